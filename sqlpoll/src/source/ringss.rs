//! Data source for the SOAR RINGSS turbulence-profile database.
//!
//! RINGSS measures atmospheric turbulence from stellar scintillation. The
//! database rows carry per-star seeing and scintillation metrics plus eight
//! integrated turbulence-profile values (`J*` columns) at fixed altitude
//! layers, which are rescaled here into SI units before emission.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlpoll_config::shared::SourceConfig;

use crate::error::PollResult;
use crate::source::base::{MappedRow, TableSource};
use crate::types::{RawRow, SqlValue};

/// Scale factor from the database's `J*` column units to m^(1/3).
pub const TURBULENCE_PROFILE_SCALE: f64 = 1e-13;

/// TAI-UTC offset in seconds. Constant since 2017; revisit when the next leap
/// second is announced.
const TAI_MINUS_UTC_SECS: f64 = 37.0;

/// The `J*` columns holding the turbulence profile, in altitude order.
const PROFILE_COLUMNS: [&str; 8] = ["J0", "J025", "J05", "J1", "J2", "J4", "J8", "J16"];

/// One RINGSS measurement, ready for emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingssMeasurement {
    /// Measurement time as TAI unix seconds.
    pub timestamp: f64,
    /// HR catalog number of the observed star.
    pub hr_num: i64,
    /// Zenith distance of the observed star, in degrees.
    pub zenith_distance: f64,
    /// Stellar flux in detector counts.
    pub flux: f64,
    /// Seeing FWHM from scintillation, in arcseconds.
    pub fwhm_scintillation: f64,
    /// Seeing FWHM from the sector method, in arcseconds.
    pub fwhm_sector: f64,
    /// Free-atmosphere seeing FWHM, in arcseconds.
    pub fwhm_free: f64,
    /// Effective wind speed, in m/s.
    pub wind: f64,
    /// Atmospheric coherence time, in milliseconds.
    pub tau0: f64,
    /// Isoplanatic angle, in arcseconds.
    pub theta0: f64,
    /// Total scintillation variance.
    pub total_variance: f64,
    /// RMS error of the profile restoration.
    pub e_rms: f64,
    /// Integrated turbulence profile per altitude layer, in m^(1/3).
    pub turbulence_profiles: [f64; 8],
}

/// A data source for the SOAR RINGSS database.
///
/// Rows are minimally adjusted to fit the output schema: timestamps move from
/// UTC to TAI and the turbulence profile is rescaled, everything else maps
/// one to one.
#[derive(Debug, Clone)]
pub struct RingssSource {
    table_name: String,
}

impl RingssSource {
    /// Creates a RINGSS source polling the configured table.
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            table_name: config.table_name.clone(),
        }
    }
}

impl TableSource for RingssSource {
    type Record = RingssMeasurement;

    fn name(&self) -> &'static str {
        "ringss"
    }

    fn query(&self) -> String {
        format!(
            "SELECT * FROM {} WHERE time > $1 ORDER BY time",
            self.table_name
        )
    }

    fn map_row(&self, row: &RawRow) -> PollResult<MappedRow<RingssMeasurement>> {
        let time = row.get_timestamp("time")?;

        let mut turbulence_profiles = [0.0; 8];
        for (profile, column) in turbulence_profiles.iter_mut().zip(PROFILE_COLUMNS) {
            *profile = row.get_f64(column)? * TURBULENCE_PROFILE_SCALE;
        }

        let record = RingssMeasurement {
            timestamp: tai_from_utc(time),
            hr_num: row.get_i64("star")?,
            zenith_distance: row.get_f64("zen")?,
            flux: row.get_f64("flux")?,
            fwhm_scintillation: row.get_f64("see")?,
            fwhm_sector: row.get_f64("see2")?,
            fwhm_free: row.get_f64("fsee")?,
            wind: row.get_f64("wind")?,
            tau0: row.get_f64("tau0")?,
            theta0: row.get_f64("theta0")?,
            total_variance: row.get_f64("totvar")?,
            e_rms: row.get_f64("erms")?,
            turbulence_profiles,
        };

        Ok(MappedRow {
            source_timestamp: time,
            record,
        })
    }

    fn simulated_row(&self) -> RawRow {
        [
            ("time", SqlValue::Timestamp(Utc::now())),
            ("star", SqlValue::Int(1234)),
            ("zen", SqlValue::Float(10.0)),
            ("flux", SqlValue::Float(100000.5)),
            ("see2", SqlValue::Float(0.9)),
            ("see", SqlValue::Float(0.8)),
            ("fsee", SqlValue::Float(1.1)),
            ("wind", SqlValue::Float(5.5)),
            ("tau0", SqlValue::Float(12.1)),
            ("theta0", SqlValue::Float(2.2)),
            ("totvar", SqlValue::Float(0.035)),
            ("erms", SqlValue::Float(0.3)),
            ("J0", SqlValue::Float(2.2)),
            ("J025", SqlValue::Float(0.0)),
            ("J05", SqlValue::Float(0.08)),
            ("J1", SqlValue::Int(0)),
            ("J2", SqlValue::Int(0)),
            ("J4", SqlValue::Int(0)),
            ("J8", SqlValue::Float(0.4)),
            ("J16", SqlValue::Float(0.3)),
        ]
        .into_iter()
        .map(|(column, value)| (column.to_string(), value))
        .collect()
    }
}

/// Converts a UTC timestamp to TAI unix seconds.
fn tai_from_utc(utc: DateTime<Utc>) -> f64 {
    utc.timestamp_micros() as f64 / 1e6 + TAI_MINUS_UTC_SECS
}
