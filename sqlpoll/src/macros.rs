//! Macros for polling error handling.
//!
//! Convenience macros for creating and returning [`crate::error::PollError`]
//! instances with reduced boilerplate.

/// Creates a [`crate::error::PollError`] from error kind and description.
///
/// Accepts an optional dynamic detail expression and an optional source error.
#[macro_export]
macro_rules! poll_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::PollError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::PollError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::PollError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::PollError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Creates and returns a [`crate::error::PollError`] from the current function.
///
/// Combines error creation with early return. Supports the same optional
/// detail and source arguments as [`poll_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::poll_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::poll_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::poll_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::poll_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
