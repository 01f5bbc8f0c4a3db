//! Macros for generator error handling.

/// Creates a [`crate::error::GenError`] from error kind, description and optional detail.
#[macro_export]
macro_rules! gen_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::GenError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::GenError::from(($kind, $desc, $detail.to_string()))
    };
}

/// Creates and returns a [`crate::error::GenError`] from the current function.
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return Err($crate::gen_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return Err($crate::gen_error!($kind, $desc, $detail))
    };
}
