use rir_core::error::Error;

/// Create a simple optimization error
pub fn optimization_error(message: impl Into<String>) -> Error {
    Error::Generic(message.into())
}

/// Create an optimization error with a specific error code
pub fn optimization_error_with_code(message: impl Into<String>, code: impl Into<String>) -> Error {
    let message = format!("{} ({})", message.into(), code.into());
    optimization_error(message)
}

/// Macro to return early with an optimization error
#[macro_export]
macro_rules! opt_bail {
    ($message:expr) => {
        return Err($crate::error::optimization_error($message))
    };
    ($message:expr, $code:expr) => {
        return Err($crate::error::optimization_error_with_code($message, $code))
    };
}

/// Macro to ensure a condition is true, or return an optimization error
#[macro_export]
macro_rules! opt_ensure {
    ($cond:expr, $message:expr) => {
        if !($cond) {
            $crate::opt_bail!($message);
        }
    };
    ($cond:expr, $message:expr, $code:expr) => {
        if !($cond) {
            $crate::opt_bail!($message, $code);
        }
    };
}
