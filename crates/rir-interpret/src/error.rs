use rir_core::error::{Error, EvaluationError};

/// Create a simple interpretation error
pub fn interpretation_error(message: impl Into<String>) -> Error {
    EvaluationError::InvalidOperation(message.into()).into()
}

/// Create an interpretation error tagged with a short code
pub fn interpretation_error_with_code(message: impl Into<String>, code: impl Into<String>) -> Error {
    let message = format!("{} ({})", message.into(), code.into());
    interpretation_error(message)
}

/// Macro to return early with an interpretation error
#[macro_export]
macro_rules! interp_bail {
    ($message:expr) => {
        return Err($crate::error::interpretation_error($message))
    };
    ($message:expr, $code:expr) => {
        return Err($crate::error::interpretation_error_with_code($message, $code))
    };
}

/// Macro to ensure a condition is true, or return an interpretation error
#[macro_export]
macro_rules! interp_ensure {
    ($cond:expr, $message:expr) => {
        if !($cond) {
            $crate::interp_bail!($message);
        }
    };
    ($cond:expr, $message:expr, $code:expr) => {
        if !($cond) {
            $crate::interp_bail!($message, $code);
        }
    };
}
