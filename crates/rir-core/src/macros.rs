/// Macro to return early with an error
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::error::Error::Generic(format!($($arg)*)))
    };
}

/// Return early with a configuration error unless the condition holds
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($crate::error::Error::Configuration($err));
        }
    };
}
