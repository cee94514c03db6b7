//! Utilities for logging diagnostic messages from the library.
//!
//! This is a debugging aid only. It is independent of the pluggable
//! [`ParseErrorHandler`](crate::error::ParseErrorHandler),
//! [`ParseExceptionHandler`](crate::error::ParseExceptionHandler) and
//! [`InterpretErrorHandler`](crate::error::InterpretErrorHandler) traits, which are
//! the load-bearing way this crate reports recoverable and fatal problems to callers.

use once_cell::sync::Lazy;

#[macro_export]
macro_rules! css_log {
    (
        $($arg:tt)+
    ) => {
        if $crate::log::log_enabled() {
            eprintln!("{}", format_args!($($arg)+));
        }
    };
}

/// Whether the `CSSOM_LOG` environment variable is set.
pub fn log_enabled() -> bool {
    static ENABLED: Lazy<bool> = Lazy::new(|| ::std::env::var_os("CSSOM_LOG").is_some());

    *ENABLED
}
