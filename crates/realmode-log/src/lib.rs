//! Leveled logging for the `realmode` memory crates.
//!
//! Messages go to standard error, tagged with the module path of the call
//! site. The level is global and can be changed at any time, either
//! programmatically or from the `REALMODE_LOG` environment variable.
//!
//! Allocation failures are reported through [`diag!`], which only emits text
//! in debug builds. Release builds keep the same return values but stay quiet.
//!
//! # Example
//!
//! ```
//! use realmode_log::{error, warn, info, debug, Level};
//!
//! realmode_log::set_level(Level::Debug);
//!
//! let paragraphs = 64;
//! info!("reserved {} paragraphs", paragraphs);
//! debug!("chain: {:?}", vec!['M', 'M', 'Z']);
//! warn!("probe returned an unexpected block");
//! error!("memory control blocks destroyed");
//! ```

use std::fmt::Arguments;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

/// Environment variable read by [`init_from_env`].
pub const LOG_ENV_VAR: &str = "REALMODE_LOG";

/// Log levels, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Failures the caller cannot ignore.
    Error = 0,
    /// Recoverable failures and suspicious states.
    Warn = 1,
    /// Lifecycle events (arena created, destroyed).
    Info = 2,
    /// Detailed diagnostic information.
    Debug = 3,
    /// Per-allocation tracing.
    Trace = 4,
}

impl Level {
    const fn color_code(&self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    /// Returns the string representation of this log level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Level {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }

    /// Parses a level name, case-insensitively.
    ///
    /// ```
    /// use realmode_log::Level;
    ///
    /// assert_eq!(Level::from_str("warn"), Ok(Level::Warn));
    /// assert_eq!(Level::from_str("TRACE"), Ok(Level::Trace));
    /// assert!(Level::from_str("verbose").is_err());
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_uppercase().as_str() {
            "ERROR" => Ok(Level::Error),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            "TRACE" => Ok(Level::Trace),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

/// Level used until something sets another one.
pub const DEFAULT_LEVEL: Level = Level::Warn;

/// The global logger.
///
/// Only the level lives here; formatting is done by the macros.
pub struct Logger {
    level: AtomicU8,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
        }
    }

    /// Sets the minimum level that gets written.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    /// Returns the current minimum level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Checks if a message at the given level would be written.
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Returns the global logger, creating it at [`DEFAULT_LEVEL`] on first use.
pub fn get_logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new(DEFAULT_LEVEL))
}

/// Sets the minimum level of the global logger.
pub fn set_level(level: Level) {
    get_logger().set_level(level);
}

/// Sets the minimum level from a level name.
///
/// ```
/// realmode_log::set_level_from_str("info").unwrap();
/// assert!(realmode_log::set_level_from_str("loud").is_err());
/// ```
pub fn set_level_from_str(s: &str) -> Result<(), String> {
    let level = Level::from_str(s)?;
    set_level(level);
    Ok(())
}

/// Configures the level from `REALMODE_LOG`.
///
/// An unset or unparsable variable leaves the current level alone. Returns
/// the level in effect afterwards.
pub fn init_from_env() -> Level {
    init_from_value(std::env::var(LOG_ENV_VAR).ok().as_deref())
}

/// Configures the level from an optional level name, as read from
/// `REALMODE_LOG`.
///
/// `None` and unparsable names leave the current level alone; the latter is
/// reported at the Warn level. Returns the level in effect afterwards.
///
/// ```
/// use realmode_log::Level;
///
/// assert_eq!(realmode_log::init_from_value(Some("error")), Level::Error);
/// assert_eq!(realmode_log::init_from_value(None), Level::Error);
/// ```
pub fn init_from_value(value: Option<&str>) -> Level {
    if let Some(value) = value {
        if let Err(message) = set_level_from_str(value) {
            __log_with_target(
                Level::Warn,
                module_path!(),
                format_args!("{message}; keeping {}", get_logger().level().as_str()),
            );
        }
    }
    get_logger().level()
}

/// Writes one record. Called by the macros after the level check.
#[doc(hidden)]
pub fn __log_with_target(level: Level, target: &str, args: Arguments) {
    static RESET: &str = "\x1b[0m";

    if !get_logger().enabled(level) {
        return;
    }

    let color = level.color_code();
    let level_str = level.as_str();

    eprintln!("{color}[{level_str}]{RESET} {target}: {args}");
}

/// Logs at an explicit level.
///
/// ```
/// use realmode_log::{log, Level};
///
/// log!(level: Level::Info, "arena of {} bytes", 1024);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {
        {
            if $crate::get_logger().enabled($level) {
                $crate::__log_with_target(
                    $level,
                    module_path!(),
                    format_args!($($arg)*)
                );
            }
        }
    };
}

/// Logs at the Error level.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Error, $($arg)*)
    };
}

/// Logs at the Warn level.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Warn, $($arg)*)
    };
}

/// Logs at the Info level.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Info, $($arg)*)
    };
}

/// Logs at the Debug level.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Debug, $($arg)*)
    };
}

/// Logs at the Trace level.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Trace, $($arg)*)
    };
}

/// Reports a failed request in debug builds only.
///
/// Release builds compile the arguments but never format or write them.
///
/// ```
/// use realmode_log::diag;
///
/// let (requested, available) = (2048, 1024);
/// diag!("Allocation failed: Requested {}, Available {}", requested, available);
/// ```
#[macro_export]
macro_rules! diag {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) {
            $crate::log!(level: $crate::Level::Warn, $($arg)*)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Warn < Level::Info);
        assert!(Level::Info < Level::Debug);
        assert!(Level::Debug < Level::Trace);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!(Level::from_str("error"), Ok(Level::Error));
        assert_eq!(Level::from_str("Warning"), Ok(Level::Warn));
        assert_eq!(Level::from_str(" info "), Ok(Level::Info));
        assert_eq!(Level::from_str("DEBUG"), Ok(Level::Debug));
        assert_eq!(Level::from_str("trace"), Ok(Level::Trace));
        assert!(Level::from_str("").is_err());
    }

    #[test]
    fn test_level_round_trips_through_u8() {
        for level in [Level::Error, Level::Warn, Level::Info, Level::Debug, Level::Trace] {
            assert_eq!(Level::from_u8(level as u8), level);
        }
    }

    #[test]
    fn test_logger_enabled() {
        let logger = Logger::new(Level::Warn);
        assert!(logger.enabled(Level::Error));
        assert!(logger.enabled(Level::Warn));
        assert!(!logger.enabled(Level::Info));

        logger.set_level(Level::Trace);
        assert_eq!(logger.level(), Level::Trace);
        assert!(logger.enabled(Level::Trace));
    }

    #[test]
    fn test_macros_do_not_panic() {
        warn!("warn {}", 1);
        info!("info {}", 2);
        debug!("debug {}", 3);
        trace!("trace {}", 4);
        diag!("diag {} {}", 5, 6);
    }

    #[test]
    fn test_init_from_value() {
        let before = get_logger().level();

        assert_eq!(init_from_value(Some("debug")), Level::Debug);
        assert_eq!(get_logger().level(), Level::Debug);

        assert_eq!(init_from_value(None), Level::Debug);
        assert_eq!(init_from_value(Some("shouting")), Level::Debug);
        assert_eq!(init_from_value(Some(" Warning ")), Level::Warn);

        let from_env = init_from_env();
        assert_eq!(from_env, get_logger().level());
        if std::env::var(LOG_ENV_VAR).is_err() {
            assert_eq!(from_env, Level::Warn);
        }

        set_level(before);
    }

    #[test]
    fn test_set_level_from_str_rejects_garbage() {
        assert!(set_level_from_str("chatty").is_err());
    }
}
