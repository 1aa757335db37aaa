//! Colored stderr logging with level filtering.
//!
//! The minimum level defaults to `info` and can be changed with the
//! `OPCHAIN_LOG` environment variable (`debug`, `info`, `warn`, `error`) or
//! programmatically via [`set_min_level`]. All macros are silent under `cfg(test)`.

use std::fmt::Display;
use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Environment variable holding the minimum log level.
pub const LOG_ENV: &str = "OPCHAIN_LOG";

/// Log level for filtering messages.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    /// Parses a level name, case-insensitively.
    pub fn parse(name: &str) -> Option<Level> {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            _ => None,
        }
    }

    fn from_u8(v: u8) -> Level {
        match v {
            0 => Level::Debug,
            1 => Level::Info,
            2 => Level::Warn,
            _ => Level::Error,
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Debug => write!(f, "DEBUG"),
            Level::Info => write!(f, "INFO"),
            Level::Warn => write!(f, "WARN"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

/// Converts days since Unix epoch to (year, month, day).
fn days_to_date(days: u64) -> (u32, u32, u32) {
    // Howard Hinnant's civil-from-days
    let z = days as i64 + 719468;
    let era = z.div_euclid(146097);
    let doe = z.rem_euclid(146097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y as u32, m, d)
}

pub static SHOW_TIMESTAMP: AtomicBool = AtomicBool::new(true);

/// `u8::MAX` until configured, then a [`Level`] discriminant.
static MIN_LEVEL: AtomicU8 = AtomicU8::new(u8::MAX);
static ENV_LEVEL: OnceLock<Level> = OnceLock::new();

/// Overrides the minimum level, ignoring `OPCHAIN_LOG`.
pub fn set_min_level(level: Level) {
    MIN_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Returns the active minimum level.
pub fn min_level() -> Level {
    match MIN_LEVEL.load(Ordering::Relaxed) {
        u8::MAX => *ENV_LEVEL.get_or_init(|| {
            std::env::var(LOG_ENV)
                .ok()
                .and_then(|v| Level::parse(&v))
                .unwrap_or(Level::Info)
        }),
        v => Level::from_u8(v),
    }
}

/// Internal logging function. Use the `debug!`, `info!`, `warn!` or `error!` macros instead.
#[doc(hidden)]
pub fn log(level: Level, message: &str) {
    if level < min_level() {
        return;
    }
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = now.as_secs();
    let (year, month, day) = days_to_date(secs / 86400);
    let hours = (secs / 3600) % 24;
    let mins = (secs / 60) % 60;
    let s = secs % 60;
    let millis = now.subsec_millis();

    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let mut spec = ColorSpec::new();
    match level {
        Level::Debug => {
            spec.set_fg(Some(Color::Cyan));
        }
        Level::Info => {}
        Level::Warn => {
            spec.set_fg(Some(Color::Yellow)).set_bold(true);
        }
        Level::Error => {
            spec.set_fg(Some(Color::Red)).set_bold(true);
        }
    }
    let _ = stderr.set_color(&spec);

    if SHOW_TIMESTAMP.load(Ordering::Relaxed) {
        let _ = write!(
            stderr,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03} ",
            year, month, day, hours, mins, s, millis
        );
    }
    let _ = writeln!(stderr, "[{:5}] {}", level, message);
    let _ = stderr.reset();
}

/// Logs a debug-level message.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {{
        if cfg!(not(test)) {
            $crate::utils::log::log($crate::utils::log::Level::Debug, &format!($($arg)*))
        }
    }};
}

/// Logs an info-level message.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        if cfg!(not(test)) {
            $crate::utils::log::log($crate::utils::log::Level::Info, &format!($($arg)*))
        }
    }};
}

/// Logs a warning-level message.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        if cfg!(not(test)) {
            $crate::utils::log::log($crate::utils::log::Level::Warn, &format!($($arg)*))
        }
    }};
}

/// Logs an error-level message.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        if cfg!(not(test)) {
            $crate::utils::log::log($crate::utils::log::Level::Error, &format!($($arg)*))
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn level_parse() {
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse(" warn "), Some(Level::Warn));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("loud"), None);
    }

    #[test]
    fn level_display() {
        assert_eq!(format!("{}", Level::Debug), "DEBUG");
        assert_eq!(format!("{}", Level::Error), "ERROR");
    }

    #[test]
    fn days_to_date_epoch() {
        assert_eq!(days_to_date(0), (1970, 1, 1));
    }

    #[test]
    fn days_to_date_leap_day() {
        // 2024-02-29 is 19782 days after epoch
        assert_eq!(days_to_date(19782), (2024, 2, 29));
    }
}
