use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration read from the environment once, at first access.
/// Bot token
/// Read from TS_TELEGRAM_BOT_TOKEN, then BOT_TOKEN, then TELOXIDE_TOKEN
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("TS_TELEGRAM_BOT_TOKEN")
        .or_else(|_| env::var("BOT_TOKEN"))
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_default()
});

/// Custom Bot API server (e.g. a local telegram-bot-api instance)
/// Read from BOT_API_URL environment variable
pub static BOT_API_URL: Lazy<Option<String>> = Lazy::new(|| env::var("BOT_API_URL").ok().filter(|s| !s.is_empty()));

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: territory.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "territory.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: terrabot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "terrabot.log".to_string()));

/// Log level
/// Read from TS_LOG_LEVEL environment variable
/// Default: info
pub static LOG_LEVEL: Lazy<log::LevelFilter> =
    Lazy::new(|| parse_log_level(env::var("TS_LOG_LEVEL").ok().as_deref()));

/// Health-check HTTP port
/// Read from PORT environment variable
/// Default: 8080
pub static PORT: Lazy<u16> = Lazy::new(|| parse_or(env::var("PORT").ok().as_deref(), 8080));

/// Language of all user-facing copy
/// Read from DEFAULT_LANG environment variable
/// Default: uk
pub static DEFAULT_LANG: Lazy<String> = Lazy::new(|| env::var("DEFAULT_LANG").unwrap_or_else(|_| "uk".to_string()));

/// Per-update processing deadline (seconds)
/// Read from UPDATE_TIMEOUT_SECS environment variable
/// Default: 20
pub static UPDATE_TIMEOUT_SECS: Lazy<u64> =
    Lazy::new(|| parse_or(env::var("UPDATE_TIMEOUT_SECS").ok().as_deref(), 20));

/// Age after which an unresolved pending action is purged (hours)
/// Read from PENDING_ACTION_TTL_HOURS environment variable
/// Default: 168 (one week)
pub static PENDING_ACTION_TTL_HOURS: Lazy<u64> =
    Lazy::new(|| parse_or(env::var("PENDING_ACTION_TTL_HOURS").ok().as_deref(), 168));

/// Per-update deadline as a duration
pub fn update_timeout() -> Duration {
    Duration::from_secs(*UPDATE_TIMEOUT_SECS)
}

/// Pending-action TTL as a chrono duration
pub fn pending_action_ttl() -> chrono::Duration {
    // Capped at a century so chrono never overflows
    let hours = (*PENDING_ACTION_TTL_HOURS).min(876_000);
    chrono::Duration::hours(hours as i64)
}

/// Parses a log level name, falling back to `Info`
pub fn parse_log_level(value: Option<&str>) -> log::LevelFilter {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("off") => log::LevelFilter::Off,
        Some("error") => log::LevelFilter::Error,
        Some("warn") | Some("warning") => log::LevelFilter::Warn,
        Some("debug") => log::LevelFilter::Debug,
        Some("trace") => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<&str>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Retry configuration
pub mod retry {
    use super::Duration;

    /// Attempts at reaching the Bot API during startup
    pub const STARTUP_ATTEMPTS: u32 = 5;

    /// First delay of the startup backoff (doubles on every attempt)
    pub const STARTUP_INITIAL_DELAY_SECS: u64 = 1;

    /// Upper bound of the startup backoff
    pub const STARTUP_MAX_DELAY_SECS: u64 = 30;

    /// Maximum number of dispatcher restarts after a panic
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Base for exponential backoff between dispatcher restarts (seconds)
    pub const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

    /// Delay before restarting the dispatcher
    pub const DISPATCHER_DELAY_SECS: u64 = 5;

    pub fn startup_initial_delay() -> Duration {
        Duration::from_secs(STARTUP_INITIAL_DELAY_SECS)
    }

    pub fn startup_max_delay() -> Duration {
        Duration::from_secs(STARTUP_MAX_DELAY_SECS)
    }

    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(DISPATCHER_DELAY_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Timeout for Bot API requests (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Message size limits
pub mod limits {
    /// Longest caption the Bot API accepts (UTF-16 units)
    pub const CAPTION_MAX_LEN: usize = 1024;

    /// Longest note a holder may leave (characters)
    pub const NOTE_MAX_CHARS: usize = 300;
}

/// Pending-action TTL sweep
pub mod purge {
    use super::Duration;

    /// How often expired pending actions are removed (seconds)
    pub const INTERVAL_SECS: u64 = 3600;

    pub fn interval() -> Duration {
        Duration::from_secs(INTERVAL_SECS)
    }
}
