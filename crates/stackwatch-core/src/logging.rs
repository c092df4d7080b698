//! Shared logging initialization for stackwatch binaries.

use std::sync::OnceLock;

static INIT: OnceLock<()> = OnceLock::new();

/// Environment variable selecting the log level
pub const ENV_LOG: &str = "STACKWATCH_LOG";

/// Map a level name to a tracing level; unknown names fall back to INFO
pub fn parse_level(value: &str) -> tracing::Level {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

/// Initialize process-level tracing output from `STACKWATCH_LOG`.
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init() {
    let level = std::env::var(ENV_LOG)
        .map(|v| parse_level(&v))
        .unwrap_or(tracing::Level::INFO);
    init_with_level(level);
}

/// Initialize tracing output at an explicit level.
pub fn init_with_level(level: tracing::Level) {
    if INIT.get().is_some() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    let _ = INIT.set(());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_names() {
        assert_eq!(parse_level("trace"), tracing::Level::TRACE);
        assert_eq!(parse_level("DEBUG"), tracing::Level::DEBUG);
        assert_eq!(parse_level(" warn "), tracing::Level::WARN);
        assert_eq!(parse_level("error"), tracing::Level::ERROR);
        assert_eq!(parse_level("info"), tracing::Level::INFO);
        assert_eq!(parse_level("loud"), tracing::Level::INFO);
    }

    #[test]
    fn test_init_is_idempotent() {
        init_with_level(tracing::Level::DEBUG);
        init_with_level(tracing::Level::ERROR);
        init();
    }
}
