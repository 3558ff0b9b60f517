//! Logging setup for the tasstooter binary
//!
//! Logs go to stderr so stdout stays free for command output. The level is
//! taken from, in order: `TASSTOOTER_LOG_LEVEL`, `--verbose`, `RUST_LOG`,
//! and finally `info`. sqlx statement logging is held at `warn` unless a
//! directive names it explicitly.

use std::str::FromStr;
use tracing_subscriber::EnvFilter;

const LEVEL_VAR: &str = "TASSTOOTER_LOG_LEVEL";
const FORMAT_VAR: &str = "TASSTOOTER_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Plain lines without colors
    Text,
    /// One JSON object per line, for `listen` running under a supervisor
    Json,
    /// Multi-line colored output
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

pub struct LoggingConfig {
    pub format: LogFormat,
    /// Explicit filter from `TASSTOOTER_LOG_LEVEL`
    pub level: Option<String>,
    pub verbose: bool,
}

impl LoggingConfig {
    /// Read `TASSTOOTER_LOG_FORMAT` and `TASSTOOTER_LOG_LEVEL`.
    ///
    /// An unparseable format falls back to text.
    pub fn from_env(verbose: bool) -> Self {
        let format = std::env::var(FORMAT_VAR)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(LogFormat::Text);
        let level = std::env::var(LEVEL_VAR).ok().filter(|s| !s.trim().is_empty());

        Self {
            format,
            level,
            verbose,
        }
    }

    fn directives(&self) -> String {
        let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        filter_directives(self.level.as_deref(), self.verbose, rust_log.as_deref())
    }

    /// Install the global subscriber. Later calls are ignored.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_new(self.directives()).unwrap_or_else(|_| EnvFilter::new("info"));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);

        let _ = match self.format {
            LogFormat::Json => builder
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .try_init(),
            LogFormat::Pretty => builder.pretty().with_file(true).try_init(),
            LogFormat::Text => builder.with_ansi(false).with_target(false).try_init(),
        };
    }
}

fn filter_directives(level: Option<&str>, verbose: bool, rust_log: Option<&str>) -> String {
    let base = match (level, verbose, rust_log) {
        (Some(level), _, _) => level,
        (None, true, _) => "debug",
        (None, false, Some(rust_log)) if !rust_log.trim().is_empty() => rust_log,
        _ => "info",
    };

    if base.contains("sqlx") {
        base.to_string()
    } else {
        format!("{},sqlx=warn", base)
    }
}
