use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::env;
use std::io::{self, Write};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::config::GatewayConfig;

static GATEWAY_LOGGER: Lazy<GatewayLogger> = Lazy::new(GatewayLogger::new);

pub fn init() -> Result<(), String> {
    init_with_config(LoggerConfig::from_env())
}

pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    let max_level = config.min_level;
    GATEWAY_LOGGER.update_config(config);

    log::set_logger(&*GATEWAY_LOGGER).map_err(|e| format!("Failed to set logger: {:?}", e))?;
    log::set_max_level(max_level);
    Ok(())
}

pub fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" => Some(LevelFilter::Off),
        _ => None,
    }
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Trace => Color::Cyan,
        Level::Debug => Color::Blue,
        Level::Info => Color::Green,
        Level::Warn => Color::Yellow,
        Level::Error => Color::Red,
    }
}

/// One JSON log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl LogEntry {
    fn from_record(record: &Record, with_location: bool) -> Self {
        let location = if with_location {
            record
                .file()
                .map(|file| format!("{}:{}", file, record.line().unwrap_or(0)))
        } else {
            None
        };
        Self {
            timestamp: Utc::now(),
            level: record.level().as_str().to_string(),
            target: record.target().to_string(),
            message: record.args().to_string(),
            location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    pub min_level: LevelFilter,
    pub show_colors: bool,
    pub output_json: bool,
    pub show_file_location: bool,
    pub timestamp_format: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LevelFilter::Info,
            show_colors: true,
            output_json: false,
            show_file_location: false,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// `LOG_LEVEL` picks the threshold; `LOG_FORMAT=json` switches to
    /// uncolored JSON lines for log shippers.
    pub fn from_env() -> Self {
        let base = match env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") => Self::production(),
            _ => Self::development(),
        };
        match env::var("LOG_LEVEL").ok().as_deref().and_then(parse_level) {
            Some(level) => base.with_level(level),
            None => base,
        }
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.show_colors = enabled;
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    pub fn production() -> Self {
        Self {
            min_level: LevelFilter::Info,
            show_colors: false,
            output_json: true,
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            min_level: LevelFilter::Debug,
            show_colors: true,
            output_json: false,
            show_file_location: true,
            ..Default::default()
        }
    }
}

pub struct GatewayLogger {
    config: RwLock<LoggerConfig>,
}

impl GatewayLogger {
    pub fn new() -> Self {
        Self {
            config: RwLock::new(LoggerConfig::default()),
        }
    }

    pub fn update_config(&self, new_config: LoggerConfig) {
        if let Ok(mut config) = self.config.write() {
            *config = new_config;
        }
    }

    fn format_line(&self, entry: &LogEntry, level: Level, config: &LoggerConfig) -> String {
        let timestamp = entry.timestamp.format(&config.timestamp_format).to_string();
        let mut line = if config.show_colors {
            format!(
                "{} [{:<5}] {}: {}",
                timestamp.bright_black(),
                entry.level.color(level_color(level)).bold(),
                entry.target.bright_blue(),
                entry.message
            )
        } else {
            format!(
                "{} [{:<5}] {}: {}",
                timestamp, entry.level, entry.target, entry.message
            )
        };

        if let Some(location) = &entry.location {
            if config.show_colors {
                line.push_str(&format!(" ({})", location.bright_black()));
            } else {
                line.push_str(&format!(" ({})", location));
            }
        }
        line
    }
}

impl Default for GatewayLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl log::Log for GatewayLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.read() {
            Ok(config) => metadata.level() <= config.min_level,
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Ok(config) = self.config.read() else {
            return;
        };

        let entry = LogEntry::from_record(record, config.show_file_location);
        let line = if config.output_json {
            serde_json::to_string(&entry).unwrap_or_default()
        } else {
            self.format_line(&entry, record.level(), &config)
        };

        // Errors go to stderr so they survive stdout redirection.
        if record.level() == Level::Error {
            let _ = writeln!(io::stderr(), "{}", line);
        } else {
            let _ = writeln!(io::stdout(), "{}", line);
        }
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
    }
}

/// Logs how long an upstream-facing operation took when dropped.
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!("{} completed in {}ms", self.name, self.elapsed().as_millis());
    }
}

pub fn timer(name: impl Into<String>) -> Timer {
    Timer::new(name)
}

/// Startup summary. Reports which credentials are present, never their values.
pub fn log_startup_info(app_name: &str, version: &str, config: &GatewayConfig) {
    let present = |key: &Option<String>| if key.is_some() { "configured" } else { "missing" };

    log::info!("Starting {} v{}", app_name, version);
    log::info!("Listening on http://{}:{}", config.host, config.port);
    log::info!("Image backend: {}", config.image_backend.as_str());
    log::info!("Stability API key: {}", present(&config.stability.api_key));
    log::info!("Pexels API key: {}", present(&config.pexels.api_key));
    log::info!("Gemini API key: {}", present(&config.text.api_key));
    log::info!(
        "Video query expansion: {}",
        if config.video_query_expansion { "on" } else { "off" }
    );
    log::info!(
        "Video polling: {} attempts every {}s",
        config.poll.max_attempts,
        config.poll.interval.as_secs()
    );
    if config.allowed_origins.is_empty() {
        log::warn!("CORS: any origin allowed");
    } else {
        log::info!("CORS: {}", config.allowed_origins.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels() {
        assert_eq!(parse_level("DEBUG"), Some(LevelFilter::Debug));
        assert_eq!(parse_level("warning"), Some(LevelFilter::Warn));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn presets_differ_in_output_format() {
        let dev = LoggerConfig::development();
        assert_eq!(dev.min_level, LevelFilter::Debug);
        assert!(dev.show_colors);

        let prod = LoggerConfig::production();
        assert!(!prod.show_colors);
        assert!(prod.output_json);
    }

    #[test]
    fn plain_line_contains_level_target_and_message() {
        let logger = GatewayLogger::new();
        let config = LoggerConfig::new().with_colors(false);
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: "WARN".into(),
            target: "genai_gateway::gateway".into(),
            message: "slow upstream".into(),
            location: Some("src/gateway/mod.rs:10".into()),
        };
        let line = logger.format_line(&entry, Level::Warn, &config);
        assert!(line.contains("[WARN ] genai_gateway::gateway: slow upstream"));
        assert!(line.ends_with("(src/gateway/mod.rs:10)"));
    }
}
