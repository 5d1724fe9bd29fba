//! # Logging & Tracing Infrastructure
//!
//! Provides structured logging with the `tracing` crate, supporting:
//! - JSON, pretty-print and compact output formats
//! - Module-level filtering
//! - Redaction of tag identifiers and secrets
//! - Integration with host logging via `LoggerSink`
//!
//! ## Overview
//!
//! This module configures the `tracing-subscriber` infrastructure and mirrors
//! events into the platform logging system (Logcat, os_log) through the
//! `LoggerSink` trait. When a sink is configured, every event that survives
//! filtering is forwarded to the host logger while still flowing through the
//! standard `tracing` layers.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::time::LogLevel;
//!
//! // `logcat` is the host's `Arc<dyn LoggerSink>`.
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Pretty)
//!     .with_level(LogLevel::Debug)
//!     .with_logger_sink(logcat);
//!
//! init_logging(config)?;
//! tracing::info!("Tag bridge started");
//! ```
//!
//! ## Redaction
//!
//! Tag identifiers are treated as personal data: a tag stuck on a parcel or a
//! patient tracks that parcel or patient. With redaction enabled (the
//! default), fields forwarded to the host sink pass through
//! [`redact_if_sensitive`].

use crate::error::{Error, Result};

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};

use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer, Registry,
};

/// Crates whose events are enabled at the configured level by default.
const WORKSPACE_TARGETS: &[&str] = &[
    "tag_bridge_workspace",
    "core_schema",
    "core_runtime",
    "core_service",
    "bridge_simulator",
];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Minimum log level
    pub level: LogLevel,
    /// Mask tag identifiers and secrets forwarded to the host sink
    pub redact_identifiers: bool,
    /// Custom filter string (e.g., "core_service=debug,core_runtime=trace")
    pub filter: Option<String>,
    /// Optional logger sink for forwarding logs to host
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span enter/exit
    pub enable_spans: bool,
    pub display_target: bool,
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            redact_identifiers: true,
            filter: None,
            logger_sink: None,
            enable_spans: true,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("redact_identifiers", &self.redact_identifiers)
            .field("filter", &self.filter)
            .field("logger_sink", &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"))
            .field("enable_spans", &self.enable_spans)
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_redaction(mut self, redact: bool) -> Self {
        self.redact_identifiers = redact;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set logger sink for host integration
    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Installs the global subscriber.
///
/// Call once during startup; a second call fails with [`Error::Config`], as
/// does an unparsable filter.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let sink_layer = config
        .logger_sink
        .clone()
        .map(|sink| LoggerSinkLayer::new(sink, config.redact_identifiers));

    tracing_subscriber::registry()
        .with(output_layer(&config))
        .with(sink_layer)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer(config: &LoggingConfig) -> BoxedLayer {
    let base = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_writer(io::stdout);

    match config.format {
        LogFormat::Pretty => {
            let span_events = if config.enable_spans {
                FmtSpan::ACTIVE
            } else {
                FmtSpan::NONE
            };
            base.pretty().with_span_events(span_events).boxed()
        }
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(config.enable_spans)
            .boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        // Workspace crates at the configured level, dependencies at warn.
        None => WORKSPACE_TARGETS.iter().fold("warn".to_string(), |acc, target| {
            format!("{},{}={}", acc, target, directive_level(config.level))
        }),
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directives, e)))
}

fn directive_level(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

// ============================================================================
// Host sink forwarding
// ============================================================================

/// Mirrors events into the host [`LoggerSink`] (Logcat, os_log).
struct LoggerSinkLayer {
    sink: Arc<dyn LoggerSink>,
    redact: bool,
}

impl LoggerSinkLayer {
    fn new(sink: Arc<dyn LoggerSink>, redact: bool) -> Self {
        Self { sink, redact }
    }
}

impl<S> Layer<S> for LoggerSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = log_level(*metadata.level());
        if level < self.sink.min_level() {
            return;
        }

        let mut fields = EntryFields::new(self.redact);
        event.record(&mut fields);

        let message = fields
            .message
            .take()
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = fields
            .values
            .into_iter()
            .fold(LogEntry::new(level, metadata.target(), message), |entry, (key, value)| {
                entry.with_field(key, value)
            });
        entry.span_id = ctx.lookup_current().map(|span| span.name().to_string());

        forward(Arc::clone(&self.sink), entry);
    }
}

fn log_level(level: tracing::Level) -> LogLevel {
    match level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

/// Hands `entry` to the sink without blocking the runtime: spawned when a
/// tokio runtime is current, otherwise awaited in place. Native callback
/// threads have no runtime.
fn forward(sink: Arc<dyn LoggerSink>, entry: LogEntry) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(err) = sink.log(entry).await {
                    eprintln!("LoggerSink error: {}", err);
                }
            });
        }
        Err(_) => {
            if let Err(err) = futures::executor::block_on(sink.log(entry)) {
                eprintln!("LoggerSink error: {}", err);
            }
        }
    }
}

/// Collects event fields, redacting as they are recorded.
struct EntryFields {
    redact: bool,
    message: Option<String>,
    values: Vec<(String, String)>,
}

impl EntryFields {
    fn new(redact: bool) -> Self {
        Self {
            redact,
            message: None,
            values: Vec::new(),
        }
    }

    fn push(&mut self, field: &Field, value: String) {
        let name = field.name();
        if name == "message" {
            self.message = Some(value);
        } else if self.redact {
            let redacted = redact_if_sensitive(name, &value);
            self.values.push((name.to_string(), redacted));
        } else {
            self.values.push((name.to_string(), value));
        }
    }
}

impl Visit for EntryFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, value.to_string());
    }

    // Numbers and bools arrive here through the default `record_*` methods.
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{:?}", value));
    }
}

/// Redacts the value of a sensitive field.
///
/// Tag identifiers keep their last four characters so log lines of one tag
/// can still be correlated; secrets are replaced entirely.
///
/// ```
/// use core_runtime::logging::redact_if_sensitive;
///
/// assert_eq!(redact_if_sensitive("tag_id", "04:A2:3B:9C"), "***B:9C");
/// assert_eq!(redact_if_sensitive("password", "hunter2"), "[REDACTED]");
/// assert_eq!(redact_if_sensitive("state", "Ready"), "Ready");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    const SECRET_FIELDS: &[&str] = &["token", "password", "secret", "api_key", "authorization"];
    const IDENTIFIER_FIELDS: &[&str] = &["tag_id", "tagid", "uid", "serial"];

    let field_lower = field_name.to_lowercase();
    if SECRET_FIELDS.iter().any(|&f| field_lower.contains(f)) {
        return "[REDACTED]".to_string();
    }

    if IDENTIFIER_FIELDS.iter().any(|&f| field_lower.contains(f)) {
        let chars: Vec<char> = value.chars().collect();
        if chars.len() <= 4 {
            return "***".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        return format!("***{}", tail);
    }

    value.to_string()
}

/// Strip full file paths to basename only
///
/// ```
/// use core_runtime::logging::strip_path;
///
/// assert_eq!(strip_path("/opt/tag-reader/Msg.dll"), "Msg.dll");
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_level(LogLevel::Debug)
            .with_redaction(false)
            .with_filter("core_service=trace")
            .with_spans(false)
            .with_target(true)
            .with_thread_info(true);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Debug);
        assert!(!config.redact_identifiers);
        assert_eq!(config.filter, Some("core_service=trace".to_string()));
        assert!(!config.enable_spans);
        assert!(config.display_thread_info);
    }

    #[test]
    fn test_redact_if_sensitive() {
        assert_eq!(redact_if_sensitive("access_token", "secret123"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("password", "pass"), "[REDACTED]");

        assert_eq!(redact_if_sensitive("tag_id", "04A23B9C"), "***3B9C");
        assert_eq!(redact_if_sensitive("tagId", "12345"), "***2345");
        assert_eq!(redact_if_sensitive("uid", "123"), "***");

        assert_eq!(redact_if_sensitive("subscription", "12"), "12");
        assert_eq!(redact_if_sensitive("state", "Ready"), "Ready");
    }

    #[test]
    fn test_strip_path() {
        assert_eq!(strip_path("/opt/tag-reader/Msg.dll"), "Msg.dll");
        assert_eq!(strip_path("C:\\TagReader\\Ndef.dll"), "Ndef.dll");
        assert_eq!(strip_path("Msg.dll"), "Msg.dll");
        assert_eq!(strip_path("/var/log/"), "");
    }

    #[test]
    fn test_default_format() {
        #[cfg(debug_assertions)]
        assert_eq!(LogFormat::default(), LogFormat::Pretty);

        #[cfg(not(debug_assertions))]
        assert_eq!(LogFormat::default(), LogFormat::Json);
    }

    #[test]
    fn test_default_filter_covers_workspace() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        let filter = build_filter(&config).unwrap().to_string();

        assert!(filter.contains("core_service=debug"));
        assert!(filter.contains("core_runtime=debug"));
        assert!(filter.contains("bridge_simulator=debug"));
    }

    #[test]
    fn test_build_custom_filter() {
        let config = LoggingConfig::default().with_filter("core_service=trace,core_runtime=debug");
        let filter = build_filter(&config).unwrap();
        assert!(filter.to_string().contains("core_service=trace"));
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let config = LoggingConfig::default().with_filter("core_service=notalevel");
        assert!(matches!(build_filter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_logger_sink_layer_forwards_redacted_event() {
        let sink = Arc::new(TestLoggerSink::default());
        let trait_sink: Arc<dyn LoggerSink> = sink.clone();
        let layer = LoggerSinkLayer::new(trait_sink, true);
        let subscriber = tracing_subscriber::registry().with(layer);
        let _guard = tracing::subscriber::set_default(subscriber);

        tracing::info!(target: "core_service", tag_id = "04A23B9C", state = "Ready", "Tag connected");

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.target, "core_service");
        assert_eq!(entry.message, "Tag connected");
        assert_eq!(entry.fields.get("tag_id"), Some(&"***3B9C".to_string()));
        assert_eq!(entry.fields.get("state"), Some(&"Ready".to_string()));
    }

    #[test]
    fn test_logger_sink_layer_respects_min_level() {
        let sink = Arc::new(TestLoggerSink {
            entries: Mutex::new(Vec::new()),
            min_level: LogLevel::Warn,
        });
        let trait_sink: Arc<dyn LoggerSink> = sink.clone();
        let subscriber =
            tracing_subscriber::registry().with(LoggerSinkLayer::new(trait_sink, false));
        let _guard = tracing::subscriber::set_default(subscriber);

        tracing::info!("ignored");
        tracing::warn!("kept");

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "kept");
    }

    struct TestLoggerSink {
        entries: Mutex<Vec<LogEntry>>,
        min_level: LogLevel,
    }

    impl Default for TestLoggerSink {
        fn default() -> Self {
            Self {
                entries: Mutex::new(Vec::new()),
                min_level: LogLevel::Trace,
            }
        }
    }

    #[async_trait]
    impl LoggerSink for TestLoggerSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            self.min_level
        }
    }
}
