//! Tracing configuration module for structured logging and observability
//!
//! Applications configure subscribers while the library only emits spans and
//! events. Subscriber setup is available with the `cli` feature; the span and
//! event helpers are always compiled so library code can share them.

#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Configuration for tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output with colors (default for CLI)
    Console,
    /// Compact console output for CI environments
    Compact,
    /// JSON structured logging
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Configuration for tracing output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracingOutput {
    /// Output to stderr (default)
    Console,
    /// Output to a file
    #[cfg(feature = "tracing-files")]
    File(std::path::PathBuf),
}

/// Keeps background log writers alive; drop it only at shutdown
#[must_use = "dropping the guard stops buffered log output"]
#[derive(Debug, Default)]
pub struct TracingGuard {
    #[cfg(feature = "tracing-files")]
    _file_writer: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    pub format: TracingFormat,
    pub output: TracingOutput,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
    /// Session ID for correlation
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            output: TracingOutput::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-2+)
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Set custom environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Set session ID for run correlation
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    ///
    /// Dependency noise (hyper, reqwest) stays at `warn` below `-vv`.
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info,hyper=warn,reqwest=warn",
            1 => "debug,hyper=warn,reqwest=warn",
            _ => "trace",
        }
    }

    /// Initialize the global tracing subscriber
    ///
    /// # Errors
    /// - Invalid filter directive
    /// - A global subscriber is already installed
    #[cfg(feature = "cli")]
    pub fn init(self) -> anyhow::Result<TracingGuard> {
        use tracing_subscriber::fmt;

        let filter = match &self.env_filter {
            Some(env_filter) => EnvFilter::try_new(env_filter)?,
            None => EnvFilter::try_new(self.verbosity_to_filter())?,
        };

        let registry = Registry::default().with(filter);
        #[allow(unused_mut)]
        let mut guard = TracingGuard::default();

        match (&self.format, &self.output) {
            (TracingFormat::Console, TracingOutput::Console) => {
                let fmt_layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(false)
                    .with_level(true)
                    .compact();

                registry.with(fmt_layer).try_init()?;
            },

            (TracingFormat::Compact, TracingOutput::Console) => {
                let fmt_layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(false)
                    .compact();

                registry.with(fmt_layer).try_init()?;
            },

            #[cfg(feature = "tracing-json")]
            (TracingFormat::Json, TracingOutput::Console) => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(true);

                registry.with(fmt_layer).try_init()?;
            },

            #[cfg(feature = "tracing-files")]
            (format, TracingOutput::File(path)) => {
                use tracing_appender::{non_blocking, rolling};

                let file_appender = rolling::never(
                    path.parent().unwrap_or_else(|| std::path::Path::new(".")),
                    path.file_name()
                        .unwrap_or_else(|| std::ffi::OsStr::new("bgcutout.log")),
                );
                let (file_writer, worker_guard) = non_blocking(file_appender);
                guard._file_writer = Some(worker_guard);

                match format {
                    TracingFormat::Console | TracingFormat::Compact => {
                        let fmt_layer = fmt::layer()
                            .with_ansi(false)
                            .with_writer(file_writer)
                            .compact();
                        registry.with(fmt_layer).try_init()?;
                    },
                    #[cfg(feature = "tracing-json")]
                    TracingFormat::Json => {
                        let fmt_layer = fmt::layer()
                            .json()
                            .with_writer(file_writer)
                            .with_current_span(true)
                            .with_span_list(true);
                        registry.with(fmt_layer).try_init()?;
                    },
                }
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "🚀 Cutout session started");
        }

        Ok(guard)
    }
}

/// Generate a session id for log correlation
#[cfg(feature = "cli")]
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Initialize tracing with CLI-friendly defaults
///
/// # Errors
/// - A global subscriber is already installed
#[cfg(feature = "cli")]
pub fn init_cli_tracing(verbosity: u8, session_id: &str) -> anyhow::Result<TracingGuard> {
    TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(TracingFormat::Console)
        .with_session_id(session_id)
        .init()
}

/// Span creation helpers for common operations
pub mod spans {
    use tracing::{Level, Span};

    /// Span for the whole CLI session
    pub fn session(session_id: &str, endpoint: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "session",
            session_id = %session_id,
            endpoint = %endpoint
        )
    }

    /// Span for one `pick_and_process` run
    pub fn pipeline_run(run_id: u64) -> Span {
        tracing::span!(Level::INFO, "pipeline_run", run_id = run_id)
    }

    /// Span for a remote removal request
    pub fn removal_request(endpoint: &str, image: &str) -> Span {
        tracing::span!(
            Level::DEBUG,
            "removal_request",
            endpoint = %endpoint,
            image = %image
        )
    }

    /// Span for writing a cutout to local storage
    pub fn persist(file_name: &str, destination: &std::path::Path) -> Span {
        tracing::span!(
            Level::DEBUG,
            "persist",
            file_name = %file_name,
            destination = %destination.display()
        )
    }

    /// Span for artifact cache maintenance
    pub fn cache_operation(operation: &str, cache_dir: &std::path::Path) -> Span {
        tracing::span!(
            Level::DEBUG,
            "cache_operation",
            operation = %operation,
            cache_dir = %cache_dir.display()
        )
    }
}

/// Event helpers for common logging patterns
pub mod events {
    use tracing::{debug, error, warn};

    /// Log an error with context
    pub fn error_with_context(error: &dyn std::fmt::Display, context: &str) {
        error!(
            error = %error,
            context = %context,
            "❌ Operation failed"
        );
    }

    /// Log a warning with recommendation
    pub fn warning_with_recommendation(message: &str, recommendation: &str) {
        warn!(
            message = %message,
            recommendation = %recommendation,
            "⚠️  Warning"
        );
    }

    /// Log how long an operation took
    pub fn performance_metric(operation: &str, duration_ms: u64) {
        debug!(
            operation = %operation,
            duration_ms = duration_ms,
            "⏱️  Performance metric"
        );
    }
}
