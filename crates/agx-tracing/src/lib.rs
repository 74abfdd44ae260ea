//! Shared tracing setup for the AGX opcode workspace.
//!
//! Demos, benches, and tests install their `tracing` subscriber through this
//! crate so the table builder's events look the same everywhere. The library
//! crates only emit events; nothing in them installs a subscriber.

use std::env;
use thiserror::Error;
pub use tracing::{debug, error, info, trace, warn};

use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter, Registry};

/// Selects the preset `from_env` starts from (`local` or `ci`)
pub const PROFILE_VAR: &str = "AGX_TRACING_PROFILE";
/// Overrides the filter directives
pub const DIRECTIVES_VAR: &str = "AGX_TRACING_DIRECTIVES";
/// Output format: `pretty`, `compact`, or `json`
pub const FORMAT_VAR: &str = "AGX_TRACING_FORMAT";

/// Configuration describing how the shared tracing subscriber should behave.
#[derive(Clone, Debug)]
pub struct TracingConfig {
    /// Optional tracing directives (e.g. `agx_opcodes=debug,info`). When
    /// absent the crate falls back to `RUST_LOG` and finally to
    /// [`TracingConfig::default_directive`].
    pub directives: Option<String>,
    /// Fallback directive used when nothing else resolves to a filter.
    pub default_directive: String,
    /// Controls whether event targets (module paths) appear in output.
    pub include_targets: bool,
    /// Controls ANSI formatting. Disable for CI logs that strip colour codes.
    pub ansi: bool,
    /// Span lifecycle events to emit. Defaults to [`FmtSpan::NONE`].
    pub span_events: FmtSpan,
    /// Output format for the formatter layer.
    pub output: TracingOutput,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_local()
    }
}

impl TracingConfig {
    /// Configuration for local development (pretty, ANSI-enabled output).
    pub fn for_local() -> Self {
        Self {
            directives: None,
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: true,
            span_events: FmtSpan::NONE,
            output: TracingOutput::Pretty,
        }
    }

    /// Configuration for CI and log collection (JSON, no ANSI).
    pub fn for_ci() -> Self {
        Self {
            directives: None,
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: false,
            span_events: FmtSpan::CLOSE,
            output: TracingOutput::Json,
        }
    }

    /// Build a configuration using environment hints.
    ///
    /// # Environment Variables
    ///
    /// - `AGX_TRACING_PROFILE` - Profile preset: `local` (default) or `ci`
    /// - `AGX_TRACING_DIRECTIVES` - Overrides tracing directives
    /// - `AGX_TRACING_FORMAT` - Output format: `pretty`, `compact`, or `json`
    pub fn from_env() -> Self {
        let profile = env::var(PROFILE_VAR)
            .unwrap_or_else(|_| "local".to_string())
            .to_ascii_lowercase();

        let mut config = match profile.as_str() {
            "ci" => Self::for_ci(),
            _ => Self::for_local(),
        };

        if let Ok(directives) = env::var(DIRECTIVES_VAR) {
            if !directives.trim().is_empty() {
                config.directives = Some(directives);
            }
        }

        if let Ok(format) = env::var(FORMAT_VAR) {
            if let Some(parsed) = TracingOutput::from_env_value(&format) {
                config.output = parsed;
                if matches!(config.output, TracingOutput::Json) {
                    config.ansi = false;
                }
            }
        }

        config
    }

    /// Resolve the `EnvFilter` to use for the subscriber.
    fn resolve_filter(&self) -> Result<EnvFilter, TracingSetupError> {
        if let Some(directives) = &self.directives {
            EnvFilter::try_new(directives).map_err(|err| TracingSetupError::InvalidFilter(err.to_string()))
        } else {
            Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_directive)))
        }
    }
}

/// Output format choices for the tracing formatter layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TracingOutput {
    Compact,
    Pretty,
    Json,
}

impl TracingOutput {
    fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Errors surfaced when configuring the shared tracing subscriber fails.
#[derive(Debug, Error)]
pub enum TracingSetupError {
    /// The provided directive string could not be parsed.
    #[error("invalid tracing directive: {0}")]
    InvalidFilter(String),
    /// Installing the global subscriber failed (usually because one is
    /// already set).
    #[error("failed to install global tracing subscriber: {0}")]
    SubscriberInit(#[source] tracing_subscriber::util::TryInitError),
}

/// Build a `tracing` subscriber using the provided configuration.
pub fn build_subscriber(config: &TracingConfig) -> Result<impl Subscriber + Send + Sync, TracingSetupError> {
    let filter = config.resolve_filter()?;
    Ok(Registry::default().with(fmt_layer(config)).with(filter))
}

fn fmt_layer(config: &TracingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let span_events = config.span_events.clone();

    match config.output {
        TracingOutput::Compact => Box::new(
            tracing_fmt::layer()
                .compact()
                .with_target(config.include_targets)
                .with_ansi(config.ansi)
                .with_span_events(span_events),
        ),
        TracingOutput::Pretty => Box::new(
            tracing_fmt::layer()
                .pretty()
                .with_target(config.include_targets)
                .with_ansi(config.ansi)
                .with_span_events(span_events),
        ),
        TracingOutput::Json => Box::new(
            tracing_fmt::layer()
                .json()
                .with_target(config.include_targets)
                .with_span_events(span_events)
                .with_ansi(false),
        ),
    }
}

/// Install the configured subscriber as the process-wide default.
pub fn init_global_tracing(config: &TracingConfig) -> Result<(), TracingSetupError> {
    build_subscriber(config)?
        .try_init()
        .map_err(TracingSetupError::SubscriberInit)
}

/// Install a subscriber for a test binary, ignoring "already installed"
///
/// Uses `from_env` so `AGX_TRACING_DIRECTIVES=agx_opcodes=debug` surfaces
/// per-declaration events while debugging a failing test.
pub fn init_test_tracing() {
    let config = TracingConfig {
        output: TracingOutput::Compact,
        ansi: false,
        default_directive: "warn".to_string(),
        ..TracingConfig::from_env()
    };
    if let Ok(subscriber) = build_subscriber(&config) {
        let _ = subscriber.try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-wide.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn reset_env(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn rejects_invalid_directive() {
        let _guard = ENV_LOCK.lock().unwrap();
        reset_env(&[DIRECTIVES_VAR, "RUST_LOG"]);
        let config = TracingConfig {
            directives: Some("=::invalid".to_string()),
            ..TracingConfig::default()
        };
        let result = build_subscriber(&config);
        assert!(matches!(result, Err(TracingSetupError::InvalidFilter(_))));
    }

    #[test]
    fn builds_every_output() {
        let _guard = ENV_LOCK.lock().unwrap();
        reset_env(&["RUST_LOG"]);
        for output in [TracingOutput::Compact, TracingOutput::Pretty, TracingOutput::Json] {
            let config = TracingConfig {
                output,
                ..TracingConfig::default()
            };
            assert!(build_subscriber(&config).is_ok());
        }
    }

    #[test]
    fn from_env_defaults_to_local() {
        let _guard = ENV_LOCK.lock().unwrap();
        reset_env(&[PROFILE_VAR, FORMAT_VAR, DIRECTIVES_VAR]);

        let config = TracingConfig::from_env();
        assert!(config.directives.is_none());
        assert!(config.ansi);
        assert_eq!(config.output, TracingOutput::Pretty);
    }

    #[test]
    fn from_env_respects_profile_and_format() {
        let _guard = ENV_LOCK.lock().unwrap();
        reset_env(&[PROFILE_VAR, FORMAT_VAR, DIRECTIVES_VAR]);

        env::set_var(PROFILE_VAR, "ci");
        env::set_var(FORMAT_VAR, "compact");
        env::set_var(DIRECTIVES_VAR, "agx_opcodes=debug");

        let config = TracingConfig::from_env();
        reset_env(&[PROFILE_VAR, FORMAT_VAR, DIRECTIVES_VAR]);

        assert_eq!(config.directives.as_deref(), Some("agx_opcodes=debug"));
        assert!(!config.ansi);
        assert_eq!(config.output, TracingOutput::Compact);
    }

    #[test]
    fn json_format_disables_ansi() {
        let _guard = ENV_LOCK.lock().unwrap();
        reset_env(&[PROFILE_VAR, FORMAT_VAR, DIRECTIVES_VAR]);

        env::set_var(FORMAT_VAR, "JSON");
        let config = TracingConfig::from_env();
        reset_env(&[FORMAT_VAR]);

        assert_eq!(config.output, TracingOutput::Json);
        assert!(!config.ansi);
    }

    #[test]
    fn blank_directives_are_ignored() {
        let _guard = ENV_LOCK.lock().unwrap();
        reset_env(&[PROFILE_VAR, FORMAT_VAR, DIRECTIVES_VAR]);

        env::set_var(DIRECTIVES_VAR, "   ");
        env::set_var(FORMAT_VAR, "yaml");
        let config = TracingConfig::from_env();
        reset_env(&[DIRECTIVES_VAR, FORMAT_VAR]);

        assert!(config.directives.is_none());
        assert_eq!(config.output, TracingOutput::Pretty);
    }
}
