//! Subscriber assembly.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

use crate::config::{Config, Format};
use crate::error::{LogError, LogResult};

/// Builds and installs the global subscriber.
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Keeps the root span entered for the lifetime of the process.
///
/// Hold it in `main`; dropping it exits the span.
#[derive(Debug)]
pub struct LoggerGuard {
    _root_span: Option<tracing::span::EnteredSpan>,
}

impl LoggerBuilder {
    /// Builder from config.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Install the subscriber.
    ///
    /// # Errors
    ///
    /// [`LogError::Filter`] if the directive does not parse,
    /// [`LogError::Init`] if a global subscriber is already set.
    pub fn build(self) -> LogResult<LoggerGuard> {
        let filter = self.filter()?;
        let Config {
            format,
            ansi,
            target,
            ..
        } = self.config;
        let registry = Registry::default().with(filter);

        let installed = match format {
            Format::Pretty => registry
                .with(fmt::layer().pretty().with_ansi(ansi).with_target(target))
                .try_init(),
            Format::Compact => registry
                .with(fmt::layer().compact().with_ansi(ansi).with_target(target))
                .try_init(),
            Format::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_current_span(true)
                        .with_target(target),
                )
                .try_init(),
        };
        installed.map_err(|e| LogError::Init(e.to_string()))?;

        let root_span = self
            .config
            .service
            .as_deref()
            .map(|service| tracing::info_span!("service", name = service).entered());
        Ok(LoggerGuard {
            _root_span: root_span,
        })
    }

    fn filter(&self) -> LogResult<EnvFilter> {
        EnvFilter::try_new(&self.config.level).map_err(|e| LogError::Filter {
            directive: self.config.level.clone(),
            reason: e.to_string(),
        })
    }
}
