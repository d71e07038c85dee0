//! Tracing initialization for SkillSwap services.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name for log attribution
    pub service_name: String,
    pub format: LogFormat,
    /// Fallback filter when `RUST_LOG` is unset (e.g. "info", "skillswap_auth=debug,info")
    pub level: String,
    /// Whether to log span events (enter/exit)
    pub log_spans: bool,
    pub include_location: bool,
}

impl TracingConfig {
    pub fn for_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            format: LogFormat::Pretty,
            level: "info".to_string(),
            log_spans: false,
            include_location: false,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn with_spans(mut self) -> Self {
        self.log_spans = true;
        self
    }
}

/// Install the global subscriber. Call once, at process start.
///
/// ```ignore
/// use skillswap_observability::{init_tracing, TracingConfig};
///
/// init_tracing(TracingConfig::for_service("auth-service"));
/// ```
pub fn init_tracing(config: TracingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let span_events = if config.log_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_current_span(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(true);

            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_span_events(span_events)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(true);

            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }

    tracing::info!(
        service = %config.service_name,
        format = ?config.format,
        "tracing initialized"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = TracingConfig::for_service("auth-service")
            .with_level("debug")
            .json()
            .with_spans();

        assert_eq!(config.service_name, "auth-service");
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.log_spans);
    }

    #[test]
    fn defaults_are_pretty_without_spans() {
        let config = TracingConfig::for_service("auth-service");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.level, "info");
        assert!(!config.log_spans);
    }
}
