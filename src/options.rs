//! Invocation options and their resolution into concrete settings.

use crate::error::GateError;
use crate::router::{ErrorHook, Handler, RouterOptions};
use regex::Regex;
use std::sync::Arc;

/// Process variable flagging the deployment environment.
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

/// True when the runtime environment is flagged as production.
pub fn is_production() -> bool {
    std::env::var(ENVIRONMENT_VAR)
        .map(|value| value == "production")
        .unwrap_or(false)
}

/// Logging channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Log,
    ErrorLog,
}

/// Caller-facing logging switch: a blanket boolean or a per-mode selector.
#[derive(Clone, Default)]
pub enum LogsSetting {
    /// Inherit the environment-derived default.
    #[default]
    Default,
    /// Enable or disable both channels.
    Enabled(bool),
    /// Decide per channel; invoked once per mode during resolution.
    Selector(Arc<dyn Fn(LogMode) -> bool + Send + Sync>),
}

/// One allowed-origin rule: an exact origin or a pattern.
#[derive(Debug, Clone)]
pub enum OriginRule {
    Exact(String),
    Pattern(Regex),
}

impl OriginRule {
    /// Compile a pattern rule.
    pub fn pattern(pattern: &str) -> Result<Self, GateError> {
        Regex::new(pattern)
            .map(OriginRule::Pattern)
            .map_err(|err| GateError::with_cause("invalid origin pattern", err.to_string()))
    }

    /// Whether the candidate origin satisfies this rule.
    pub fn allows(&self, origin: &str) -> bool {
        match self {
            OriginRule::Exact(exact) => exact == origin,
            OriginRule::Pattern(pattern) => pattern.is_match(origin),
        }
    }
}

impl From<&str> for OriginRule {
    fn from(origin: &str) -> Self {
        OriginRule::Exact(origin.to_string())
    }
}

impl From<String> for OriginRule {
    fn from(origin: String) -> Self {
        OriginRule::Exact(origin)
    }
}

/// Cross-origin configuration supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    /// Origins allowed to make cross-origin requests.
    pub allowed_origins: Vec<OriginRule>,
    /// Overrides the default method allow-list when set.
    pub allow_methods: Option<Vec<String>>,
    /// Overrides the default header allow-list when set.
    pub allow_headers: Option<Vec<String>>,
}

/// Caller-supplied invocation options.
#[derive(Clone, Default)]
pub struct Options {
    /// Publish gated loggers into process-wide state. Default: true.
    pub globals: Option<bool>,
    /// Propagate the platform API-key header into a process variable.
    /// Default: true.
    pub env: Option<bool>,
    /// Blanket or per-mode logging switch.
    pub logs: LogsSetting,
    /// Raw override for the log channel; wins over `logs`.
    pub log: Option<bool>,
    /// Raw override for the error-log channel; wins over `logs`.
    pub error_log: Option<bool>,
    /// Cross-origin configuration.
    pub cors: CorsConfig,
    /// Options forwarded verbatim to the router.
    pub router: RouterOptions,
}

impl Options {
    /// Create options with every default in place.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle process-wide logger publication.
    pub fn globals(mut self, enabled: bool) -> Self {
        self.globals = Some(enabled);
        self
    }

    /// Toggle API-key propagation into the process environment.
    pub fn env(mut self, enabled: bool) -> Self {
        self.env = Some(enabled);
        self
    }

    /// Enable or disable both logging channels.
    pub fn logs(mut self, enabled: bool) -> Self {
        self.logs = LogsSetting::Enabled(enabled);
        self
    }

    /// Decide logging per channel.
    pub fn logs_with(mut self, select: impl Fn(LogMode) -> bool + Send + Sync + 'static) -> Self {
        self.logs = LogsSetting::Selector(Arc::new(select));
        self
    }

    /// Raw override for the log channel.
    pub fn log(mut self, enabled: bool) -> Self {
        self.log = Some(enabled);
        self
    }

    /// Raw override for the error-log channel.
    pub fn error_log(mut self, enabled: bool) -> Self {
        self.error_log = Some(enabled);
        self
    }

    /// Allow an origin, exact or pattern.
    pub fn allow_origin(mut self, origin: impl Into<OriginRule>) -> Self {
        self.cors.allowed_origins.push(origin.into());
        self
    }

    /// Replace the CORS method allow-list.
    pub fn allow_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cors.allow_methods = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the CORS header allow-list.
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cors.allow_headers = Some(headers.into_iter().map(Into::into).collect());
        self
    }

    /// Append a before-chain middleware.
    pub fn before(mut self, handler: impl Handler + 'static) -> Self {
        self.router.before.push(Arc::new(handler));
        self
    }

    /// Append a finally-chain middleware.
    pub fn finally(mut self, handler: impl Handler + 'static) -> Self {
        self.router.finally.push(Arc::new(handler));
        self
    }

    /// Install an error hook.
    pub fn catch(mut self, hook: impl ErrorHook + 'static) -> Self {
        self.router.catch = Some(Arc::new(hook));
        self
    }
}

/// Options with every default applied and logging resolved to booleans.
///
/// Immutable for the duration of one invocation, never persisted across
/// invocations.
#[derive(Clone)]
pub struct FinalOptions {
    /// Publish gated loggers into process-wide state.
    pub globals: bool,
    /// Propagate the platform API key into a process variable.
    pub env: bool,
    /// Log channel enabled.
    pub log: bool,
    /// Error-log channel enabled.
    pub error_log: bool,
    /// Cross-origin configuration.
    pub cors: CorsConfig,
    /// Options forwarded verbatim to the router.
    pub router: RouterOptions,
}

impl FinalOptions {
    /// Resolve caller options against environment-derived defaults.
    ///
    /// Precedence, lowest to highest: hardcoded defaults, environment-derived
    /// logging defaults, the `logs` selector or boolean, and finally the raw
    /// `log` / `error_log` overrides. The raw-field-wins order is deliberate:
    /// it gives advanced callers a last word over any `logs` decision.
    pub fn resolve(options: &Options) -> Self {
        let production = is_production();
        let mut log = !production;
        let mut error_log = !production;

        match &options.logs {
            LogsSetting::Default => {}
            LogsSetting::Enabled(enabled) => {
                log = *enabled;
                error_log = *enabled;
            }
            LogsSetting::Selector(select) => {
                log = select(LogMode::Log);
                error_log = select(LogMode::ErrorLog);
            }
        }

        if let Some(raw) = options.log {
            log = raw;
        }
        if let Some(raw) = options.error_log {
            error_log = raw;
        }

        Self {
            globals: options.globals.unwrap_or(true),
            env: options.env.unwrap_or(true),
            log,
            error_log,
            cors: options.cors.clone(),
            router: options.router.clone(),
        }
    }

    /// Maximally defensive settings for the error boundary: all logging
    /// disabled, everything else at its default.
    pub fn fallback() -> Self {
        Self {
            globals: false,
            env: false,
            log: false,
            error_log: false,
            cors: CorsConfig::default(),
            router: RouterOptions::default(),
        }
    }
}
