//! Host logging callbacks, the enable/disable gate, and process-wide
//! bindings.

use crate::http::GateRequest;
use crate::options::FinalOptions;
use std::sync::{Arc, RwLock};

/// Request header carrying the platform function API key.
pub const API_KEY_HEADER: &str = "x-function-key";
/// Process variable the API key is propagated into.
pub const API_KEY_ENV: &str = "FUNCTION_API_KEY";

/// Unidirectional logging callback handed in by the host.
#[derive(Clone)]
pub struct Logger(Arc<dyn Fn(&str) + Send + Sync>);

impl Logger {
    /// Wrap a host callback.
    pub fn from_fn(f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// A logger that drops everything.
    pub fn noop() -> Self {
        Self(Arc::new(|_| {}))
    }

    /// Emit one message.
    pub fn emit(&self, message: &str) {
        (self.0)(message)
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Logger")
    }
}

/// Gate the host's logging callbacks by the resolved flags.
///
/// Downstream consumers call the returned loggers unconditionally; a
/// disabled channel is a no-op instead of a flag re-checked at every call
/// site.
pub fn gate_loggers(options: &FinalOptions, log: Logger, error: Logger) -> (Logger, Logger) {
    let log = if options.log { log } else { Logger::noop() };
    let error = if options.error_log { error } else { Logger::noop() };
    (log, error)
}

static GLOBAL_LOGGERS: RwLock<Option<(Logger, Logger)>> = RwLock::new(None);

/// Publish the gated loggers and the request's API key into process-wide
/// state.
///
/// Warm instances may interleave invocations; two concurrent calls with
/// different credentials can observe each other's values. The reference
/// deployment target serves one invocation per warm instance at a time.
pub fn install_globals(options: &FinalOptions, request: &GateRequest, log: &Logger, error: &Logger) {
    if options.globals {
        if let Ok(mut slot) = GLOBAL_LOGGERS.write() {
            *slot = Some((log.clone(), error.clone()));
        }
    }
    if options.env {
        let key = request.get_header(API_KEY_HEADER).unwrap_or("");
        std::env::set_var(API_KEY_ENV, key);
    }
}

/// Emit through the process-wide log channel, if one is installed.
pub fn global_log(message: &str) {
    if let Ok(slot) = GLOBAL_LOGGERS.read() {
        if let Some((log, _)) = slot.as_ref() {
            log.emit(message);
        }
    }
}

/// Emit through the process-wide error channel, if one is installed.
pub fn global_error(message: &str) {
    if let Ok(slot) = GLOBAL_LOGGERS.read() {
        if let Some((_, error)) = slot.as_ref() {
            error.emit(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::options::Options;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // Process-wide state under test; serialize the tests that touch it.
    fn state_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: Mutex<()> = Mutex::new(());
        LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn counting_logger() -> (Logger, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let logger = Logger::from_fn(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (logger, count)
    }

    #[test]
    fn test_gate_passes_enabled_channels_through() {
        let finals = crate::options::FinalOptions::resolve(&Options::new().logs(true));
        let (log, log_count) = counting_logger();
        let (error, error_count) = counting_logger();

        let (log, error) = gate_loggers(&finals, log, error);
        log.emit("a");
        error.emit("b");

        assert_eq!(log_count.load(Ordering::SeqCst), 1);
        assert_eq!(error_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_gate_silences_disabled_channels() {
        let finals = crate::options::FinalOptions::resolve(&Options::new().logs(false));
        let (log, log_count) = counting_logger();
        let (error, error_count) = counting_logger();

        let (log, error) = gate_loggers(&finals, log, error);
        log.emit("a");
        error.emit("b");

        assert_eq!(log_count.load(Ordering::SeqCst), 0);
        assert_eq!(error_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_install_globals_publishes_loggers() {
        let _guard = state_lock();
        let finals = crate::options::FinalOptions::resolve(&Options::new().env(false));
        let (log, log_count) = counting_logger();
        let (error, error_count) = counting_logger();
        let request = GateRequest::new(Method::Get, "/");

        install_globals(&finals, &request, &log, &error);
        global_log("hello");
        global_error("oops");

        assert_eq!(log_count.load(Ordering::SeqCst), 1);
        assert_eq!(error_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_install_globals_propagates_api_key() {
        let _guard = state_lock();
        let finals = crate::options::FinalOptions::resolve(&Options::new().globals(false));
        let mut request = GateRequest::new(Method::Get, "/").header("X-Function-Key", "sekrit");
        crate::http::normalize_headers(&mut request);

        install_globals(&finals, &request, &Logger::noop(), &Logger::noop());
        assert_eq!(std::env::var(API_KEY_ENV).as_deref(), Ok("sekrit"));

        // Absent header degrades to an empty value.
        let bare = GateRequest::new(Method::Get, "/");
        install_globals(&finals, &bare, &Logger::noop(), &Logger::noop());
        assert_eq!(std::env::var(API_KEY_ENV).as_deref(), Ok(""));

        std::env::remove_var(API_KEY_ENV);
    }
}
