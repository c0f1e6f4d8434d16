use super::{ErrorPolicy, Result, Severity};

/// Extension trait for `Result` enabling policy-driven emission without
/// contaminating core control-flow with side-effects.
///
/// Typical usage: at subsystem boundaries in the front end, emit recoverable
/// failures via the installed [`ErrorPolicy`] while preserving the original
/// result for further handling (usually a fallback).
///
/// Example
/// ```rust,ignore
/// use kbchat_error::{Error, ErrorPolicy, Result, ResultExt};
///
/// fn load(policy: &impl ErrorPolicy) -> Result<String> {
///     let r: Result<String> = Err(Error::Config("no config file".into()));
///     r.emit_warning(policy) // emitted, still Err for the caller
/// }
/// ```
pub trait ResultExt<T> {
    /// If the result is an error classified as a warning, emit it
    fn emit_warning(self, policy: &impl ErrorPolicy) -> Self;
}

impl<T> ResultExt<T> for Result<T> {
    fn emit_warning(self, policy: &impl ErrorPolicy) -> Self {
        if let Err(ref e) = self {
            if policy.classify(e) == Severity::Warning {
                policy.emit(e);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    impl ErrorPolicy for Recording {
        fn classify(&self, error: &Error) -> Severity {
            error.severity()
        }

        fn emit(&self, error: &Error) {
            self.0.lock().unwrap().push(error.to_string());
        }
    }

    #[test]
    fn emit_warning_skips_errors() {
        let policy = Recording::default();
        let warn: Result<()> = Err(Error::Config("fallback".into()));
        let fail: Result<()> = Err(Error::Server {
            status: 500,
            message: "boom".into(),
        });

        assert!(warn.emit_warning(&policy).is_err());
        assert!(fail.emit_warning(&policy).is_err());

        let seen = policy.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("fallback"));
    }

    #[test]
    fn ok_results_emit_nothing() {
        let policy = Recording::default();
        let ok: Result<u8> = Ok(3);
        assert_eq!(ok.emit_warning(&policy).unwrap(), 3);
        assert!(policy.0.lock().unwrap().is_empty());
    }
}
