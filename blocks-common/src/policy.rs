use std::fmt;

/// How the service reacts to a class of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Abort the process. Only produced during startup.
    Fatal,
    /// Abandon the current cycle, the next scheduled tick retries from the same checkpoint.
    Retryable,
    /// Log and keep going.
    Ignorable,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorPolicy::Fatal => write!(f, "fatal"),
            ErrorPolicy::Retryable => write!(f, "retryable"),
            ErrorPolicy::Ignorable => write!(f, "ignorable"),
        }
    }
}

/// Errors that know which `ErrorPolicy` applies to them.
pub trait Classify {
    fn policy(&self) -> ErrorPolicy;
}
