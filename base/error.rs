//! Crate-wide error type.
//!
//! Modeled on the gRPC status-code classification: a coarse `ErrorKind` plus
//! an optional human-readable message and an optional wrapped source error.
//! Every fallible operation in this crate returns `Result<T, Error>`.

use std::fmt;

/// Error kind. See the individual variants' doc comments for when each applies.
///
/// Taken from the same classification used by gRPC, which is a reasonable
/// general-purpose bucketing of failure modes independent of transport.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    Unauthenticated,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Internal,
    Unavailable,
    DataLoss,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::DeadlineExceeded => "deadline exceeded",
            ErrorKind::NotFound => "not found",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::FailedPrecondition => "failed precondition",
            ErrorKind::Aborted => "aborted",
            ErrorKind::OutOfRange => "out of range",
            ErrorKind::Internal => "internal",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::DataLoss => "data loss",
        };
        f.write_str(s)
    }
}

pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: Some(message.into()),
            source: None,
        }
    }

    pub fn wrap<E>(kind: ErrorKind, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error {
            kind,
            message: None,
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Renders the full cause chain, one `caused by:` line per source, for
    /// logging at the top level (the CLI's `main` uses this).
    pub fn chain(&self) -> String {
        use std::fmt::Write;
        let mut s = self.to_string();
        let mut cause = self.source.as_deref().and_then(std::error::Error::source);
        while let Some(c) = cause {
            write!(&mut s, "\ncaused by: {c}").unwrap();
            cause = c.source();
        }
        s
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.message, &self.source) {
            (Some(m), Some(s)) => write!(f, "{}: {m}: {s}", self.kind),
            (Some(m), None) => write!(f, "{}: {m}", self.kind),
            (None, Some(s)) => write!(f, "{}: {s}", self.kind),
            (None, None) => write!(f, "{}", self.kind),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error {{ kind: {:?}, .. }}: {self}", self.kind)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as _)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            kind,
            message: None,
            source: None,
        }
    }
}

/// Extension methods for annotating a foreign `Result` with an `ErrorKind`.
pub trait ResultExt<T> {
    fn err_kind(self, k: ErrorKind) -> Result<T, Error>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn err_kind(self, k: ErrorKind) -> Result<T, Error> {
        self.map_err(|e| Error::wrap(k, e))
    }
}

/// Constructs an [`Error`] with a kind and a formatted message, without
/// returning from the enclosing function.
///
/// ```ignore
/// return Err(err!(NotFound, "no such study {label}"));
/// ```
#[macro_export]
macro_rules! err {
    ($kind:ident, $fmt:expr) => {
        $crate::Error::new($crate::ErrorKind::$kind, format!($fmt))
    };
    ($kind:ident, $fmt:expr, $($arg:tt)+) => {
        $crate::Error::new($crate::ErrorKind::$kind, format!($fmt, $($arg)+))
    };
}

/// Like [`err!`], but returns immediately from the enclosing function.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)+) => {
        return Err($crate::err!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let e = err!(NotFound, "no such study {}", "alpha");
        assert_eq!(e.kind(), ErrorKind::NotFound);
        assert_eq!(e.to_string(), "not found: no such study alpha");
    }

    #[test]
    fn err_interpolates_captured_identifiers() {
        let label = "alpha";
        let e = err!(NotFound, "no such study {label:?}");
        assert_eq!(e.to_string(), "not found: no such study \"alpha\"");
    }

    #[test]
    fn wrap_preserves_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let e: Error = Result::<(), _>::Err(io_err).err_kind(ErrorKind::Internal).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Internal);
        assert!(e.to_string().contains("disk full"));
    }
}
