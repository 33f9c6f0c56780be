//! Error types for the REST client.

use std::fmt;

use crate::{request::Method, response::Response};

/// Which failure an [`Error`] describes.
///
/// Status-tier kinds mean a response arrived with a rejected status code.
/// Transport-tier kinds mean no response arrived at all; those errors carry
/// [`Response::placeholder`] instead of a real response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// HTTP 400.
    BadRequest,
    /// HTTP 401.
    Unauthorized,
    /// HTTP 402.
    PaymentRequired,
    /// HTTP 403.
    Forbidden,
    /// HTTP 404.
    NotFound,
    /// HTTP 408.
    RequestTimeout,
    /// HTTP 409.
    Conflict,
    /// HTTP 429.
    TooManyRequests,
    /// Any HTTP 5xx.
    ServerError,
    /// Any other rejected status code.
    ResponseError,
    /// TLS handshake or certificate verification failed.
    Ssl,
    /// The request did not complete within its timeout.
    Timeout,
    /// The connection was refused, reset, or the host was unreachable.
    Connection,
    /// Any other transport failure, including broken redirect chains.
    Request,
    /// The request could not be assembled from the supplied options.
    InvalidRequest,
}

impl ErrorKind {
    /// Picks the status-tier kind for a rejected status code.
    pub fn for_status(code: i32) -> Self {
        match code {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::Unauthorized,
            402 => ErrorKind::PaymentRequired,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::RequestTimeout,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::TooManyRequests,
            500..=599 => ErrorKind::ServerError,
            _ => ErrorKind::ResponseError,
        }
    }

    /// Name used at the start of every error message.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequestError",
            ErrorKind::Unauthorized => "UnauthorizedError",
            ErrorKind::PaymentRequired => "PaymentRequiredError",
            ErrorKind::Forbidden => "ForbiddenError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::RequestTimeout => "RequestTimeoutError",
            ErrorKind::Conflict => "ConflictError",
            ErrorKind::TooManyRequests => "TooManyRequestsError",
            ErrorKind::ServerError => "ServerError",
            ErrorKind::ResponseError => "ResponseError",
            ErrorKind::Ssl => "SslError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Connection => "ConnectionError",
            ErrorKind::Request => "RequestError",
            ErrorKind::InvalidRequest => "InvalidRequestError",
        }
    }

    /// True when no response was received.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ErrorKind::Ssl | ErrorKind::Timeout | ErrorKind::Connection | ErrorKind::Request
        )
    }

    /// True when a response was received and its status was rejected.
    pub fn is_status(&self) -> bool {
        !self.is_transport() && *self != ErrorKind::InvalidRequest
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed request.
///
/// Every failure produces exactly one of these. It carries what is needed to
/// diagnose the failure without re-running the request: the method, the
/// resolved URL, the response (a placeholder for transport failures) and the
/// captured wire trace, if any.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    method: Method,
    path: String,
    response: Response,
    trace: Option<String>,
}

impl Error {
    /// Builds an error from all of its parts.
    pub fn with_details(
        kind: ErrorKind,
        method: Method,
        path: impl Into<String>,
        response: Response,
        trace: Option<String>,
    ) -> Self {
        Self {
            kind,
            method,
            path: path.into(),
            response,
            trace,
        }
    }

    /// Builds an error for a request that never produced a response.
    pub(crate) fn without_response(
        kind: ErrorKind,
        method: Method,
        path: &str,
        trace: Option<String>,
    ) -> Self {
        Self::with_details(kind, method, path, Response::placeholder(), trace)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The resolved request URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Captured wire trace. `None` when tracing went to the log or was suppressed.
    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    /// Status code of the attached response, `-1` for the placeholder.
    pub fn code(&self) -> i32 {
        self.response.code
    }

    /// Consumes the error and returns the attached response.
    pub fn into_response(self) -> Response {
        self.response
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (HTTP {}): {} {}",
            self.kind, self.response.code, self.method, self.path
        )?;
        match self.trace.as_deref() {
            Some(trace) if !trace.is_empty() => write!(f, "\n{}", trace),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for Error {}

/// Errors raised while building a [`crate::RestClient`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// No base URL was given and none was found in the environment.
    #[error("Missing base URL (set {0})")]
    MissingBaseUrl(&'static str),
    /// The base URL failed to parse.
    #[error("Invalid base URL `{url}`")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// The base URL parsed but cannot carry a path (e.g. `mailto:`).
    #[error("Base URL `{0}` cannot be used as a base")]
    UnsupportedBaseUrl(String),
    /// A timeout setting was not a whole number of seconds.
    #[error("Invalid timeout `{0}`")]
    InvalidTimeout(String),
}

/// Errors from parsing option values out of strings.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unsupported HTTP method `{0}`")]
    Method(String),
    #[error("Unknown body encoding `{0}`")]
    BodyEncoding(String),
    #[error("Unknown query parameter method `{0}`")]
    QueryParamMethod(String),
}
