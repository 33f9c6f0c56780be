//! HTTP client wrapper: URL building, request dispatch, failure classification.

use std::{error::Error as StdError, io, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    redirect::Policy,
};
use url::{Position, Url};

use crate::{
    config::ClientConfig,
    errors::{ConfigError, Error, ErrorKind},
    query::{Params, QueryParamMethod},
    request::{build_headers, encode_body, Method, Payload, RequestOptions},
    response::Response,
    trace::Trace,
};

/// REST client bound to a base URL.
///
/// Every call builds a fresh `reqwest::Client` so per-call proxy, redirect
/// and timeout options apply. Failures come back as a single [`Error`] whose
/// [`ErrorKind`] says what went wrong; successful responses are returned
/// untouched.
#[derive(Clone, Debug)]
pub struct RestClient {
    base_url: Url,
    debug: bool,
    timeout: Option<Duration>,
    user_agent: String,
}

impl RestClient {
    /// Creates a client with default settings for `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Self::with_config(ClientConfig::new(base_url))
    }

    /// Creates a client from `APP_REST_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::with_config(ClientConfig::from_env()?)
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, ConfigError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
                url: config.base_url.clone(),
                source,
            })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::UnsupportedBaseUrl(config.base_url));
        }
        Ok(Self {
            base_url,
            debug: config.debug,
            timeout: config.timeout,
            user_agent: config.user_agent,
        })
    }

    /// Sends the wire trace of every request to the log.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Default timeout for requests that do not set their own.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Resolves `path` against the base URL and appends `query`.
    ///
    /// Absolute URLs are used as they are. When the base URL has a path,
    /// the two are joined with exactly one `/`. A blank query leaves the URL
    /// without a query string.
    pub fn url_for(&self, path: &str, query: Option<&Params>, method: QueryParamMethod) -> String {
        let url = self.join_path(path);
        let query = match query {
            Some(query) if !query.is_empty() => query.to_query_string(method),
            _ => return url,
        };
        if query.is_empty() {
            return url;
        }
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", url, separator, query)
    }

    fn join_path(&self, path: &str) -> String {
        if let Ok(absolute) = Url::parse(path) {
            if absolute.has_host() {
                return path.to_string();
            }
        }

        let origin = &self.base_url[..Position::BeforePath];
        let base_path = self.base_url.path();
        let joined = if base_path.is_empty() || base_path == "/" {
            if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{}", path)
            }
        } else if path.is_empty() {
            base_path.to_string()
        } else {
            match (base_path.ends_with('/'), path.starts_with('/')) {
                (true, true) => format!("{}{}", base_path, &path[1..]),
                (false, false) => format!("{}/{}", base_path, path),
                _ => format!("{}{}", base_path, path),
            }
        };
        format!("{}{}", origin, joined)
    }

    /// Performs one request.
    ///
    /// Returns the response when its status is accepted (1–399, or one of
    /// `options.allowed_statuses` when set). Any other outcome is an
    /// [`Error`]: rejected statuses map to status-tier kinds, failures before
    /// a response arrived map to transport-tier kinds carrying
    /// [`Response::placeholder`]. Nothing is retried.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        mut options: RequestOptions,
    ) -> Result<Response, Error> {
        let url = self.url_for(path, options.query.as_ref(), options.query_param_method);
        let mut trace = Trace::new(self.debug || options.debug, options.suppress_trace);
        let headers = build_headers(options.body_encoding, &options.headers);

        let payload = match encode_body(options.body.take(), options.body_encoding) {
            Ok(payload) => payload,
            Err(reason) => return Err(invalid_request(method, &url, &reason, trace)),
        };

        let transport = match self.build_transport(&options) {
            Ok(transport) => transport,
            Err(reason) => return Err(invalid_request(method, &url, &reason, trace)),
        };
        let header_map = match to_header_map(&headers) {
            Ok(map) => map,
            Err(reason) => return Err(invalid_request(method, &url, &reason, trace)),
        };

        let mut builder = transport
            .request(method.into(), url.as_str())
            .headers(header_map);
        if let Some(auth) = &options.basic_auth {
            builder = builder.basic_auth(&auth.user, auth.password.as_deref());
        }

        trace.request(method, &url, &headers, payload.describe());
        builder = match payload {
            Payload::Empty => builder,
            Payload::Text(text) => builder.body(text),
            Payload::Multipart(form) => builder.multipart(form),
        };

        let received = match builder.send().await {
            Ok(resp) => Response::read(resp).await,
            Err(e) => Err(e),
        };
        let response = match received {
            Ok(response) => response,
            Err(e) => {
                let kind = classify_transport_error(&e);
                tracing::error!("{} {} failed ({}): {}", method, url, kind, e);
                trace.note(&e.to_string());
                return Err(Error::without_response(kind, method, &url, trace.finish()));
            }
        };

        trace.response(&response);
        validate_response(
            method,
            &url,
            response,
            options.allowed_statuses.as_deref(),
            trace.finish(),
        )
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Response, Error> {
        self.request(Method::Get, path, options).await
    }

    pub async fn post(&self, path: &str, options: RequestOptions) -> Result<Response, Error> {
        self.request(Method::Post, path, options).await
    }

    pub async fn put(&self, path: &str, options: RequestOptions) -> Result<Response, Error> {
        self.request(Method::Put, path, options).await
    }

    pub async fn patch(&self, path: &str, options: RequestOptions) -> Result<Response, Error> {
        self.request(Method::Patch, path, options).await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<Response, Error> {
        self.request(Method::Delete, path, options).await
    }

    fn build_transport(&self, options: &RequestOptions) -> Result<reqwest::Client, String> {
        let mut builder = reqwest::Client::builder().user_agent(self.user_agent.as_str());
        if let Some(timeout) = options.timeout.or(self.timeout) {
            builder = builder.timeout(timeout);
        }
        if options.follow_redirects == Some(false) {
            builder = builder.redirect(Policy::none());
        }
        if let Some(proxy) = &options.proxy {
            builder = builder.proxy(proxy.to_reqwest()?);
        }
        builder.build().map_err(|e| e.to_string())
    }
}

/// Header names are case-insensitive on the wire, so a later entry replaces
/// an earlier one that differs only in case.
fn to_header_map(headers: &[(String, String)]) -> Result<HeaderMap, String> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let parsed_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("invalid header name `{}`: {}", name, e))?;
        let parsed_value = HeaderValue::from_str(value)
            .map_err(|e| format!("invalid value for header `{}`: {}", name, e))?;
        map.insert(parsed_name, parsed_value);
    }
    Ok(map)
}

fn invalid_request(method: Method, url: &str, reason: &str, mut trace: Trace) -> Error {
    tracing::error!("{} {} could not be built: {}", method, url, reason);
    trace.note(reason);
    Error::without_response(ErrorKind::InvalidRequest, method, url, trace.finish())
}

/// Accepts 1–399 by default, or exactly `allowed` when given.
pub(crate) fn validate_response(
    method: Method,
    url: &str,
    response: Response,
    allowed: Option<&[u16]>,
    trace: Option<String>,
) -> Result<Response, Error> {
    let accepted = match allowed {
        Some(codes) => codes.iter().any(|&c| i32::from(c) == response.code),
        None => (1..=399).contains(&response.code),
    };
    if accepted {
        return Ok(response);
    }
    let kind = ErrorKind::for_status(response.code);
    tracing::warn!("{} {} rejected with HTTP {} ({})", method, url, response.code, kind);
    Err(Error::with_details(kind, method, url, response, trace))
}

pub(crate) fn classify_transport_error(err: &reqwest::Error) -> ErrorKind {
    classify_failure(err.is_timeout(), err.is_connect(), err)
}

/// Maps a transport failure onto a transport-tier kind.
fn classify_failure(is_timeout: bool, is_connect: bool, err: &(dyn StdError + 'static)) -> ErrorKind {
    if is_timeout || chain_has_io_kind(err, &[io::ErrorKind::TimedOut]) {
        return ErrorKind::Timeout;
    }
    if wraps_rustls_error(err) || (is_connect && mentions_tls(err)) {
        return ErrorKind::Ssl;
    }
    if is_connect
        || chain_has_io_kind(
            err,
            &[
                io::ErrorKind::ConnectionRefused,
                io::ErrorKind::ConnectionReset,
                io::ErrorKind::ConnectionAborted,
                io::ErrorKind::NotConnected,
                io::ErrorKind::AddrNotAvailable,
            ],
        )
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Request
}

fn chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |e: &&'a (dyn StdError + 'static)| (*e).source())
}

fn chain_has_io_kind(err: &(dyn StdError + 'static), kinds: &[io::ErrorKind]) -> bool {
    chain(err)
        .filter_map(|e| e.downcast_ref::<io::Error>())
        .any(|e| kinds.contains(&e.kind()))
}

/// rustls failures reach us boxed inside an `io::Error`, whose `source()`
/// skips the boxed error itself, so each `io::Error` is opened by hand.
fn wraps_rustls_error(err: &(dyn StdError + 'static)) -> bool {
    chain(err).any(|e| {
        e.is::<rustls::Error>()
            || e.downcast_ref::<io::Error>()
                .and_then(io::Error::get_ref)
                .is_some_and(|inner| wraps_rustls_error(inner))
    })
}

/// Fallback for TLS stacks that only leave a message behind. The outermost
/// message is skipped since it embeds the request URL.
fn mentions_tls(err: &(dyn StdError + 'static)) -> bool {
    chain(err).skip(1).any(|e| {
        let message = e.to_string().to_ascii_lowercase();
        ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|needle| message.contains(needle))
    })
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use reqwest::header::HeaderMap;

    use super::*;

    fn client(base: &str) -> RestClient {
        RestClient::new(base).unwrap()
    }

    #[test]
    fn joins_paths_with_one_slash() {
        let form = QueryParamMethod::Form;
        assert_eq!(
            client("https://h.example/api").url_for("/v1", None, form),
            "https://h.example/api/v1"
        );
        assert_eq!(
            client("https://h.example/api/").url_for("v1", None, form),
            "https://h.example/api/v1"
        );
        assert_eq!(
            client("https://h.example/api").url_for("v1", None, form),
            "https://h.example/api/v1"
        );
        assert_eq!(
            client("https://h.example/api/").url_for("/v1", None, form),
            "https://h.example/api/v1"
        );
    }

    #[test]
    fn bare_base_uses_path_verbatim() {
        let form = QueryParamMethod::Form;
        let c = client("http://localhost:8080");
        assert_eq!(c.url_for("/users/1", None, form), "http://localhost:8080/users/1");
        assert_eq!(c.url_for("users/1", None, form), "http://localhost:8080/users/1");
    }

    #[test]
    fn absolute_paths_bypass_base() {
        let c = client("https://h.example/api");
        assert_eq!(
            c.url_for("https://other.example/x", None, QueryParamMethod::Form),
            "https://other.example/x"
        );
    }

    #[test]
    fn empty_path_keeps_base_path() {
        let c = client("https://h.example/api");
        assert_eq!(c.url_for("", None, QueryParamMethod::Form), "https://h.example/api");
    }

    #[test]
    fn query_is_appended_in_selected_encoding() {
        let c = client("https://h.example/api");
        let query = Params::new().with("q", "a b").with("ids", vec![1, 2]);
        insta::assert_snapshot!(
            c.url_for("search", Some(&query), QueryParamMethod::Form),
            @"https://h.example/api/search?q=a+b&ids=1&ids=2"
        );
        insta::assert_snapshot!(
            c.url_for("search", Some(&query), QueryParamMethod::Nested),
            @"https://h.example/api/search?ids%5B%5D=1&ids%5B%5D=2&q=a+b"
        );
        insta::assert_snapshot!(
            c.url_for("search", Some(&query), QueryParamMethod::Naive),
            @"https://h.example/api/search?q=a b&ids=1,2"
        );
    }

    #[test]
    fn existing_query_is_extended() {
        let c = client("https://h.example");
        let query = Params::new().with("page", 2);
        assert_eq!(
            c.url_for("/items?sort=name", Some(&query), QueryParamMethod::Form),
            "https://h.example/items?sort=name&page=2"
        );
    }

    #[test]
    fn blank_query_leaves_url_unchanged() {
        let c = client("https://h.example/api");
        let empty = Params::new();
        assert_eq!(
            c.url_for("/v1", Some(&empty), QueryParamMethod::Nested),
            "https://h.example/api/v1"
        );
        let only_empty = Params::new().with("tags", Vec::<String>::new());
        assert_eq!(
            c.url_for("/v1", Some(&only_empty), QueryParamMethod::Nested),
            "https://h.example/api/v1"
        );
    }

    #[test]
    fn rejects_bad_base_urls() {
        assert!(matches!(
            RestClient::new("not a url"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            RestClient::new("mailto:someone@example.com"),
            Err(ConfigError::UnsupportedBaseUrl(_))
        ));
    }

    fn response(code: i32) -> Response {
        Response::new(code, "", HeaderMap::new(), "body")
    }

    #[test]
    fn default_validation_accepts_1_to_399() {
        for code in [1, 100, 200, 204, 301, 304, 399] {
            let resp = validate_response(Method::Get, "u", response(code), None, None).unwrap();
            assert_eq!(resp.code, code);
        }
        for code in [0, 400, 404, 500] {
            assert!(validate_response(Method::Get, "u", response(code), None, None).is_err());
        }
    }

    #[test]
    fn explicit_allowed_set_is_exclusive() {
        let allowed = [200u16, 404];
        assert!(validate_response(Method::Get, "u", response(404), Some(&allowed), None).is_ok());
        let err = validate_response(Method::Get, "u", response(201), Some(&allowed), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponseError);
        let err = validate_response(Method::Get, "u", response(418), Some(&allowed), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponseError);
    }

    #[test]
    fn rejection_carries_context() {
        let err = validate_response(
            Method::Post,
            "https://h.example/items",
            response(503),
            None,
            Some("> POST https://h.example/items".to_string()),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.method(), Method::Post);
        assert_eq!(err.path(), "https://h.example/items");
        assert_eq!(err.response().text(), "body");
        assert_eq!(err.trace(), Some("> POST https://h.example/items"));
    }

    #[derive(Debug)]
    struct Wrapped {
        message: &'static str,
        source: io::Error,
    }

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.source)
        }
    }

    fn wrapped(kind: io::ErrorKind, inner: &str) -> Wrapped {
        Wrapped {
            message: "error sending request",
            source: io::Error::new(kind, inner.to_string()),
        }
    }

    fn wrapped_tls(error: rustls::Error) -> Wrapped {
        Wrapped {
            message: "error sending request",
            source: io::Error::new(io::ErrorKind::Other, error),
        }
    }

    #[test]
    fn rustls_failures_are_ssl() {
        let err = wrapped_tls(rustls::Error::InvalidMessage(
            rustls::InvalidMessage::InvalidContentType,
        ));
        assert_eq!(classify_failure(false, true, &err), ErrorKind::Ssl);

        let err = wrapped_tls(rustls::Error::InvalidCertificate(
            rustls::CertificateError::UnknownIssuer,
        ));
        assert_eq!(classify_failure(false, true, &err), ErrorKind::Ssl);
    }

    #[test]
    fn tls_messages_are_ssl_on_connect_only() {
        let err = wrapped(io::ErrorKind::Other, "received fatal alert: HandshakeFailure");
        assert_eq!(classify_failure(false, true, &err), ErrorKind::Ssl);
        assert_eq!(classify_failure(false, false, &err), ErrorKind::Request);
    }

    #[test]
    fn case_variants_of_a_header_collapse_to_the_last() {
        let headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("content-type".to_string(), "text/plain".to_string()),
            ("X-Request-Id".to_string(), "abc".to_string()),
        ];
        let map = to_header_map(&headers).unwrap();
        let values: Vec<_> = map.get_all("content-type").iter().collect();
        assert_eq!(values, vec!["text/plain"]);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn bad_header_names_are_reported() {
        let headers = vec![("Bad Header".to_string(), "x".to_string())];
        assert!(to_header_map(&headers).unwrap_err().contains("Bad Header"));
    }

    #[test]
    fn from_env_reads_configuration() {
        std::env::set_var(crate::config::BASE_URL_VAR, "https://env.example/api");
        std::env::set_var(crate::config::USER_AGENT_VAR, "env-agent/2.0");
        let client = RestClient::from_env().unwrap();
        std::env::remove_var(crate::config::BASE_URL_VAR);
        std::env::remove_var(crate::config::USER_AGENT_VAR);

        assert_eq!(client.base_url().as_str(), "https://env.example/api");
        assert_eq!(client.user_agent(), "env-agent/2.0");
    }

    #[test]
    fn timeouts_win() {
        let err = wrapped(io::ErrorKind::Other, "deadline elapsed");
        assert_eq!(classify_failure(true, true, &err), ErrorKind::Timeout);
        let err = wrapped(io::ErrorKind::TimedOut, "timed out");
        assert_eq!(classify_failure(false, false, &err), ErrorKind::Timeout);
    }

    #[test]
    fn refused_and_reset_are_connection_errors() {
        let err = wrapped(io::ErrorKind::ConnectionRefused, "Connection refused");
        assert_eq!(classify_failure(false, true, &err), ErrorKind::Connection);
        let err = wrapped(io::ErrorKind::ConnectionReset, "Connection reset by peer");
        assert_eq!(classify_failure(false, false, &err), ErrorKind::Connection);
    }

    #[test]
    fn everything_else_is_a_request_error() {
        let err = wrapped(io::ErrorKind::Other, "too many redirects");
        assert_eq!(classify_failure(false, false, &err), ErrorKind::Request);
    }
}
