//! Per-call request options: method, body, encoding, auth, proxy, timeouts.

use std::{fmt, str::FromStr, time::Duration};

use reqwest::multipart::Form;
use serde_json::Value;
use url::Url;

use crate::{
    errors::ParseError,
    query::{Params, QueryParamMethod},
};

/// Supported HTTP verbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(ParseError::Method(s.to_string())),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// How the request body is serialized. Defaults to JSON.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BodyEncoding {
    #[default]
    Json,
    Form,
    Multipart,
    Xml,
    Raw,
}

impl BodyEncoding {
    /// Content type implied by this encoding. Multipart boundaries are set
    /// by the transport, and raw bodies imply nothing.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            BodyEncoding::Json => Some("application/json"),
            BodyEncoding::Form => Some("application/x-www-form-urlencoded"),
            BodyEncoding::Xml => Some("application/xml"),
            BodyEncoding::Multipart | BodyEncoding::Raw => None,
        }
    }
}

impl FromStr for BodyEncoding {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(BodyEncoding::Json),
            "form" => Ok(BodyEncoding::Form),
            "multipart" => Ok(BodyEncoding::Multipart),
            "xml" => Ok(BodyEncoding::Xml),
            "raw" => Ok(BodyEncoding::Raw),
            _ => Err(ParseError::BodyEncoding(s.to_string())),
        }
    }
}

/// A request body before encoding.
#[derive(Debug)]
pub enum Body {
    /// Structured data, serialized according to the [`BodyEncoding`].
    Structured(Value),
    /// Already-encoded text, sent as is.
    Text(String),
    /// A multipart form, only valid with [`BodyEncoding::Multipart`].
    Multipart(Form),
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Structured(value)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Form> for Body {
    fn from(form: Form) -> Self {
        Body::Multipart(form)
    }
}

/// An encoded body ready to hand to the transport.
#[derive(Debug)]
pub(crate) enum Payload {
    Empty,
    Text(String),
    Multipart(Form),
}

impl Payload {
    /// Text shown for the body in wire traces.
    pub(crate) fn describe(&self) -> Option<&str> {
        match self {
            Payload::Empty => None,
            Payload::Text(text) => Some(text.as_str()),
            Payload::Multipart(_) => Some("<multipart form>"),
        }
    }
}

/// Serializes `body` per `encoding`.
///
/// Returns the reason as a message when the combination cannot be encoded.
pub(crate) fn encode_body(body: Option<Body>, encoding: BodyEncoding) -> Result<Payload, String> {
    let Some(body) = body else {
        return Ok(Payload::Empty);
    };
    match (encoding, body) {
        (BodyEncoding::Multipart, Body::Multipart(form)) => Ok(Payload::Multipart(form)),
        (BodyEncoding::Multipart, Body::Structured(Value::Object(map))) => {
            let form = map.into_iter().fold(Form::new(), |form, (key, value)| {
                form.text(key, value_to_string(&value))
            });
            Ok(Payload::Multipart(form))
        }
        (_, Body::Multipart(_)) => {
            Err("multipart forms require the multipart body encoding".to_string())
        }
        (_, Body::Text(text)) => Ok(Payload::Text(text)),
        (BodyEncoding::Json, Body::Structured(value)) => serde_json::to_string(&value)
            .map(Payload::Text)
            .map_err(|e| format!("failed to encode JSON body: {}", e)),
        (BodyEncoding::Form, Body::Structured(Value::Object(map))) => {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in map.iter() {
                match value {
                    Value::Array(items) => {
                        for item in items {
                            serializer.append_pair(key, &value_to_string(item));
                        }
                    }
                    other => {
                        serializer.append_pair(key, &value_to_string(other));
                    }
                }
            }
            Ok(Payload::Text(serializer.finish()))
        }
        (BodyEncoding::Form, Body::Structured(_)) => {
            Err("form bodies must be a JSON object".to_string())
        }
        (BodyEncoding::Multipart, Body::Structured(_)) => {
            Err("multipart bodies must be a form or a JSON object".to_string())
        }
        (BodyEncoding::Xml, Body::Structured(Value::String(text))) => Ok(Payload::Text(text)),
        (BodyEncoding::Xml, Body::Structured(_)) => {
            Err("XML bodies must be supplied as text".to_string())
        }
        (BodyEncoding::Raw, Body::Structured(value)) => Ok(Payload::Text(value_to_string(&value))),
    }
}

/// Stringifies a JSON value without quoting plain strings.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// HTTP basic-auth credentials.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: Option<String>,
}

/// Proxy settings applied to a single request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Proxy {
    /// Host or URL of the proxy. `http://` is assumed when no scheme is given.
    pub address: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Proxy {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(mut self, user: &str, password: &str) -> Self {
        self.user = Some(user.to_string());
        self.password = Some(password.to_string());
        self
    }

    /// The proxy URL handed to the transport. `port`, when set, replaces
    /// any port already in `address`.
    pub fn url(&self) -> Result<Url, url::ParseError> {
        let mut url = if self.address.contains("://") {
            Url::parse(&self.address)?
        } else {
            Url::parse(&format!("http://{}", self.address))?
        };
        if self.port.is_some() {
            url.set_port(self.port)
                .map_err(|()| url::ParseError::InvalidPort)?;
        }
        Ok(url)
    }

    pub(crate) fn to_reqwest(&self) -> Result<reqwest::Proxy, String> {
        let url = self
            .url()
            .map_err(|e| format!("invalid proxy address `{}`: {}", self.address, e))?;
        let proxy = reqwest::Proxy::all(url).map_err(|e| e.to_string())?;
        Ok(match &self.user {
            Some(user) => proxy.basic_auth(user, self.password.as_deref().unwrap_or_default()),
            None => proxy,
        })
    }
}

/// Everything about a request besides its method and path.
///
/// Built fresh for every call with the `with_*` methods.
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub query: Option<Params>,
    pub query_param_method: QueryParamMethod,
    /// Extra headers, merged over the defaults by exact key. On the wire a
    /// later header also replaces an earlier one differing only in case.
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub body_encoding: BodyEncoding,
    pub basic_auth: Option<BasicAuth>,
    pub proxy: Option<Proxy>,
    /// Overrides the client-wide timeout.
    pub timeout: Option<Duration>,
    /// `Some(false)` returns redirects to the caller instead of following them.
    pub follow_redirects: Option<bool>,
    /// When set, only these status codes are accepted.
    pub allowed_statuses: Option<Vec<u16>>,
    /// Sends the wire trace to the log for this call.
    pub debug: bool,
    /// Skips trace capture entirely.
    pub suppress_trace: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: Params) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_query_param_method(mut self, method: QueryParamMethod) -> Self {
        self.query_param_method = method;
        self
    }

    /// Adds a header, replacing an earlier one with exactly the same key.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        merge_header(&mut self.headers, name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a structured JSON body.
    pub fn with_json(self, value: Value) -> Self {
        self.with_body(value).with_body_encoding(BodyEncoding::Json)
    }

    /// Sets a URL-encoded form body from a JSON object.
    pub fn with_form(self, value: Value) -> Self {
        self.with_body(value).with_body_encoding(BodyEncoding::Form)
    }

    pub fn with_multipart(self, form: Form) -> Self {
        self.with_body(form).with_body_encoding(BodyEncoding::Multipart)
    }

    pub fn with_body_encoding(mut self, encoding: BodyEncoding) -> Self {
        self.body_encoding = encoding;
        self
    }

    pub fn with_basic_auth(mut self, user: &str, password: Option<&str>) -> Self {
        self.basic_auth = Some(BasicAuth {
            user: user.to_string(),
            password: password.map(str::to_string),
        });
        self
    }

    pub fn with_proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    pub fn with_allowed_statuses(mut self, statuses: &[u16]) -> Self {
        self.allowed_statuses = Some(statuses.to_vec());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_suppressed_trace(mut self) -> Self {
        self.suppress_trace = true;
        self
    }
}

fn merge_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(key, _)| key == name) {
        Some(entry) => entry.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// Default headers for `encoding` with the caller's headers merged on top.
pub(crate) fn build_headers(
    encoding: BodyEncoding,
    extra: &[(String, String)],
) -> Vec<(String, String)> {
    let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
    if let Some(content_type) = encoding.content_type() {
        headers.push(("Content-Type".to_string(), content_type.to_string()));
    }
    for (name, value) in extra {
        merge_header(&mut headers, name, value);
    }
    headers
}
