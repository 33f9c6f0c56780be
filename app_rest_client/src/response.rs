//! Response returned by [`crate::RestClient::request`].

use std::borrow::Cow;

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

/// Reason attached to the placeholder response of transport failures.
pub const PLACEHOLDER_REASON: &str = "No response received (transport failure)";

/// An HTTP response, read fully into memory.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// Status code. `-1` on the placeholder response.
    pub code: i32,
    /// Canonical reason phrase, empty when the code has none.
    pub reason: String,
    pub headers: HeaderMap,
    /// Body bytes exactly as received.
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(
        code: i32,
        reason: impl Into<String>,
        headers: HeaderMap,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            code,
            reason: reason.into(),
            headers,
            body: body.into(),
        }
    }

    /// Stand-in response attached to errors raised before anything was received.
    pub fn placeholder() -> Self {
        Self::new(-1, PLACEHOLDER_REASON, HeaderMap::new(), "")
    }

    pub fn is_placeholder(&self) -> bool {
        self.code == -1
    }

    /// Looks up a header value, ignoring values that are not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The body as text. Invalid UTF-8 sequences are replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub(crate) async fn read(resp: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?.to_vec();
        Ok(Self::new(
            i32::from(status.as_u16()),
            status.canonical_reason().unwrap_or_default(),
            headers,
            body,
        ))
    }
}
