//! REST client wrapper that turns every failed request into one typed [`Error`].
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use app_rest_client::{ErrorKind, Params, RequestOptions, RestClient};
//!
//! let client = RestClient::new("https://api.example.com/v1")?;
//! let options = RequestOptions::new().with_query(Params::new().with("page", 2));
//! match client.get("/items", options).await {
//!     Ok(response) => println!("{}", response.text()),
//!     Err(e) if e.kind() == ErrorKind::NotFound => println!("no items"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod errors;
mod query;
mod request;
mod response;
mod trace;
pub use self::client::RestClient;
pub use self::config::{
    parse_flag, ClientConfig, BASE_URL_VAR, DEBUG_VAR, DEFAULT_USER_AGENT, TIMEOUT_VAR,
    USER_AGENT_VAR,
};
pub use self::errors::{ConfigError, Error, ErrorKind, ParseError};
pub use self::query::{ParamValue, Params, QueryParamMethod};
pub use self::request::{BasicAuth, Body, BodyEncoding, Method, Proxy, RequestOptions};
pub use self::response::{Response, PLACEHOLDER_REASON};

/// Re-exported so callers can build multipart bodies and inspect headers
/// without naming reqwest.
pub use reqwest::header::{HeaderMap, HeaderValue};
pub use reqwest::multipart;
