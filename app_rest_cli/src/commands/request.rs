use std::time::Duration;

use anyhow::Result;
use app_rest_client::{BodyEncoding, Method, QueryParamMethod, RequestOptions, RestClient};
use clap::Args;

use crate::args::{parse_body, parse_credentials, parse_header, parse_proxy, parse_query};
use crate::output::{print_body, print_json, print_response_table, OutputFormat, ResponseView};

#[derive(Args)]
pub struct RequestArgs {
    /// HTTP method: get, post, put, patch, delete, head, options
    pub method: Method,

    /// Path relative to the base URL, or an absolute URL
    pub path: String,

    /// Query parameter as key=value (repeatable)
    #[arg(short, long = "query")]
    pub query: Vec<String>,

    /// Query serialization: form, nested or naive
    #[arg(long, default_value = "form")]
    pub query_method: QueryParamMethod,

    /// Header as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    pub header: Vec<String>,

    /// Request body
    #[arg(short, long)]
    pub data: Option<String>,

    /// Body encoding: json, form, multipart, xml or raw
    #[arg(long, default_value = "json")]
    pub encoding: BodyEncoding,

    /// Basic auth credentials as user[:password]
    #[arg(short, long)]
    pub user: Option<String>,

    /// Proxy as host:port or URL
    #[arg(long)]
    pub proxy: Option<String>,

    /// Proxy credentials as user[:password]
    #[arg(long, requires = "proxy")]
    pub proxy_user: Option<String>,

    /// Request timeout in seconds, overriding the default
    #[arg(long = "request-timeout")]
    pub request_timeout: Option<u64>,

    /// Return redirects instead of following them
    #[arg(long)]
    pub no_redirect: bool,

    /// Accept only these status codes (repeatable)
    #[arg(long)]
    pub allow: Vec<u16>,

    /// Send the wire trace to the log for this request only
    #[arg(long)]
    pub verbose: bool,
}

/// Turns parsed arguments into request options.
pub fn build_options(args: &RequestArgs) -> Result<RequestOptions> {
    let mut options = RequestOptions::new()
        .with_query_param_method(args.query_method)
        .with_body_encoding(args.encoding)
        .with_debug(args.verbose);

    if !args.query.is_empty() {
        options = options.with_query(parse_query(&args.query)?);
    }
    for line in &args.header {
        let (name, value) = parse_header(line)?;
        options = options.with_header(&name, &value);
    }
    if let Some(data) = &args.data {
        options = options.with_body(parse_body(data, args.encoding));
    }
    if let Some(user) = &args.user {
        let (user, password) = parse_credentials(user);
        options = options.with_basic_auth(&user, password.as_deref());
    }
    if let Some(proxy) = &args.proxy {
        options = options.with_proxy(parse_proxy(proxy, args.proxy_user.as_deref())?);
    }
    if let Some(secs) = args.request_timeout {
        options = options.with_timeout(Duration::from_secs(secs));
    }
    if args.no_redirect {
        options = options.with_follow_redirects(false);
    }
    if !args.allow.is_empty() {
        options = options.with_allowed_statuses(&args.allow);
    }
    Ok(options)
}

pub async fn run(args: &RequestArgs, client: &RestClient, format: &OutputFormat) -> Result<()> {
    let options = build_options(args)?;
    let resp = client.request(args.method, &args.path, options).await?;

    match format {
        OutputFormat::Table => print_response_table(&resp),
        OutputFormat::Json => print_json(&ResponseView::from(&resp)),
        OutputFormat::Body => print_body(&resp)?,
    }

    Ok(())
}
