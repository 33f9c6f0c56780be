use anyhow::Result;
use app_rest_client::{QueryParamMethod, RestClient};
use clap::Args;

use crate::args::parse_query;

#[derive(Args)]
pub struct UrlArgs {
    /// Path relative to the base URL, or an absolute URL
    pub path: String,

    /// Query parameter as key=value (repeatable)
    #[arg(short, long = "query")]
    pub query: Vec<String>,

    /// Query serialization: form, nested or naive
    #[arg(long, default_value = "form")]
    pub query_method: QueryParamMethod,
}

pub fn run(args: &UrlArgs, client: &RestClient) -> Result<()> {
    let query = parse_query(&args.query)?;
    println!("{}", client.url_for(&args.path, Some(&query), args.query_method));
    Ok(())
}
