//! Parsing of free-form command-line values into client options.

use anyhow::{bail, Result};
use app_rest_client::{Body, BodyEncoding, ParamValue, Params, Proxy};

/// Parses `key=value` pairs. A key given more than once becomes a list.
pub fn parse_query(pairs: &[String]) -> Result<Params> {
    let mut params = Params::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid query parameter `{}` (expected key=value)", pair);
        };
        if key.is_empty() {
            bail!("Invalid query parameter `{}` (empty key)", pair);
        }
        let merged = match params.get(key) {
            Some(ParamValue::List(items)) => {
                let mut items = items.clone();
                items.push(value.into());
                ParamValue::List(items)
            }
            Some(existing) => ParamValue::List(vec![existing.clone(), value.into()]),
            None => value.into(),
        };
        params.insert(key, merged);
    }
    Ok(params)
}

/// Parses a `Name: value` header line.
pub fn parse_header(line: &str) -> Result<(String, String)> {
    let Some((name, value)) = line.split_once(':') else {
        bail!("Invalid header `{}` (expected `Name: value`)", line);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid header `{}` (empty name)", line);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Splits `user[:password]`.
pub fn parse_credentials(value: &str) -> (String, Option<String>) {
    match value.split_once(':') {
        Some((user, password)) => (user.to_string(), Some(password.to_string())),
        None => (value.to_string(), None),
    }
}

/// Parses `host[:port]` or a proxy URL.
pub fn parse_proxy(value: &str, credentials: Option<&str>) -> Result<Proxy> {
    let mut proxy = match value.rsplit_once(':') {
        Some((host, port)) if !value.contains("://") => {
            let Ok(port) = port.parse::<u16>() else {
                bail!("Invalid proxy port in `{}`", value);
            };
            Proxy::new(host).with_port(port)
        }
        _ => Proxy::new(value),
    };
    if let Some(credentials) = credentials {
        let (user, password) = parse_credentials(credentials);
        proxy = proxy.with_credentials(&user, password.as_deref().unwrap_or_default());
    }
    Ok(proxy)
}

/// Structured encodings get parsed JSON when the data is JSON; everything
/// else is sent as text.
pub fn parse_body(data: &str, encoding: BodyEncoding) -> Body {
    match encoding {
        BodyEncoding::Xml | BodyEncoding::Raw => Body::Text(data.to_string()),
        BodyEncoding::Json | BodyEncoding::Form | BodyEncoding::Multipart => {
            match serde_json::from_str::<serde_json::Value>(data) {
                Ok(value) => Body::Structured(value),
                Err(_) => Body::Text(data.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use app_rest_client::QueryParamMethod;

    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_query_repeats_become_lists() {
        let params = parse_query(&strings(&["tag=a", "page=2", "tag=b", "tag=c"])).unwrap();
        assert_eq!(
            params.to_query_string(QueryParamMethod::Form),
            "tag=a&tag=b&tag=c&page=2"
        );
    }

    #[test]
    fn test_parse_query_rejects_missing_equals() {
        assert!(parse_query(&strings(&["page"])).is_err());
        assert!(parse_query(&strings(&["=2"])).is_err());
    }

    #[test]
    fn test_parse_query_allows_empty_value() {
        let params = parse_query(&strings(&["q="])).unwrap();
        assert_eq!(params.get("q"), Some(&ParamValue::Scalar(String::new())));
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("X-Request-Id:  abc ").unwrap(),
            ("X-Request-Id".to_string(), "abc".to_string())
        );
        assert_eq!(
            parse_header("Authorization: Bearer a:b").unwrap().1,
            "Bearer a:b"
        );
        assert!(parse_header("no colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_parse_credentials() {
        assert_eq!(
            parse_credentials("alice:s3cret"),
            ("alice".to_string(), Some("s3cret".to_string()))
        );
        assert_eq!(parse_credentials("alice"), ("alice".to_string(), None));
    }

    #[test]
    fn test_parse_proxy() {
        let proxy = parse_proxy("proxy.local:3128", Some("bob:pw")).unwrap();
        assert_eq!(proxy.url().unwrap().as_str(), "http://proxy.local:3128/");
        assert_eq!(proxy.user.as_deref(), Some("bob"));
        assert_eq!(proxy.password.as_deref(), Some("pw"));

        let proxy = parse_proxy("https://proxy.local:8443", None).unwrap();
        assert_eq!(proxy.url().unwrap().as_str(), "https://proxy.local:8443/");

        assert!(parse_proxy("proxy.local:http", None).is_err());
    }

    #[test]
    fn test_parse_body() {
        assert!(matches!(
            parse_body(r#"{"a": 1}"#, BodyEncoding::Json),
            Body::Structured(_)
        ));
        assert!(matches!(parse_body("a=1", BodyEncoding::Form), Body::Text(_)));
        assert!(matches!(
            parse_body(r#"{"a": 1}"#, BodyEncoding::Raw),
            Body::Text(_)
        ));
        assert!(matches!(parse_body("<a/>", BodyEncoding::Xml), Body::Text(_)));
    }
}
