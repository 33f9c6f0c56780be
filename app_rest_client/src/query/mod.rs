//! Query-string serialization for [`Params`].

mod params;
pub use self::params::{ParamValue, Params};

use std::str::FromStr;

use url::form_urlencoded;

use crate::errors::ParseError;

/// How query parameters are turned into a query string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueryParamMethod {
    /// Framework-style nesting: `tags[]=a`, `filter[state]=open`. Keys and
    /// values are escaped and top-level pairs are sorted.
    Nested,
    /// `key=value` joined with `&`, no escaping. Lists are joined with `,`.
    Naive,
    /// Standard `application/x-www-form-urlencoded`. Lists repeat their key.
    #[default]
    Form,
}

impl FromStr for QueryParamMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nested" => Ok(QueryParamMethod::Nested),
            "naive" => Ok(QueryParamMethod::Naive),
            "form" => Ok(QueryParamMethod::Form),
            _ => Err(ParseError::QueryParamMethod(s.to_string())),
        }
    }
}

impl Params {
    /// Serializes these parameters, without a leading `?`.
    pub fn to_query_string(&self, method: QueryParamMethod) -> String {
        match method {
            QueryParamMethod::Nested => nested_map(self, None),
            QueryParamMethod::Naive => {
                let mut pairs = Vec::new();
                naive_pairs(self, None, &mut pairs);
                pairs
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("&")
            }
            QueryParamMethod::Form => {
                let mut pairs = Vec::new();
                form_pairs(self, None, &mut pairs);
                form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish()
            }
        }
    }
}

fn scoped_key(namespace: Option<&str>, key: &str) -> String {
    match namespace {
        Some(ns) => format!("{}[{}]", ns, key),
        None => key.to_string(),
    }
}

fn escape(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn nested_map(params: &Params, namespace: Option<&str>) -> String {
    let mut parts: Vec<String> = params
        .iter()
        .filter(|(_, value)| !is_empty_collection(value))
        .map(|(key, value)| nested_value(value, &scoped_key(namespace, key)))
        .collect();
    if !namespace.is_some_and(|ns| ns.contains("[]")) {
        parts.sort();
    }
    parts.join("&")
}

fn nested_value(value: &ParamValue, key: &str) -> String {
    match value {
        ParamValue::Scalar(s) => format!("{}={}", escape(key), escape(s)),
        ParamValue::List(items) => {
            let prefix = format!("{}[]", key);
            if items.is_empty() {
                return format!("{}=", escape(&prefix));
            }
            items
                .iter()
                .map(|item| nested_value(item, &prefix))
                .collect::<Vec<_>>()
                .join("&")
        }
        ParamValue::Map(map) => nested_map(map, Some(key)),
    }
}

fn is_empty_collection(value: &ParamValue) -> bool {
    match value {
        ParamValue::List(items) => items.is_empty(),
        ParamValue::Map(map) => map.is_empty(),
        ParamValue::Scalar(_) => false,
    }
}

fn naive_pairs(params: &Params, namespace: Option<&str>, out: &mut Vec<(String, String)>) {
    for (key, value) in params.iter() {
        let key = scoped_key(namespace, key);
        match value {
            ParamValue::Map(map) => naive_pairs(map, Some(&key), out),
            other => out.push((key, naive_join(other))),
        }
    }
}

fn naive_join(value: &ParamValue) -> String {
    match value {
        ParamValue::Scalar(s) => s.clone(),
        ParamValue::List(items) => items.iter().map(naive_join).collect::<Vec<_>>().join(","),
        ParamValue::Map(map) => map
            .iter()
            .map(|(k, v)| format!("{}:{}", k, naive_join(v)))
            .collect::<Vec<_>>()
            .join(","),
    }
}

fn form_pairs(params: &Params, namespace: Option<&str>, out: &mut Vec<(String, String)>) {
    for (key, value) in params.iter() {
        form_value(value, &scoped_key(namespace, key), out);
    }
}

fn form_value(value: &ParamValue, key: &str, out: &mut Vec<(String, String)>) {
    match value {
        ParamValue::Scalar(s) => out.push((key.to_string(), s.clone())),
        ParamValue::List(items) => {
            for item in items {
                form_value(item, key, out);
            }
        }
        ParamValue::Map(map) => form_pairs(map, Some(key), out),
    }
}
