use std::collections::BTreeMap;
use std::io::{self, Write};

use app_rest_client::Response;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Json,
    Body,
}

#[derive(Tabled, Serialize)]
struct FieldRow {
    #[tabled(rename = "Field")]
    #[serde(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: String,
}

/// Serializable view of a response for `--output json`.
#[derive(Serialize)]
pub struct ResponseView {
    pub code: i32,
    pub reason: String,
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON when the body is JSON, the raw text otherwise.
    pub body: serde_json::Value,
}

impl From<&Response> for ResponseView {
    fn from(resp: &Response) -> Self {
        let headers = resp
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect();
        let body = resp
            .json::<serde_json::Value>()
            .unwrap_or_else(|_| serde_json::Value::String(resp.text().into_owned()));
        Self {
            code: resp.code,
            reason: resp.reason.clone(),
            headers,
            body,
        }
    }
}

// -- Row builders --

fn build_response_rows(resp: &Response) -> Vec<FieldRow> {
    let mut rows = vec![FieldRow {
        field: "Status".to_string(),
        value: format!("{} {}", resp.code, resp.reason).trim_end().to_string(),
    }];
    rows.extend(resp.headers.iter().map(|(name, value)| FieldRow {
        field: name.to_string(),
        value: value.to_str().unwrap_or("<binary>").to_string(),
    }));
    rows.push(FieldRow {
        field: "Body".to_string(),
        value: truncate_body(&resp.text()),
    });
    rows
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}

// -- Table output --

pub fn print_response_table(resp: &Response) {
    let mut table = Table::new(build_response_rows(resp));
    table.with(Style::sharp());
    println!("{}", table);
}

// -- Body output --

/// Writes the body bytes unchanged.
pub fn print_body(resp: &Response) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(&resp.body)?;
    stdout.flush()
}

// -- JSON output --

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use app_rest_client::{HeaderMap, HeaderValue};

    use super::*;

    fn sample_response(body: &str) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        Response::new(200, "OK", headers, body)
    }

    // -- Row builder tests --

    #[test]
    fn test_build_response_rows_mapping() {
        let rows = build_response_rows(&sample_response(r#"{"id": 1}"#));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].field, "Status");
        assert_eq!(rows[0].value, "200 OK");
        assert_eq!(rows[1].field, "content-type");
        assert_eq!(rows[1].value, "application/json");
        assert_eq!(rows[2].field, "Body");
        assert_eq!(rows[2].value, r#"{"id": 1}"#);
    }

    #[test]
    fn test_build_response_rows_without_reason() {
        let resp = Response::new(399, "", HeaderMap::new(), "");
        let rows = build_response_rows(&resp);
        assert_eq!(rows[0].value, "399");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        let long = "é".repeat(1500);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("...[truncated]"));
        assert!(truncated.len() < long.len());
    }

    // -- JSON view tests --

    #[test]
    fn test_response_view_parses_json_body() {
        let view = ResponseView::from(&sample_response(r#"{"id": 1}"#));
        assert_eq!(view.code, 200);
        assert_eq!(view.body["id"], 1);
        assert_eq!(view.headers.get("content-type").map(String::as_str), Some("application/json"));
    }

    #[test]
    fn test_response_view_keeps_text_body() {
        let view = ResponseView::from(&sample_response("plain text"));
        assert_eq!(view.body, serde_json::Value::String("plain text".to_string()));
    }

    #[test]
    fn test_table_renders_headers() {
        let table = Table::new(build_response_rows(&sample_response("{}"))).to_string();
        assert!(table.contains("Field"));
        assert!(table.contains("Value"));
        assert!(table.contains("200 OK"));
    }
}
