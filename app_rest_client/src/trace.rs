//! Wire trace capture.
//!
//! In debug mode the trace goes straight to the log on the
//! `app_rest_client::wire` target. Otherwise it is buffered so it can be
//! attached to an error, then dropped with the request.

use crate::{request::Method, response::Response};

enum Sink {
    Log,
    Buffer(String),
    Off,
}

pub(crate) struct Trace {
    sink: Sink,
}

impl Trace {
    pub(crate) fn new(debug: bool, suppress: bool) -> Self {
        let sink = if debug {
            Sink::Log
        } else if suppress {
            Sink::Off
        } else {
            Sink::Buffer(String::new())
        };
        Self { sink }
    }

    pub(crate) fn request(
        &mut self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Option<&str>,
    ) {
        self.line('>', &format!("{} {}", method, url));
        for (name, value) in headers {
            self.line('>', &format!("{}: {}", name, value));
        }
        if let Some(body) = body {
            self.line('>', body);
        }
    }

    pub(crate) fn response(&mut self, response: &Response) {
        self.line('<', &format!("HTTP {} {}", response.code, response.reason));
        for (name, value) in response.headers.iter() {
            self.line(
                '<',
                &format!("{}: {}", name, value.to_str().unwrap_or("<binary>")),
            );
        }
        if !response.body.is_empty() {
            self.line('<', &response.text());
        }
    }

    /// Records something that happened outside the request/response exchange.
    pub(crate) fn note(&mut self, text: &str) {
        self.line('*', text);
    }

    fn line(&mut self, marker: char, text: &str) {
        match &mut self.sink {
            Sink::Log => tracing::debug!(target: "app_rest_client::wire", "{} {}", marker, text),
            Sink::Buffer(buf) => {
                buf.push(marker);
                buf.push(' ');
                buf.push_str(text);
                buf.push('\n');
            }
            Sink::Off => {}
        }
    }

    /// Hands back the buffered trace. `None` unless buffering.
    pub(crate) fn finish(self) -> Option<String> {
        match self.sink {
            Sink::Buffer(buf) => Some(buf.trim_end().to_string()),
            Sink::Log | Sink::Off => None,
        }
    }
}
