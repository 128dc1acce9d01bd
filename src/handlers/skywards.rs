//! Skywards dashboard page.

use async_trait::async_trait;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::EdgeError;
use crate::http::request::EdgeRequest;
use crate::routing::Handler;

const TEMPLATE: &str = include_str!("../../templates/skywards.html");
const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Serves the dashboard, rendered once at startup.
#[derive(Debug, Clone)]
pub struct SkywardsPage {
    html: String,
}

impl SkywardsPage {
    pub fn new(title: &str) -> Self {
        Self {
            html: TEMPLATE.replace("{{title}}", &escape_html(title)),
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

#[async_trait]
impl Handler for SkywardsPage {
    async fn call(&self, request: &EdgeRequest) -> Result<Response, EdgeError> {
        tracing::info!(request_id = %request.request_id(), "Skywards request received");
        Ok((StatusCode::OK, [(CONTENT_TYPE, TEXT_HTML)], self.html.clone()).into_response())
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
