use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A template name plus the context it is rendered with. Turning it into a response hands
/// both to the client as JSON, with the current year added to the context.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub template: &'static str,
    pub context: Map<String, Value>,
    status: StatusCode,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RenderedWrapper {
    pub template: String,
    pub context: Map<String, Value>,
}

impl Rendered {
    /// `context` is expected to be a JSON object; any other value is stored under `"value"`.
    pub fn new(template: &'static str, context: Value) -> Self {
        let context = match context {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_owned(), other);
                map
            }
        };
        Rendered {
            template,
            context,
            status: StatusCode::OK,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

/// The `year` context value every page receives.
pub fn current_year() -> String {
    chrono::Utc::now().year().to_string()
}

impl IntoResponse for Rendered {
    fn into_response(self) -> axum::response::Response {
        let mut context = self.context;
        context.insert("year".to_owned(), Value::String(current_year()));
        let body = RenderedWrapper {
            template: self.template.to_owned(),
            context,
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TokenWrapper {
    pub username: String,
    pub token: String,
}
