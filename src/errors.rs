use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;

use crate::data_formats::Rendered;

pub const NOT_FOUND_TEMPLATE: &str = "core/404.html";

/// Field name to messages, in the shape a form template expects.
pub type FormErrors = BTreeMap<&'static str, Vec<String>>;

#[derive(Debug)]
pub enum RequestError {
    NotFound(&'static str),
    NotAuthorized(&'static str),
    /// The caller may not perform the action and is sent somewhere neutral instead.
    PermissionDenied { redirect_to: String },
    Validation(FormErrors),
    ServerError,
    DatabaseError(sqlx::Error),
}

#[derive(serde::Serialize)]
pub struct RequestErrorJsonWrapper {
    errors: RequestErrorJson,
}

#[derive(serde::Serialize)]
pub struct RequestErrorJson {
    body: Vec<String>,
}

impl RequestErrorJsonWrapper {
    pub fn new(error: &str) -> RequestErrorJsonWrapper {
        RequestErrorJsonWrapper {
            errors: RequestErrorJson {
                body: vec![error.to_string()],
            },
        }
    }
}

impl From<sqlx::Error> for RequestError {
    fn from(value: sqlx::Error) -> Self {
        Self::DatabaseError(value)
    }
}

impl RequestError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = FormErrors::new();
        errors.entry(field).or_default().push(message.into());
        Self::Validation(errors)
    }
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(RequestErrorJsonWrapper::new(message))).into_response()
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        match self {
            RequestError::NotFound(message) => {
                tracing::debug!("not found: {}", message);
                Rendered::new(NOT_FOUND_TEMPLATE, json!({ "message": message }))
                    .with_status(StatusCode::NOT_FOUND)
                    .into_response()
            }
            RequestError::PermissionDenied { redirect_to } => {
                Redirect::to(&redirect_to).into_response()
            }
            RequestError::NotAuthorized(message) => json_error(StatusCode::UNAUTHORIZED, message),
            RequestError::Validation(errors) => {
                let messages = errors
                    .iter()
                    .flat_map(|(field, messages)| {
                        messages.iter().map(move |m| format!("{}: {}", field, m))
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                json_error(StatusCode::UNPROCESSABLE_ENTITY, &messages)
            }
            RequestError::ServerError => {
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
            RequestError::DatabaseError(e) => {
                tracing::error!("Database error: {}", e);
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}
