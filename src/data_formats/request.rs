use axum::extract::Multipart;
use serde::{Deserialize, Serialize};

use crate::errors::{FormErrors, RequestError};

pub const REQUIRED_FIELD: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

// ----------------- User Request -----------------
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsRequest {
    pub fn validate(&self) -> Result<(), RequestError> {
        let mut errors = FormErrors::new();
        if self.username.trim().is_empty() {
            errors.entry("username").or_default().push(REQUIRED_FIELD.to_owned());
        } else if !self
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@.+-_".contains(c))
        {
            errors.entry("username").or_default().push(
                "Enter a valid username. Letters, digits and @/./+/-/_ only.".to_owned(),
            );
        }
        if self.password.is_empty() {
            errors.entry("password").or_default().push(REQUIRED_FIELD.to_owned());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RequestError::Validation(errors))
        }
    }
}

// ----------------- Post Request -----------------
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// The raw create/edit submission as it arrives over `multipart/form-data`.
#[derive(Debug, Default, Clone)]
pub struct PostForm {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<UploadedImage>,
}

/// A submission that passed field-level checks. The group still has to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPost {
    pub text: String,
    pub group_id: Option<i64>,
}

impl PostForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, RequestError> {
        let mut form = PostForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| RequestError::validation("__all__", "Malformed form submission"))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "text" => {
                    form.text = field
                        .text()
                        .await
                        .map_err(|_| RequestError::validation("text", "Invalid text"))?;
                }
                "group" => {
                    let group = field
                        .text()
                        .await
                        .map_err(|_| RequestError::validation("group", INVALID_CHOICE))?;
                    form.group = Some(group);
                }
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_owned();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|_| RequestError::validation("image", "Invalid upload"))?;
                    // Browsers send an empty part when no file was chosen.
                    if !file_name.is_empty() && !bytes.is_empty() {
                        form.image = Some(UploadedImage {
                            file_name,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                other => tracing::debug!("ignoring unknown form field {}", other),
            }
        }
        Ok(form)
    }

    /// Field checks that need no storage: the text must not be blank and the group, when
    /// given, must be an id.
    pub fn clean(&self) -> Result<CleanPost, RequestError> {
        let mut errors = FormErrors::new();
        let text = self.text.trim();
        if text.is_empty() {
            errors.entry("text").or_default().push(REQUIRED_FIELD.to_owned());
        }
        let group_id = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.entry("group").or_default().push(INVALID_CHOICE.to_owned());
                    None
                }
            },
        };
        if !errors.is_empty() {
            return Err(RequestError::Validation(errors));
        }
        Ok(CleanPost {
            text: text.to_owned(),
            group_id,
        })
    }
}

// ----------------- Comment Request -----------------
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}
