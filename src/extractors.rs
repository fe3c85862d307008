use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, StatusCode};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Deserializer};

use crate::error::AppError;
use crate::state::AppState;

/// An image file received in a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub data: Bytes,
}

/// What a request wants done with a prompt's expected-output image.
#[derive(Debug, Clone, Default)]
pub enum ImageChange {
    #[default]
    Keep,
    Clear,
    Upload(UploadedImage),
}

/// Prompt fields sent by a client, either as JSON or as `multipart/form-data`.
/// Fields the client left out are `None`.
#[derive(Debug, Default)]
pub struct PromptForm {
    pub author: Option<String>,
    pub text: Option<String>,
    pub tags: Option<String>,
    pub expected_output: ImageChange,
}

#[derive(Deserialize)]
struct PromptJson {
    author: Option<String>,
    #[serde(alias = "text")]
    prompt: Option<String>,
    tags: Option<String>,
    #[serde(default, deserialize_with = "present")]
    expected_output: Option<Option<String>>,
}

// Distinguishes an explicit `null` from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<PromptJson> for PromptForm {
    fn from(body: PromptJson) -> Self {
        // A string here is the URL a client read back from us; images only
        // arrive through multipart.
        let expected_output = match body.expected_output {
            Some(None) => ImageChange::Clear,
            Some(Some(_)) | None => ImageChange::Keep,
        };
        PromptForm {
            author: body.author,
            text: body.prompt,
            tags: body.tags,
            expected_output,
        }
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

impl PromptForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = PromptForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(multipart_error)?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "expected_output" => {
                    let file_name = field.file_name().map(str::to_string);
                    let data = field.bytes().await.map_err(multipart_error)?;
                    form.expected_output = match file_name {
                        Some(file_name) if !data.is_empty() => {
                            ImageChange::Upload(UploadedImage { file_name, data })
                        }
                        _ => ImageChange::Clear,
                    };
                }
                "author" | "prompt" | "text" | "tags" => {
                    let value = field.text().await.map_err(multipart_error)?;
                    match name.as_str() {
                        "author" => form.author = Some(value),
                        "tags" => form.tags = Some(value),
                        _ => form.text = Some(value),
                    }
                }
                _ => {} // ignore unknown fields
            }
        }

        Ok(form)
    }
}

impl FromRequest<AppState> for PromptForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else {
            let Json(body) = Json::<PromptJson>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(body.into())
        }
    }
}
