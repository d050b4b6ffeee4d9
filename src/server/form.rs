use crate::{
    error::{GatewayError, Result},
    models::ImageUpload,
};
use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpRequest};
use futures::StreamExt;
use std::collections::HashMap;

/// Largest accepted request body, multipart or JSON.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Fields of a `multipart/form-data` body, split into text values and files.
#[derive(Debug, Default)]
pub struct FormData {
    texts: HashMap<String, String>,
    files: HashMap<String, ImageUpload>,
}

impl FormData {
    pub fn text(&self, name: &str) -> Option<String> {
        self.texts.get(name).cloned()
    }

    pub fn take_file(&mut self, name: &str) -> Option<ImageUpload> {
        self.files.remove(name)
    }
}

pub fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| {
            ct.trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        })
}

fn invalid_body(err: impl std::fmt::Display) -> GatewayError {
    GatewayError::validation(format!("Invalid multipart body: {}", err))
}

fn too_large() -> GatewayError {
    GatewayError::validation("Request body too large")
}

pub async fn read_form(req: &HttpRequest, payload: web::Payload) -> Result<FormData> {
    let mut multipart = Multipart::new(req.headers(), payload);
    let mut form = FormData::default();
    let mut total = 0usize;

    while let Some(field) = multipart.next().await {
        let mut field = field.map_err(invalid_body)?;
        let disposition = field.content_disposition();
        let Some(name) = disposition.get_name().map(String::from) else {
            continue;
        };
        let filename = disposition.get_filename().map(String::from);
        let content_type = field.content_type().map(|mime| mime.to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(invalid_body)?;
            total += chunk.len();
            if total > MAX_BODY_BYTES {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        if filename.is_some() || name == "image" {
            let mut upload = ImageUpload::new(bytes);
            upload.filename = filename.filter(|f| !f.is_empty());
            upload.content_type = content_type;
            form.files.insert(name, upload);
        } else {
            form.texts
                .insert(name, String::from_utf8_lossy(&bytes).into_owned());
        }
    }

    Ok(form)
}

/// Reads a non-multipart body in full.
pub async fn read_body(mut payload: web::Payload) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| GatewayError::validation(format!("Invalid body: {}", e)))?;
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
