//! Reqwest-backed adapter for the external image host.
//!
//! Uploads go out as a single multipart POST; the host answers with the
//! hosted secure URL. Clients never talk to the host directly.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::domain::ports::{ImageStore, ImageStoreError};

/// Reqwest-backed implementation of the [`ImageStore`] port.
#[derive(Clone)]
pub struct HttpImageStore {
    client: reqwest::Client,
    upload_url: String,
}

/// Upload response from the host.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(alias = "secure_url", alias = "secureUrl")]
    url: String,
}

impl HttpImageStore {
    /// Create an adapter posting to `upload_url`.
    pub fn new(client: reqwest::Client, upload_url: impl Into<String>) -> Self {
        Self {
            client,
            upload_url: upload_url.into(),
        }
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ImageStoreError> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_owned())
            .mime_str(content_type)
            .map_err(|err| ImageStoreError::rejected(format!("invalid content type: {err}")))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| ImageStoreError::unavailable(err.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ImageStoreError::unavailable(format!(
                "image host answered {status}"
            )));
        }
        if !status.is_success() {
            return Err(ImageStoreError::rejected(format!(
                "image host answered {status}"
            )));
        }

        let payload: UploadResponse = response
            .json()
            .await
            .map_err(|err| ImageStoreError::rejected(format!("undecodable response: {err}")))?;
        Ok(payload.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_response_accepts_the_hosts_field_spellings() {
        for raw in [
            r#"{"url":"https://img.example.test/a.png"}"#,
            r#"{"secure_url":"https://img.example.test/a.png"}"#,
            r#"{"secureUrl":"https://img.example.test/a.png"}"#,
        ] {
            let parsed: UploadResponse = serde_json::from_str(raw).expect("parse");
            assert_eq!(parsed.url, "https://img.example.test/a.png");
        }
    }
}
