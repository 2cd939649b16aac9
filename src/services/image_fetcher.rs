use async_trait::async_trait;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::models::analysis::ImagePayload;
use crate::services::analyzer::AnalysisError;

/// Media type assumed when neither the header nor the bytes reveal one.
const FALLBACK_MIME_TYPE: &str = "image/jpeg";

/// Source of image bytes for analysis.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ImagePayload, AnalysisError>;
}

/// Downloads images over HTTP(S). No retries, transport default timeouts.
pub struct HttpImageFetcher {
    http: Client,
}

impl HttpImageFetcher {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl ImageSource for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<ImagePayload, AnalysisError> {
        let fetch_error = |reason: String| AnalysisError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("host responded with {status}")));
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .filter(|value| value.starts_with("image/"));

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let mime_type = declared.unwrap_or_else(|| sniff_mime_type(&bytes));

        tracing::debug!(url, mime_type = %mime_type, bytes = bytes.len(), "Fetched image");

        Ok(ImagePayload {
            data: base64::engine::general_purpose::STANDARD.encode(&bytes),
            mime_type,
        })
    }
}

/// Guess the media type from magic bytes.
pub fn sniff_mime_type(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_MIME_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_png() {
        let png_magic = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(sniff_mime_type(&png_magic), "image/png");
    }

    #[test]
    fn test_sniff_unknown_falls_back_to_jpeg() {
        assert_eq!(sniff_mime_type(b"plain text"), "image/jpeg");
    }
}
