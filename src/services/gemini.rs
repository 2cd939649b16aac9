use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::analysis::ImagePayload;
use crate::services::analyzer::AnalysisError;

/// One element of a multimodal prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Text(String),
    Image(ImagePayload),
}

/// Instruction first, then every image in input order.
pub fn build_prompt_parts(
    instruction: &str,
    images: Vec<ImagePayload>,
) -> Result<Vec<PromptPart>, AnalysisError> {
    if images.is_empty() {
        return Err(AnalysisError::Validation(
            "at least one image payload is required".to_string(),
        ));
    }

    let mut parts = Vec::with_capacity(images.len() + 1);
    parts.push(PromptPart::Text(instruction.to_string()));
    parts.extend(images.into_iter().map(PromptPart::Image));
    Ok(parts)
}

/// A multimodal model that turns a prompt into free-form text.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Identifier reported in analysis metadata.
    fn model_id(&self) -> &str;

    async fn generate(&self, parts: &[PromptPart]) -> Result<String, AnalysisError>;
}

/// Client for the Google Gemini `generateContent` REST API.
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
    system_instruction: String,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(
        http: Client,
        api_key: String,
        model: String,
        base_url: String,
        system_instruction: String,
    ) -> Self {
        Self {
            http,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            system_instruction,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

fn to_wire(part: &PromptPart) -> Part<'_> {
    match part {
        PromptPart::Text(text) => Part::Text { text },
        PromptPart::Image(image) => Part::InlineData {
            inline_data: InlineData {
                mime_type: &image.mime_type,
                data: &image.data,
            },
        },
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, parts: &[PromptPart]) -> Result<String, AnalysisError> {
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text {
                    text: &self.system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: parts.iter().map(to_wire).collect(),
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::ModelInvocation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AnalysisError::ModelInvocation(format!(
                "Gemini responded with {status}: {error_text}"
            )));
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ModelInvocation(e.to_string()))?;

        let text: String = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnalysisError::ModelInvocation(
                "Gemini returned no text content".to_string(),
            ));
        }

        Ok(text)
    }
}
