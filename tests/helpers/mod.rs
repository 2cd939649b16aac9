//! Test doubles for the analysis pipeline.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use catalog_api::models::analysis::ImagePayload;
use catalog_api::services::analyzer::{AnalysisError, ProductAnalyzer};
use catalog_api::services::extraction::FencedJsonExtractor;
use catalog_api::services::gemini::{PromptPart, VisionModel};
use catalog_api::services::image_fetcher::ImageSource;

pub const VALID_REPLY: &str = r#"{"products":[{"name":"Linen Shirt"},{"category":"Clothing"}],"colors":[{"name":"White"}]}"#;

/// Serves a payload whose data is the URL itself, so the model can tell
/// images apart.
#[derive(Default)]
pub struct FakeImages {
    pub failing: HashSet<String>,
    pub delays: HashMap<String, Duration>,
    pub calls: AtomicUsize,
}

impl FakeImages {
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn delayed(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }
}

#[async_trait]
impl ImageSource for FakeImages {
    async fn fetch(&self, url: &str) -> Result<ImagePayload, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(url) {
            return Err(AnalysisError::Fetch {
                url: url.to_string(),
                reason: "host responded with 404 Not Found".to_string(),
            });
        }
        Ok(ImagePayload {
            data: url.to_string(),
            mime_type: "image/jpeg".to_string(),
        })
    }
}

/// Replies with `default_reply` unless a single-image prompt carries an
/// image listed in `replies`.
pub struct FakeModel {
    pub default_reply: String,
    pub replies: HashMap<String, String>,
    pub calls: AtomicUsize,
    pub images_seen: AtomicUsize,
}

impl FakeModel {
    pub fn new(default_reply: &str) -> Self {
        Self {
            default_reply: default_reply.to_string(),
            replies: HashMap::new(),
            calls: AtomicUsize::new(0),
            images_seen: AtomicUsize::new(0),
        }
    }

    pub fn reply_for(mut self, url: &str, reply: &str) -> Self {
        self.replies.insert(url.to_string(), reply.to_string());
        self
    }
}

#[async_trait]
impl VisionModel for FakeModel {
    fn model_id(&self) -> &str {
        "fake-vision"
    }

    async fn generate(&self, parts: &[PromptPart]) -> Result<String, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let images: Vec<&ImagePayload> = parts
            .iter()
            .filter_map(|part| match part {
                PromptPart::Image(image) => Some(image),
                PromptPart::Text(_) => None,
            })
            .collect();
        self.images_seen.fetch_add(images.len(), Ordering::SeqCst);

        let reply = match images.as_slice() {
            [single] => self.replies.get(&single.data).unwrap_or(&self.default_reply),
            _ => &self.default_reply,
        };
        Ok(reply.clone())
    }
}

pub fn analyzer(images: Arc<FakeImages>, model: Arc<FakeModel>) -> ProductAnalyzer {
    ProductAnalyzer::new(images, model, Arc::new(FencedJsonExtractor))
}

pub fn urls(names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|name| format!("https://img.example.com/{name}"))
        .collect()
}
