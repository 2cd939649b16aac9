use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use garde::Validate;
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::models::product::ProductAttribute;
use crate::services::analyzer::AnalysisError;

/// Upper bound on images per analysis request.
pub const MAX_ANALYSIS_IMAGES: usize = 5;

static IMAGE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp)(\?.*)?$").expect("static regex")
});

static HTTP_IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://.+\.(jpg|jpeg|png|gif|webp)(\?.*)?$").expect("static regex")
});

/// True when the URL path ends in a supported image extension.
pub fn has_image_extension(url: &str) -> bool {
    IMAGE_EXTENSION.is_match(url)
}

/// True for absolute http(s) links to a supported image file.
pub fn is_http_image_url(url: &str) -> bool {
    HTTP_IMAGE_URL.is_match(url)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    /// One model call spanning every image.
    Combined,
    /// One model call per image.
    PerImage,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Combined => "combined",
            AnalysisMode::PerImage => "per_image",
        }
    }
}

/// A validated set of image URLs to analyze.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    image_urls: Vec<String>,
    mode: AnalysisMode,
}

impl AnalysisRequest {
    pub fn new(image_urls: Vec<String>, mode: AnalysisMode) -> Result<Self, AnalysisError> {
        if image_urls.is_empty() {
            return Err(AnalysisError::Validation(
                "imageUrls must contain at least one URL".to_string(),
            ));
        }
        if image_urls.len() > MAX_ANALYSIS_IMAGES {
            return Err(AnalysisError::Validation(format!(
                "Maximum {MAX_ANALYSIS_IMAGES} images allowed per analysis"
            )));
        }

        let invalid: Vec<&str> = image_urls
            .iter()
            .map(String::as_str)
            .filter(|url| !has_image_extension(url))
            .collect();
        if !invalid.is_empty() {
            return Err(AnalysisError::Validation(format!(
                "URLs must point to image files (jpg, jpeg, png, gif, webp): {}",
                invalid.join(", ")
            )));
        }

        Ok(Self { image_urls, mode })
    }

    pub fn image_urls(&self) -> &[String] {
        &self.image_urls
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }
}

fn validate_image_url(value: &str, _context: &()) -> garde::Result {
    if is_http_image_url(value) {
        Ok(())
    } else {
        Err(garde::Error::new(
            "must be an http(s) URL pointing to an image file (jpg, jpeg, png, gif, webp)",
        ))
    }
}

/// Body of `POST /products/analyze-images`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImagesRequest {
    #[garde(length(min = 1, max = 5), inner(custom(validate_image_url)))]
    pub image_urls: Vec<String>,

    #[garde(skip)]
    #[serde(default)]
    pub analyze_individually: bool,
}

impl AnalyzeImagesRequest {
    pub fn mode(&self) -> AnalysisMode {
        if self.analyze_individually {
            AnalysisMode::PerImage
        } else {
            AnalysisMode::Combined
        }
    }
}

/// Body of `POST /products/analyze-and-create`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeAndCreateRequest {
    #[garde(length(min = 1, max = 5), inner(custom(validate_image_url)))]
    pub image_urls: Vec<String>,

    #[garde(dive)]
    #[serde(default)]
    pub additional_data: ProductOverrides,
}

/// Tags as a list or as one comma-delimited string.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Delimited(String),
}

impl TagsInput {
    pub fn into_tags(self) -> Vec<String> {
        match self {
            TagsInput::List(tags) => tags
                .into_iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
            TagsInput::Delimited(joined) => split_tags(&joined),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            TagsInput::List(tags) => tags.iter().all(|tag| tag.trim().is_empty()),
            TagsInput::Delimited(joined) => joined.trim().is_empty(),
        }
    }
}

/// Split a comma-delimited tag string, trimming and dropping empty pieces.
pub fn split_tags(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Caller-supplied values that win over AI-derived fields.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductOverrides {
    #[garde(skip)]
    pub name: Option<String>,
    #[garde(skip)]
    pub product_type: Option<String>,
    #[garde(skip)]
    pub category: Option<String>,
    #[garde(skip)]
    pub subcategory: Option<String>,
    #[garde(skip)]
    pub gender: Option<String>,
    #[garde(skip)]
    pub target_age_group: Option<String>,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(skip)]
    pub tags: Option<TagsInput>,
    #[garde(skip)]
    pub brand: Option<String>,
    #[garde(skip)]
    pub collection: Option<String>,
    #[garde(skip)]
    pub colors: Option<Vec<String>>,
    #[garde(skip)]
    pub sizes: Option<Vec<String>>,
    #[garde(skip)]
    pub attributes: Option<Vec<ProductAttribute>>,
    #[garde(range(min = 0.0))]
    pub price: Option<f64>,
    #[garde(range(min = 0))]
    pub stock: Option<i32>,
}

impl ProductOverrides {
    /// Overrides whose tag input is blank count as absent.
    pub fn tags(&self) -> Option<&TagsInput> {
        self.tags.as_ref().filter(|tags| !tags.is_empty())
    }
}

/// Image bytes ready for inline submission to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    /// Base64 (standard alphabet) encoded image content.
    pub data: String,
    pub mime_type: String,
}

/// Parsed JSON returned by the model. Expected to be an object keyed by
/// catalog table name, but no shape is enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredRecord(pub Value);

impl StructuredRecord {
    /// Entries listed under a top-level category, empty when missing.
    pub fn entries(&self, category: &str) -> &[Value] {
        self.0
            .get(category)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first_str(&self, category: &str, field: &str) -> Option<&str> {
        self.entries(category)
            .iter()
            .filter_map(|entry| entry.get(field).and_then(Value::as_str))
            .find(|value| !value.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub image_count: usize,
    pub model_used: String,
    pub analysis_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadata {
    pub image_count: usize,
    pub successful_analyses: usize,
    pub failed_analyses: usize,
    pub model_used: String,
    pub analysis_timestamp: DateTime<Utc>,
}

/// Result of a single model call spanning every image.
#[derive(Debug, Clone, Serialize)]
pub struct CombinedAnalysis {
    pub analysis: StructuredRecord,
    pub metadata: AnalysisMetadata,
}

/// Result for one image in per-image mode.
#[derive(Debug)]
pub struct ImageAnalysisOutcome {
    pub image_url: String,
    pub image_index: usize,
    pub result: Result<StructuredRecord, AnalysisError>,
}

impl ImageAnalysisOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

impl Serialize for ImageAnalysisOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ImageAnalysisOutcome", 4)?;
        state.serialize_field("imageUrl", &self.image_url)?;
        state.serialize_field("imageIndex", &self.image_index)?;
        match &self.result {
            Ok(record) => state.serialize_field("analysis", record)?,
            Err(e) => state.serialize_field("error", &e.to_string())?,
        }
        state.serialize_field("success", &self.is_success())?;
        state.end()
    }
}

/// Ordered per-image outcomes plus summary counts.
#[derive(Debug, Serialize)]
pub struct BatchAnalysis {
    pub analyses: Vec<ImageAnalysisOutcome>,
    pub metadata: BatchMetadata,
}

impl BatchAnalysis {
    pub fn succeeded(&self) -> usize {
        self.metadata.successful_analyses
    }

    pub fn failed(&self) -> usize {
        self.metadata.failed_analyses
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Combined(CombinedAnalysis),
    PerImage(BatchAnalysis),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extension_pattern() {
        assert!(has_image_extension("a.jpg"));
        assert!(has_image_extension("https://cdn.example.com/x/shoe.WEBP?w=800"));
        assert!(!has_image_extension("https://cdn.example.com/x/shoe.pdf"));
        assert!(!has_image_extension("https://cdn.example.com/jpg"));
    }

    #[test]
    fn test_http_image_url_requires_scheme() {
        assert!(is_http_image_url("http://example.com/a.png"));
        assert!(!is_http_image_url("ftp://example.com/a.png"));
        assert!(!is_http_image_url("a.png"));
    }

    #[test]
    fn test_request_rejects_empty_and_oversized() {
        assert!(matches!(
            AnalysisRequest::new(vec![], AnalysisMode::Combined),
            Err(AnalysisError::Validation(_))
        ));
        let six = urls(&["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg", "6.jpg"]);
        assert!(matches!(
            AnalysisRequest::new(six, AnalysisMode::PerImage),
            Err(AnalysisError::Validation(_))
        ));
    }

    #[test]
    fn test_request_names_non_image_urls() {
        let err = AnalysisRequest::new(urls(&["a.jpg", "notes.txt"]), AnalysisMode::Combined)
            .unwrap_err();
        assert!(err.to_string().contains("notes.txt"));
    }

    #[test]
    fn test_analyze_request_dto_validation() {
        let ok: AnalyzeImagesRequest = serde_json::from_value(json!({
            "imageUrls": ["https://img.example.com/a.jpg"],
            "analyzeIndividually": true
        }))
        .unwrap();
        assert!(ok.validate().is_ok());
        assert_eq!(ok.mode(), AnalysisMode::PerImage);

        let bad: AnalyzeImagesRequest = serde_json::from_value(json!({
            "imageUrls": ["https://img.example.com/a.svg"]
        }))
        .unwrap();
        assert!(bad.validate().is_err());
        assert_eq!(bad.mode(), AnalysisMode::Combined);
    }

    #[test]
    fn test_tags_input_accepts_string_or_list() {
        let delimited: TagsInput = serde_json::from_value(json!(" a, b ,,c ")).unwrap();
        assert_eq!(delimited.into_tags(), vec!["a", "b", "c"]);
        let list: TagsInput = serde_json::from_value(json!(["x ", ""])).unwrap();
        assert_eq!(list.into_tags(), vec!["x"]);
    }

    #[test]
    fn test_record_first_str_skips_blank_entries() {
        let record = StructuredRecord(json!({
            "products": [
                {"name": "", "confidence_score": 0.2},
                {"category": "Clothing"},
                {"name": "Denim Jacket"}
            ]
        }));
        assert_eq!(record.first_str("products", "name"), Some("Denim Jacket"));
        assert_eq!(record.first_str("products", "gender"), None);
        assert!(record.entries("brands").is_empty());
    }

    #[test]
    fn test_outcome_serialization_shape() {
        let outcome = ImageAnalysisOutcome {
            image_url: "b.png".to_string(),
            image_index: 1,
            result: Err(AnalysisError::Fetch {
                url: "b.png".to_string(),
                reason: "status 404".to_string(),
            }),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["imageIndex"], json!(1));
        assert_eq!(value["success"], json!(false));
        assert!(value["error"].as_str().unwrap().contains("b.png"));
        assert!(value.get("analysis").is_none());
    }
}
