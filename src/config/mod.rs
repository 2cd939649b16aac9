use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Google Gemini API key. Image analysis is disabled when unset.
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Gemini model used for product image analysis
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Gemini REST endpoint root
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    /// Maximum accepted request body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Settings handed to the image analyzer at construction time.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn analysis(&self) -> AnalysisConfig {
        AnalysisConfig {
            api_key: self.gemini_api_key.clone(),
            model: self.gemini_model.clone(),
            base_url: self.gemini_base_url.clone(),
        }
    }
}

impl AnalysisConfig {
    /// Config pointing at the public Gemini endpoint with the default model.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
        }
    }
}
