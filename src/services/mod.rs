pub mod analyzer;
pub mod extraction;
pub mod gemini;
pub mod image_fetcher;
pub mod product_mapper;
pub mod prompt;
