//! Fashion catalog API
//!
//! Product and folder management over PostgreSQL, plus AI-assisted product
//! image analysis: image URLs are fetched, sent to a Gemini vision model,
//! and the structured reply is mapped onto catalog products.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
