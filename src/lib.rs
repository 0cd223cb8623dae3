pub mod api;
pub mod cli;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod models;
pub mod projection;
pub mod rag;


pub use config::AppConfig;
pub use errors::*;
