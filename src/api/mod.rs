//! JSON API over the record store and the analysis pipeline

pub mod handlers;
pub mod routes;
pub mod server;
pub mod session;
pub mod types;

pub use server::build_app;
pub use server::serve_api;
pub use session::SearchCache;
