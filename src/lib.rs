pub mod config;
pub mod error;
pub mod models;
pub mod openapi;
pub mod pages;
pub mod render;
pub mod repo;
pub mod routes;
pub mod sanitize;
pub mod security;
pub mod service;

// Re-export commonly used items for tests / binaries
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
pub use service::ThreadService;
