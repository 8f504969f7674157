pub mod api;
pub mod app;
pub mod config;
pub mod models;
pub mod routes;
pub mod session;
pub mod ui;
pub mod validators;

// Re-export commonly used types
pub use api::{ApiClient, ApiError};
pub use app::App;
pub use config::Config;
pub use routes::{NavContext, Route, Router};
pub use session::SessionStore;
