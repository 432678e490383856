pub mod auth;
pub mod editor_handler;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod uploads;

// Re-export the handlers the binary needs to build the web server router.
pub use editor_handler::editor_handler;
pub use middleware::require_auth;
pub use rest::ApiDoc;
