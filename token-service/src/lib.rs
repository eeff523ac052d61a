pub mod app;
pub mod auth_handlers;
pub mod config;
pub mod cookies;
pub mod error;
pub mod metrics;
pub mod oidc;
pub mod pages;
pub mod policy;
pub mod verify_handlers;

pub use app::{router, AppState};
