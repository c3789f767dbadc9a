//! API layer - HTTP endpoints

pub mod auth;
pub mod health;
pub mod profile;
pub mod router;
pub mod scan;
pub mod state;
pub mod types;
pub mod upload;

pub use router::create_router;
pub use state::AppState;
