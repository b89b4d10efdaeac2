pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod state;

pub use api::{create_app, create_router};
pub use error::ServerError;
pub use state::AppState;
