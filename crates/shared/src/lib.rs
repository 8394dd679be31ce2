pub mod api_gateway;
pub mod auth;
pub mod config;
pub mod errors;
pub mod tracing;

pub use api_gateway::*;
pub use auth::*;
pub use config::*;
pub use errors::*;
pub use self::tracing::init_tracing;
