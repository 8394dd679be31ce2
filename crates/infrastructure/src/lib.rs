pub mod dynamodb;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod todo_service;
pub mod viewer_service;

pub use dynamodb::*;
pub use memory::*;
pub use models::*;
pub use repositories::*;
pub use todo_service::*;
pub use viewer_service::*;
