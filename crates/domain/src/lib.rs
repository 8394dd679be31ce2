pub mod caller;
pub mod clock;
pub mod errors;
pub mod filter;
pub mod todo;
pub mod user;

pub use caller::*;
pub use clock::*;
pub use errors::*;
pub use filter::*;
pub use todo::*;
pub use user::*;
