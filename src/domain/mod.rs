pub mod models;
pub mod services;
pub mod errors;
pub mod status;
pub mod request;

pub use models::*;
pub use services::*;
pub use errors::*;
pub use status::*;
pub use request::*;
