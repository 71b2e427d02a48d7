//! Application layer managing request lifecycles and business workflows.
//!
//! This module coordinates between the domain layer and presentation layer:
//! resource controllers, status workflows, notifications and the composite
//! views built from them.

pub mod board;
pub mod expense;
pub mod notifications;
pub mod resource;
pub mod session;
pub mod state;
pub mod workflow;

pub use board::*;
pub use expense::*;
pub use notifications::*;
pub use resource::*;
pub use session::*;
pub use state::*;
pub use workflow::*;
