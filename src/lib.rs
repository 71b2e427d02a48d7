//! bizdesk - terminal console for a business-management API
//!
//! Tracks the lifecycle of every remote call a view makes, shows transient
//! notifications, and drives status changes for tasks, projects and expense
//! reports.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
pub use application::*;
