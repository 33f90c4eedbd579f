//! Provider Module
//!
//! Server side of the collector service: the collector table, the backend
//! registry, the admin token check and the worker pool, tied together by
//! [`Provider`].

pub mod auth;
pub mod endpoint;
pub mod metrics;
pub mod pool;
pub mod provider;
pub mod registry;
pub mod table;

pub use auth::*;
pub use endpoint::*;
pub use pool::*;
pub use provider::*;
pub use registry::*;
pub use table::*;
