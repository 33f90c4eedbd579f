//! RPC API - Wire messages, router and endpoint server
//!
//! Providers are reached over HTTP with JSON bodies:
//! - `POST /v1/providers/{provider_id}/{rpc}` for every admin and collector RPC
//! - `GET /health` and `GET /metrics` for operators

pub mod messages;
pub mod rpc;
pub mod server;

pub use messages::*;
pub use rpc::RpcRouter;
pub use server::{ApiServer, ApiServerConfig};
