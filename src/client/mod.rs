//! Client side - Admin client, collector client and handles

pub mod admin;
pub mod client;
pub mod handle;
pub mod transport;

pub use admin::AdminClient;
pub use client::Client;
pub use handle::CollectorHandle;
pub use transport::{ProviderHandle, RpcTransport, DEFAULT_TIMEOUT_MS};
