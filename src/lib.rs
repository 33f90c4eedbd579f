//! Collector Provider - Typed remote resources over RPC
//!
//! A provider process hosts named, dynamically instantiable "collector"
//! resources. Admins create, open, close, destroy and list them with a token;
//! clients reach them through reference-counted handles.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐
//! │   AdminClient    │   │ Client / Handle  │
//! └────────┬─────────┘   └────────┬─────────┘
//!          │   POST /v1/providers/{id}/{rpc}
//!          └───────────┬──────────┘
//! ┌────────────────────┴──────────────────────────────────────┐
//! │                 Endpoint (RpcRouter, axum)                 │
//! │              ProviderSet: provider id → Provider           │
//! ├────────────────────────────────────────────────────────────┤
//! │  Provider                                                  │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────┐  │
//! │  │  WorkerPool  │  │  CollectorTable  │  │  AdminToken  │  │
//! │  │ (semaphore)  │  │ (id → instance)  │  │              │  │
//! │  └──────────────┘  └──────────────────┘  └──────────────┘  │
//! │                ┌──────────────────────┐                    │
//! │                │   BackendRegistry    │                    │
//! │                │  name → backend      │                    │
//! │                └──────────────────────┘                    │
//! ├────────────────────────────────────────────────────────────┤
//! │                      Backends (dummy, ...)                 │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`provider`]: Provider, collector table, backend registry, worker pool
//! - [`api`]: Wire messages, RPC router and endpoint server
//! - [`client`]: Admin client, collector client and handles
//! - [`backends`]: Built-in backend implementations
//! - [`domain`]: Collector ids and backend traits
//! - [`config`]: Endpoint configuration files
//! - [`error`]: Error types and wire statuses

pub mod api;
pub mod backends;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod provider;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, RpcResponse, RpcRouter};

pub use backends::{BackendFactory, DummyBackend, DummyCollector, DUMMY_BACKEND_NAME};

pub use client::{AdminClient, Client, CollectorHandle, ProviderHandle, RpcTransport};

pub use config::ServerConfig;

pub use domain::ports::{
    CollectorBackend, CollectorBackendRef, CollectorId, CollectorInstance, CollectorInstanceRef,
};

pub use error::{Error, Result, RpcStatus};

pub use provider::{
    check_token, AdminToken, BackendRegistry, Collector, CollectorTable, Provider, ProviderConfig,
    ProviderSet, WorkerPool, DEFAULT_POOL_SIZE,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
