//! JSON RPC transport
//!
//! The client side ([`RpcDataSource`]) exposes a remote data source through
//! the local collection contract. The server side ([`RpcServer`]) resolves
//! the data source a request names and runs the call against it.

pub mod client;
pub mod protocol;
pub mod registry;
pub mod server;

pub use client::{RpcClient, RpcCollection, RpcDataSource};
pub use protocol::{Handshake, RpcMethod, RpcParams, RpcRequest};
pub use registry::{definition_key, DataSourceRegistry};
pub use server::RpcServer;
