//! Typed RPC plumbing.
//!
//! Calls are described by an `RpcRequest` (endpoint, `RpcMethod`, JSON
//! payload, streaming flag, metadata) and flow through a `Pipeline` of
//! `Interceptor`s before reaching a `Transport`.

pub mod error;
pub mod method;
pub mod pipeline;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Code, RpcError, RpcResult};
pub use method::{MethodKind, RpcMethod};
pub use pipeline::{Interceptor, Next, Pipeline, Transport};
pub use request::RpcRequest;
pub use transport::HttpTransport;
