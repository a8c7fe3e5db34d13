//! # Streamgate Core
//!
//! Domain types, traits, and error definitions for the Streamgate streaming
//! inference gateway. This crate has **no HTTP dependencies**: it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is defined as a trait here. Implementations live in their
//! respective crates:
//! - [`Adapter`] / [`CacheRenewer`]: upstream model providers (`streamgate-providers`)
//! - [`TenantStore`]: the configuration store (`streamgate-config`)
//!
//! Tests in the leaf crates swap in mock implementations of these traits.

pub mod error;
pub mod event;
pub mod greeting;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ErrorKind, ProviderError, Result, StoreError};
pub use event::{ExtractedAnswer, StreamContent, StreamEvent};
pub use greeting::{is_greeting, normalize};
pub use provider::{
    Adapter, CacheRenewer, ProviderKind, ProviderParams, TenantProviderConfig, TokenStream,
};
pub use store::TenantStore;
