//! Upstream LLM provider adapters for Streamgate.
//!
//! Both adapters implement the `streamgate_core::Adapter` trait; the chat
//! adapter also implements `CacheRenewer`. The router picks an adapter by
//! the tenant's provider family.

pub mod chat;
pub mod completion;
pub mod router;
pub mod sse;

pub use chat::ChatAdapter;
pub use completion::CompletionAdapter;
pub use router::{ProviderSet, Providers, build_from_config};
