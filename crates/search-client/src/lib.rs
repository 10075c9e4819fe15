//! Client for the remote document-indexing service.
//!
//! This crate wraps the four operations the load generator needs from the
//! service: create an index, delete it, post a batch of documents, and count
//! the searchable documents that match a filter.
//!
//! The operations are expressed by the [`IndexService`] trait so that callers
//! can run against [`SearchClient`] (HTTP, via `reqwest`) or an in-memory
//! implementation in tests. The client performs exactly one round-trip per
//! call: it never retries and never caches. Retrying transient failures is
//! the caller's responsibility.
//!
//! # Example
//!
//! ```ignore
//! use search_client::{tag_filter, ClientConfig, IndexSchema, IndexService, SearchClient};
//!
//! let client = SearchClient::new(ClientConfig::new(
//!     "https://example.search.windows.net",
//!     "secret",
//!     "throughput",
//! ))?;
//! client.create_index(&IndexSchema::default()).await?;
//! let count = client.count_matching(&tag_filter("run-1")).await?;
//! ```

pub mod client;
pub mod document;
pub mod error;
pub mod schema;
pub mod service;

pub use client::{ClientConfig, SearchClient, DEFAULT_API_VERSION};
pub use document::{Batch, Document};
pub use error::{SchemaError, ServiceError, ServiceOperation};
pub use schema::{IndexField, IndexSchema};
pub use service::{tag_filter, IndexService};
