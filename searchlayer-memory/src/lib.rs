//! In-memory search backend for searchlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `SearchBackend` trait that speaks the search engine's request and response
//! shapes. It is intended for development and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Engine-shaped responses** - Get and search responses mirror the real engine
//! - **Query DSL subset** - `match_all`, `match`, `term` and `bool` queries
//! - **Shared indices** - Documents remember their type, so models can share an index
//!
//! # Quick Start
//!
//! ```ignore
//! use searchlayer::{prelude::*, memory::InMemorySearch};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = Connector::new(InMemorySearch::new(), ConnectorSettings::default());
//!     connector.define(ModelDefinition::new(
//!         "User",
//!         PropertySchema::new().field("name", FieldType::String),
//!     )).await;
//!
//!     let id = connector.create("User", json!({ "name": "Alice" })).await?;
//!     assert!(connector.exists("User", id).await?);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as searchlayer_memory;

pub mod store;
pub(crate) mod evaluator;

pub use store::{InMemorySearch, InMemorySearchBuilder, DEFAULT_SEARCH_SIZE};
