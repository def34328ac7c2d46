//! Main searchlayer crate: an ORM-style data access layer over search engines.
//!
//! This crate is the primary entry point. It re-exports the core types from the
//! sub-crates, the `Model` derive macro, and the available search backends.
//!
//! # Features
//!
//! - **Model definitions** - Declare properties once, by hand or with `#[derive(Model)]`
//! - **Lossy-but-total mapping** - Raw documents are coerced to their declared field types
//! - **Filter objects** - `where`/`limit`/`skip` criteria become search queries
//! - **Multiple backends** - In-memory for tests, Elasticsearch behind the `elasticsearch` feature
//!
//! # Quick Start
//!
//! ```ignore
//! use searchlayer::{prelude::*, memory::InMemorySearch};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Model)]
//! pub struct User {
//!     pub id: Option<String>,
//!     pub name: Option<String>,
//!     pub tags: Option<Vec<String>>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = Connector::new(
//!         InMemorySearch::builder().build().await?,
//!         ConnectorSettings::default(),
//!     );
//!     connector.define_model::<User>().await;
//!     connector.connect().await?;
//!
//!     let users = connector.model::<User>();
//!     let id = users.create(&User { id: None, name: Some("Alice".into()), tags: None }).await?;
//!
//!     let alice = users.find(id).await?;
//!     println!("Found: {:?}", alice);
//!
//!     let admins = users
//!         .all(Some(&Criteria::builder().where_eq("name", "Alice").limit(10).build()))
//!         .await?;
//!     println!("Matching: {:?}", admins);
//!
//!     connector.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! A connector over a concrete backend can be turned into one over a boxed
//! [`DynSearchBackend`](backend::DynSearchBackend) with `into_dyn`, which lets
//! the backend be chosen at runtime:
//!
//! ```ignore
//! use searchlayer::{prelude::*, memory::InMemorySearch};
//!
//! let connector: Connector<Box<dyn DynSearchBackend>> =
//!     Connector::new(InMemorySearch::new(), ConnectorSettings::default()).into_dyn();
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory search for development and testing
//! - `elasticsearch` - Elasticsearch backend (requires `elasticsearch` feature)

#[allow(unused_extern_crates)]
extern crate self as searchlayer;

pub mod prelude;

pub use searchlayer_core::{
    backend, coerce, config, connector, criteria, error, mapper, request, schema, translator,
};

pub use searchlayer_macros::Model;

// Re-export serde_json for building documents and where clauses
pub use serde_json;

/// In-memory search backend implementations.
pub mod memory {
    pub use searchlayer_memory::{InMemorySearch, InMemorySearchBuilder};
}

/// Elasticsearch search backend implementations.
///
/// This module is only available when the `elasticsearch` feature is enabled.
#[cfg(feature = "elasticsearch")]
pub mod elasticsearch {
    pub use searchlayer_elasticsearch::{ElasticsearchSearch, ElasticsearchSearchBuilder, TYPE_FIELD};
}
