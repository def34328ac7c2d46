//! Elasticsearch backend for searchlayer.
//!
//! Implements `SearchBackend` over the official `elasticsearch` client. Build
//! it from a `TransportConfig` resolved by `ConfigBuilder`:
//!
//! ```ignore
//! use searchlayer::prelude::*;
//! use searchlayer::elasticsearch::ElasticsearchSearchBuilder;
//!
//! let settings = ConnectorSettings::from_json(serde_json::json!({
//!     "hosts": ["localhost:9200"],
//!     "index": "shop",
//! }))?;
//! let backend = ElasticsearchSearchBuilder::new(ConfigBuilder::build(&settings)?)
//!     .build()
//!     .await?;
//! let connector = Connector::new(backend, settings);
//! ```

#[allow(unused_extern_crates)]
extern crate self as searchlayer_elasticsearch;

pub mod scope;
pub mod store;

pub use scope::TYPE_FIELD;
pub use store::{ElasticsearchSearch, ElasticsearchSearchBuilder};
