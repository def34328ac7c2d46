//! A thin ORM-style data access layer over document search engines.
//!
//! This crate is the core of the searchlayer project and provides:
//!
//! - **Model schemas** ([`schema`]) - Declared field types and model definitions
//! - **Value coercion** ([`coerce`]) - Identifier and field type coercion
//! - **Document mapping** ([`mapper`]) - Raw documents to typed model records
//! - **Criteria** ([`criteria`]) - Native queries and equality `where` clauses
//! - **Query translation** ([`translator`]) - Criteria to backend query requests
//! - **Backend requests** ([`request`]) - Request and response types for backends
//! - **Backend abstraction** ([`backend`]) - Traits for implementing search backends
//! - **Connector** ([`connector`]) - CRUD and query operations for models
//! - **Configuration** ([`config`]) - Connector settings and transport configuration
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use searchlayer::{prelude::*, memory::InMemorySearch};
//!
//! let translator = FilterTranslator::new(TranslatorSettings::default());
//! let criteria = Criteria::builder().where_eq("name", "Bob").limit(10).build();
//! let request = translator.translate("User", Some(&criteria), criteria.limit, criteria.skip);
//!
//! assert_eq!(request.size, Some(10));
//! ```

#[allow(unused_extern_crates)]
extern crate self as searchlayer_core;

pub mod backend;
pub mod coerce;
pub mod config;
pub mod connector;
pub mod criteria;
pub mod error;
pub mod mapper;
pub mod request;
pub mod schema;
pub mod translator;
