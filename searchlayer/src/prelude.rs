//! Convenient re-exports of commonly used types from searchlayer.
//!
//! ```ignore
//! use searchlayer::prelude::*;
//! ```

pub use searchlayer_core::{
    backend::{SearchBackend, DynSearchBackend, SearchBackendBuilder},
    config::{Auth, ConfigBuilder, ConnectorSettings, SslSettings, TransportConfig},
    connector::{Connector, ModelHandle},
    criteria::{Criteria, CriteriaBuilder, WhereClause},
    coerce::FieldValue,
    mapper::ModelRecord,
    schema::{FieldType, Model, ModelDefinition, PropertySchema},
    error::{SearchLayerError, SearchLayerResult},
};

pub use searchlayer_macros::Model;
