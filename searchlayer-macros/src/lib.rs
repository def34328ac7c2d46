//! Procedural macros for the searchlayer project.
//!
//! Provides `#[derive(Model)]`, which describes a struct's properties to the
//! connector so that typed instances can be stored and read back.

#[allow(unused_extern_crates)]
extern crate self as searchlayer_macros;

use proc_macro::TokenStream;

mod model;

/// Derives `searchlayer::schema::Model` for a struct with named fields.
///
/// Container attributes:
/// - `#[model(name = "User")]` sets the model name (defaults to the struct name).
/// - `#[model(id = "uid")]` sets the id property (defaults to `"id"`).
///
/// Field attributes:
/// - `#[model(field_type = "string" | "number" | "array" | "other")]` overrides
///   the inferred property type.
///
/// Property names follow `#[serde(rename = "...")]` when present.
#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    model::derive_model(input.into()).into()
}
