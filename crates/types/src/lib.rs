//! Shared data model for actionkit crates.
//!
//! - [`field`]: declarative field definitions authored by destinations
//! - [`schema`]: the structural schema the engine compiles fields into
//! - [`http`]: transport-neutral request/response descriptors and call options
//! - [`autocomplete`]: responses produced by dynamic field resolvers

pub mod autocomplete;
pub mod field;
pub mod http;
pub mod schema;

pub use autocomplete::{AutocompleteItem, AutocompletePagination, AutocompleteResponse};
pub use field::{FieldChoice, FieldDefinition, FieldDefinitions, FieldType};
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse, RequestOptions};
pub use schema::{JsonSchema, SCHEMA_DIALECT, SchemaType, SchemaTypes};
