//! A columnar dataframe codec for a BSON-framed wire format.
//!
//! This crate implements the core of a dataframe serialisation system: a closed
//! logical type system ([`schema::Schema`]), an immutable columnar array model
//! ([`array::Array`]), and a type-directed encoder/decoder pair that round-trips
//! arrays through BSON documents with LZ4-compressed buffers.
//!
//! ```text
//! Array --[encoder::encode]--> bson::Document --[decoder::decode]--> Array
//! ```
//!
//! A document's shape can optionally be checked against a JSON-Schema generated from
//! its [`schema::Schema`] via [`validator`], independent of the decoder's own
//! structural checks. [`table`] composes multiple columns into one document.

pub mod array;
pub mod bitutil;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod schema;
pub mod table;
pub mod validator;

pub use array::Array;
pub use error::{CompressionError, DecodingError, EncodingError, SchemaError, ValidationError};
pub use schema::Schema;
