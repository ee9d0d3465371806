//! Numeric-array codec for structured-text exports.
//!
//! Arrays are written as `{"__nparray__": true, "__npdata__": [...]}` with
//! shape carried by list nesting. Values without the marker key are left
//! alone when decoding.

mod array;
pub mod tagged;

pub use array::{decode, decode_tree, encode_float, encode_int, Decoded, DecodedTree, NumericArray};

/// Marker key identifying a tagged array
pub const ARRAY_MARKER: &str = "__nparray__";

/// Key holding the nested element lists
pub const ARRAY_DATA: &str = "__npdata__";
