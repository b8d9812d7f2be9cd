//! Error types surfaced across schema decoding, array construction, encoding, decoding,
//! compression and JSON-Schema validation.
//!
//! Every error variant that can occur anywhere inside a recursive traversal (schema
//! decoding, array encoding/decoding) carries an [`ErrorPath`] naming the array/field
//! path the failure happened at, e.g. `struct.f[measurements].list.values.int64`. Callers
//! that catch an error one level up call [`ErrorPath::prefixed`] (via the error's own
//! `prefixed` method) to extend the path before returning it further up the recursion.

use std::fmt;

use thiserror::Error;

/// A breadcrumb of array/field segments an error occurred at, closest-to-root first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPath(Vec<String>);

impl ErrorPath {
    pub fn new() -> Self {
        ErrorPath(Vec::new())
    }

    pub fn root(segment: impl Into<String>) -> Self {
        ErrorPath(vec![segment.into()])
    }

    /// Returns a copy of this path with `segment` pushed in front (closer to the root).
    pub(crate) fn prefixed(&self, segment: impl Into<String>) -> Self {
        let mut segments = vec![segment.into()];
        segments.extend(self.0.iter().cloned());
        ErrorPath(segments)
    }

    pub(crate) fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ErrorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0.join("."))
        }
    }
}

/// Errors raised while decoding a type descriptor into a [`crate::schema::Schema`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{path}: unknown schema tag {tag:?}")]
    UnknownTag { path: ErrorPath, tag: String },

    #[error("{path}: malformed descriptor: {reason}")]
    MalformedDescriptor { path: ErrorPath, reason: String },

    #[error("{path}: unsupported parameter for {tag}: {reason}")]
    UnsupportedParameter {
        path: ErrorPath,
        tag: String,
        reason: String,
    },
}

impl SchemaError {
    pub(crate) fn prefixed(self, segment: impl Into<String>) -> Self {
        match self {
            SchemaError::UnknownTag { path, tag } => SchemaError::UnknownTag {
                path: path.prefixed(segment),
                tag,
            },
            SchemaError::MalformedDescriptor { path, reason } => SchemaError::MalformedDescriptor {
                path: path.prefixed(segment),
                reason,
            },
            SchemaError::UnsupportedParameter { path, tag, reason } => {
                SchemaError::UnsupportedParameter {
                    path: path.prefixed(segment),
                    tag,
                    reason,
                }
            }
        }
    }
}

/// Errors raised while compressing or decompressing an LZ4 block frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompressionError {
    #[error("LZ4 block frame is truncated: expected at least {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("LZ4 block frame is corrupt: {0}")]
    Corrupt(String),
}

/// Errors raised while encoding an [`crate::array::Array`] into a wire document.
///
/// These surface array invariants that a caller violated when constructing an `Array`
/// by hand, rather than something the encoder itself miscomputed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("{path}: counts sum to {sum} but the values buffer has length {values_len}")]
    CountsMismatch {
        path: ErrorPath,
        sum: i64,
        values_len: usize,
    },

    #[error("{path}: struct field {field:?} has length {actual}, expected parent length {expected}")]
    ChildLengthMismatch {
        path: ErrorPath,
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("{path}: dictionary index length {index_len} differs from array length {array_len}")]
    DictionaryLengthMismatch {
        path: ErrorPath,
        index_len: usize,
        array_len: usize,
    },

    #[error("{path}: dictionary index schema must be a signed integer type, found {found}")]
    NonIntegerDictionaryIndex { path: ErrorPath, found: String },

    #[error("{path}: utf8 array values are not valid UTF-8")]
    InvalidUtf8 { path: ErrorPath },

    #[error("{path}: slice [{begin}, {end}) is out of bounds for an array of length {length}")]
    SliceOutOfBounds {
        path: ErrorPath,
        begin: usize,
        end: usize,
        length: usize,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Compression(#[from] CompressionError),
}

impl EncodingError {
    pub(crate) fn prefixed(self, segment: impl Into<String>) -> Self {
        match self {
            EncodingError::CountsMismatch { path, sum, values_len } => EncodingError::CountsMismatch {
                path: path.prefixed(segment),
                sum,
                values_len,
            },
            EncodingError::ChildLengthMismatch {
                path,
                field,
                expected,
                actual,
            } => EncodingError::ChildLengthMismatch {
                path: path.prefixed(segment),
                field,
                expected,
                actual,
            },
            EncodingError::DictionaryLengthMismatch {
                path,
                index_len,
                array_len,
            } => EncodingError::DictionaryLengthMismatch {
                path: path.prefixed(segment),
                index_len,
                array_len,
            },
            EncodingError::NonIntegerDictionaryIndex { path, found } => {
                EncodingError::NonIntegerDictionaryIndex {
                    path: path.prefixed(segment),
                    found,
                }
            }
            EncodingError::InvalidUtf8 { path } => EncodingError::InvalidUtf8 {
                path: path.prefixed(segment),
            },
            EncodingError::SliceOutOfBounds { path, begin, end, length } => EncodingError::SliceOutOfBounds {
                path: path.prefixed(segment),
                begin,
                end,
                length,
            },
            EncodingError::Schema(e) => EncodingError::Schema(e.prefixed(segment)),
            other @ EncodingError::Compression(_) => other,
        }
    }
}

/// Errors raised while decoding a wire document into an [`crate::array::Array`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodingError {
    #[error("{path}: missing required key {key:?}")]
    MissingKey { path: ErrorPath, key: &'static str },

    #[error("{path}: expected type tag {expected:?}, found {found:?}")]
    TagMismatch {
        path: ErrorPath,
        expected: String,
        found: String,
    },

    #[error("{path}: length mismatch: expected {expected}, found {actual}")]
    LengthMismatch {
        path: ErrorPath,
        expected: usize,
        actual: usize,
    },

    #[error("{path}: decompressed buffer of {len} bytes is not a multiple of byte width {byte_width}")]
    MisalignedBuffer {
        path: ErrorPath,
        len: usize,
        byte_width: usize,
    },

    #[error("{path}: value is not valid UTF-8")]
    InvalidUtf8 { path: ErrorPath },

    #[error("{path}: unexpected BSON value, expected {expected}")]
    UnexpectedBsonType { path: ErrorPath, expected: &'static str },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Compression(#[from] CompressionError),
}

impl DecodingError {
    pub(crate) fn prefixed(self, segment: impl Into<String>) -> Self {
        match self {
            DecodingError::MissingKey { path, key } => DecodingError::MissingKey {
                path: path.prefixed(segment),
                key,
            },
            DecodingError::TagMismatch { path, expected, found } => DecodingError::TagMismatch {
                path: path.prefixed(segment),
                expected,
                found,
            },
            DecodingError::LengthMismatch { path, expected, actual } => DecodingError::LengthMismatch {
                path: path.prefixed(segment),
                expected,
                actual,
            },
            DecodingError::MisalignedBuffer { path, len, byte_width } => DecodingError::MisalignedBuffer {
                path: path.prefixed(segment),
                len,
                byte_width,
            },
            DecodingError::InvalidUtf8 { path } => DecodingError::InvalidUtf8 {
                path: path.prefixed(segment),
            },
            DecodingError::UnexpectedBsonType { path, expected } => DecodingError::UnexpectedBsonType {
                path: path.prefixed(segment),
                expected,
            },
            DecodingError::Schema(e) => DecodingError::Schema(e.prefixed(segment)),
            other @ DecodingError::Compression(_) => other,
        }
    }
}

/// Errors raised by the optional JSON-Schema conformance validator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("failed to compile generated JSON-Schema: {0}")]
    SchemaCompile(String),

    #[error("document does not conform to schema: {0}")]
    Conformance(String),

    #[error("failed to produce canonical-JSON projection: {0}")]
    Canonicalize(String),
}
