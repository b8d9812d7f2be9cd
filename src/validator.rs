//! The optional JSON-Schema conformance check over a document's canonical-JSON
//! projection (§4.5). Pure: it never interprets array payloads semantically, only
//! checks document shape, and is never required for decoding to succeed — the
//! decoder's own structural checks (§4.4) are the sole line of defence when a
//! validator is not run.

use bson::Document;
use jsonschema::Validator;

use crate::error::ValidationError;
use crate::schema::Schema;

/// A [`Schema`]'s JSON-Schema, compiled once so repeated `validate` calls don't
/// re-parse it.
pub struct CompiledSchema {
    validator: Validator,
}

impl CompiledSchema {
    /// Compiles `schema.json_schema()` into a reusable [`jsonschema::Validator`].
    pub fn compile(schema: &Schema) -> Result<Self, ValidationError> {
        let document = schema.json_schema();
        let validator = jsonschema::validator_for(&document).map_err(|e| ValidationError::SchemaCompile(e.to_string()))?;
        Ok(CompiledSchema { validator })
    }

    /// Converts `doc` to its canonical-JSON (extended JSON, canonical mode) projection
    /// and asserts it against the compiled schema.
    pub fn validate(&self, doc: &Document) -> Result<(), ValidationError> {
        let canonical = to_canonical_json(doc)?;
        let mut errors = self.validator.iter_errors(&canonical).peekable();
        if errors.peek().is_none() {
            return Ok(());
        }
        let message = errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
        Err(ValidationError::Conformance(message))
    }
}

/// Converts a BSON document to its canonical extended-JSON projection (§4.5, §6
/// "Canonical JSON" in the glossary).
pub fn to_canonical_json(doc: &Document) -> Result<serde_json::Value, ValidationError> {
    let text = bson::Bson::Document(doc.clone()).into_canonical_extjson();
    Ok(text)
}

/// Convenience wrapper: compile `schema`'s JSON-Schema and validate `doc` against it in
/// one call. Prefer [`CompiledSchema::compile`] directly when validating many documents
/// of the same schema.
pub fn validate(schema: &Schema, doc: &Document) -> Result<(), ValidationError> {
    CompiledSchema::compile(schema)?.validate(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::bitutil::{self, ValidityMode};
    use crate::encoder::encode;

    #[test]
    fn valid_document_passes() {
        let validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let array = Array::primitive(Schema::Int32, 2, validity, vec![1, 0, 0, 0, 2, 0, 0, 0]).unwrap();
        let doc = encode(&array, 0).unwrap();
        assert!(validate(&Schema::Int32, &doc).is_ok());
    }

    #[test]
    fn wrong_type_tag_is_rejected() {
        let validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let array = Array::primitive(Schema::Int32, 2, validity, vec![1, 0, 0, 0, 2, 0, 0, 0]).unwrap();
        let doc = encode(&array, 0).unwrap();
        let err = validate(&Schema::Int64, &doc).unwrap_err();
        assert!(matches!(err, ValidationError::Conformance(_)));
    }

    #[test]
    fn missing_required_key_is_rejected() {
        let mut doc = Document::new();
        doc.insert("t", "int32");
        let err = validate(&Schema::Int32, &doc).unwrap_err();
        assert!(matches!(err, ValidationError::Conformance(_)));
    }
}
