//! Multi-column document composition (§4.6, supplemented from `original_source/`'s
//! `table_schema()`). A table has no required common column length; each column is
//! encoded/decoded independently of the others.

use bson::Document;

use crate::array::Array;
use crate::decoder;
use crate::encoder;
use crate::error::{DecodingError, EncodingError};

/// Encodes an ordered sequence of `(column name, Array)` pairs into a single document
/// keyed by column name, preserving insertion order.
pub fn encode_table<'a>(
    columns: impl IntoIterator<Item = (&'a str, &'a Array)>,
    compression_level: u32,
) -> Result<Document, EncodingError> {
    let mut doc = Document::new();
    for (name, array) in columns {
        let column_doc = encoder::encode(array, compression_level).map_err(|e| e.prefixed(name.to_string()))?;
        doc.insert(name, column_doc);
    }
    Ok(doc)
}

/// Decodes a table document, preserving the original column order. A decode failure in
/// one column is reported with that column's name prefixed onto the error path and
/// does not prevent the other columns from being reported on by the caller if it
/// chooses to decode them individually via [`decode_column`].
pub fn decode_table(doc: &Document) -> Result<Vec<(String, Array)>, DecodingError> {
    let mut columns = Vec::with_capacity(doc.len());
    for (name, value) in doc {
        let column_doc = value.as_document().ok_or_else(|| DecodingError::UnexpectedBsonType {
            path: crate::error::ErrorPath::root(name.clone()),
            expected: "document",
        })?;
        let array = decoder::decode(column_doc).map_err(|e| e.prefixed(name.clone()))?;
        columns.push((name.clone(), array));
    }
    Ok(columns)
}

/// Decodes a single named column out of a table document without requiring the others
/// to decode successfully first.
pub fn decode_column(doc: &Document, name: &str) -> Result<Array, DecodingError> {
    let column_doc = doc
        .get_document(name)
        .map_err(|_| DecodingError::MissingKey {
            path: crate::error::ErrorPath::new(),
            key: "column",
        })?;
    decoder::decode(column_doc).map_err(|e| e.prefixed(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitutil::{self, ValidityMode};
    use crate::schema::Schema;

    #[test]
    fn table_roundtrip_independent_lengths() {
        let x_validity = bitutil::make_validity(3, ValidityMode::AllValid);
        let x = Array::primitive(Schema::Int32, 3, x_validity, vec![0u8; 12]).unwrap();
        let y_validity = bitutil::make_validity(1, ValidityMode::AllValid);
        let y = Array::binary(Schema::Utf8, y_validity, vec![0, 2], b"ab".to_vec()).unwrap();

        let doc = encode_table([("x", &x), ("y", &y)], 0).unwrap();
        let decoded = decode_table(&doc).unwrap();

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].0, "x");
        assert_eq!(decoded[0].1, x);
        assert_eq!(decoded[1].0, "y");
        assert_eq!(decoded[1].1, y);
    }

    #[test]
    fn decode_column_does_not_require_other_columns_to_be_valid() {
        let x_validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let x = Array::primitive(Schema::Int32, 2, x_validity, vec![0u8; 8]).unwrap();
        let mut doc = encode_table([("x", &x)], 0).unwrap();
        doc.insert("broken", "not a column document");

        let decoded = decode_column(&doc, "x").unwrap();
        assert_eq!(decoded, x);
    }
}
