//! The type-directed visitor that serialises an [`Array`] into a BSON wire document
//! (§4.3). Dispatch is a single `match` over [`Schema`]/[`Array`] variants rather than
//! a visitor-class hierarchy, per the re-architecture notes.

use bson::{Bson, Document};

use crate::array::Array;
use crate::bitutil::{self, lz4};
use crate::error::{EncodingError, ErrorPath};
use crate::schema::{self, Schema};

/// Encodes `array` into a wire document at the given LZ4 `compression_level` (§4.1 —
/// `level=0` selects the default mode; `lz4_flex` does not currently distinguish
/// higher levels, see DESIGN.md). Field order is always `d, m, t, [p], [o]`.
pub fn encode(array: &Array, compression_level: u32) -> Result<Document, EncodingError> {
    encode_at(array, compression_level, &ErrorPath::new())
}

fn compress_binary(data: &[u8], level: u32) -> Bson {
    Bson::Binary(bson::Binary {
        subtype: bson::spec::BinarySubtype::Generic,
        bytes: lz4::compress(data, level),
    })
}

fn counts_to_bytes(counts: &[i32]) -> Vec<u8> {
    counts.iter().flat_map(|c| c.to_le_bytes()).collect()
}

fn delta_encode_bytes(data: &[u8], byte_width: usize) -> Vec<u8> {
    match byte_width {
        4 => {
            let values: Vec<i32> = data
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
                .collect();
            bitutil::delta_encode(&values).iter().flat_map(|v| v.to_le_bytes()).collect()
        }
        8 => {
            let values: Vec<i64> = data
                .chunks_exact(8)
                .map(|c| i64::from_le_bytes(c.try_into().unwrap()))
                .collect();
            bitutil::delta_encode(&values).iter().flat_map(|v| v.to_le_bytes()).collect()
        }
        _ => data.to_vec(),
    }
}

fn prepare_primitive_bytes(schema: &Schema, data: &[u8]) -> Vec<u8> {
    match schema {
        Schema::Bool => bitutil::pack_bits(&data.iter().map(|&b| b != 0).collect::<Vec<_>>()),
        Schema::Date { .. } | Schema::Timestamp { .. } => {
            delta_encode_bytes(data, schema.byte_width().unwrap_or(data.len()))
        }
        _ => data.to_vec(),
    }
}

fn encode_at(array: &Array, level: u32, path: &ErrorPath) -> Result<Document, EncodingError> {
    let schema = array.schema();
    tracing::trace!(tag = %schema.name(), length = array.length(), "encoding array");

    let mut doc = Document::new();

    match array {
        Array::Null { length, validity } => {
            doc.insert(schema::KEY_DATA, *length as i64);
            doc.insert(schema::KEY_MASK, compress_binary(validity, level));
        }
        Array::Primitive { array: p, .. } => {
            let prepared = prepare_primitive_bytes(&schema, &p.data);
            doc.insert(schema::KEY_DATA, compress_binary(&prepared, level));
            doc.insert(schema::KEY_MASK, compress_binary(&p.validity, level));
        }
        Array::Binary { array: b, .. } => {
            doc.insert(schema::KEY_DATA, compress_binary(&b.values, level));
            doc.insert(schema::KEY_MASK, compress_binary(&b.validity, level));
        }
        Array::List { array: l, .. } => {
            let child = encode_at(&l.values, level, &path.prefixed("list.values"))?;
            doc.insert(schema::KEY_DATA, child);
            doc.insert(schema::KEY_MASK, compress_binary(&l.validity, level));
        }
        Array::Dictionary { array: d, .. } => {
            let index_doc = encode_at(&d.index, level, &path.prefixed("dictionary.index"))?;
            let value_doc = encode_at(&d.value, level, &path.prefixed("dictionary.value"))?;
            let mut inner = Document::new();
            inner.insert(schema::KEY_INDEX, index_doc);
            inner.insert(schema::KEY_DATA, value_doc);
            doc.insert(schema::KEY_DATA, inner);
            doc.insert(schema::KEY_MASK, compress_binary(d.index.validity(), level));
        }
        Array::Struct { array: s, .. } => {
            let mut fields_doc = Document::new();
            for (name, field) in &s.fields {
                let field_doc = encode_at(field, level, &path.prefixed(format!("struct.f[{name}]")))?;
                fields_doc.insert(name.clone(), field_doc);
            }
            let mut inner = Document::new();
            inner.insert(schema::KEY_LENGTH, s.length as i64);
            inner.insert(schema::KEY_FIELDS, fields_doc);
            doc.insert(schema::KEY_DATA, inner);
            doc.insert(schema::KEY_MASK, compress_binary(&s.validity, level));
        }
    }

    let descriptor = schema.encode_descriptor();
    doc.insert(schema::KEY_TYPE, descriptor.get_str(schema::KEY_TYPE).unwrap().to_string());
    if let Ok(param) = descriptor.get_document(schema::KEY_PARAM) {
        doc.insert(schema::KEY_PARAM, param.clone());
    } else if let Some(param) = descriptor.get(schema::KEY_PARAM) {
        doc.insert(schema::KEY_PARAM, param.clone());
    }

    match array {
        Array::Binary { array: b, .. } => {
            doc.insert(schema::KEY_COUNTS, compress_binary(&counts_to_bytes(&b.counts), level));
        }
        Array::List { array: l, .. } => {
            doc.insert(schema::KEY_COUNTS, compress_binary(&counts_to_bytes(&l.counts), level));
        }
        _ => {}
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitutil::ValidityMode;

    #[test]
    fn encode_key_order_is_d_m_t_o() {
        let validity = bitutil::make_validity(1, ValidityMode::AllValid);
        let array = Array::binary(Schema::Utf8, validity, vec![0, 1], b"x".to_vec()).unwrap();
        let doc = encode(&array, 0).unwrap();
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["d", "m", "t", "o"]);
    }

    #[test]
    fn null_array_emits_length_as_data() {
        let validity = bitutil::make_validity(3, ValidityMode::AllValid);
        let array = Array::null(3, validity).unwrap();
        let doc = encode(&array, 0).unwrap();
        assert_eq!(doc.get_i64("d").unwrap(), 3);
        assert_eq!(doc.get_str("t").unwrap(), "null");
    }

    #[test]
    fn opaque_descriptor_param_is_embedded() {
        let schema = Schema::opaque(4).unwrap();
        let validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let array = Array::primitive(schema, 2, validity, vec![0u8; 8]).unwrap();
        let doc = encode(&array, 0).unwrap();
        assert_eq!(doc.get_i64("p").unwrap(), 4);
    }

    #[test]
    fn struct_encodes_fields_in_order() {
        let validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let x_validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let x = Array::primitive(Schema::Int32, 2, x_validity, vec![0u8; 8]).unwrap();
        let y_validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let y = Array::binary(Schema::Utf8, y_validity, vec![0, 1, 2], b"ab".to_vec()).unwrap();
        let array = Array::struct_(2, validity, vec![("x".to_string(), x), ("y".to_string(), y)]).unwrap();
        let doc = encode(&array, 0).unwrap();
        let inner = doc.get_document("d").unwrap();
        let fields = inner.get_document("f").unwrap();
        let field_names: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(field_names, vec!["x", "y"]);
    }
}
