//! The type-directed visitor that reconstructs an [`Array`] from a BSON wire document
//! (§4.4). Mirrors [`crate::encoder`] exactly, variant for variant.

use bson::Document;

use crate::array::{Array, BinaryArray, DictionaryArray, ListArray, PrimitiveArray, StructArray};
use crate::bitutil::{self, lz4};
use crate::error::{DecodingError, ErrorPath};
use crate::schema::{self, decode_descriptor, Schema};

/// Decodes a wire document produced by [`crate::encoder::encode`] back into an
/// [`Array`]. Internally re-derives the [`Schema`] from the document's own descriptor
/// keys (`t`, `p`) before dispatching.
pub fn decode(doc: &Document) -> Result<Array, DecodingError> {
    decode_at(doc, &ErrorPath::new())
}

fn get_binary<'a>(doc: &'a Document, key: &'static str, path: &ErrorPath) -> Result<&'a [u8], DecodingError> {
    doc.get_binary_generic(key)
        .map(Vec::as_slice)
        .map_err(|_| DecodingError::MissingKey {
            path: path.clone(),
            key,
        })
}

fn decompress_key(doc: &Document, key: &'static str, path: &ErrorPath) -> Result<Vec<u8>, DecodingError> {
    let blob = get_binary(doc, key, path)?;
    lz4::decompress_blob(blob)
        .map_err(DecodingError::from)
        .map_err(|e| e.prefixed(path.to_string()))
}

/// `bool` arrays are bit-packed on the wire with no separate length field, so a
/// standalone decode can only recover length rounded up to a multiple of 8 (§4.4). A
/// `list`/`struct` parent that already knows the true child length truncates it back
/// down; other primitive widths never need this since `raw.len() / byte_width` is
/// already exact.
fn truncate_to_known_length(array: Array, expected_length: usize) -> Array {
    match array {
        Array::Primitive {
            schema: Schema::Bool,
            array: p,
        } if p.length != expected_length => {
            let validity = bitutil::pack_bits(&bitutil::unpack_bits(&p.validity, expected_length));
            let data = p.data[..expected_length].to_vec();
            Array::Primitive {
                schema: Schema::Bool,
                array: PrimitiveArray {
                    length: expected_length,
                    validity,
                    data,
                },
            }
        }
        other => other,
    }
}

fn bytes_to_counts(bytes: &[u8], path: &ErrorPath) -> Result<Vec<i32>, DecodingError> {
    if bytes.len() % 4 != 0 {
        return Err(DecodingError::MisalignedBuffer {
            path: path.clone(),
            len: bytes.len(),
            byte_width: 4,
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
        .collect())
}

fn delta_decode_bytes(data: &[u8], byte_width: usize, path: &ErrorPath) -> Result<Vec<u8>, DecodingError> {
    match byte_width {
        4 => {
            if data.len() % 4 != 0 {
                return Err(DecodingError::MisalignedBuffer {
                    path: path.clone(),
                    len: data.len(),
                    byte_width: 4,
                });
            }
            let values: Vec<i32> = data.chunks_exact(4).map(|c| i32::from_le_bytes(c.try_into().unwrap())).collect();
            Ok(bitutil::delta_decode(&values).iter().flat_map(|v| v.to_le_bytes()).collect())
        }
        8 => {
            if data.len() % 8 != 0 {
                return Err(DecodingError::MisalignedBuffer {
                    path: path.clone(),
                    len: data.len(),
                    byte_width: 8,
                });
            }
            let values: Vec<i64> = data.chunks_exact(8).map(|c| i64::from_le_bytes(c.try_into().unwrap())).collect();
            Ok(bitutil::delta_decode(&values).iter().flat_map(|v| v.to_le_bytes()).collect())
        }
        _ => Ok(data.to_vec()),
    }
}

fn unpack_primitive_bytes(schema: &Schema, raw: Vec<u8>, length: usize, path: &ErrorPath) -> Result<Vec<u8>, DecodingError> {
    match schema {
        Schema::Bool => {
            let bools = bitutil::unpack_bits(&raw, length);
            Ok(bools.into_iter().map(|b| b as u8).collect())
        }
        Schema::Date { .. } | Schema::Timestamp { .. } => {
            delta_decode_bytes(&raw, schema.byte_width().unwrap_or(raw.len()), path)
        }
        _ => Ok(raw),
    }
}

fn validity_byte_len(length: usize) -> usize {
    length.div_ceil(8)
}

fn decode_at(doc: &Document, path: &ErrorPath) -> Result<Array, DecodingError> {
    let schema = decode_descriptor(doc)?;
    tracing::trace!(tag = %schema.name(), "decoding array");

    match &schema {
        Schema::Null => {
            let length = doc.get_i64(schema::KEY_DATA).map_err(|_| DecodingError::MissingKey {
                path: path.clone(),
                key: schema::KEY_DATA,
            })?;
            if length < 0 {
                return Err(DecodingError::LengthMismatch {
                    path: path.clone(),
                    expected: 0,
                    actual: length as usize,
                });
            }
            let length = length as usize;
            let validity = decompress_key(doc, schema::KEY_MASK, path)?;
            if validity.len() != validity_byte_len(length) {
                return Err(DecodingError::LengthMismatch {
                    path: path.clone(),
                    expected: validity_byte_len(length),
                    actual: validity.len(),
                });
            }
            Ok(Array::Null { length, validity })
        }

        Schema::Bytes | Schema::Utf8 => {
            let counts_bytes = decompress_key(doc, schema::KEY_COUNTS, path)?;
            let counts = bytes_to_counts(&counts_bytes, path)?;
            let values = decompress_key(doc, schema::KEY_DATA, path)?;

            let sum: i64 = counts.iter().map(|&c| c as i64).sum();
            if sum as usize != values.len() {
                return Err(DecodingError::LengthMismatch {
                    path: path.clone(),
                    expected: sum as usize,
                    actual: values.len(),
                });
            }
            if matches!(schema, Schema::Utf8) && std::str::from_utf8(&values).is_err() {
                return Err(DecodingError::InvalidUtf8 { path: path.clone() });
            }

            let length = counts.len().saturating_sub(1);
            let validity = decompress_key(doc, schema::KEY_MASK, path)?;
            if validity.len() != validity_byte_len(length) {
                return Err(DecodingError::LengthMismatch {
                    path: path.clone(),
                    expected: validity_byte_len(length),
                    actual: validity.len(),
                });
            }

            Ok(Array::Binary {
                schema,
                array: BinaryArray {
                    length,
                    validity,
                    counts,
                    values,
                },
            })
        }

        Schema::List { .. } => {
            let counts_bytes = decompress_key(doc, schema::KEY_COUNTS, path)?;
            let counts = bytes_to_counts(&counts_bytes, path)?;
            let length = counts.len().saturating_sub(1);

            let child_doc = doc.get_document(schema::KEY_DATA).map_err(|_| DecodingError::MissingKey {
                path: path.clone(),
                key: schema::KEY_DATA,
            })?;
            let values = decode_at(child_doc, &path.prefixed("list.values"))?;

            let sum: i64 = counts.iter().map(|&c| c as i64).sum();
            let values = truncate_to_known_length(values, sum as usize);
            if sum as usize != values.length() {
                return Err(DecodingError::LengthMismatch {
                    path: path.clone(),
                    expected: sum as usize,
                    actual: values.length(),
                });
            }

            let validity = decompress_key(doc, schema::KEY_MASK, path)?;
            if validity.len() != validity_byte_len(length) {
                return Err(DecodingError::LengthMismatch {
                    path: path.clone(),
                    expected: validity_byte_len(length),
                    actual: validity.len(),
                });
            }

            Ok(Array::List {
                schema,
                array: ListArray {
                    length,
                    validity,
                    counts,
                    values: Box::new(values),
                },
            })
        }

        Schema::Dictionary { ordered, .. } => {
            let inner = doc.get_document(schema::KEY_DATA).map_err(|_| DecodingError::MissingKey {
                path: path.clone(),
                key: schema::KEY_DATA,
            })?;
            let index_doc = inner.get_document(schema::KEY_INDEX).map_err(|_| DecodingError::MissingKey {
                path: path.clone(),
                key: schema::KEY_INDEX,
            })?;
            let value_doc = inner.get_document(schema::KEY_DATA).map_err(|_| DecodingError::MissingKey {
                path: path.clone(),
                key: schema::KEY_DATA,
            })?;
            let index = decode_at(index_doc, &path.prefixed("dictionary.index"))?;
            let value = decode_at(value_doc, &path.prefixed("dictionary.value"))?;

            Ok(Array::Dictionary {
                schema,
                array: DictionaryArray {
                    ordered: *ordered,
                    index: Box::new(index),
                    value: Box::new(value),
                },
            })
        }

        Schema::Struct { fields } => {
            let inner = doc.get_document(schema::KEY_DATA).map_err(|_| DecodingError::MissingKey {
                path: path.clone(),
                key: schema::KEY_DATA,
            })?;
            let length = inner.get_i64(schema::KEY_LENGTH).map_err(|_| DecodingError::MissingKey {
                path: path.clone(),
                key: schema::KEY_LENGTH,
            })? as usize;
            let field_docs = inner.get_document(schema::KEY_FIELDS).map_err(|_| DecodingError::MissingKey {
                path: path.clone(),
                key: schema::KEY_FIELDS,
            })?;

            let mut decoded_fields = Vec::with_capacity(fields.len());
            for (name, _) in fields {
                let field_doc = field_docs.get_document(name).map_err(|_| DecodingError::MissingKey {
                    path: path.clone(),
                    key: "f[name]",
                })?;
                let field = decode_at(field_doc, &path.prefixed(format!("struct.f[{name}]")))?;
                let field = truncate_to_known_length(field, length);
                if field.length() != length {
                    return Err(DecodingError::LengthMismatch {
                        path: path.clone(),
                        expected: length,
                        actual: field.length(),
                    });
                }
                decoded_fields.push((name.clone(), field));
            }

            let validity = decompress_key(doc, schema::KEY_MASK, path)?;
            if validity.len() != validity_byte_len(length) {
                return Err(DecodingError::LengthMismatch {
                    path: path.clone(),
                    expected: validity_byte_len(length),
                    actual: validity.len(),
                });
            }

            Ok(Array::Struct {
                schema,
                array: StructArray {
                    length,
                    validity,
                    fields: decoded_fields,
                },
            })
        }

        primitive => {
            let byte_width = primitive.byte_width().ok_or_else(|| DecodingError::TagMismatch {
                path: path.clone(),
                expected: "primitive".to_string(),
                found: primitive.name(),
            })?;

            let raw = decompress_key(doc, schema::KEY_DATA, path)?;
            let validity = decompress_key(doc, schema::KEY_MASK, path)?;

            let length = if matches!(primitive, Schema::Bool) {
                // bit-packed on the wire with no separate length field; recovered only
                // up to the nearest multiple of 8 here (see `truncate_to_known_length`).
                validity.len() * 8
            } else {
                if raw.len() % byte_width != 0 {
                    return Err(DecodingError::MisalignedBuffer {
                        path: path.clone(),
                        len: raw.len(),
                        byte_width,
                    });
                }
                raw.len() / byte_width
            };

            if validity.len() != validity_byte_len(length) {
                return Err(DecodingError::LengthMismatch {
                    path: path.clone(),
                    expected: validity_byte_len(length),
                    actual: validity.len(),
                });
            }

            let data = unpack_primitive_bytes(primitive, raw, length, path)?;

            Ok(Array::Primitive {
                schema,
                array: PrimitiveArray { length, validity, data },
            })
        }
    }
}
