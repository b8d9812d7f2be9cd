//! The columnar array model: immutable, typed, validity-tracked payload containers
//! tied one-to-one to a [`Schema`] variant.
//!
//! Like `Schema`, `Array` is a closed tagged union dispatched by `match`, not an open
//! class hierarchy (§9 re-architecture notes). Every constructor enforces the payload
//! invariants of §3 at construction time and returns `Result<Array, EncodingError>`
//! rather than panicking, so a value of type `Array` is always well-formed.

use crate::bitutil;
use crate::error::{ErrorPath, EncodingError};
use crate::schema::Schema;

fn validity_byte_len(length: usize) -> usize {
    length.div_ceil(8)
}

fn check_validity(path: &ErrorPath, length: usize, validity: &[u8]) -> Result<(), EncodingError> {
    let expected = validity_byte_len(length);
    if validity.len() != expected {
        return Err(EncodingError::ChildLengthMismatch {
            path: path.clone(),
            field: "validity".to_string(),
            expected,
            actual: validity.len(),
        });
    }
    Ok(())
}

/// A fixed-width primitive payload: bool, integer, float, opaque, date, timestamp, or
/// time. `data.len()` is always `length * byte_width`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveArray {
    pub length: usize,
    pub validity: Vec<u8>,
    pub data: Vec<u8>,
}

/// Variable-length bytes/utf8 payload: `counts` has `length + 1` entries, `counts[0] ==
/// 0`, and `values.len() == counts.iter().sum()`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryArray {
    pub length: usize,
    pub validity: Vec<u8>,
    pub counts: Vec<i32>,
    pub values: Vec<u8>,
}

/// A list array: `counts` framing identical to [`BinaryArray`], with a child `Array`
/// in place of a raw byte buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ListArray {
    pub length: usize,
    pub validity: Vec<u8>,
    pub counts: Vec<i32>,
    pub values: Box<Array>,
}

/// A dictionary-encoded array: `index` selects into `value` per position; `value`
/// itself carries no nulls of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryArray {
    pub ordered: bool,
    pub index: Box<Array>,
    pub value: Box<Array>,
}

/// A struct array: ordered named children, each of length equal to the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct StructArray {
    pub length: usize,
    pub validity: Vec<u8>,
    pub fields: Vec<(String, Array)>,
}

/// The columnar array model. See module docs.
#[derive(Debug, Clone)]
pub enum Array {
    Null { length: usize, validity: Vec<u8> },
    Primitive { schema: Schema, array: PrimitiveArray },
    Binary { schema: Schema, array: BinaryArray },
    List { schema: Schema, array: ListArray },
    Dictionary { schema: Schema, array: DictionaryArray },
    Struct { schema: Schema, array: StructArray },
}

impl Array {
    /// A `null`-typed array: no payload beyond validity (and per §3, invalid positions
    /// still cost a bit in the validity buffer — a null array with no valid value at
    /// all is simply all-invalid).
    pub fn null(length: usize, validity: Vec<u8>) -> Result<Self, EncodingError> {
        check_validity(&ErrorPath::new(), length, &validity)?;
        Ok(Array::Null { length, validity })
    }

    /// A fixed-width primitive array (bool/int/float/opaque/date/timestamp/time).
    /// `schema` must have a static `byte_width`; `data.len()` must equal `length *
    /// byte_width`.
    pub fn primitive(schema: Schema, length: usize, validity: Vec<u8>, data: Vec<u8>) -> Result<Self, EncodingError> {
        let path = ErrorPath::new();
        check_validity(&path, length, &validity)?;
        let byte_width = schema.byte_width().ok_or_else(|| EncodingError::ChildLengthMismatch {
            path: path.clone(),
            field: "data".to_string(),
            expected: 0,
            actual: data.len(),
        })?;
        let expected = length * byte_width;
        if data.len() != expected {
            return Err(EncodingError::ChildLengthMismatch {
                path,
                field: "data".to_string(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Array::Primitive {
            schema,
            array: PrimitiveArray { length, validity, data },
        })
    }

    /// A `bytes`/`utf8` array. `counts[0]` must be `0` and `counts` must sum to
    /// `values.len()`; `utf8` additionally requires `values` to be valid UTF-8.
    pub fn binary(schema: Schema, validity: Vec<u8>, counts: Vec<i32>, values: Vec<u8>) -> Result<Self, EncodingError> {
        let path = ErrorPath::new();
        if !matches!(schema, Schema::Bytes | Schema::Utf8) {
            return Err(EncodingError::ChildLengthMismatch {
                path,
                field: "schema".to_string(),
                expected: 0,
                actual: 0,
            });
        }
        if matches!(schema, Schema::Utf8) && std::str::from_utf8(&values).is_err() {
            return Err(EncodingError::InvalidUtf8 { path });
        }
        let length = counts.len().saturating_sub(1);
        check_validity(&path, length, &validity)?;
        validate_counts(&path, &counts, values.len())?;
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

    /// A `list` array. `counts` framing is identical to [`Array::binary`]; the element
    /// schema is implied by `values`'s own schema.
    pub fn list(validity: Vec<u8>, counts: Vec<i32>, values: Array) -> Result<Self, EncodingError> {
        let path = ErrorPath::new();
        let length = counts.len().saturating_sub(1);
        check_validity(&path, length, &validity)?;
        let values_len = values.length();
        validate_counts(&path, &counts, values_len)?;
        let schema = Schema::List {
            value: Box::new(values.schema()),
        };
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

    /// A dictionary-encoded array. `index`'s schema must be a signed integer schema;
    /// the resulting array's length and validity are exactly `index`'s.
    pub fn dictionary(ordered: bool, index: Array, value: Array) -> Result<Self, EncodingError> {
        let path = ErrorPath::new();
        if !index.schema().is_signed_integer() {
            return Err(EncodingError::NonIntegerDictionaryIndex {
                path,
                found: index.schema().name(),
            });
        }
        let schema = Schema::Dictionary {
            ordered,
            index: Box::new(index.schema()),
            value: Box::new(value.schema()),
        };
        Ok(Array::Dictionary {
            schema,
            array: DictionaryArray {
                ordered,
                index: Box::new(index),
                value: Box::new(value),
            },
        })
    }

    /// A struct array. Every field's array length must equal `length`; field names and
    /// order are taken from `fields` and become part of the resulting schema.
    pub fn struct_(length: usize, validity: Vec<u8>, fields: Vec<(String, Array)>) -> Result<Self, EncodingError> {
        let path = ErrorPath::new();
        check_validity(&path, length, &validity)?;
        for (name, field) in &fields {
            if field.length() != length {
                return Err(EncodingError::ChildLengthMismatch {
                    path: path.clone(),
                    field: name.clone(),
                    expected: length,
                    actual: field.length(),
                });
            }
        }
        let field_schemas = fields.iter().map(|(name, field)| (name.clone(), field.schema())).collect();
        let schema = Schema::struct_(field_schemas).map_err(EncodingError::Schema)?;
        Ok(Array::Struct {
            schema,
            array: StructArray { length, validity, fields },
        })
    }

    /// The number of logical positions in this array.
    pub fn length(&self) -> usize {
        match self {
            Array::Null { length, .. } => *length,
            Array::Primitive { array, .. } => array.length,
            Array::Binary { array, .. } => array.length,
            Array::List { array, .. } => array.length,
            Array::Dictionary { array, .. } => array.index.length(),
            Array::Struct { array, .. } => array.length,
        }
    }

    /// The validity bitmap governing this array's own positions (for dictionaries,
    /// this is the index's validity).
    pub fn validity(&self) -> &[u8] {
        match self {
            Array::Null { validity, .. } => validity,
            Array::Primitive { array, .. } => &array.validity,
            Array::Binary { array, .. } => &array.validity,
            Array::List { array, .. } => &array.validity,
            Array::Dictionary { array, .. } => array.index.validity(),
            Array::Struct { array, .. } => &array.validity,
        }
    }

    /// The logical type of this array.
    pub fn schema(&self) -> Schema {
        match self {
            Array::Null { .. } => Schema::Null,
            Array::Primitive { schema, .. } => schema.clone(),
            Array::Binary { schema, .. } => schema.clone(),
            Array::List { schema, .. } => schema.clone(),
            Array::Dictionary { schema, .. } => schema.clone(),
            Array::Struct { schema, .. } => schema.clone(),
        }
    }

    /// Materialises the logical slice `[begin, end)` of this array as a fresh,
    /// independent `Array` (§8 "Slicing"). The dictionary `value` array is never
    /// sliced — only its `index` selects a narrower range of positions, since `value`
    /// holds the distinct dictionary entries rather than per-position data.
    pub fn slice(&self, begin: usize, end: usize) -> Result<Array, EncodingError> {
        let path = ErrorPath::new();
        let length = self.length();
        if begin > end || end > length {
            return Err(EncodingError::SliceOutOfBounds { path, begin, end, length });
        }
        let new_length = end - begin;

        match self {
            Array::Null { validity, .. } => {
                let validity = slice_validity(validity, length, begin, end);
                Array::null(new_length, validity)
            }
            Array::Primitive { schema, array } => {
                let byte_width = schema.byte_width().unwrap_or(0);
                let data = array.data[begin * byte_width..end * byte_width].to_vec();
                let validity = slice_validity(&array.validity, length, begin, end);
                Array::primitive(schema.clone(), new_length, validity, data)
            }
            Array::Binary { schema, array } => {
                let (counts, values) = slice_counts_and_values(&array.counts, &array.values, begin, end);
                let validity = slice_validity(&array.validity, length, begin, end);
                Array::binary(schema.clone(), validity, counts, values)
            }
            Array::List { array, .. } => {
                let offsets = bitutil::offsets_from_counts(&array.counts);
                let (start, finish) = (offsets[begin] as usize, offsets[end] as usize);
                let values = array.values.slice(start, finish)?;
                let mut counts = Vec::with_capacity(new_length + 1);
                counts.push(0);
                counts.extend_from_slice(&array.counts[begin + 1..=end]);
                let validity = slice_validity(&array.validity, length, begin, end);
                Array::list(validity, counts, values)
            }
            Array::Dictionary { array, .. } => {
                let index = array.index.slice(begin, end)?;
                Array::dictionary(array.ordered, index, (*array.value).clone())
            }
            Array::Struct { array, .. } => {
                let validity = slice_validity(&array.validity, length, begin, end);
                let fields = array
                    .fields
                    .iter()
                    .map(|(name, field)| Ok((name.clone(), field.slice(begin, end)?)))
                    .collect::<Result<Vec<_>, EncodingError>>()?;
                Array::struct_(new_length, validity, fields)
            }
        }
    }
}

/// Extracts the bits `[begin, end)` of a `total_length`-position validity bitmap into a
/// fresh, independently byte-aligned bitmap.
fn slice_validity(validity: &[u8], total_length: usize, begin: usize, end: usize) -> Vec<u8> {
    let bits = bitutil::unpack_bits(validity, total_length);
    bitutil::pack_bits(&bits[begin..end])
}

/// Slices a counts/values pair (shared framing of `bytes`/`utf8`/`list`) to the item
/// range `[begin, end)`, restarting the counts stream at `0` per §4.1.
fn slice_counts_and_values(counts: &[i32], values: &[u8], begin: usize, end: usize) -> (Vec<i32>, Vec<u8>) {
    let offsets = bitutil::offsets_from_counts(counts);
    let (start, finish) = (offsets[begin] as usize, offsets[end] as usize);
    let mut sliced_counts = Vec::with_capacity(end - begin + 1);
    sliced_counts.push(0);
    sliced_counts.extend_from_slice(&counts[begin + 1..=end]);
    (sliced_counts, values[start..finish].to_vec())
}

fn validate_counts(path: &ErrorPath, counts: &[i32], values_len: usize) -> Result<(), EncodingError> {
    if counts.is_empty() || counts[0] != 0 {
        return Err(EncodingError::CountsMismatch {
            path: path.clone(),
            sum: counts.first().copied().unwrap_or(-1) as i64,
            values_len,
        });
    }
    let mut sum: i64 = 0;
    for &c in counts {
        if c < 0 {
            return Err(EncodingError::CountsMismatch {
                path: path.clone(),
                sum: c as i64,
                values_len,
            });
        }
        sum += c as i64;
    }
    if sum as usize != values_len {
        return Err(EncodingError::CountsMismatch {
            path: path.clone(),
            sum,
            values_len,
        });
    }
    Ok(())
}

impl PartialEq for Array {
    /// Schemas must match, and every position must match, except positions marked
    /// invalid in *both* arrays' validity bitmaps, which compare equal regardless of
    /// the payload bits underneath (§3 "Array equality").
    fn eq(&self, other: &Self) -> bool {
        if self.schema() != other.schema() || self.length() != other.length() {
            return false;
        }

        match (self, other) {
            (Array::Null { length, .. }, Array::Null { .. }) => {
                positions_equal_ignoring_masked(self.validity(), other.validity(), *length, |_| true)
            }
            (Array::Primitive { array: a, .. }, Array::Primitive { array: b, .. }) => {
                let byte_width = self.schema().byte_width().unwrap_or(0);
                positions_equal_ignoring_masked(&a.validity, &b.validity, a.length, |i| {
                    byte_width == 0 || a.data[i * byte_width..(i + 1) * byte_width] == b.data[i * byte_width..(i + 1) * byte_width]
                })
            }
            (Array::Binary { array: a, .. }, Array::Binary { array: b, .. }) => {
                positions_equal_ignoring_masked(&a.validity, &b.validity, a.length, |i| {
                    slice_at(&a.counts, &a.values, i) == slice_at(&b.counts, &b.values, i)
                })
            }
            (Array::List { array: a, .. }, Array::List { array: b, .. }) => {
                if a.counts != b.counts {
                    return false;
                }
                positions_equal_ignoring_masked(&a.validity, &b.validity, a.length, |_| a.values == b.values)
            }
            (Array::Dictionary { array: a, .. }, Array::Dictionary { array: b, .. }) => {
                a.ordered == b.ordered && a.index == b.index && a.value == b.value
            }
            (Array::Struct { array: a, .. }, Array::Struct { array: b, .. }) => {
                if a.fields.len() != b.fields.len() {
                    return false;
                }
                let fields_equal = a
                    .fields
                    .iter()
                    .zip(b.fields.iter())
                    .all(|((name_a, field_a), (name_b, field_b))| name_a == name_b && field_a == field_b);
                fields_equal && positions_equal_ignoring_masked(&a.validity, &b.validity, a.length, |_| true)
            }
            _ => false,
        }
    }
}

impl Eq for Array {}

fn slice_at<'a>(counts: &[i32], values: &'a [u8], i: usize) -> &'a [u8] {
    let start: i64 = counts[..=i].iter().map(|&c| c as i64).sum::<i64>() - counts[i] as i64;
    let len = counts[i] as usize;
    &values[start as usize..start as usize + len]
}

fn positions_equal_ignoring_masked(
    validity_a: &[u8],
    validity_b: &[u8],
    length: usize,
    payload_eq: impl Fn(usize) -> bool,
) -> bool {
    for i in 0..length {
        let valid_a = bitutil::bit_is_set(validity_a, i);
        let valid_b = bitutil::bit_is_set(validity_b, i);
        if valid_a != valid_b {
            return false;
        }
        if valid_a && !payload_eq(i) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitutil::ValidityMode;

    #[test]
    fn primitive_rejects_wrong_length() {
        let validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let err = Array::primitive(Schema::Int32, 2, validity, vec![0u8; 5]).unwrap_err();
        assert!(matches!(err, EncodingError::ChildLengthMismatch { .. }));
    }

    #[test]
    fn binary_counts_must_start_at_zero() {
        let validity = bitutil::make_validity(1, ValidityMode::AllValid);
        let err = Array::binary(Schema::Utf8, validity, vec![1, 1], b"a".to_vec()).unwrap_err();
        assert!(matches!(err, EncodingError::CountsMismatch { .. }));
    }

    #[test]
    fn utf8_rejects_invalid_utf8() {
        let validity = bitutil::make_validity(1, ValidityMode::AllValid);
        let err = Array::binary(Schema::Utf8, validity, vec![0, 3], vec![0xFF, 0xFE, 0xFD]).unwrap_err();
        assert!(matches!(err, EncodingError::InvalidUtf8 { .. }));
    }

    #[test]
    fn binary_scenario_from_spec() {
        // ["", "ab", "", "c"] -> counts [0, 0, 2, 0, 1], values "abc".
        let validity = bitutil::make_validity(4, ValidityMode::AllValid);
        let array = Array::binary(Schema::Utf8, validity, vec![0, 0, 2, 0, 1], b"abc".to_vec()).unwrap();
        assert_eq!(array.length(), 4);
    }

    #[test]
    fn list_length_derived_from_counts() {
        let validity = bitutil::make_validity(3, ValidityMode::AllValid);
        let child_validity = bitutil::make_validity(5, ValidityMode::AllValid);
        let child = Array::primitive(
            Schema::Int64,
            5,
            child_validity,
            (1i64..=5).flat_map(|v| v.to_le_bytes()).collect(),
        )
        .unwrap();
        let list = Array::list(validity, vec![0, 3, 0, 2], child).unwrap();
        assert_eq!(list.length(), 3);
    }

    #[test]
    fn struct_rejects_mismatched_child_length() {
        let validity = bitutil::make_validity(4, ValidityMode::AllValid);
        let child_validity = bitutil::make_validity(3, ValidityMode::AllValid);
        let child = Array::primitive(Schema::Int32, 3, child_validity, vec![0u8; 12]).unwrap();
        let err = Array::struct_(4, validity, vec![("x".to_string(), child)]).unwrap_err();
        assert!(matches!(err, EncodingError::ChildLengthMismatch { .. }));
    }

    #[test]
    fn dictionary_requires_signed_integer_index() {
        let idx_validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let index = Array::primitive(Schema::UInt32, 2, idx_validity, vec![0u8; 8]).unwrap();
        let value_validity = bitutil::make_validity(1, ValidityMode::AllValid);
        let value = Array::binary(Schema::Utf8, value_validity, vec![0, 1], b"x".to_vec()).unwrap();
        let err = Array::dictionary(false, index, value).unwrap_err();
        assert!(matches!(err, EncodingError::NonIntegerDictionaryIndex { .. }));
    }

    #[test]
    fn masked_positions_compare_equal_regardless_of_payload() {
        let mut validity = bitutil::make_validity(2, ValidityMode::AllValid);
        // mark position 1 invalid
        validity[0] &= 0b0000_0001;
        let a = Array::primitive(Schema::Int32, 2, validity.clone(), vec![1, 0, 0, 0, 99, 99, 99, 99]).unwrap();
        let b = Array::primitive(Schema::Int32, 2, validity, vec![1, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_length_boundary() {
        let array = Array::binary(Schema::Bytes, Vec::new(), vec![0], Vec::new()).unwrap();
        assert_eq!(array.length(), 0);
        assert!(array.validity().is_empty());
    }

    #[test]
    fn struct_propagates_real_schema_error_on_duplicate_field_names() {
        let validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let x_validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let x = Array::primitive(Schema::Int32, 2, x_validity, vec![0u8; 8]).unwrap();
        let y_validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let y = Array::primitive(Schema::Int32, 2, y_validity, vec![0u8; 8]).unwrap();
        let err = Array::struct_(2, validity, vec![("x".to_string(), x), ("x".to_string(), y)]).unwrap_err();
        assert!(matches!(
            err,
            EncodingError::Schema(crate::error::SchemaError::MalformedDescriptor { .. })
        ));
    }

    #[test]
    fn slice_out_of_bounds_is_rejected() {
        let validity = bitutil::make_validity(4, ValidityMode::AllValid);
        let array = Array::primitive(Schema::Int32, 4, validity, vec![0u8; 16]).unwrap();
        let err = array.slice(2, 5).unwrap_err();
        assert!(matches!(err, EncodingError::SliceOutOfBounds { .. }));
    }

    #[test]
    fn slice_primitive_narrows_data_and_validity() {
        let mut validity = bitutil::make_validity(4, ValidityMode::AllValid);
        validity[0] &= !(1 << 3); // position 3 invalid
        let data: Vec<u8> = (1i32..=4).flat_map(|v| v.to_le_bytes()).collect();
        let array = Array::primitive(Schema::Int32, 4, validity, data).unwrap();

        let sliced = array.slice(1, 3).unwrap();
        assert_eq!(sliced.length(), 2);
        let expected_validity = bitutil::make_validity(2, ValidityMode::AllValid);
        assert_eq!(sliced.validity(), expected_validity.as_slice());
    }

    #[test]
    fn slice_binary_scenario_from_spec() {
        // scenario 5 is phrased over a list, but the same counts-restart logic applies
        // to bytes/utf8: slicing ["", "ab", "", "c"] to [1, 3) yields ["ab", ""].
        let validity = bitutil::make_validity(4, ValidityMode::AllValid);
        let array = Array::binary(Schema::Utf8, validity, vec![0, 0, 2, 0, 1], b"abc".to_vec()).unwrap();
        let sliced = array.slice(1, 3).unwrap();

        let expected_validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let expected = Array::binary(Schema::Utf8, expected_validity, vec![0, 2, 0], b"ab".to_vec()).unwrap();
        assert_eq!(sliced, expected);
    }

    #[test]
    fn slice_list_scenario_from_spec() {
        // list(int64) with counts [0, 3, 0, 2] and child [1,2,3,4,5]: slicing [1, 3)
        // yields an array equal to the materialised slice ([], [4,5]).
        let validity = bitutil::make_validity(3, ValidityMode::AllValid);
        let child_validity = bitutil::make_validity(5, ValidityMode::AllValid);
        let child = Array::primitive(
            Schema::Int64,
            5,
            child_validity,
            (1i64..=5).flat_map(|v| v.to_le_bytes()).collect(),
        )
        .unwrap();
        let array = Array::list(validity, vec![0, 3, 0, 2], child).unwrap();

        let sliced = array.slice(1, 3).unwrap();
        assert_eq!(sliced.length(), 2);

        let expected_validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let expected_child_validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let expected_child = Array::primitive(Schema::Int64, 2, expected_child_validity, vec![4, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        let expected = Array::list(expected_validity, vec![0, 0, 2], expected_child).unwrap();
        assert_eq!(sliced, expected);
    }

    #[test]
    fn slice_struct_narrows_every_field() {
        let validity = bitutil::make_validity(4, ValidityMode::AllValid);
        let x_validity = bitutil::make_validity(4, ValidityMode::AllValid);
        let x = Array::primitive(
            Schema::Int32,
            4,
            x_validity,
            (1i32..=4).flat_map(|v| v.to_le_bytes()).collect(),
        )
        .unwrap();
        let array = Array::struct_(4, validity, vec![("x".to_string(), x)]).unwrap();

        let sliced = array.slice(2, 4).unwrap();
        assert_eq!(sliced.length(), 2);

        let expected_x_validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let expected_x = Array::primitive(Schema::Int32, 2, expected_x_validity, vec![3, 0, 0, 0, 4, 0, 0, 0]).unwrap();
        let expected_validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let expected = Array::struct_(2, expected_validity, vec![("x".to_string(), expected_x)]).unwrap();
        assert_eq!(sliced, expected);
    }

    #[test]
    fn slice_dictionary_only_narrows_the_index() {
        let idx_validity = bitutil::make_validity(4, ValidityMode::AllValid);
        let index = Array::primitive(Schema::Int32, 4, idx_validity, vec![0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        let value_validity = bitutil::make_validity(3, ValidityMode::AllValid);
        let value = Array::binary(Schema::Utf8, value_validity, vec![0, 1, 1, 1], b"xyz".to_vec()).unwrap();
        let array = Array::dictionary(true, index, value).unwrap();

        let sliced = array.slice(1, 3).unwrap();
        assert_eq!(sliced.length(), 2);

        let expected_idx_validity = bitutil::make_validity(2, ValidityMode::AllValid);
        let expected_index = Array::primitive(Schema::Int32, 2, expected_idx_validity, vec![1, 0, 0, 0, 2, 0, 0, 0]).unwrap();
        let expected_value_validity = bitutil::make_validity(3, ValidityMode::AllValid);
        let expected_value = Array::binary(Schema::Utf8, expected_value_validity, vec![0, 1, 1, 1], b"xyz".to_vec()).unwrap();
        let expected = Array::dictionary(true, expected_index, expected_value).unwrap();
        assert_eq!(sliced, expected);
    }
}
