//! The closed logical type hierarchy (`Schema`), its canonical descriptor
//! encoding/decoding, and its JSON-Schema projections.
//!
//! `Schema` is a tagged union, not an open class hierarchy: every concrete type is one
//! of the variants below, dispatched by `match` rather than virtual calls, per the
//! re-architecture notes. Smart constructors (`Schema::opaque`, `Schema::dictionary`,
//! `Schema::timestamp`, `Schema::struct_`) are the only way to build variants that carry
//! an invariant narrower than their field types, so an out-of-band `Schema` value can
//! never violate §3's invariants.

use bson::{Bson, Document};
use serde_json::{json, Map, Value};

use crate::error::{ErrorPath, SchemaError};

pub const KEY_DATA: &str = "d";
pub const KEY_MASK: &str = "m";
pub const KEY_TYPE: &str = "t";
pub const KEY_PARAM: &str = "p";
pub const KEY_COUNTS: &str = "o";
pub const KEY_LENGTH: &str = "l";
pub const KEY_NAME: &str = "n";
pub const KEY_FIELDS: &str = "f";
pub const KEY_INDEX: &str = "i";

/// The unit of a `date[_]` schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateUnit {
    Day,
    Millisecond,
}

impl DateUnit {
    fn tag(self) -> &'static str {
        match self {
            DateUnit::Day => "date[d]",
            DateUnit::Millisecond => "date[ms]",
        }
    }

    fn byte_width(self) -> usize {
        match self {
            DateUnit::Day => 4,
            DateUnit::Millisecond => 8,
        }
    }

    fn from_unit_str(unit: &str) -> Option<Self> {
        match unit {
            "d" => Some(DateUnit::Day),
            "ms" => Some(DateUnit::Millisecond),
            _ => None,
        }
    }
}

/// The unit shared by `timestamp[_]` and `time[_]` schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl TimeUnit {
    fn unit_str(self) -> &'static str {
        match self {
            TimeUnit::Second => "s",
            TimeUnit::Millisecond => "ms",
            TimeUnit::Microsecond => "us",
            TimeUnit::Nanosecond => "ns",
        }
    }

    fn from_unit_str(unit: &str) -> Option<Self> {
        match unit {
            "s" => Some(TimeUnit::Second),
            "ms" => Some(TimeUnit::Millisecond),
            "us" => Some(TimeUnit::Microsecond),
            "ns" => Some(TimeUnit::Nanosecond),
            _ => None,
        }
    }

    /// Byte width of a `time[_]` schema: 4 for s/ms, 8 for us/ns. `timestamp[_]` is
    /// always 8 bytes regardless of unit.
    fn time_byte_width(self) -> usize {
        match self {
            TimeUnit::Second | TimeUnit::Millisecond => 4,
            TimeUnit::Microsecond | TimeUnit::Nanosecond => 8,
        }
    }
}

/// The closed logical type hierarchy. See module docs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schema {
    Null,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Date {
        unit: DateUnit,
    },
    Timestamp {
        unit: TimeUnit,
        tz: Option<String>,
    },
    Time {
        unit: TimeUnit,
    },
    Opaque {
        byte_width: u32,
    },
    Bytes,
    Utf8,
    Dictionary {
        ordered: bool,
        index: Box<Schema>,
        value: Box<Schema>,
    },
    List {
        value: Box<Schema>,
    },
    Struct {
        fields: Vec<(String, Schema)>,
    },
}

impl Schema {
    /// A fixed-size byte string. Fails if `byte_width` is zero.
    pub fn opaque(byte_width: u32) -> Result<Self, SchemaError> {
        if byte_width == 0 {
            return Err(SchemaError::UnsupportedParameter {
                path: ErrorPath::new(),
                tag: "opaque".to_string(),
                reason: "byte width must be positive".to_string(),
            });
        }
        Ok(Schema::Opaque { byte_width })
    }

    /// A `timestamp[_]` schema, optionally carrying a timezone. Fails if `tz` is `Some`
    /// but empty.
    pub fn timestamp(unit: TimeUnit, tz: Option<String>) -> Result<Self, SchemaError> {
        if let Some(tz) = &tz {
            if tz.is_empty() {
                return Err(SchemaError::UnsupportedParameter {
                    path: ErrorPath::new(),
                    tag: format!("timestamp[{}]", unit.unit_str()),
                    reason: "timezone parameter must not be empty".to_string(),
                });
            }
        }
        Ok(Schema::Timestamp { unit, tz })
    }

    /// A dictionary-encoded schema. `index` must be one of the signed integer schemas.
    pub fn dictionary(ordered: bool, index: Schema, value: Schema) -> Result<Self, SchemaError> {
        if !index.is_signed_integer() {
            return Err(SchemaError::UnsupportedParameter {
                path: ErrorPath::new(),
                tag: if ordered { "ordered".to_string() } else { "factor".to_string() },
                reason: format!("index schema must be a signed integer type, found {}", index.name()),
            });
        }
        Ok(Schema::Dictionary {
            ordered,
            index: Box::new(index),
            value: Box::new(value),
        })
    }

    /// A struct schema. Field names must be non-empty and unique; order is preserved
    /// and participates in equality.
    pub fn struct_(fields: Vec<(String, Schema)>) -> Result<Self, SchemaError> {
        for (name, _) in &fields {
            if name.is_empty() {
                return Err(SchemaError::MalformedDescriptor {
                    path: ErrorPath::new(),
                    reason: "struct field names must be non-empty".to_string(),
                });
            }
        }
        let mut seen = std::collections::HashSet::new();
        for (name, _) in &fields {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::MalformedDescriptor {
                    path: ErrorPath::new(),
                    reason: format!("duplicate struct field name {name:?}"),
                });
            }
        }
        Ok(Schema::Struct { fields })
    }

    /// The lowercase wire tag for this schema, e.g. `"int32"`, `"date[d]"`, `"ordered"`.
    pub fn name(&self) -> String {
        match self {
            Schema::Null => "null".to_string(),
            Schema::Bool => "bool".to_string(),
            Schema::Int8 => "int8".to_string(),
            Schema::Int16 => "int16".to_string(),
            Schema::Int32 => "int32".to_string(),
            Schema::Int64 => "int64".to_string(),
            Schema::UInt8 => "uint8".to_string(),
            Schema::UInt16 => "uint16".to_string(),
            Schema::UInt32 => "uint32".to_string(),
            Schema::UInt64 => "uint64".to_string(),
            Schema::Float16 => "float16".to_string(),
            Schema::Float32 => "float32".to_string(),
            Schema::Float64 => "float64".to_string(),
            Schema::Date { unit } => unit.tag().to_string(),
            Schema::Timestamp { unit, .. } => format!("timestamp[{}]", unit.unit_str()),
            Schema::Time { unit } => format!("time[{}]", unit.unit_str()),
            Schema::Opaque { .. } => "opaque".to_string(),
            Schema::Bytes => "bytes".to_string(),
            Schema::Utf8 => "utf8".to_string(),
            Schema::Dictionary { ordered, .. } => if *ordered { "ordered" } else { "factor" }.to_string(),
            Schema::List { .. } => "list".to_string(),
            Schema::Struct { .. } => "struct".to_string(),
        }
    }

    /// Static per-value byte width, or `None` for variable-width/recursive variants
    /// (`null`, `bytes`, `utf8`, `list`, `struct`, `dictionary`).
    pub fn byte_width(&self) -> Option<usize> {
        match self {
            Schema::Null => None,
            Schema::Bool => Some(1),
            Schema::Int8 | Schema::UInt8 => Some(1),
            Schema::Int16 | Schema::UInt16 | Schema::Float16 => Some(2),
            Schema::Int32 | Schema::UInt32 | Schema::Float32 => Some(4),
            Schema::Int64 | Schema::UInt64 | Schema::Float64 => Some(8),
            Schema::Date { unit } => Some(unit.byte_width()),
            Schema::Timestamp { .. } => Some(8),
            Schema::Time { unit } => Some(unit.time_byte_width()),
            Schema::Opaque { byte_width } => Some(*byte_width as usize),
            Schema::Bytes | Schema::Utf8 | Schema::List { .. } | Schema::Struct { .. } | Schema::Dictionary { .. } => {
                None
            }
        }
    }

    /// Whether this schema is one of the signed integer primitives, i.e. eligible as a
    /// dictionary index schema.
    pub fn is_signed_integer(&self) -> bool {
        matches!(self, Schema::Int8 | Schema::Int16 | Schema::Int32 | Schema::Int64)
    }

    /// Emits the canonical descriptor document for this schema (§4.2).
    pub fn encode_descriptor(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(KEY_TYPE, self.name());
        match self {
            Schema::Opaque { byte_width } => {
                doc.insert(KEY_PARAM, *byte_width as i64);
            }
            Schema::Timestamp { tz: Some(tz), .. } => {
                doc.insert(KEY_PARAM, tz.clone());
            }
            Schema::Dictionary { index, value, .. } => {
                let mut param = Document::new();
                param.insert(KEY_INDEX, index.encode_descriptor());
                param.insert(KEY_DATA, value.encode_descriptor());
                doc.insert(KEY_PARAM, param);
            }
            Schema::List { value } => {
                doc.insert(KEY_PARAM, value.encode_descriptor());
            }
            Schema::Struct { fields } => {
                let params: Vec<Bson> = fields
                    .iter()
                    .map(|(name, field)| {
                        let mut field_doc = field.encode_descriptor();
                        let mut named = Document::new();
                        named.insert(KEY_NAME, name.clone());
                        named.append(&mut field_doc);
                        Bson::Document(named)
                    })
                    .collect();
                doc.insert(KEY_PARAM, params);
            }
            _ => {}
        }
        doc
    }
}

fn require_str<'a>(doc: &'a Document, key: &'static str, path: &ErrorPath) -> Result<&'a str, SchemaError> {
    doc.get_str(key).map_err(|_| SchemaError::MalformedDescriptor {
        path: path.clone(),
        reason: format!("missing or non-string {key:?}"),
    })
}

/// Reconstructs a [`Schema`] from its canonical descriptor document (§4.2). Inverse of
/// [`Schema::encode_descriptor`].
pub fn decode_descriptor(doc: &Document) -> Result<Schema, SchemaError> {
    decode_descriptor_at(doc, &ErrorPath::new())
}

fn decode_descriptor_at(doc: &Document, path: &ErrorPath) -> Result<Schema, SchemaError> {
    let tag = require_str(doc, KEY_TYPE, path)?;

    match tag {
        "null" => Ok(Schema::Null),
        "bool" => Ok(Schema::Bool),
        "int8" => Ok(Schema::Int8),
        "int16" => Ok(Schema::Int16),
        "int32" => Ok(Schema::Int32),
        "int64" => Ok(Schema::Int64),
        "uint8" => Ok(Schema::UInt8),
        "uint16" => Ok(Schema::UInt16),
        "uint32" => Ok(Schema::UInt32),
        "uint64" => Ok(Schema::UInt64),
        "float16" => Ok(Schema::Float16),
        "float32" => Ok(Schema::Float32),
        "float64" => Ok(Schema::Float64),
        "bytes" => Ok(Schema::Bytes),
        "utf8" => Ok(Schema::Utf8),

        "date[d]" => Ok(Schema::Date { unit: DateUnit::Day }),
        "date[ms]" => Ok(Schema::Date {
            unit: DateUnit::Millisecond,
        }),

        t if t.starts_with("timestamp[") && t.ends_with(']') => {
            let unit_str = &t["timestamp[".len()..t.len() - 1];
            let unit = TimeUnit::from_unit_str(unit_str).ok_or_else(|| SchemaError::UnknownTag {
                path: path.clone(),
                tag: t.to_string(),
            })?;
            let tz = match doc.get_str(KEY_PARAM) {
                Ok(tz) => Some(tz.to_string()),
                Err(bson::document::ValueAccessError::NotPresent) => None,
                Err(_) => {
                    return Err(SchemaError::MalformedDescriptor {
                        path: path.clone(),
                        reason: "timestamp parameter must be a string".to_string(),
                    })
                }
            };
            Schema::timestamp(unit, tz).map_err(|e| e.at_path(path))
        }

        t if t.starts_with("time[") && t.ends_with(']') => {
            let unit_str = &t["time[".len()..t.len() - 1];
            let unit = TimeUnit::from_unit_str(unit_str).ok_or_else(|| SchemaError::UnknownTag {
                path: path.clone(),
                tag: t.to_string(),
            })?;
            Ok(Schema::Time { unit })
        }

        "opaque" => {
            let width = doc.get_i64(KEY_PARAM).map_err(|_| SchemaError::MalformedDescriptor {
                path: path.clone(),
                reason: "opaque requires an integer byte-width parameter".to_string(),
            })?;
            if width <= 0 || width >= (1i64 << 31) {
                return Err(SchemaError::UnsupportedParameter {
                    path: path.clone(),
                    tag: "opaque".to_string(),
                    reason: format!("byte width {width} out of range"),
                });
            }
            Ok(Schema::Opaque { byte_width: width as u32 })
        }

        "factor" | "ordered" => {
            let ordered = tag == "ordered";
            let param = doc
                .get_document(KEY_PARAM)
                .map_err(|_| SchemaError::MalformedDescriptor {
                    path: path.clone(),
                    reason: format!("{tag} requires a document parameter with {KEY_INDEX:?} and {KEY_DATA:?}"),
                })?;
            let index_doc = param.get_document(KEY_INDEX).map_err(|_| SchemaError::MalformedDescriptor {
                path: path.clone(),
                reason: format!("{tag} parameter missing {KEY_INDEX:?}"),
            })?;
            let value_doc = param.get_document(KEY_DATA).map_err(|_| SchemaError::MalformedDescriptor {
                path: path.clone(),
                reason: format!("{tag} parameter missing {KEY_DATA:?}"),
            })?;
            let index = decode_descriptor_at(index_doc, &path.prefixed("i"))?;
            let value = decode_descriptor_at(value_doc, &path.prefixed("d"))?;
            Schema::dictionary(ordered, index, value).map_err(|e| e.at_path(path))
        }

        "list" => {
            let param = doc
                .get_document(KEY_PARAM)
                .map_err(|_| SchemaError::MalformedDescriptor {
                    path: path.clone(),
                    reason: "list requires a document parameter".to_string(),
                })?;
            let value = decode_descriptor_at(param, &path.prefixed("value"))?;
            Ok(Schema::List { value: Box::new(value) })
        }

        "struct" => {
            let params = doc.get_array(KEY_PARAM).map_err(|_| SchemaError::MalformedDescriptor {
                path: path.clone(),
                reason: "struct requires an array parameter".to_string(),
            })?;
            let mut fields = Vec::with_capacity(params.len());
            for entry in params {
                let field_doc = entry.as_document().ok_or_else(|| SchemaError::MalformedDescriptor {
                    path: path.clone(),
                    reason: "struct field entries must be documents".to_string(),
                })?;
                let name = require_str(field_doc, KEY_NAME, path)?.to_string();
                let field = decode_descriptor_at(field_doc, &path.prefixed(format!("f[{name}]")))?;
                fields.push((name, field));
            }
            Schema::struct_(fields).map_err(|e| e.at_path(path))
        }

        other => Err(SchemaError::UnknownTag {
            path: path.clone(),
            tag: other.to_string(),
        }),
    }
}

// Smart constructors build errors with an empty path (they have no path of their own);
// this attaches the path of the descriptor currently being decoded.
impl SchemaError {
    fn at_path(self, path: &ErrorPath) -> Self {
        if path.is_root() {
            self
        } else {
            self.prefixed(path.to_string())
        }
    }
}

fn js_const(value: &str) -> Value {
    json!({ "const": value })
}

fn js_int32() -> Value {
    json!({ "type": "integer", "minimum": -2147483648i64, "maximum": 2147483647i64 })
}

fn js_int64_extjson() -> Value {
    json!({
        "type": "object",
        "required": ["$numberLong"],
        "properties": { "$numberLong": { "type": "string" } },
        "additionalProperties": false
    })
}

fn js_binary_extjson() -> Value {
    json!({
        "type": "object",
        "required": ["$binary"],
        "properties": {
            "$binary": {
                "type": "object",
                "required": ["base64", "subType"],
                "properties": {
                    "base64": { "type": "string" },
                    "subType": { "type": "string" }
                }
            }
        },
        "additionalProperties": false
    })
}

fn js_string() -> Value {
    json!({ "type": "string" })
}

impl Schema {
    /// A minimal `{t, [p]}`-only JSON-Schema fragment, used to describe the `p` slot of
    /// a parent schema's descriptor (§2b) without repeating the full array-document
    /// shape produced by [`Schema::json_schema`].
    pub fn type_schema(&self) -> Value {
        let mut properties = Map::new();
        properties.insert(KEY_TYPE.to_string(), js_const(&self.name()));
        let mut required = vec![KEY_TYPE.to_string()];

        if let Some(param) = self.param_type_schema() {
            properties.insert(KEY_PARAM.to_string(), param);
            required.push(KEY_PARAM.to_string());
        }

        json!({
            "type": "object",
            "required": required,
            "properties": properties,
        })
    }

    fn param_type_schema(&self) -> Option<Value> {
        match self {
            Schema::Opaque { .. } => Some(js_int32()),
            Schema::Timestamp { tz: Some(_), .. } => Some(js_string()),
            Schema::Dictionary { index, value, .. } => Some(json!({
                "type": "object",
                "required": [KEY_INDEX, KEY_DATA],
                "properties": {
                    KEY_INDEX: index.type_schema(),
                    KEY_DATA: value.type_schema(),
                }
            })),
            Schema::List { value } => Some(value.type_schema()),
            Schema::Struct { fields } => Some(json!({
                "type": "array",
                "items": fields.iter().map(|(name, field)| {
                    let mut schema = field.type_schema();
                    if let Value::Object(map) = &mut schema {
                        if let Some(Value::Array(required)) = map.get_mut("required") {
                            required.push(Value::String(KEY_NAME.to_string()));
                        }
                        if let Some(Value::Object(props)) = map.get_mut("properties") {
                            props.insert(KEY_NAME.to_string(), json!({ "const": name }));
                        }
                    }
                    schema
                }).collect::<Vec<_>>(),
                "minItems": fields.len(),
                "maxItems": fields.len(),
            })),
            _ => None,
        }
    }

    /// A JSON-Schema describing the shape of a valid canonical-JSON encoding of an
    /// array document of this schema (§4.2). Self-sufficient: rejects every document
    /// the decoder would reject for structural reasons.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        properties.insert(KEY_TYPE.to_string(), js_const(&self.name()));
        properties.insert(KEY_MASK.to_string(), js_binary_extjson());

        let mut required = vec![KEY_TYPE.to_string(), KEY_MASK.to_string(), KEY_DATA.to_string()];

        match self {
            Schema::Null => {
                properties.insert(KEY_DATA.to_string(), js_int64_extjson());
            }
            Schema::Bytes | Schema::Utf8 => {
                properties.insert(KEY_DATA.to_string(), js_binary_extjson());
                properties.insert(KEY_COUNTS.to_string(), js_binary_extjson());
                required.push(KEY_COUNTS.to_string());
            }
            Schema::List { value } => {
                properties.insert(KEY_DATA.to_string(), value.json_schema());
                properties.insert(KEY_COUNTS.to_string(), js_binary_extjson());
                required.push(KEY_COUNTS.to_string());
            }
            Schema::Dictionary { index, value, .. } => {
                properties.insert(
                    KEY_DATA.to_string(),
                    json!({
                        "type": "object",
                        "required": [KEY_INDEX, KEY_DATA],
                        "properties": {
                            KEY_INDEX: index.json_schema(),
                            KEY_DATA: value.json_schema(),
                        }
                    }),
                );
            }
            Schema::Struct { fields } => {
                let mut field_props = Map::new();
                let mut field_required = Vec::with_capacity(fields.len());
                for (name, field) in fields {
                    field_props.insert(name.clone(), field.json_schema());
                    field_required.push(Value::String(name.clone()));
                }
                properties.insert(
                    KEY_DATA.to_string(),
                    json!({
                        "type": "object",
                        "required": [KEY_LENGTH, KEY_FIELDS],
                        "properties": {
                            KEY_LENGTH: js_int64_extjson(),
                            KEY_FIELDS: {
                                "type": "object",
                                "required": field_required,
                                "properties": field_props,
                            }
                        }
                    }),
                );
            }
            _ => {
                properties.insert(KEY_DATA.to_string(), js_binary_extjson());
            }
        }

        if let Some(param) = self.param_type_schema() {
            properties.insert(KEY_PARAM.to_string(), param);
            required.push(KEY_PARAM.to_string());
        }

        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "required": required,
            "properties": properties,
        })
    }
}
