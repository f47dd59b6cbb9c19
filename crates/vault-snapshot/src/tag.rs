//! Item tag trees with exact numeric round-tripping.
//!
//! Item metadata is an arbitrary nested key-value structure. Some of its
//! numeric leaves are 64-bit unique identifiers, so the JSON bridge must
//! never collapse numbers to `f64`: integers decode to the narrowest exact
//! width (8 → 16 → 32 → 64 bits) and only genuine floating-point literals
//! become `Double`.

use std::collections::BTreeMap;

use serde_json::Value;

/// A compound tag: string keys mapped to tag values.
pub type TagCompound = BTreeMap<String, TagValue>;

/// A single tag value.
///
/// Integer variants are kept canonical: the narrowest width that represents
/// the value exactly. Use [`TagValue::int`] instead of picking a variant by
/// hand so that equality after a round-trip is structural.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    List(Vec<TagValue>),
    Compound(TagCompound),
}

impl TagValue {
    /// Build an integer tag with the narrowest width that holds `value`.
    #[must_use]
    pub fn int(value: i64) -> Self {
        if let Ok(byte) = i8::try_from(value) {
            Self::Byte(byte)
        } else if let Ok(short) = i16::try_from(value) {
            Self::Short(short)
        } else if let Ok(int) = i32::try_from(value) {
            Self::Int(int)
        } else {
            Self::Long(value)
        }
    }

    /// The integer value, if this tag is any integer width.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Byte(v) => Some(i64::from(*v)),
            Self::Short(v) => Some(i64::from(*v)),
            Self::Int(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to a JSON value.
    ///
    /// Non-finite doubles have no JSON representation and serialize as null.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(v) => Value::Bool(*v),
            Self::Byte(v) => Value::from(i64::from(*v)),
            Self::Short(v) => Value::from(i64::from(*v)),
            Self::Int(v) => Value::from(i64::from(*v)),
            Self::Long(v) => Value::from(*v),
            Self::Double(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
            Self::String(v) => Value::String(v.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Compound(map) => Value::Object(compound_to_json(map)),
        }
    }

    /// Decode a JSON value into a tag.
    ///
    /// Returns `None` for JSON null, which has no tag counterpart; compound
    /// entries and list elements that decode to `None` are dropped.
    #[must_use]
    pub fn from_json(json: &Value) -> Option<Self> {
        match json {
            Value::Null => None,
            Value::Bool(v) => Some(Self::Bool(*v)),
            Value::Number(number) => Some(number_to_tag(number)),
            Value::String(v) => Some(Self::String(v.clone())),
            Value::Array(items) => {
                Some(Self::List(items.iter().filter_map(Self::from_json).collect()))
            }
            Value::Object(map) => {
                let mut compound = TagCompound::new();
                for (key, value) in map {
                    if let Some(tag) = Self::from_json(value) {
                        compound.insert(key.clone(), tag);
                    }
                }
                Some(Self::Compound(compound))
            }
        }
    }
}

/// Convert a compound to a JSON object map.
#[must_use]
pub fn compound_to_json(compound: &TagCompound) -> serde_json::Map<String, Value> {
    compound
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

/// Decode a JSON object into a compound. Non-object input yields `None`.
#[must_use]
pub fn compound_from_json(json: &Value) -> Option<TagCompound> {
    match TagValue::from_json(json) {
        Some(TagValue::Compound(compound)) => Some(compound),
        _ => None,
    }
}

/// Decode a JSON number, trying integer widths before falling back to f64.
///
/// `serde_json` keeps the integer/float distinction from the source text, so
/// `2` becomes `Byte(2)` while `2.0` stays `Double(2.0)`.
fn number_to_tag(number: &serde_json::Number) -> TagValue {
    if let Some(value) = number.as_i64() {
        TagValue::int(value)
    } else {
        // Either a float literal or an integer above i64::MAX; the latter
        // does not exist in tag data produced by the game.
        TagValue::Double(number.as_f64().unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_picks_narrowest_width() {
        assert_eq!(TagValue::int(0), TagValue::Byte(0));
        assert_eq!(TagValue::int(-128), TagValue::Byte(-128));
        assert_eq!(TagValue::int(128), TagValue::Short(128));
        assert_eq!(TagValue::int(-40_000), TagValue::Int(-40_000));
        assert_eq!(TagValue::int(3_000_000_000), TagValue::Long(3_000_000_000));
        assert_eq!(TagValue::int(i64::MAX), TagValue::Long(i64::MAX));
    }

    #[test]
    fn json_round_trip_keeps_widths() {
        let mut compound = TagCompound::new();
        compound.insert("small".into(), TagValue::int(7));
        compound.insert("medium".into(), TagValue::int(1234));
        compound.insert("large".into(), TagValue::int(70_000));
        compound.insert("id".into(), TagValue::Long(i64::MAX - 1));
        compound.insert("ratio".into(), TagValue::Double(0.1));
        let tag = TagValue::Compound(compound);

        let text = serde_json::to_string(&tag.to_json()).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(TagValue::from_json(&parsed), Some(tag));
    }

    #[test]
    fn sixty_four_bit_id_survives_text_round_trip() {
        // The value that motivates the custom decoder: a naive f64 decode
        // would land on a nearby representable double instead.
        let id = 9_007_199_254_740_993_i64; // 2^53 + 1
        let tag = TagValue::int(id);
        let text = serde_json::to_string(&tag.to_json()).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(TagValue::from_json(&parsed), Some(TagValue::Long(id)));
    }

    #[test]
    fn whole_double_stays_a_double() {
        let tag = TagValue::Double(2.0);
        let text = serde_json::to_string(&tag.to_json()).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(TagValue::from_json(&parsed), Some(TagValue::Double(2.0)));
    }

    #[test]
    fn nested_structures_round_trip() {
        let mut inner = TagCompound::new();
        inner.insert("flag".into(), TagValue::Bool(true));
        inner.insert("name".into(), TagValue::String("Excalibur".into()));
        let tag = TagValue::List(vec![
            TagValue::Compound(inner),
            TagValue::int(300),
            TagValue::Double(-1.5),
        ]);

        let json = tag.to_json();
        assert_eq!(TagValue::from_json(&json), Some(tag));
    }

    #[test]
    fn null_entries_are_dropped() {
        let parsed: Value = serde_json::from_str(r#"{"keep": 1, "drop": null}"#).unwrap();
        let compound = compound_from_json(&parsed).unwrap();
        assert_eq!(compound.len(), 1);
        assert_eq!(compound.get("keep"), Some(&TagValue::Byte(1)));
    }
}
