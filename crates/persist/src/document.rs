use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use stoon_common::ObjectId;

use crate::error::StoreError;

/// Reserved key carrying the document identifier in serialized form.
pub const ID_FIELD: &str = "_id";

/// An open field bag. The store does not interpret field contents.
pub type Fields = Map<String, Value>;

/// An identity-bearing record.
///
/// The identifier lives outside the field bag; `fields` never contains
/// [`ID_FIELD`]. Serializes as a JSON object whose first key is `_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: ObjectId,
    fields: Fields,
}

/// Outcome of turning one raw snapshot entry back into a [`Document`].
pub(crate) enum Rehydrated {
    Intact(Document),
    /// The `_id` was missing, malformed or already taken, and a fresh one was
    /// assigned.
    Repaired(Document),
    /// The entry was not a JSON object; handed back untouched.
    Skipped(Value),
}

impl Document {
    pub fn new(id: ObjectId, mut fields: Fields) -> Self {
        fields.remove(ID_FIELD);
        Self { id, fields }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// JSON object form including `_id` as its canonical hex string.
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 1);
        map.insert(ID_FIELD.to_owned(), Value::String(self.id.to_hex()));
        map.extend(self.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        Value::Object(map)
    }

    /// Decode into a typed shape. `_id` is included, so types with an
    /// `#[serde(rename = "_id")] id: ObjectId` field pick it up.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_value())
    }

    pub(crate) fn replace_fields(&mut self, mut fields: Fields) -> Fields {
        fields.remove(ID_FIELD);
        std::mem::replace(&mut self.fields, fields)
    }

    /// Rebuild a document from a snapshot entry. `taken` holds the ids of
    /// the entries already loaded; a repeat is repaired like a bad id.
    pub(crate) fn rehydrate(value: Value, taken: &HashSet<ObjectId>) -> Rehydrated {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => return Rehydrated::Skipped(other),
        };
        let id = fields
            .remove(ID_FIELD)
            .and_then(|raw| raw.as_str().and_then(|s| ObjectId::parse_str(s).ok()))
            .filter(|id| !taken.contains(id));
        match id {
            Some(id) => Rehydrated::Intact(Document { id, fields }),
            None => {
                let mut id = ObjectId::new();
                while taken.contains(&id) {
                    id = ObjectId::new();
                }
                Rehydrated::Repaired(Document { id, fields })
            }
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Serialize a caller value into a field bag. Anything other than a JSON
/// object is rejected.
pub(crate) fn to_fields<T: Serialize + ?Sized>(doc: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(doc)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::NotAnObject(json_kind(&other))),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Equality-only query.
///
/// A document matches when every criterion matches. `_id` criteria are
/// compared through the canonical identifier encoding: the value must be a
/// string naming the same [`ObjectId`], in any letter case. All other keys
/// use exact JSON equality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    criteria: Fields,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: ObjectId) -> Self {
        Self::new().eq(ID_FIELD, id.to_hex())
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.criteria.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.criteria.iter().all(|(key, expected)| {
            if key == ID_FIELD {
                id_matches(doc.id, expected)
            } else {
                doc.fields.get(key) == Some(expected)
            }
        })
    }
}

fn id_matches(id: ObjectId, expected: &Value) -> bool {
    expected
        .as_str()
        .and_then(|s| ObjectId::parse_str(s).ok())
        .is_some_and(|other| other == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match Document::rehydrate(value, &HashSet::new()) {
            Rehydrated::Intact(d) | Rehydrated::Repaired(d) => d,
            Rehydrated::Skipped(other) => panic!("skipped {other}"),
        }
    }

    #[test]
    fn new_strips_reserved_field() {
        let fields = json!({"_id": "ignored", "name": "a"})
            .as_object()
            .cloned()
            .unwrap();
        let d = Document::new(ObjectId::new(), fields);
        assert!(d.get(ID_FIELD).is_none());
        assert_eq!(d.get("name"), Some(&json!("a")));
    }

    #[test]
    fn serializes_id_first_as_hex() {
        let id = ObjectId::parse_str("010101010101010101010101").unwrap();
        let d = Document::new(id, json!({"a": 1}).as_object().cloned().unwrap());
        let text = serde_json::to_string(&d).unwrap();
        assert!(text.starts_with(r#"{"_id":"010101010101010101010101""#));
        assert_eq!(d.to_value()["_id"], json!(id.to_hex()));
    }

    #[test]
    fn rehydrate_keeps_valid_id() {
        let id = ObjectId::new();
        match Document::rehydrate(json!({"_id": id.to_hex(), "n": 1}), &HashSet::new()) {
            Rehydrated::Intact(d) => {
                assert_eq!(d.id(), id);
                assert_eq!(d.get("n"), Some(&json!(1)));
            }
            _ => panic!("expected intact document"),
        }
    }

    #[test]
    fn rehydrate_repairs_missing_or_bad_id() {
        let taken = HashSet::new();
        for raw in [json!({"n": 1}), json!({"_id": "xyz", "n": 1}), json!({"_id": 7})] {
            assert!(matches!(
                Document::rehydrate(raw, &taken),
                Rehydrated::Repaired(_)
            ));
        }
        match Document::rehydrate(json!([1, 2]), &taken) {
            Rehydrated::Skipped(value) => assert_eq!(value, json!([1, 2])),
            _ => panic!("expected skipped entry"),
        }
    }

    #[test]
    fn rehydrate_reassigns_taken_id() {
        let id = ObjectId::new();
        let taken = HashSet::from([id]);
        match Document::rehydrate(json!({"_id": id.to_hex(), "n": 2}), &taken) {
            Rehydrated::Repaired(d) => {
                assert_ne!(d.id(), id);
                assert!(!taken.contains(&d.id()));
                assert_eq!(d.get("n"), Some(&json!(2)));
            }
            _ => panic!("expected repaired document"),
        }
    }

    #[test]
    fn filter_matches_all_criteria() {
        let d = doc(json!({"name": "a", "level": 3}));
        assert!(Filter::new().matches(&d));
        assert!(Filter::new().eq("name", "a").matches(&d));
        assert!(Filter::new().eq("name", "a").eq("level", 3).matches(&d));
        assert!(!Filter::new().eq("name", "a").eq("level", 4).matches(&d));
        assert!(!Filter::new().eq("missing", Value::Null).matches(&d));
    }

    #[test]
    fn filter_compares_id_by_canonical_form() {
        let d = doc(json!({"name": "a"}));
        assert!(Filter::by_id(d.id()).matches(&d));

        let upper = d.id().to_hex().to_uppercase();
        assert!(Filter::new().eq(ID_FIELD, upper).matches(&d));
        assert!(!Filter::new().eq(ID_FIELD, "not-an-id").matches(&d));
        assert!(!Filter::by_id(ObjectId::new()).matches(&d));
    }

    #[test]
    fn to_fields_rejects_non_objects() {
        assert!(to_fields(&json!({"a": 1})).is_ok());
        assert!(matches!(
            to_fields(&42),
            Err(StoreError::NotAnObject("a number"))
        ));
    }

    #[test]
    fn decode_includes_id() {
        #[derive(serde::Deserialize)]
        struct Named {
            #[serde(rename = "_id")]
            id: ObjectId,
            name: String,
        }
        let d = doc(json!({"name": "x"}));
        let named: Named = d.decode().unwrap();
        assert_eq!(named.id, d.id());
        assert_eq!(named.name, "x");
    }
}
