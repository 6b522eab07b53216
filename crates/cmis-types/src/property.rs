use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::PropertyFilter;

/// Well-known CMIS property ids.
pub mod property_ids {
    pub const OBJECT_ID: &str = "cmis:objectId";
    pub const OBJECT_TYPE_ID: &str = "cmis:objectTypeId";
    pub const BASE_TYPE_ID: &str = "cmis:baseTypeId";
    pub const NAME: &str = "cmis:name";
    pub const CHANGE_TOKEN: &str = "cmis:changeToken";
    pub const CREATION_DATE: &str = "cmis:creationDate";
    pub const LAST_MODIFICATION_DATE: &str = "cmis:lastModificationDate";
    pub const SECONDARY_OBJECT_TYPE_IDS: &str = "cmis:secondaryObjectTypeIds";
    pub const PARENT_ID: &str = "cmis:parentId";
    pub const PATH: &str = "cmis:path";
    pub const SOURCE_ID: &str = "cmis:sourceId";
    pub const TARGET_ID: &str = "cmis:targetId";
    pub const POLICY_TEXT: &str = "cmis:policyText";
    pub const CONTENT_STREAM_LENGTH: &str = "cmis:contentStreamLength";
    pub const CONTENT_STREAM_MIME_TYPE: &str = "cmis:contentStreamMimeType";
    pub const CONTENT_STREAM_FILE_NAME: &str = "cmis:contentStreamFileName";
    pub const VERSION_SERIES_ID: &str = "cmis:versionSeriesId";
    pub const VERSION_LABEL: &str = "cmis:versionLabel";
    pub const IS_MAJOR_VERSION: &str = "cmis:isMajorVersion";
    pub const IS_LATEST_VERSION: &str = "cmis:isLatestVersion";
    pub const IS_VERSION_SERIES_CHECKED_OUT: &str = "cmis:isVersionSeriesCheckedOut";
}

/// A typed, possibly multi-valued property value.
///
/// Single-valued properties are one-element vectors. An empty vector is a
/// "not set" value; on update it clears the property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum PropertyValue {
    String(Vec<String>),
    Id(Vec<String>),
    Integer(Vec<i64>),
    Decimal(Vec<f64>),
    Boolean(Vec<bool>),
    DateTime(Vec<DateTime<Utc>>),
    Uri(Vec<String>),
    Html(Vec<String>),
}

impl PropertyValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(vec![value.into()])
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::Id(vec![value.into()])
    }

    pub fn integer(value: i64) -> Self {
        Self::Integer(vec![value])
    }

    pub fn decimal(value: f64) -> Self {
        Self::Decimal(vec![value])
    }

    pub fn boolean(value: bool) -> Self {
        Self::Boolean(vec![value])
    }

    pub fn datetime(value: DateTime<Utc>) -> Self {
        Self::DateTime(vec![value])
    }

    /// Multi-valued id list.
    pub fn ids<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Id(values.into_iter().map(Into::into).collect())
    }

    /// Number of values held.
    pub fn len(&self) -> usize {
        match self {
            Self::String(v) | Self::Id(v) | Self::Uri(v) | Self::Html(v) => v.len(),
            Self::Integer(v) => v.len(),
            Self::Decimal(v) => v.len(),
            Self::Boolean(v) => v.len(),
            Self::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The property type name as used by CMIS.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Id(_) => "id",
            Self::Integer(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::Boolean(_) => "boolean",
            Self::DateTime(_) => "datetime",
            Self::Uri(_) => "uri",
            Self::Html(_) => "html",
        }
    }

    /// First value of a textual property (string, id, uri, html).
    pub fn first_str(&self) -> Option<&str> {
        match self {
            Self::String(v) | Self::Id(v) | Self::Uri(v) | Self::Html(v) => {
                v.first().map(String::as_str)
            }
            _ => None,
        }
    }

    /// All values of a textual property.
    pub fn strings(&self) -> &[String] {
        match self {
            Self::String(v) | Self::Id(v) | Self::Uri(v) | Self::Html(v) => v,
            _ => &[],
        }
    }

    pub fn first_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => v.first().copied(),
            _ => None,
        }
    }

    pub fn first_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => v.first().copied(),
            _ => None,
        }
    }
}

/// Named, typed property values attached to an object.
///
/// Ordered by property id so that snapshots compare and serialize
/// deterministically.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    values: BTreeMap<String, PropertyValue>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, id: impl Into<String>, value: PropertyValue) -> Self {
        self.values.insert(id.into(), value);
        self
    }

    /// Insert or replace a property, returning the previous value.
    pub fn insert(&mut self, id: impl Into<String>, value: PropertyValue) -> Option<PropertyValue> {
        self.values.insert(id.into(), value)
    }

    pub fn get(&self, id: &str) -> Option<&PropertyValue> {
        self.values.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<PropertyValue> {
        self.values.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First textual value of a property, if set.
    pub fn first_str(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(PropertyValue::first_str)
    }

    /// The `cmis:objectTypeId` value, if present and non-empty.
    pub fn object_type_id(&self) -> Option<&str> {
        self.first_str(property_ids::OBJECT_TYPE_ID)
            .filter(|s| !s.is_empty())
    }

    /// The `cmis:name` value, if present.
    pub fn name(&self) -> Option<&str> {
        self.first_str(property_ids::NAME)
    }

    /// Apply an update set: values in `update` replace existing ones, and an
    /// empty value list clears the property.
    pub fn merge(&mut self, update: &Properties) {
        for (id, value) in &update.values {
            if value.is_empty() {
                self.values.remove(id);
            } else {
                self.values.insert(id.clone(), value.clone());
            }
        }
    }

    /// A copy restricted to the properties selected by `filter`.
    pub fn filtered(&self, filter: &PropertyFilter) -> Properties {
        Properties {
            values: self
                .values
                .iter()
                .filter(|(id, _)| filter.selects(id))
                .map(|(id, v)| (id.clone(), v.clone()))
                .collect(),
        }
    }

    /// Returns `true` if every property in `self` appears in `other` with an
    /// equal value.
    pub fn is_subset_of(&self, other: &Properties) -> bool {
        self.values
            .iter()
            .all(|(id, value)| other.values.get(id) == Some(value))
    }
}

impl FromIterator<(String, PropertyValue)> for Properties {
    fn from_iter<T: IntoIterator<Item = (String, PropertyValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_properties() -> Properties {
        Properties::new()
            .with(property_ids::OBJECT_TYPE_ID, PropertyValue::id("cmis:document"))
            .with(property_ids::NAME, PropertyValue::string("a.txt"))
    }

    #[test]
    fn accessors_read_first_value() {
        let props = doc_properties();
        assert_eq!(props.object_type_id(), Some("cmis:document"));
        assert_eq!(props.name(), Some("a.txt"));
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn empty_type_id_counts_as_missing() {
        let props = Properties::new().with(property_ids::OBJECT_TYPE_ID, PropertyValue::id(""));
        assert!(props.object_type_id().is_none());
    }

    #[test]
    fn merge_replaces_and_clears() {
        let mut props = doc_properties().with("custom:tag", PropertyValue::string("x"));
        let update = Properties::new()
            .with(property_ids::NAME, PropertyValue::string("b.txt"))
            .with("custom:tag", PropertyValue::String(vec![]));
        props.merge(&update);
        assert_eq!(props.name(), Some("b.txt"));
        assert!(!props.contains("custom:tag"));
    }

    #[test]
    fn filtered_keeps_selected() {
        let filter = PropertyFilter::parse("cmis:name").unwrap();
        let props = doc_properties().filtered(&filter);
        assert_eq!(props.len(), 1);
        assert!(props.contains(property_ids::NAME));
    }

    #[test]
    fn subset_check() {
        let small = Properties::new().with(property_ids::NAME, PropertyValue::string("a.txt"));
        assert!(small.is_subset_of(&doc_properties()));
        assert!(!doc_properties().is_subset_of(&small));
    }

    #[test]
    fn value_shapes() {
        assert_eq!(PropertyValue::ids(["a", "b"]).len(), 2);
        assert!(PropertyValue::Integer(vec![]).is_empty());
        assert_eq!(PropertyValue::integer(5).first_integer(), Some(5));
        assert_eq!(PropertyValue::boolean(true).type_name(), "boolean");
        assert!(PropertyValue::integer(1).first_str().is_none());
    }

    #[test]
    fn serde_is_tagged() {
        let json = serde_json::to_value(PropertyValue::integer(3)).unwrap();
        assert_eq!(json["type"], "integer");
        assert_eq!(json["values"][0], 3);
    }
}
