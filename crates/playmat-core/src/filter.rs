//! Feature filter expressions.
//!
//! A small subset of the GL "legacy" filter language: enough to select
//! road features by their `class` and `type` tags and their geometry
//! type. Missing properties follow GL semantics: `==` and `in` do not
//! match, `!=` does.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Geometry type of a vector feature (the `$type` pseudo-property).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    /// Point or multi-point.
    Point,
    /// Line string or multi-line string.
    LineString,
    /// Polygon or multi-polygon.
    Polygon,
}

impl GeometryType {
    /// Name as it appears in filter expressions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
        }
    }
}

/// Read access to the tags a filter inspects.
pub trait FeatureProperties {
    /// Geometry type of the feature.
    fn geometry_type(&self) -> GeometryType;

    /// String value of a property, if present.
    fn property(&self, key: &str) -> Option<&str>;
}

/// Owned tag set, handy for tests and simple feature stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureTags {
    /// Geometry type.
    pub geometry: GeometryType,
    /// String properties such as `class` and `type`.
    pub properties: BTreeMap<String, String>,
}

impl FeatureTags {
    /// A line feature with the given `class` and optional `type`.
    #[must_use]
    pub fn line(class: &str, kind: Option<&str>) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("class".to_string(), class.to_string());
        if let Some(kind) = kind {
            properties.insert("type".to_string(), kind.to_string());
        }
        Self {
            geometry: GeometryType::LineString,
            properties,
        }
    }
}

impl FeatureProperties for FeatureTags {
    fn geometry_type(&self) -> GeometryType {
        self.geometry
    }

    fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// A boolean expression over feature tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    /// Every sub-filter matches. Empty matches everything.
    All(Vec<Self>),
    /// At least one sub-filter matches. Empty matches nothing.
    Any(Vec<Self>),
    /// Geometry type equals.
    GeometryIs(GeometryType),
    /// Property equals value.
    Eq(String, String),
    /// Property is absent or differs from value.
    Ne(String, String),
    /// Property is one of the values.
    In(String, Vec<String>),
}

impl Filter {
    /// `key == value`.
    #[must_use]
    pub fn eq(key: &str, value: &str) -> Self {
        Self::Eq(key.to_string(), value.to_string())
    }

    /// `key != value`.
    #[must_use]
    pub fn ne(key: &str, value: &str) -> Self {
        Self::Ne(key.to_string(), value.to_string())
    }

    /// `key in values`.
    #[must_use]
    pub fn one_of(key: &str, values: &[&str]) -> Self {
        Self::In(
            key.to_string(),
            values.iter().map(|v| (*v).to_string()).collect(),
        )
    }

    /// Evaluate against a feature.
    #[must_use]
    pub fn matches<F: FeatureProperties + ?Sized>(&self, feature: &F) -> bool {
        match self {
            Self::All(filters) => filters.iter().all(|f| f.matches(feature)),
            Self::Any(filters) => filters.iter().any(|f| f.matches(feature)),
            Self::GeometryIs(ty) => feature.geometry_type() == *ty,
            Self::Eq(key, value) => feature.property(key) == Some(value.as_str()),
            Self::Ne(key, value) => feature.property(key) != Some(value.as_str()),
            Self::In(key, values) => feature
                .property(key)
                .is_some_and(|p| values.iter().any(|v| v == p)),
        }
    }
}
