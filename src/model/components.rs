//! Street network components - nodes, edges and their classification state

use std::collections::BTreeMap;

use geo::{LineString, Point};
use serde::{Deserialize, Serialize};

use crate::{OsmNodeId, ScaleLevel};

// Common OSM keys used by the classifier. Keys read in a single place
// are not worth naming here.
pub const HIGHWAY: &str = "highway";
pub const FOOTWAY: &str = "footway";
pub const JUNCTION: &str = "junction";
pub const CROSSING: &str = "crossing";
pub const CROSSING_ISLAND: &str = "crossing:island";
pub const NAME: &str = "name";

/// OSM `key=value` attributes of a node or an edge.
///
/// Backed by a sorted map so that serialized output and iteration order
/// are reproducible across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// True when the tag is present with exactly this value.
    pub fn is(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn highway(&self) -> Option<&str> {
        self.get(HIGHWAY)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(NAME)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Semantic class assigned to a node or an edge by the region classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Part of a crossing body.
    Crossing,
    /// Part of an approach street leading into a crossing.
    Branch,
    /// Pedestrian-only element alongside the roadway.
    Sidewalk,
    /// Traffic island inside a crossing.
    Island,
    #[default]
    Unknown,
}

impl ElementKind {
    /// Elements a candidate-crossroad ring may be built from.
    pub fn is_crossroad_candidate(self) -> bool {
        matches!(self, ElementKind::Crossing | ElementKind::Island)
    }
}

/// Street graph node
#[derive(Debug, Clone)]
pub struct StreetNode {
    /// OSM ID of the node
    pub id: OsmNodeId,
    /// Node coordinates (lng, lat)
    pub geometry: Point<f64>,
    pub tags: Tags,
    /// Classification state. Written by the region classifier only.
    pub kind: ElementKind,
    pub scale_level: ScaleLevel,
}

impl StreetNode {
    pub fn new(id: OsmNodeId, geometry: Point<f64>, tags: Tags) -> Self {
        Self {
            id,
            geometry,
            tags,
            kind: ElementKind::Unknown,
            scale_level: 0,
        }
    }
}

/// Street graph edge (street segment)
#[derive(Debug, Clone)]
pub struct StreetEdge {
    /// Segment geometry, endpoints included
    pub geometry: LineString<f64>,
    /// Segment length in meters, precomputed at load time
    pub length: f64,
    pub tags: Tags,
    /// Classification state. Written by the region classifier only.
    pub kind: ElementKind,
    pub scale_level: ScaleLevel,
}

impl StreetEdge {
    pub fn new(geometry: LineString<f64>, length: f64, tags: Tags) -> Self {
        Self {
            geometry,
            length,
            tags,
            kind: ElementKind::Unknown,
            scale_level: 0,
        }
    }

    /// Highway class of the edge, with `*_link` ways collapsed onto
    /// their parent class and untagged ways reported as `None`.
    pub fn highway_class(&self) -> Option<&str> {
        self.tags
            .highway()
            .map(|h| h.strip_suffix("_link").unwrap_or(h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_typed_accessors() {
        let tags: Tags = [(HIGHWAY, "residential"), (NAME, "Main St")]
            .into_iter()
            .collect();
        assert_eq!(tags.highway(), Some("residential"));
        assert_eq!(tags.name(), Some("Main St"));
        assert!(tags.is(HIGHWAY, "residential"));
        assert!(!tags.contains(JUNCTION));
    }

    #[test]
    fn highway_link_collapses_to_parent_class() {
        let edge = StreetEdge::new(
            LineString::new(vec![]),
            0.0,
            [(HIGHWAY, "primary_link")].into_iter().collect(),
        );
        assert_eq!(edge.highway_class(), Some("primary"));
    }

    #[test]
    fn unknown_is_default_kind() {
        assert_eq!(ElementKind::default(), ElementKind::Unknown);
        assert!(!ElementKind::Unknown.is_crossroad_candidate());
        assert!(ElementKind::Island.is_crossroad_candidate());
    }
}
