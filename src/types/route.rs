use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const MARKER_START: &str = "start";
pub const MARKER_STOP: &str = "stop";
pub const MARKER_PROGRESS: &str = "progress";

/// Identifier of a route feature: segments are numbered, markers are named.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Index(u64),
    Marker(String),
}

impl FeatureId {
    pub fn marker(name: &str) -> Self {
        FeatureId::Marker(name.to_string())
    }

    pub fn is_marker(&self, name: &str) -> bool {
        matches!(self, FeatureId::Marker(m) if m == name)
    }

    /// Markers serialized by some backends carry numeric ids as strings.
    pub fn as_index(&self) -> Option<u64> {
        match self {
            FeatureId::Index(i) => Some(*i),
            FeatureId::Marker(m) => m.parse().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// Coordinates are `[longitude, latitude]`; altitude and any further
    /// position members are dropped on input.
    LineString {
        #[serde(deserialize_with = "positions")]
        coordinates: Vec<[f64; 2]>,
    },
    Point {
        #[serde(deserialize_with = "position")]
        coordinates: [f64; 2],
    },
}

fn position<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[f64; 2], D::Error> {
    let values = Vec::<f64>::deserialize(deserializer)?;
    match values.as_slice() {
        [longitude, latitude, ..] => Ok([*longitude, *latitude]),
        _ => Err(D::Error::invalid_length(values.len(), &"a position of two or more numbers")),
    }
}

fn positions<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<[f64; 2]>, D::Error> {
    #[derive(Deserialize)]
    struct Position(#[serde(deserialize_with = "position")] [f64; 2]);

    let positions = Vec::<Position>::deserialize(deserializer)?;
    Ok(positions.into_iter().map(|p| p.0).collect())
}

impl Geometry {
    pub fn is_line(&self) -> bool {
        matches!(self, Geometry::LineString { .. })
    }

    pub fn first_coordinate(&self) -> Option<[f64; 2]> {
        match self {
            Geometry::LineString { coordinates } => coordinates.first().copied(),
            Geometry::Point { coordinates } => Some(*coordinates),
        }
    }

    pub fn coordinates(&self) -> &[[f64; 2]] {
        match self {
            Geometry::LineString { coordinates } => coordinates,
            Geometry::Point { coordinates } => std::slice::from_ref(coordinates),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    #[default]
    Feature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub id: FeatureId,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteFeature {
    #[serde(rename = "type", default)]
    pub kind: FeatureKind,
    pub properties: FeatureProperties,
    pub geometry: Geometry,
}

impl RouteFeature {
    pub fn segment(id: u64, coordinates: Vec<[f64; 2]>, values: Map<String, Value>) -> Self {
        Self {
            kind: FeatureKind::Feature,
            properties: FeatureProperties {
                id: FeatureId::Index(id),
                values,
            },
            geometry: Geometry::LineString { coordinates },
        }
    }

    pub fn marker(name: &str, coordinate: [f64; 2]) -> Self {
        Self {
            kind: FeatureKind::Feature,
            properties: FeatureProperties {
                id: FeatureId::marker(name),
                values: Map::new(),
            },
            geometry: Geometry::Point {
                coordinates: coordinate,
            },
        }
    }

    pub fn id(&self) -> &FeatureId {
        &self.properties.id
    }

    pub fn value(&self, field: &str) -> Option<f64> {
        self.properties.values.get(field).and_then(Value::as_f64)
    }
}

/// Ordered route description: line segments followed by point markers.
///
/// Accepts both a bare feature array and a `FeatureCollection` object on
/// input; always serializes as a `FeatureCollection`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RouteCollectionRepr")]
pub struct RouteCollection {
    #[serde(rename = "type", serialize_with = "feature_collection_tag")]
    kind: (),
    pub features: Vec<RouteFeature>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RouteCollectionRepr {
    Bare(Vec<RouteFeature>),
    Collection { features: Vec<RouteFeature> },
}

impl From<RouteCollectionRepr> for RouteCollection {
    fn from(repr: RouteCollectionRepr) -> Self {
        match repr {
            RouteCollectionRepr::Bare(features) | RouteCollectionRepr::Collection { features } => {
                Self::new(features)
            }
        }
    }
}

fn feature_collection_tag<S: serde::Serializer>(_: &(), serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str("FeatureCollection")
}

impl RouteCollection {
    pub fn new(features: Vec<RouteFeature>) -> Self {
        Self { kind: (), features }
    }

    pub fn segments(&self) -> impl Iterator<Item = &RouteFeature> {
        self.features.iter().filter(|f| f.geometry.is_line())
    }

    pub fn find(&self, id: &FeatureId) -> Option<&RouteFeature> {
        self.features.iter().find(|f| f.id() == id)
    }

    pub fn find_mut(&mut self, id: &FeatureId) -> Option<&mut RouteFeature> {
        self.features.iter_mut().find(|f| f.id() == id)
    }
}
