// src/types/geometry.rs
//! Boundary geometry as a closed union, parsed once at ingestion.
//!
//! The backend expresses a field boundary as any of: a GeoJSON Polygon, a
//! Feature wrapping one, a FeatureCollection, or a bare coordinate-ring
//! array with no `type` tag at all. [`Boundary::from_value`] resolves all of
//! those into one tagged union so the rest of the engine never touches raw
//! JSON shapes.

use serde_json::Value;
use url::Url;

/// A single vertex; longitude/latitude with an optional altitude tail.
pub type Position = Vec<f64>;

/// A closed ring of vertices.
pub type Ring = Vec<Position>;

/// Every boundary representation the backend is known to emit.
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    /// GeoJSON `Polygon`: an outer ring plus optional holes.
    Polygon { coordinates: Vec<Ring> },
    /// GeoJSON `Feature` wrapping a geometry (which may be absent).
    Feature { geometry: Option<Box<Boundary>> },
    /// GeoJSON `FeatureCollection`.
    FeatureCollection { features: Vec<Boundary> },
    /// A bare coordinate array with no `type` tag.
    Rings(Vec<Ring>),
}

impl Boundary {
    /// Parses any known boundary representation out of a JSON value.
    ///
    /// Returns `None` for nulls, unrecognized tags, and values that carry a
    /// recognized tag but no usable coordinates — the caller treats all of
    /// those identically as "no geometry".
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(_) => parse_rings(value).map(Boundary::Rings),
            Value::Object(obj) => match obj.get("type").and_then(Value::as_str) {
                Some("Polygon") => {
                    let coordinates = parse_rings(obj.get("coordinates")?)?;
                    Some(Boundary::Polygon { coordinates })
                }
                Some("Feature") => {
                    let geometry = obj
                        .get("geometry")
                        .and_then(Boundary::from_value)
                        .map(Box::new);
                    Some(Boundary::Feature { geometry })
                }
                Some("FeatureCollection") => {
                    let features = obj
                        .get("features")?
                        .as_array()?
                        .iter()
                        .filter_map(Boundary::from_value)
                        .collect();
                    Some(Boundary::FeatureCollection { features })
                }
                Some(other) => {
                    log::debug!("ignoring boundary with unrecognized type tag '{}'", other);
                    None
                }
                // An untagged object sometimes wraps the rings directly.
                None => obj
                    .get("coordinates")
                    .and_then(parse_rings)
                    .map(Boundary::Rings),
            },
            _ => None,
        }
    }

    /// Whether this boundary carries at least one vertex.
    ///
    /// An empty Polygon, an empty FeatureCollection, and a Feature with no
    /// geometry all count as empty — presence of a tag is not evidence.
    pub fn has_coordinates(&self) -> bool {
        match self {
            Boundary::Polygon { coordinates } | Boundary::Rings(coordinates) => {
                coordinates.iter().any(|ring| !ring.is_empty())
            }
            Boundary::Feature { geometry } => geometry
                .as_ref()
                .map(|g| g.has_coordinates())
                .unwrap_or(false),
            Boundary::FeatureCollection { features } => {
                features.iter().any(|f| f.has_coordinates())
            }
        }
    }

    /// Total vertex count across all rings, for logging.
    pub fn vertex_count(&self) -> usize {
        match self {
            Boundary::Polygon { coordinates } | Boundary::Rings(coordinates) => {
                coordinates.iter().map(|ring| ring.len()).sum()
            }
            Boundary::Feature { geometry } => {
                geometry.as_ref().map(|g| g.vertex_count()).unwrap_or(0)
            }
            Boundary::FeatureCollection { features } => {
                features.iter().map(|f| f.vertex_count()).sum()
            }
        }
    }
}

/// Parses a nested coordinate array into rings of positions.
///
/// Accepts both `[[lon, lat], ...]` (a single ring) and
/// `[[[lon, lat], ...], ...]` (a ring list), normalizing to the latter.
fn parse_rings(value: &Value) -> Option<Vec<Ring>> {
    let outer = value.as_array()?;
    if outer.is_empty() {
        return Some(vec![]);
    }
    // Single flat ring: first element is a position, not another ring.
    if outer[0].as_array().map(is_position).unwrap_or(false) {
        return Some(vec![outer.iter().filter_map(parse_position).collect()]);
    }
    Some(
        outer
            .iter()
            .filter_map(|ring| {
                let positions = ring.as_array()?;
                Some(positions.iter().filter_map(parse_position).collect())
            })
            .collect(),
    )
}

fn is_position(items: &Vec<Value>) -> bool {
    items.len() >= 2 && items.iter().all(Value::is_number)
}

fn parse_position(value: &Value) -> Option<Position> {
    let items = value.as_array()?;
    let coords: Position = items.iter().filter_map(Value::as_f64).collect();
    (coords.len() >= 2).then_some(coords)
}

/// Reference to an externally stored boundary file (KML/KMZ URL).
///
/// The raw string is kept verbatim — a malformed URL is still evidence that
/// geometry exists somewhere, it just can't be dereferenced from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalFileRef(String);

impl ExternalFileRef {
    /// Wraps a non-empty reference string, logging when it is not a
    /// well-formed URL.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if Url::parse(trimmed).is_err() {
            log::warn!("external boundary file reference is not a valid URL: {}", trimmed);
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_geojson_polygon() {
        let value = json!({
            "type": "Polygon",
            "coordinates": [[[30.1, -1.9], [30.2, -1.9], [30.2, -2.0], [30.1, -1.9]]]
        });
        let boundary = Boundary::from_value(&value).unwrap();
        assert!(boundary.has_coordinates());
        assert_eq!(boundary.vertex_count(), 4);
    }

    #[test]
    fn parses_feature_wrapping_polygon() {
        let value = json!({
            "type": "Feature",
            "geometry": {"type": "Polygon", "coordinates": [[[1.0, 2.0], [3.0, 4.0]]]}
        });
        let boundary = Boundary::from_value(&value).unwrap();
        assert!(boundary.has_coordinates());
    }

    #[test]
    fn feature_without_geometry_is_empty() {
        let value = json!({"type": "Feature", "geometry": null});
        let boundary = Boundary::from_value(&value).unwrap();
        assert!(!boundary.has_coordinates());
    }

    #[test]
    fn parses_bare_ring_array() {
        let value = json!([[30.1, -1.9], [30.2, -1.9], [30.2, -2.0]]);
        let boundary = Boundary::from_value(&value).unwrap();
        assert!(boundary.has_coordinates());
        assert_eq!(boundary.vertex_count(), 3);
    }

    #[test]
    fn parses_nested_ring_list() {
        let value = json!([[[30.1, -1.9], [30.2, -1.9]], [[31.0, -2.0]]]);
        let boundary = Boundary::from_value(&value).unwrap();
        assert_eq!(boundary.vertex_count(), 3);
    }

    #[test]
    fn empty_polygon_has_no_coordinates() {
        let value = json!({"type": "Polygon", "coordinates": []});
        let boundary = Boundary::from_value(&value).unwrap();
        assert!(!boundary.has_coordinates());
    }

    #[test]
    fn empty_feature_collection_has_no_coordinates() {
        let value = json!({"type": "FeatureCollection", "features": []});
        let boundary = Boundary::from_value(&value).unwrap();
        assert!(!boundary.has_coordinates());
    }

    #[test]
    fn unrecognized_type_tag_is_not_geometry() {
        let value = json!({"type": "Point", "coordinates": [30.0, -2.0]});
        assert!(Boundary::from_value(&value).is_none());
    }

    #[test]
    fn null_is_not_geometry() {
        assert!(Boundary::from_value(&Value::Null).is_none());
    }

    #[test]
    fn external_ref_keeps_raw_string() {
        let r = ExternalFileRef::new(" https://files.example.com/b/field.kmz ").unwrap();
        assert_eq!(r.as_str(), "https://files.example.com/b/field.kmz");
        assert!(ExternalFileRef::new("   ").is_none());
    }
}
