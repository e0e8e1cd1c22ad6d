//! Parsed GeoJSON: a FeatureCollection reduced to typed geometries plus raw
//! property maps. Reading files is the caller's job.

use foundation::geometry::{GeoPoint, Geometry};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct VectorFeature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: Geometry,
}

impl VectorFeature {
    pub fn new(properties: Map<String, Value>, geometry: Geometry) -> Self {
        Self {
            id: None,
            properties,
            geometry,
        }
    }

    /// Non-empty, trimmed string property.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        match self.properties.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    }

    /// Numeric property; numeric strings (`"3"`) are accepted as well.
    pub fn property_f64(&self, key: &str) -> Option<f64> {
        let v = match self.properties.get(key)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        v.is_finite().then_some(v)
    }

    /// First key in `keys` holding a usable string.
    pub fn first_property_str(&self, keys: &[String]) -> Option<&str> {
        keys.iter().find_map(|k| self.property_str(k))
    }

    pub fn first_property_f64(&self, keys: &[String]) -> Option<f64> {
        keys.iter().find_map(|k| self.property_f64(k))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<VectorFeature>,
    /// Features dropped because their geometry was missing or malformed.
    pub skipped: usize,
}

#[derive(Debug)]
pub enum GeoJsonError {
    Json(serde_json::Error),
    NotAFeatureCollection,
}

impl std::fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoJsonError::Json(e) => write!(f, "JSON parse error: {e}"),
            GeoJsonError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
        }
    }
}

impl std::error::Error for GeoJsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoJsonError::Json(e) => Some(e),
            GeoJsonError::NotAFeatureCollection => None,
        }
    }
}

impl From<serde_json::Error> for GeoJsonError {
    fn from(e: serde_json::Error) -> Self {
        GeoJsonError::Json(e)
    }
}

impl FeatureCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_geojson_value(&value)
    }

    /// Only the envelope is strict. A feature that is not an object or whose
    /// geometry cannot be read is skipped and counted.
    pub fn from_geojson_value(value: &Value) -> Result<Self, GeoJsonError> {
        let obj = value
            .as_object()
            .ok_or(GeoJsonError::NotAFeatureCollection)?;
        if obj.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(GeoJsonError::NotAFeatureCollection);
        }
        let features_val = obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or(GeoJsonError::NotAFeatureCollection)?;

        let mut out = FeatureCollection::default();
        for (index, feat_val) in features_val.iter().enumerate() {
            match parse_feature(feat_val) {
                Ok(feature) => out.features.push(feature),
                Err(reason) => {
                    debug!(index, %reason, "skipping malformed feature");
                    out.skipped += 1;
                }
            }
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn parse_feature(value: &Value) -> Result<VectorFeature, String> {
    let feat_obj = value
        .as_object()
        .ok_or("feature must be an object".to_string())?;

    let id = match feat_obj.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let properties = feat_obj
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let geometry_val = feat_obj
        .get("geometry")
        .filter(|g| !g.is_null())
        .ok_or("feature missing geometry".to_string())?;
    let geometry = parse_geometry(geometry_val)?;

    Ok(VectorFeature {
        id,
        properties,
        geometry,
    })
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry missing type".to_string())?;
    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_point(coords)?)),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_points(coords)?)),
        "LineString" => Ok(Geometry::LineString(parse_points(coords)?)),
        "MultiLineString" => Ok(Geometry::MultiLineString(parse_rings(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_rings(coords)?)),
        "MultiPolygon" => {
            let polys = coords
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            polys.iter().map(parse_rings).collect::<Result<_, _>>().map(Geometry::MultiPolygon)
        }
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_point(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    let (Some(lon), Some(lat)) = (
        arr.first().and_then(Value::as_f64),
        arr.get(1).and_then(Value::as_f64),
    ) else {
        return Err("position must start with numeric [lon, lat]".to_string());
    };
    Ok(GeoPoint::new(lon, lat))
}

fn parse_points(coords: &Value) -> Result<Vec<GeoPoint>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_rings(coords: &Value) -> Result<Vec<Vec<GeoPoint>>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array of lines".to_string())?;
    arr.iter().map(parse_points).collect()
}

#[cfg(test)]
mod tests {
    use super::{FeatureCollection, GeoJsonError};
    use foundation::geometry::{GeoPoint, Geometry};
    use pretty_assertions::assert_eq;

    const LABELS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": 7,
             "properties": {"sr_sov_a3": "FRA", "sr_subunit": " France ", "scalerank": "2"},
             "geometry": {"type": "Point", "coordinates": [2.5, 46.5]}},
            {"type": "Feature", "properties": {"name": "nowhere"}, "geometry": null},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "GeometryCollection", "coordinates": []}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "MultiLineString",
                          "coordinates": [[[0, 0], [1, 1]], [[2, 2], [3, 3]]]}},
            "not a feature"
        ]
    }"#;

    #[test]
    fn parses_and_skips_malformed_features() {
        let fc = FeatureCollection::from_geojson_str(LABELS).unwrap();
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.skipped, 3);
        assert_eq!(fc.features[0].id.as_deref(), Some("7"));
        assert_eq!(
            fc.features[0].geometry,
            Geometry::Point(GeoPoint::new(2.5, 46.5))
        );
        assert!(matches!(
            fc.features[1].geometry,
            Geometry::MultiLineString(ref lines) if lines.len() == 2
        ));
    }

    #[test]
    fn property_accessors_trim_and_coerce() {
        let fc = FeatureCollection::from_geojson_str(LABELS).unwrap();
        let f = &fc.features[0];
        assert_eq!(f.property_str("sr_subunit"), Some("France"));
        assert_eq!(f.property_f64("scalerank"), Some(2.0));
        assert_eq!(f.property_str("missing"), None);
        let keys = vec!["sr_adm0_a3".to_string(), "sr_sov_a3".to_string()];
        assert_eq!(f.first_property_str(&keys), Some("FRA"));
    }

    #[test]
    fn rejects_non_collections() {
        assert!(matches!(
            FeatureCollection::from_geojson_str(r#"{"type": "Feature"}"#),
            Err(GeoJsonError::NotAFeatureCollection)
        ));
        assert!(matches!(
            FeatureCollection::from_geojson_str("{"),
            Err(GeoJsonError::Json(_))
        ));
    }
}
