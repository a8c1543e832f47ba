//! Place search against a remote geocoding service.
//!
//! The UI never talks to the network directly: requests go through
//! [`worker::GeocodeWorker`], which runs a [`Geocoder`] on its own thread.

mod nominatim;
pub mod worker;

pub use nominatim::{parse_places, Nominatim};

use crate::data::geometry_outlines;
use crate::geo::{Bounds, LineString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoder responded with status {0}")]
    Status(u16),
    #[error("could not decode geocoder response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("region not found or does not include geometry")]
    NoGeometry,
}

/// One search result
#[derive(Clone, Debug, Deserialize)]
pub struct Place {
    pub display_name: String,
    #[serde(deserialize_with = "number_or_string")]
    pub lat: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub lon: f64,
    #[serde(default, rename = "boundingbox", deserialize_with = "bounding_box")]
    pub bbox: Option<Bounds>,
    /// Present when the request asked for polygon output
    #[serde(default, rename = "geojson")]
    pub geometry: Option<geojson::Geometry>,
}

/// The service sends coordinates as JSON strings
#[derive(Deserialize)]
#[serde(untagged)]
enum Coord {
    Number(f64),
    Text(String),
}

impl Coord {
    fn value(&self) -> Option<f64> {
        match self {
            Coord::Number(v) => Some(*v),
            Coord::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Coord::deserialize(deserializer)?
        .value()
        .ok_or_else(|| serde::de::Error::custom("coordinate is not a number"))
}

/// `[min_lat, max_lat, min_lon, max_lon]`
fn bounding_box<'de, D>(deserializer: D) -> Result<Option<Bounds>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Coord>>::deserialize(deserializer)?;
    let values: Option<Vec<f64>> = raw.and_then(|v| v.iter().map(Coord::value).collect());
    Ok(match values.as_deref() {
        Some(&[min_lat, max_lat, min_lon, max_lon]) => {
            Some(Bounds::new(min_lon, min_lat, max_lon, max_lat))
        }
        _ => None,
    })
}

/// Search backend used by the worker
pub trait Geocoder {
    /// Autocomplete candidates for a partial query
    fn suggest(&self, query: &str, limit: usize) -> Result<Vec<Place>, GeocodeError>;

    /// Best match for a query, which must carry a geometry
    fn lookup_region(&self, query: &str) -> Result<Place, GeocodeError>;
}

/// A highlighted area on the map
#[derive(Clone, Debug)]
pub struct Region {
    pub name: String,
    pub outlines: Vec<LineString>,
    pub bounds: Bounds,
    /// Where to mark the region when its geometry is a bare point
    pub anchor: (f64, f64),
}

impl Region {
    /// Build the overlay for a place. `None` when the place has no geometry.
    pub fn from_place(place: &Place) -> Option<Self> {
        let geometry = place.geometry.as_ref()?;
        let outlines = geometry_outlines(geometry);

        let bounds = Bounds::from_points(outlines.iter().flatten().copied())
            .or(place.bbox)
            .unwrap_or_else(|| Bounds::new(place.lon, place.lat, place.lon, place.lat));

        let anchor = match &geometry.value {
            geojson::Value::Point(c) if c.len() >= 2 => (c[0], c[1]),
            _ => (place.lon, place.lat),
        };

        Some(Self {
            name: place.display_name.clone(),
            outlines,
            bounds,
            anchor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYROL: &str = r#"[{
        "place_id": 1234,
        "lat": "47.2224", "lon": "11.5261",
        "display_name": "Tyrol, Austria",
        "boundingbox": ["46.6", "47.8", "10.1", "12.9"],
        "geojson": {"type": "Polygon", "coordinates": [[
            [10.1, 47.0], [12.9, 46.6], [12.9, 47.8], [10.1, 47.8], [10.1, 47.0]
        ]]}
    }]"#;

    #[test]
    fn test_place_decodes_string_coordinates() {
        let places = parse_places(TYROL).unwrap();
        assert_eq!(places.len(), 1);
        let place = &places[0];
        assert_eq!(place.display_name, "Tyrol, Austria");
        assert_eq!((place.lon, place.lat), (11.5261, 47.2224));
        assert_eq!(place.bbox, Some(Bounds::new(10.1, 46.6, 12.9, 47.8)));
        assert!(place.geometry.is_some());
    }

    #[test]
    fn test_region_bounds_from_outline() {
        let place = parse_places(TYROL).unwrap().remove(0);
        let region = Region::from_place(&place).unwrap();
        assert_eq!(region.outlines.len(), 1);
        assert_eq!(region.bounds, Bounds::new(10.1, 46.6, 12.9, 47.8));
        assert_eq!(region.anchor, (11.5261, 47.2224));
    }

    #[test]
    fn test_point_region_anchors_on_point() {
        let places = parse_places(
            r#"[{"lat": 45.92, "lon": 6.87, "display_name": "Chamonix",
                 "geojson": {"type": "Point", "coordinates": [6.8694, 45.9237]}}]"#,
        )
        .unwrap();
        let region = Region::from_place(&places[0]).unwrap();
        assert!(region.outlines.is_empty());
        assert_eq!(region.anchor, (6.8694, 45.9237));
        assert!(region.bounds.is_point());
    }

    #[test]
    fn test_place_without_geometry_is_not_a_region() {
        let places = parse_places(
            r#"[{"lat": "1", "lon": "2", "display_name": "Somewhere", "boundingbox": ["0", "1"]}]"#,
        )
        .unwrap();
        assert_eq!(places[0].bbox, None);
        assert!(Region::from_place(&places[0]).is_none());
    }
}
