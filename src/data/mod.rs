use crate::geo::LineString;
use crate::map::{Lod, MapRenderer};
use anyhow::Result;
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Load the Natural Earth GeoJSON layers found in `data_dir` into the renderer.
/// Missing files are skipped; unreadable ones are logged and skipped.
pub fn load_all_geojson(renderer: &mut MapRenderer, data_dir: &Path) -> Result<()> {
    let coastline_files = [
        ("ne_110m_coastline.json", Lod::Low),
        ("ne_50m_coastline.json", Lod::Medium),
        ("ne_10m_coastline.json", Lod::High),
    ];
    for (filename, lod) in coastline_files {
        load_layer(data_dir, filename, |gj| {
            for_each_outline(&gj, |line| renderer.add_coastline(line, lod))
        });
    }

    let border_files = [
        ("ne_50m_borders.json", Lod::Medium),
        ("ne_10m_borders.json", Lod::High),
    ];
    for (filename, lod) in border_files {
        load_layer(data_dir, filename, |gj| {
            for_each_outline(&gj, |line| renderer.add_border(line, lod))
        });
    }

    load_layer(data_dir, "ne_10m_states.json", |gj| {
        for_each_outline(&gj, |line| renderer.add_state(line))
    });

    load_layer(data_dir, "ne_10m_populated_places.json", |gj| {
        load_places(renderer, gj)
    });

    Ok(())
}

fn load_layer<F>(data_dir: &Path, filename: &str, apply: F)
where
    F: FnOnce(GeoJson),
{
    let path = data_dir.join(filename);
    if !path.exists() {
        return;
    }
    match read_geojson(&path) {
        Ok(gj) => {
            debug!("Loaded {}", path.display());
            apply(gj);
        }
        Err(e) => warn!("Failed to load {}: {}", filename, e),
    }
}

/// Parse a GeoJSON file with simd-json
pub fn read_geojson(path: &Path) -> Result<GeoJson> {
    let mut bytes = fs::read(path)?;
    let geojson: GeoJson = simd_json::serde::from_slice(&mut bytes)?;
    Ok(geojson)
}

/// Populated places become map labels
fn load_places(renderer: &mut MapRenderer, geojson: GeoJson) {
    let GeoJson::FeatureCollection(fc) = geojson else {
        return;
    };

    for feature in fc.features {
        let props = feature.properties.as_ref();

        let name = props
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown")
            .to_string();

        let population = props
            .and_then(|p| p.get("pop_max").or_else(|| p.get("pop_min")))
            .and_then(|v| v.as_f64())
            .map(|v| v as u64)
            .unwrap_or(0);

        if let Some(Value::Point(coords)) = feature.geometry.map(|g| g.value) {
            if coords.len() >= 2 {
                renderer.add_place(coords[0], coords[1], &name, population);
            }
        }
    }
}

/// Visit every drawable outline in a GeoJSON document
fn for_each_outline<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(LineString),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for geometry in fc.features.iter().filter_map(|f| f.geometry.as_ref()) {
                geometry_outlines(geometry).into_iter().for_each(&mut add_line);
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                geometry_outlines(geometry).into_iter().for_each(&mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            geometry_outlines(geometry).into_iter().for_each(&mut add_line);
        }
    }
}

/// Flatten a geometry into lon/lat outlines: every polygon ring (holes
/// included) and every line string. Points carry no outline.
pub fn geometry_outlines(geometry: &Geometry) -> Vec<LineString> {
    let mut lines = Vec::new();
    collect_outlines(&geometry.value, &mut lines);
    lines
}

fn collect_outlines(value: &Value, lines: &mut Vec<LineString>) {
    let to_line = |coords: &Vec<Vec<f64>>| -> LineString {
        coords
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| (c[0], c[1]))
            .collect()
    };

    match value {
        Value::LineString(coords) => lines.push(to_line(coords)),
        Value::MultiLineString(parts) | Value::Polygon(parts) => {
            lines.extend(parts.iter().map(to_line));
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                lines.extend(rings.iter().map(to_line));
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_outlines(&g.value, lines);
            }
        }
        Value::Point(_) | Value::MultiPoint(_) => {}
    }
}

/// Coarse continent outlines used when no Natural Earth data is installed
const CONTINENTS: &[&[(f64, f64)]] = &[
    &[
        (-168.0, 65.0), (-166.0, 60.0), (-141.0, 60.0), (-130.0, 55.0), (-125.0, 48.0),
        (-124.0, 40.0), (-117.0, 32.0), (-110.0, 25.0), (-97.0, 25.0), (-97.0, 28.0),
        (-82.0, 24.0), (-80.0, 25.0), (-81.0, 31.0), (-75.0, 35.0), (-70.0, 41.0),
        (-67.0, 45.0), (-65.0, 47.0), (-55.0, 47.0), (-52.0, 47.0), (-55.0, 52.0),
        (-58.0, 55.0), (-64.0, 60.0), (-73.0, 62.0), (-80.0, 63.0), (-95.0, 62.0),
        (-110.0, 68.0), (-130.0, 70.0), (-145.0, 70.0), (-168.0, 65.0),
    ],
    &[
        (-80.0, 10.0), (-75.0, 5.0), (-70.0, 5.0), (-60.0, 5.0), (-50.0, 0.0),
        (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0), (-40.0, -22.0), (-48.0, -25.0),
        (-55.0, -34.0), (-58.0, -38.0), (-65.0, -42.0), (-68.0, -50.0), (-75.0, -52.0),
        (-75.0, -45.0), (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0), (-70.0, -15.0),
        (-80.0, -5.0), (-80.0, 0.0), (-80.0, 10.0),
    ],
    &[
        (-10.0, 36.0), (-5.0, 36.0), (0.0, 38.0), (5.0, 43.0), (10.0, 44.0),
        (15.0, 45.0), (20.0, 40.0), (25.0, 37.0), (30.0, 40.0), (35.0, 42.0),
        (40.0, 43.0), (40.0, 55.0), (30.0, 60.0), (25.0, 65.0), (20.0, 70.0),
        (10.0, 71.0), (5.0, 62.0), (5.0, 58.0), (-5.0, 58.0), (-10.0, 52.0),
        (-5.0, 48.0), (-5.0, 43.0), (-10.0, 36.0),
    ],
    &[
        (-17.0, 15.0), (-15.0, 10.0), (-10.0, 5.0), (0.0, 5.0), (10.0, 5.0),
        (15.0, 0.0), (20.0, -5.0), (25.0, -10.0), (35.0, -20.0), (35.0, -25.0),
        (30.0, -30.0), (20.0, -35.0), (18.0, -35.0), (15.0, -30.0), (10.0, -15.0),
        (10.0, 0.0), (5.0, 5.0), (-5.0, 5.0), (-10.0, 10.0), (-17.0, 15.0),
    ],
    &[
        (-17.0, 15.0), (-17.0, 20.0), (-15.0, 28.0), (-5.0, 35.0), (10.0, 37.0),
        (20.0, 33.0), (25.0, 32.0), (35.0, 30.0), (35.0, 20.0), (42.0, 12.0),
        (50.0, 12.0), (45.0, 5.0), (35.0, -5.0), (35.0, -20.0),
    ],
    &[
        (35.0, 42.0), (40.0, 43.0), (50.0, 40.0), (55.0, 37.0), (60.0, 25.0),
        (65.0, 25.0), (70.0, 20.0), (75.0, 15.0), (80.0, 8.0), (80.0, 15.0),
        (88.0, 22.0), (92.0, 22.0), (95.0, 16.0), (100.0, 14.0), (105.0, 10.0),
        (110.0, 20.0), (115.0, 22.0), (120.0, 22.0), (122.0, 25.0), (125.0, 30.0),
        (130.0, 35.0), (135.0, 35.0), (140.0, 40.0), (145.0, 45.0), (145.0, 50.0),
        (140.0, 55.0), (135.0, 55.0), (130.0, 52.0), (130.0, 43.0), (120.0, 40.0),
        (110.0, 45.0), (90.0, 50.0), (70.0, 55.0), (60.0, 55.0), (50.0, 50.0),
        (40.0, 43.0),
    ],
    &[
        (115.0, -20.0), (120.0, -18.0), (130.0, -12.0), (140.0, -12.0), (145.0, -15.0),
        (150.0, -25.0), (153.0, -30.0), (150.0, -35.0), (145.0, -38.0), (140.0, -38.0),
        (135.0, -35.0), (130.0, -32.0), (125.0, -32.0), (115.0, -35.0), (115.0, -25.0),
        (115.0, -20.0),
    ],
];

/// Towns near the big ski regions, labelled on the fallback map
const FALLBACK_PLACES: &[(f64, f64, &str, u64)] = &[
    (-104.99, 39.74, "Denver", 2_900_000),
    (-111.89, 40.76, "Salt Lake City", 1_200_000),
    (-123.12, 49.28, "Vancouver", 2_600_000),
    (6.14, 46.20, "Geneva", 600_000),
    (11.58, 48.14, "Munich", 1_500_000),
    (11.39, 47.27, "Innsbruck", 130_000),
    (9.19, 45.46, "Milan", 3_100_000),
    (10.75, 59.91, "Oslo", 1_000_000),
    (141.35, 43.06, "Sapporo", 1_900_000),
    (-70.67, -33.45, "Santiago", 6_800_000),
    (168.66, -45.03, "Queenstown", 30_000),
    (147.0, -36.5, "Victorian Alps", 10_000),
];

/// Fill the renderer with the built-in fallback world
pub fn generate_simple_world(renderer: &mut MapRenderer) {
    for outline in CONTINENTS {
        renderer.add_coastline(outline.to_vec(), Lod::Low);
    }
    for &(lon, lat, name, population) in FALLBACK_PLACES {
        renderer.add_place(lon, lat, name, population);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn geometry(json: &str) -> Geometry {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_polygon_outlines_include_holes() {
        let g = geometry(
            r#"{"type":"Polygon","coordinates":[
                [[0,0],[10,0],[10,10],[0,10],[0,0]],
                [[2,2],[4,2],[4,4],[2,2]]
            ]}"#,
        );
        let lines = geometry_outlines(&g);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 5);
        assert_eq!(lines[1][1], (4.0, 2.0));
    }

    #[test]
    fn test_multipolygon_and_collection() {
        let g = geometry(
            r#"{"type":"GeometryCollection","geometries":[
                {"type":"MultiPolygon","coordinates":[
                    [[[0,0],[1,0],[1,1],[0,0]]],
                    [[[5,5],[6,5],[6,6],[5,5]]]
                ]},
                {"type":"LineString","coordinates":[[20,20],[21,21]]},
                {"type":"Point","coordinates":[30,30]}
            ]}"#,
        );
        assert_eq!(geometry_outlines(&g).len(), 3);
    }

    #[test]
    fn test_point_has_no_outline() {
        let g = geometry(r#"{"type":"Point","coordinates":[7.7,46.0]}"#);
        assert!(geometry_outlines(&g).is_empty());
    }

    #[test]
    fn test_load_all_geojson_reads_coastlines_and_places() {
        let dir = tempfile::tempdir().unwrap();
        let mut coast = fs::File::create(dir.path().join("ne_110m_coastline.json")).unwrap();
        coast
            .write_all(
                br#"{"type":"FeatureCollection","features":[
                    {"type":"Feature","properties":{},"geometry":
                        {"type":"LineString","coordinates":[[0,0],[10,10],[20,0]]}}
                ]}"#,
            )
            .unwrap();
        let mut places = fs::File::create(dir.path().join("ne_10m_populated_places.json")).unwrap();
        places
            .write_all(
                br#"{"type":"FeatureCollection","features":[
                    {"type":"Feature","properties":{"name":"Chamonix","pop_max":9000},"geometry":
                        {"type":"Point","coordinates":[6.87,45.92]}}
                ]}"#,
            )
            .unwrap();
        fs::write(dir.path().join("ne_50m_borders.json"), b"not json").unwrap();

        let mut renderer = MapRenderer::new();
        load_all_geojson(&mut renderer, dir.path()).unwrap();
        assert!(renderer.has_data());
        assert_eq!(renderer.places.len(), 1);
        assert_eq!(renderer.places[0].name, "Chamonix");
    }

    #[test]
    fn test_simple_world() {
        let mut renderer = MapRenderer::new();
        generate_simple_world(&mut renderer);
        assert!(renderer.has_data());
        assert_eq!(renderer.places.len(), FALLBACK_PLACES.len());
    }
}
