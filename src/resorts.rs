use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// One row of the resort list.
/// Coordinates stay as text so that rows without usable coordinates still
/// appear in the table.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Resort {
    #[serde(rename = "Resort")]
    pub name: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Latitude")]
    pub latitude: String,
    #[serde(rename = "Longitude")]
    pub longitude: String,
}

impl Resort {
    /// `(lon, lat)` when both columns hold finite numbers
    pub fn coords(&self) -> Option<(f64, f64)> {
        let lat = parse_coord(&self.latitude)?;
        let lon = parse_coord(&self.longitude)?;
        Some((lon, lat))
    }

    /// Marker title, also the text the resort search matches against
    pub fn title(&self) -> &str {
        &self.name
    }

    /// Tooltip body: name, then "location, country"
    pub fn tooltip_lines(&self) -> (String, String) {
        (self.name.clone(), format!("{}, {}", self.location, self.country))
    }
}

fn parse_coord(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Read the resort CSV. Rows that fail to decode are skipped with a warning.
pub fn load_resorts(path: &Path) -> Result<Vec<Resort>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("failed to open resort list {}", path.display()))?;

    let mut resorts = Vec::new();
    for (line, record) in reader.deserialize::<Resort>().enumerate() {
        match record {
            Ok(resort) if is_blank(&resort) => {}
            Ok(resort) => resorts.push(resort),
            Err(e) => warn!("Skipping resort row {}: {}", line + 2, e),
        }
    }

    let plotted = resorts.iter().filter(|r| r.coords().is_some()).count();
    info!(
        "Loaded {} resorts from {} ({} with coordinates)",
        resorts.len(),
        path.display(),
        plotted
    );

    Ok(resorts)
}

/// Rows made only of separators (",,,,") carry nothing to show
fn is_blank(resort: &Resort) -> bool {
    [
        &resort.name,
        &resort.location,
        &resort.country,
        &resort.latitude,
        &resort.longitude,
    ]
    .iter()
    .all(|field| field.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_resorts_by_header_name() {
        let file = write_csv(
            "Resort,Country,Location,Latitude,Longitude,Elevation\n\
             Zermatt,Switzerland,Valais,46.0207,7.7491,3883\n\
             Aspen Snowmass,United States,Colorado,39.2084,-106.9490,3813\n",
        );
        let resorts = load_resorts(file.path()).unwrap();
        assert_eq!(resorts.len(), 2);
        assert_eq!(resorts[0].name, "Zermatt");
        assert_eq!(resorts[0].location, "Valais");
        assert_eq!(resorts[1].coords(), Some((-106.949, 39.2084)));
    }

    #[test]
    fn test_rows_without_coordinates_are_kept() {
        let file = write_csv(
            "Resort,Location,Country,Latitude,Longitude\n\
             Nowhere Peak,Unknown,Unknown,,\n\
             Bad Data,Somewhere,Atlantis,north,east\n\
             \n\
             Niseko,Hokkaido,Japan,42.8048,140.6874\n",
        );
        let resorts = load_resorts(file.path()).unwrap();
        assert_eq!(resorts.len(), 3);
        assert_eq!(resorts[0].coords(), None);
        assert_eq!(resorts[1].coords(), None);
        assert_eq!(resorts[2].coords(), Some((140.6874, 42.8048)));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_resorts(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(err.to_string().contains("failed to open resort list"));
    }

    #[test]
    fn test_tooltip_lines() {
        let resort = Resort {
            name: "Whistler Blackcomb".into(),
            location: "British Columbia".into(),
            country: "Canada".into(),
            latitude: "50.1163".into(),
            longitude: "-122.9574".into(),
        };
        assert_eq!(
            resort.tooltip_lines(),
            ("Whistler Blackcomb".to_string(), "British Columbia, Canada".to_string())
        );
    }

    #[test]
    fn test_coords_trim_and_reject_non_finite() {
        let mut resort = Resort {
            latitude: " 45.5 ".into(),
            longitude: "6.9".into(),
            ..Default::default()
        };
        assert_eq!(resort.coords(), Some((6.9, 45.5)));
        resort.longitude = "inf".into();
        assert_eq!(resort.coords(), None);
    }
}
