/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Web Mercator stops being finite at the poles
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Axis-aligned lon/lat bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Smallest box containing every point, `None` for an empty iterator
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc, (lon, lat)| {
            Some(match acc {
                None => Bounds::new(lon, lat, lon, lat),
                Some(b) => Bounds::new(
                    b.min_lon.min(lon),
                    b.min_lat.min(lat),
                    b.max_lon.max(lon),
                    b.max_lat.max(lat),
                ),
            })
        })
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    #[cfg(test)]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// True when the box has no extent in either direction
    pub fn is_point(&self) -> bool {
        (self.max_lon - self.min_lon).abs() < f64::EPSILON
            && (self.max_lat - self.min_lat).abs() < f64::EPSILON
    }
}

/// Clamp latitude into the range Web Mercator can represent
#[inline(always)]
pub fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_from_points() {
        let b = Bounds::from_points([(10.0, 46.0), (6.0, 47.5), (8.5, 45.8)]).unwrap();
        assert_eq!(b, Bounds::new(6.0, 45.8, 10.0, 47.5));
        assert!(b.contains(7.0, 46.5));
        assert!(!b.contains(11.0, 46.5));
        assert!(!b.is_point());
    }

    #[test]
    fn test_bounds_empty() {
        assert!(Bounds::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_single_point_bounds() {
        let b = Bounds::from_points([(-106.8, 39.2)]).unwrap();
        assert!(b.is_point());
        assert_eq!(b.center(), (-106.8, 39.2));
    }
}
