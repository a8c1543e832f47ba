use std::f64::consts::PI;

use crate::geo::{clamp_lat, Bounds};

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 1000.0;

/// Web-map zoom level that corresponds to `zoom == 1.0` (whole world across the canvas)
const BASE_LEVEL: f64 = 2.0;

/// Zoom level used when the map jumps to a single point
pub const POINT_LEVEL: f64 = 10.0;

/// Initial view: mid-Atlantic, whole world visible
const INITIAL_CENTER: (f64, f64) = (-39.341946, 18.032617);

/// Fraction of the canvas left free around fitted bounds
const FIT_PADDING: f64 = 0.1;

/// Normalized Web Mercator x in [0, 1]
#[inline(always)]
fn mercator_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

/// Normalized Web Mercator y in [0, 1], 0 at the north edge
#[inline(always)]
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = clamp_lat(lat).to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

#[inline(always)]
fn inverse_mercator_y(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees()
}

/// Viewport representing the visible map area and zoom level
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Zoom factor (1.0 = the world spans the canvas width)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// The view shown on startup and after a reset
    pub fn initial(width: usize, height: usize) -> Self {
        let (lon, lat) = INITIAL_CENTER;
        Self::new(lon, lat, 1.0, width, height)
    }

    /// Convert a web-map zoom level to a zoom factor
    pub fn zoom_for_level(level: f64) -> f64 {
        2f64.powf(level - BASE_LEVEL).clamp(MIN_ZOOM, MAX_ZOOM)
    }

    /// Current zoom expressed as a web-map zoom level
    pub fn level(&self) -> f64 {
        self.zoom.log2() + BASE_LEVEL
    }

    /// Center the map on a point at a given web-map zoom level
    pub fn set_view(&mut self, lon: f64, lat: f64, level: f64) {
        self.center_lon = lon;
        self.center_lat = clamp_lat(lat);
        self.zoom = Self::zoom_for_level(level);
    }

    /// Center on `bounds` and zoom in as far as the whole box still fits
    pub fn fit_bounds(&mut self, bounds: &Bounds) {
        if bounds.is_point() || self.width == 0 || self.height == 0 {
            let (lon, lat) = bounds.center();
            self.set_view(lon, lat, POINT_LEVEL);
            return;
        }

        let x0 = mercator_x(bounds.min_lon);
        let x1 = mercator_x(bounds.max_lon);
        let y0 = mercator_y(bounds.max_lat);
        let y1 = mercator_y(bounds.min_lat);

        let usable = 1.0 - FIT_PADDING;
        let zoom_x = if x1 > x0 { usable / (x1 - x0) } else { MAX_ZOOM };
        let zoom_y = if y1 > y0 {
            usable * self.height as f64 / (self.width as f64 * (y1 - y0))
        } else {
            MAX_ZOOM
        };

        self.center_lon = (bounds.min_lon + bounds.max_lon) / 2.0;
        self.center_lat = clamp_lat(inverse_mercator_y((y0 + y1) / 2.0));
        self.zoom = zoom_x.min(zoom_y).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = self.zoom * self.width.max(1) as f64;
        let x = mercator_x(self.center_lon) + dx as f64 / scale;
        let y = mercator_y(self.center_lat) + dy as f64 / scale;

        self.center_lon = x * 360.0 - 180.0;
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }
        self.center_lat = inverse_mercator_y(y).clamp(-85.0, 85.0);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor while keeping the point under (px, py) fixed
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let scale = self.zoom * self.width.max(1) as f64;

        let x = (px as f64 - self.width as f64 / 2.0) / scale + mercator_x(self.center_lon);
        let y = (py as f64 - self.height as f64 / 2.0) / scale + mercator_y(self.center_lat);

        (x * 360.0 - 180.0, inverse_mercator_y(y))
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let scale = self.zoom * self.width as f64;

        let px = (mercator_x(lon) - mercator_x(self.center_lon)) * scale + self.width as f64 / 2.0;
        let py = (mercator_y(lat) - mercator_y(self.center_lat)) * scale + self.height as f64 / 2.0;

        (px as i32, py as i32)
    }

    /// Degrees of longitude covered by one pixel at this zoom
    pub fn degrees_per_pixel(&self) -> f64 {
        360.0 / (self.zoom * self.width.max(1) as f64)
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
        vp.pan(0, -10);
        assert!(vp.center_lat > 0.0);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let vp = Viewport::new(8.0, 46.0, 40.0, 200, 120);
        let (px, py) = vp.project(7.75, 46.02);
        let (lon, lat) = vp.unproject(px, py);
        assert!((lon - 7.75).abs() < vp.degrees_per_pixel() * 2.0);
        assert!((lat - 46.02).abs() < vp.degrees_per_pixel() * 2.0);
    }

    #[test]
    fn test_poles_project_finitely() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (_, north) = vp.project(0.0, 90.0);
        let (_, south) = vp.project(0.0, -90.0);
        assert!(north <= 1);
        assert!(south >= 99);
    }

    #[test]
    fn test_initial_view() {
        let vp = Viewport::initial(160, 80);
        assert_eq!(vp.center_lat, 18.032617);
        assert_eq!(vp.center_lon, -39.341946);
        assert!((vp.level() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_view_level() {
        let mut vp = Viewport::initial(160, 80);
        vp.set_view(-106.95, 39.64, 10.0);
        assert_eq!(vp.zoom, 256.0);
        assert!((vp.level() - 10.0).abs() < 1e-9);
        assert_eq!(vp.project(-106.95, 39.64), (80, 40));
    }

    #[test]
    fn test_fit_bounds_keeps_corners_visible() {
        let mut vp = Viewport::initial(200, 100);
        let alps = Bounds::new(5.9, 45.8, 10.5, 47.8);
        vp.fit_bounds(&alps);

        for (lon, lat) in [(5.9, 45.8), (10.5, 47.8), (5.9, 47.8), (10.5, 45.8)] {
            let (px, py) = vp.project(lon, lat);
            assert!(px >= 0 && px < 200, "x {px} out of view");
            assert!(py >= 0 && py < 100, "y {py} out of view");
        }
        assert!(vp.zoom > 10.0);
    }

    #[test]
    fn test_fit_point_bounds_uses_point_level() {
        let mut vp = Viewport::initial(200, 100);
        vp.fit_bounds(&Bounds::new(11.4, 47.3, 11.4, 47.3));
        assert!((vp.level() - POINT_LEVEL).abs() < 1e-9);
        assert_eq!(vp.center_lon, 11.4);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut vp = Viewport::initial(100, 100);
        for _ in 0..100 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom, MAX_ZOOM);
        for _ in 0..100 {
            vp.zoom_out();
        }
        assert_eq!(vp.zoom, MIN_ZOOM);
    }
}
