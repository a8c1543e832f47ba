use crate::braille::BrailleCanvas;
use crate::geo::LineString;
use crate::geocode::Region;
use crate::map::geometry::{draw_circle, draw_marker, draw_polyline};
use crate::map::projection::Viewport;
use crate::map::spatial::SpatialGrid;
use crate::resorts::Resort;

/// Resort markers closer than this many braille pixels to the cursor count as hovered
const HIT_RADIUS_PX: i32 = 4;

/// Resort names are drawn next to their markers from this zoom on
const RESORT_LABEL_ZOOM: f64 = 64.0;

/// Level of detail for map data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lod {
    Low,    // 110m - world view
    Medium, // 50m - continental
    High,   // 10m - regional
}

impl Lod {
    /// Select LOD based on zoom level
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom < 2.0 {
            Lod::Low
        } else if zoom < 8.0 {
            Lod::Medium
        } else {
            Lod::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Lod::Low => "110m",
            Lod::Medium => "50m",
            Lod::High => "10m",
        }
    }
}

/// Base map choices, cycled like a layer switcher
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BaseLayer {
    /// Coastlines and place labels
    #[default]
    Outline,
    /// Adds country borders
    Political,
    /// Adds state and province borders
    Detailed,
}

impl BaseLayer {
    pub fn next(self) -> Self {
        match self {
            BaseLayer::Outline => BaseLayer::Political,
            BaseLayer::Political => BaseLayer::Detailed,
            BaseLayer::Detailed => BaseLayer::Outline,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BaseLayer::Outline => "Coast + Labels",
            BaseLayer::Political => "Countries",
            BaseLayer::Detailed => "Countries + States",
        }
    }

    fn shows_borders(&self) -> bool {
        matches!(self, BaseLayer::Political | BaseLayer::Detailed)
    }

    fn shows_states(&self) -> bool {
        matches!(self, BaseLayer::Detailed)
    }
}

/// A populated place shown as a text label
#[derive(Clone, Debug)]
pub struct PlaceLabel {
    pub lon: f64,
    pub lat: f64,
    pub name: String,
    pub population: u64,
}

/// Map position of one plottable resort
#[derive(Clone, Copy, Debug)]
pub struct ResortMarker {
    pub lon: f64,
    pub lat: f64,
    /// Index into the loaded resort list (and table row)
    pub resort: usize,
}

/// Display settings for map layers
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub base_layer: BaseLayer,
    pub show_labels: bool,
    pub show_markers: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            base_layer: BaseLayer::default(),
            show_labels: true,
            show_markers: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelKind {
    Place,
    Resort,
}

/// Text drawn over the braille layers, in character cells
#[derive(Clone, Debug)]
pub struct Label {
    pub x: u16,
    pub y: u16,
    pub text: String,
    pub kind: LabelKind,
}

/// Things drawn on top of the base map for the current frame
#[derive(Default)]
pub struct Overlay<'a> {
    pub region: Option<&'a Region>,
    /// Resort highlighted by hover or table selection
    pub focused: Option<usize>,
}

/// Rasterized layers, colored separately by the UI
pub struct MapLayers {
    pub coastlines: BrailleCanvas,
    pub borders: BrailleCanvas,
    pub states: BrailleCanvas,
    pub markers: BrailleCanvas,
    pub region: BrailleCanvas,
    pub focus: BrailleCanvas,
    pub labels: Vec<Label>,
}

/// Map renderer with multi-resolution base data and the resort marker layer
pub struct MapRenderer {
    pub coastlines_low: Vec<LineString>,
    pub coastlines_medium: Vec<LineString>,
    pub coastlines_high: Vec<LineString>,
    pub borders_medium: Vec<LineString>,
    pub borders_high: Vec<LineString>,
    pub states: Vec<LineString>,
    pub places: Vec<PlaceLabel>,
    pub markers: SpatialGrid<ResortMarker>,
    /// Marker titles, indexed like `markers`
    titles: Vec<String>,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            coastlines_low: Vec::new(),
            coastlines_medium: Vec::new(),
            coastlines_high: Vec::new(),
            borders_medium: Vec::new(),
            borders_high: Vec::new(),
            states: Vec::new(),
            places: Vec::new(),
            markers: SpatialGrid::new(1.0),
            titles: Vec::new(),
            settings: DisplaySettings::default(),
        }
    }

    fn get_coastlines(&self, lod: Lod) -> &[LineString] {
        let tiers = match lod {
            Lod::High => [&self.coastlines_high, &self.coastlines_medium, &self.coastlines_low],
            Lod::Medium => [&self.coastlines_medium, &self.coastlines_low, &self.coastlines_low],
            Lod::Low => [&self.coastlines_low, &self.coastlines_medium, &self.coastlines_high],
        };
        tiers
            .into_iter()
            .find(|t| !t.is_empty())
            .map(|t| t.as_slice())
            .unwrap_or(&[])
    }

    fn get_borders(&self, lod: Lod) -> &[LineString] {
        match lod {
            Lod::High if !self.borders_high.is_empty() => &self.borders_high,
            _ => &self.borders_medium,
        }
    }

    /// Places worth labelling at this zoom (bigger towns first appear)
    fn get_visible_places(&self, zoom: f64) -> impl Iterator<Item = &PlaceLabel> {
        let min_pop = if zoom > 15.0 {
            0
        } else if zoom > 10.0 {
            50_000
        } else if zoom > 6.0 {
            200_000
        } else if zoom > 4.0 {
            1_000_000
        } else {
            2_000_000
        };

        self.places.iter().filter(move |c| c.population >= min_pop)
    }

    /// Rasterize every layer for a `width` x `height` character area
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        overlay: &Overlay,
    ) -> MapLayers {
        let lod = Lod::from_zoom(viewport.zoom);
        let base = self.settings.base_layer;
        let blank = || BrailleCanvas::new(width, height);

        let ((coastlines, borders), ((states, markers), (region, focus))) = rayon::join(
            || {
                rayon::join(
                    || self.draw_lines(width, height, self.get_coastlines(lod), viewport),
                    || {
                        if base.shows_borders() {
                            self.draw_lines(width, height, self.get_borders(lod), viewport)
                        } else {
                            blank()
                        }
                    },
                )
            },
            || {
                rayon::join(
                    || {
                        rayon::join(
                            || {
                                if base.shows_states() && viewport.zoom >= 4.0 {
                                    self.draw_lines(width, height, &self.states, viewport)
                                } else {
                                    blank()
                                }
                            },
                            || self.draw_markers(width, height, viewport),
                        )
                    },
                    || {
                        rayon::join(
                            || match overlay.region {
                                Some(region) => draw_region(width, height, region, viewport),
                                None => blank(),
                            },
                            || self.draw_focus(width, height, viewport, overlay.focused),
                        )
                    },
                )
            },
        );

        MapLayers {
            coastlines,
            borders,
            states,
            markers,
            region,
            focus,
            labels: self.collect_labels(viewport),
        }
    }

    fn draw_lines(
        &self,
        width: usize,
        height: usize,
        lines: &[LineString],
        viewport: &Viewport,
    ) -> BrailleCanvas {
        let mut canvas = BrailleCanvas::new(width, height);
        for line in lines {
            draw_polyline(&mut canvas, line, viewport);
        }
        canvas
    }

    fn marker_size(zoom: f64) -> i32 {
        if zoom > 64.0 {
            2
        } else {
            1
        }
    }

    fn draw_markers(&self, width: usize, height: usize, viewport: &Viewport) -> BrailleCanvas {
        let mut canvas = BrailleCanvas::new(width, height);
        if !self.settings.show_markers {
            return canvas;
        }
        let size = Self::marker_size(viewport.zoom);
        for marker in self.markers.items() {
            let (px, py) = viewport.project(marker.lon, marker.lat);
            if viewport.is_visible(px, py) {
                draw_marker(&mut canvas, px, py, size);
            }
        }
        canvas
    }

    fn draw_focus(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        focused: Option<usize>,
    ) -> BrailleCanvas {
        let mut canvas = BrailleCanvas::new(width, height);
        if let Some(marker) = focused.and_then(|r| self.marker_for_resort(r)) {
            let (px, py) = viewport.project(marker.lon, marker.lat);
            draw_circle(&mut canvas, px, py, Self::marker_size(viewport.zoom) + 1);
        }
        canvas
    }

    fn collect_labels(&self, viewport: &Viewport) -> Vec<Label> {
        let mut labels = Vec::new();
        if !self.settings.show_labels {
            return labels;
        }

        let mut push = |lon: f64, lat: f64, text: &str, kind: LabelKind| {
            let (px, py) = viewport.project(lon, lat);
            if viewport.is_visible(px, py) && px >= 0 && py >= 0 {
                let x = (px / 2) as u16;
                let y = (py / 4) as u16;
                if let Some(x) = x.checked_add(2) {
                    labels.push(Label {
                        x,
                        y,
                        text: text.to_string(),
                        kind,
                    });
                }
            }
        };

        if viewport.zoom > 2.0 {
            for place in self.get_visible_places(viewport.zoom) {
                push(place.lon, place.lat, &place.name, LabelKind::Place);
            }
        }

        if self.settings.show_markers && viewport.zoom >= RESORT_LABEL_ZOOM {
            for (marker, title) in self.markers.items().iter().zip(&self.titles) {
                push(marker.lon, marker.lat, title, LabelKind::Resort);
            }
        }

        labels
    }

    /// Replace the resort marker layer. Resorts without coordinates get no marker.
    pub fn set_resorts(&mut self, resorts: &[Resort]) {
        self.markers.clear();
        self.titles.clear();
        for (resort, (lon, lat)) in resorts
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.coords().map(|c| (i, c)))
        {
            self.markers.insert(lon, lat, ResortMarker { lon, lat, resort });
            self.titles.push(resorts[resort].title().to_string());
        }
    }

    fn marker_for_resort(&self, resort: usize) -> Option<&ResortMarker> {
        self.markers.items().iter().find(|m| m.resort == resort)
    }

    /// Resort whose marker is nearest to a braille pixel, within the hit radius
    pub fn resort_at(&self, viewport: &Viewport, px: i32, py: i32) -> Option<usize> {
        if !self.settings.show_markers || self.markers.is_empty() {
            return None;
        }
        let (lon, lat) = viewport.unproject(px, py);
        let radius = viewport.degrees_per_pixel() * (HIT_RADIUS_PX + 1) as f64;

        self.markers
            .query_radius(lon, lat, radius)
            .into_iter()
            .filter_map(|idx| self.markers.get(idx))
            .map(|m| {
                let (mx, my) = viewport.project(m.lon, m.lat);
                let d2 = (mx - px).pow(2) + (my - py).pow(2);
                (d2, m.resort)
            })
            .filter(|&(d2, _)| d2 <= HIT_RADIUS_PX * HIT_RADIUS_PX)
            .min_by_key(|&(d2, resort)| (d2, resort))
            .map(|(_, resort)| resort)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Add coastline data at a specific LOD
    pub fn add_coastline(&mut self, line: LineString, lod: Lod) {
        match lod {
            Lod::Low => self.coastlines_low.push(line),
            Lod::Medium => self.coastlines_medium.push(line),
            Lod::High => self.coastlines_high.push(line),
        }
    }

    /// Add border data at a specific LOD (low shares the medium set)
    pub fn add_border(&mut self, line: LineString, lod: Lod) {
        match lod {
            Lod::High => self.borders_high.push(line),
            Lod::Low | Lod::Medium => self.borders_medium.push(line),
        }
    }

    pub fn add_state(&mut self, line: LineString) {
        self.states.push(line);
    }

    pub fn add_place(&mut self, lon: f64, lat: f64, name: &str, population: u64) {
        self.places.push(PlaceLabel {
            lon,
            lat,
            name: name.to_string(),
            population,
        });
    }

    /// Check if any base map data is loaded
    pub fn has_data(&self) -> bool {
        !self.coastlines_low.is_empty()
            || !self.coastlines_medium.is_empty()
            || !self.coastlines_high.is_empty()
    }

    pub fn cycle_base_layer(&mut self) {
        self.settings.base_layer = self.settings.base_layer.next();
    }

    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    pub fn toggle_markers(&mut self) {
        self.settings.show_markers = !self.settings.show_markers;
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Region outline, or a marker at its anchor when it has no outline
fn draw_region(width: usize, height: usize, region: &Region, viewport: &Viewport) -> BrailleCanvas {
    let mut canvas = BrailleCanvas::new(width, height);
    if region.outlines.is_empty() {
        let (px, py) = viewport.project(region.anchor.0, region.anchor.1);
        draw_marker(&mut canvas, px, py, 3);
    }
    for line in &region.outlines {
        draw_polyline(&mut canvas, line, viewport);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Bounds;

    fn resort(name: &str, lat: &str, lon: &str) -> Resort {
        Resort {
            name: name.into(),
            location: "Somewhere".into(),
            country: "Nowhere".into(),
            latitude: lat.into(),
            longitude: lon.into(),
        }
    }

    fn sample_renderer() -> MapRenderer {
        let mut renderer = MapRenderer::new();
        renderer.set_resorts(&[
            resort("Zermatt", "46.0207", "7.7491"),
            resort("Unmapped", "", ""),
            resort("Verbier", "46.0961", "7.2286"),
        ]);
        renderer
    }

    #[test]
    fn test_set_resorts_skips_unplottable() {
        let renderer = sample_renderer();
        assert_eq!(renderer.marker_count(), 2);
        let indices: Vec<_> = renderer.markers.items().iter().map(|m| m.resort).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_set_resorts_replaces_previous_markers() {
        let mut renderer = sample_renderer();
        renderer.set_resorts(&[resort("Niseko", "42.8048", "140.6874")]);
        assert_eq!(renderer.marker_count(), 1);
    }

    #[test]
    fn test_resort_at_picks_nearest_marker() {
        let renderer = sample_renderer();
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 400, 200);
        vp.set_view(7.5, 46.05, 10.0);

        let (zx, zy) = vp.project(7.7491, 46.0207);
        assert_eq!(renderer.resort_at(&vp, zx + 1, zy), Some(0));

        let (vx, vy) = vp.project(7.2286, 46.0961);
        assert_eq!(renderer.resort_at(&vp, vx, vy - 2), Some(2));

        assert_eq!(renderer.resort_at(&vp, 0, 0), None);
    }

    #[test]
    fn test_resort_at_without_markers() {
        let mut renderer = sample_renderer();
        renderer.set_resorts(&[]);
        let vp = Viewport::new(7.5, 46.05, 256.0, 400, 200);
        assert_eq!(renderer.resort_at(&vp, 200, 100), None);
        assert_eq!(renderer.marker_count(), 0);
    }

    #[test]
    fn test_render_draws_markers_and_region() {
        let renderer = sample_renderer();
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 200, 100);
        vp.set_view(7.5, 46.05, 8.0);

        let region = Region {
            name: "Valais".into(),
            outlines: vec![vec![(7.0, 45.9), (8.4, 45.9), (8.4, 46.6), (7.0, 46.6), (7.0, 45.9)]],
            bounds: Bounds::new(7.0, 45.9, 8.4, 46.6),
            anchor: (7.6, 46.2),
        };
        let overlay = Overlay {
            region: Some(&region),
            focused: Some(2),
        };
        let layers = renderer.render(100, 25, &vp, &overlay);

        assert!(!layers.markers.is_blank());
        assert!(!layers.region.is_blank());
        assert!(!layers.focus.is_blank());
        assert!(layers.borders.is_blank());
    }

    #[test]
    fn test_hidden_markers_are_not_hit() {
        let mut renderer = sample_renderer();
        renderer.toggle_markers();
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 400, 200);
        vp.set_view(7.7491, 46.0207, 10.0);
        assert_eq!(renderer.resort_at(&vp, 200, 100), None);
        let layers = renderer.render(200, 50, &vp, &Overlay::default());
        assert!(layers.markers.is_blank());
    }

    #[test]
    fn test_resort_labels_at_close_zoom() {
        let renderer = sample_renderer();
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 400, 200);
        vp.set_view(7.5, 46.05, 10.0);
        let labels = renderer.collect_labels(&vp);
        let names: Vec<_> = labels
            .iter()
            .filter(|l| l.kind == LabelKind::Resort)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(names, vec!["Zermatt", "Verbier"]);
    }

    #[test]
    fn test_base_layer_cycle() {
        let mut renderer = MapRenderer::new();
        assert_eq!(renderer.settings.base_layer, BaseLayer::Outline);
        renderer.cycle_base_layer();
        assert_eq!(renderer.settings.base_layer, BaseLayer::Political);
        renderer.cycle_base_layer();
        renderer.cycle_base_layer();
        assert_eq!(renderer.settings.base_layer, BaseLayer::Outline);
    }
}
