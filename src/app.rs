use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use ratatui::widgets::TableState;
use tracing::{debug, info, warn};

use crate::config::SearchSettings;
use crate::geocode::worker::{GeocodeWorker, Request, Response};
use crate::geocode::{GeocodeError, Region};
use crate::map::{Lod, MapRenderer, Viewport, POINT_LEVEL};
use crate::resorts::Resort;
use crate::search::ResortIndex;
use crate::ui;

pub const REGION_NOT_FOUND: &str = "Region not found or does not include geometry.";
pub const REGION_ERROR: &str = "There was an error searching for the region.";
pub const OFFLINE: &str = "Geocoding is disabled (offline)";

/// Resort typeahead shows at most this many matches
const MAX_RESORT_MATCHES: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing into the local resort search
    ResortSearch,
    /// Typing a place name for the geocoder
    RegionSearch,
}

/// Holds back a query until input has been quiet for `delay`.
/// Scheduling again replaces the pending query and restarts the wait.
pub struct Debouncer {
    delay: Duration,
    pending: Option<(Instant, String)>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule(&mut self, now: Instant, query: String) {
        self.pending = Some((now + self.delay, query));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending query once its deadline has passed
    pub fn fire(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((due, _)) if now >= *due => self.pending.take().map(|(_, q)| q),
            _ => None,
        }
    }
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub resorts: Vec<Resort>,
    resort_index: ResortIndex,
    pub table_state: TableState,
    pub show_table: bool,
    pub mode: InputMode,
    pub resort_query: String,
    pub region_query: String,
    /// Matches for the resort typeahead (indices into `resorts`)
    pub resort_matches: Vec<usize>,
    /// Geocoder suggestions for the region input
    pub suggestions: Vec<String>,
    /// Highlighted entry in the open popup
    pub popup_cursor: Option<usize>,
    debouncer: Debouncer,
    /// Bumped per suggestion request and whenever the input moves on;
    /// responses carrying an older value are stale
    generation: u64,
    pub region: Option<Region>,
    /// Region lookups sent but not yet answered
    pending_lookups: usize,
    pub hovered: Option<usize>,
    pub status: Option<String>,
    geocoder: Option<GeocodeWorker>,
    settings: SearchSettings,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Inner map area in terminal cells
    map_area: Rect,
    screen: (u16, u16),
}

impl App {
    pub fn new(width: u16, height: u16, settings: SearchSettings) -> Self {
        let mut app = Self {
            viewport: Viewport::initial(0, 0),
            map_renderer: MapRenderer::new(),
            resorts: Vec::new(),
            resort_index: ResortIndex::new(&[]),
            table_state: TableState::default(),
            show_table: true,
            mode: InputMode::Normal,
            resort_query: String::new(),
            region_query: String::new(),
            resort_matches: Vec::new(),
            suggestions: Vec::new(),
            popup_cursor: None,
            debouncer: Debouncer::new(settings.debounce),
            generation: 0,
            region: None,
            pending_lookups: 0,
            hovered: None,
            status: None,
            geocoder: None,
            settings,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            map_area: Rect::default(),
            screen: (width, height),
        };
        app.resize(width, height);
        app
    }

    /// Replace the resort set: markers, search index and table rows
    pub fn load_resorts(&mut self, resorts: Vec<Resort>) {
        self.map_renderer.set_resorts(&resorts);
        self.resort_index = ResortIndex::new(&resorts);
        self.resorts = resorts;
        self.hovered = None;
        self.resort_matches.clear();
        self.table_state
            .select(if self.resorts.is_empty() { None } else { Some(0) });
    }

    pub fn attach_geocoder(&mut self, worker: GeocodeWorker) {
        self.geocoder = Some(worker);
    }

    /// Update viewport size when the terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.screen = (width, height);
        self.map_area = ui::layout(Rect::new(0, 0, width, height), self.show_table).map_inner;
        // Braille gives 2x4 resolution per character
        self.viewport.width = self.map_area.width as usize * 2;
        self.viewport.height = self.map_area.height as usize * 4;
    }

    pub fn toggle_table(&mut self) {
        self.show_table = !self.show_table;
        let (w, h) = self.screen;
        self.resize(w, h);
    }

    /// Back to the initial world view
    pub fn reset_view(&mut self) {
        self.viewport = Viewport::initial(self.viewport.width, self.viewport.height);
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Terminal cell to braille pixel inside the map, `None` outside it
    fn cell_to_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.map_area;
        if col < area.x
            || row < area.y
            || col >= area.x + area.width
            || row >= area.y + area.height
        {
            return None;
        }
        Some((((col - area.x) as i32) * 2, ((row - area.y) as i32) * 4))
    }

    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        match self.cell_to_pixel(col, row) {
            Some((px, py)) => self.viewport.zoom_in_at(px, py),
            None => self.zoom_in(),
        }
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        match self.cell_to_pixel(col, row) {
            Some((px, py)) => self.viewport.zoom_out_at(px, py),
            None => self.zoom_out(),
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Current zoom as a web-map level
    pub fn zoom_level(&self) -> String {
        format!("{:.1}", self.viewport.level())
    }

    pub fn center_coords(&self) -> String {
        format!(
            "{:.1}°{}, {:.1}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    pub fn lod_level(&self) -> &'static str {
        Lod::from_zoom(self.viewport.zoom).label()
    }

    /// Pan by mouse drag; sensitivity drops as the map zooms in
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = (last_x as i32 - x as i32) * 2;
            let dy = (last_y as i32 - y as i32) * 4;
            self.pan(dx, dy);
        }
        self.last_mouse = Some((x, y));
        self.hovered = None;
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Track the cursor and the resort marker under it
    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
        self.hovered = self
            .cell_to_pixel(col, row)
            .and_then(|(px, py)| self.map_renderer.resort_at(&self.viewport, px + 1, py + 2));
    }

    /// Clicking a marker selects its table row
    pub fn click(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.set_mouse_pos(col, row);
        if let Some(idx) = self.hovered {
            self.table_state.select(Some(idx));
        }
    }

    /// Center on a resort at close zoom and select its row
    pub fn select_resort(&mut self, idx: usize) {
        let Some(resort) = self.resorts.get(idx) else {
            return;
        };
        self.table_state.select(Some(idx));
        match resort.coords() {
            Some((lon, lat)) => {
                self.viewport.set_view(lon, lat, POINT_LEVEL);
                self.status = None;
            }
            None => self.status = Some(format!("{} has no coordinates", resort.name)),
        }
    }

    pub fn select_next_row(&mut self) {
        if self.resorts.is_empty() {
            return;
        }
        let next = self
            .table_state
            .selected()
            .map_or(0, |i| (i + 1).min(self.resorts.len() - 1));
        self.table_state.select(Some(next));
    }

    pub fn select_previous_row(&mut self) {
        if self.resorts.is_empty() {
            return;
        }
        let prev = self.table_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.table_state.select(Some(prev));
    }

    /// Move the map to the resort selected in the table
    pub fn jump_to_selected(&mut self) {
        if let Some(idx) = self.table_state.selected() {
            self.select_resort(idx);
        }
    }

    pub fn start_resort_search(&mut self) {
        self.mode = InputMode::ResortSearch;
        self.popup_cursor = None;
        self.refresh_resort_matches();
    }

    pub fn start_region_search(&mut self) {
        self.mode = InputMode::RegionSearch;
        self.popup_cursor = None;
        self.status = None;
    }

    /// Collapse the search box; the typed text is kept for next time
    pub fn cancel_input(&mut self) {
        self.mode = InputMode::Normal;
        self.popup_cursor = None;
        self.resort_matches.clear();
        self.suggestions.clear();
        self.invalidate_suggestions();
    }

    /// Stop the pending debounce and make any request in flight stale
    fn invalidate_suggestions(&mut self) {
        self.debouncer.cancel();
        self.generation += 1;
    }

    /// True while a region lookup is in flight
    pub fn is_searching(&self) -> bool {
        self.pending_lookups > 0
    }

    pub fn input_char(&mut self, c: char, now: Instant) {
        match self.mode {
            InputMode::ResortSearch => {
                self.resort_query.push(c);
                self.refresh_resort_matches();
            }
            InputMode::RegionSearch => {
                self.region_query.push(c);
                self.on_region_input_changed(now);
            }
            InputMode::Normal => {}
        }
    }

    pub fn input_backspace(&mut self, now: Instant) {
        match self.mode {
            InputMode::ResortSearch => {
                self.resort_query.pop();
                self.refresh_resort_matches();
            }
            InputMode::RegionSearch => {
                self.region_query.pop();
                self.on_region_input_changed(now);
            }
            InputMode::Normal => {}
        }
    }

    /// Text of the popup entries for the active search box
    pub fn popup_entries(&self) -> Vec<String> {
        match self.mode {
            InputMode::ResortSearch => self
                .resort_matches
                .iter()
                .filter_map(|&i| self.resorts.get(i))
                .map(|r| format!("{} · {}, {}", r.name, r.location, r.country))
                .collect(),
            InputMode::RegionSearch => self.suggestions.clone(),
            InputMode::Normal => Vec::new(),
        }
    }

    /// Move the popup highlight by `delta`, wrapping at both ends
    pub fn move_popup_cursor(&mut self, delta: i32) {
        let len = match self.mode {
            InputMode::ResortSearch => self.resort_matches.len(),
            InputMode::RegionSearch => self.suggestions.len(),
            InputMode::Normal => 0,
        } as i32;
        if len == 0 {
            self.popup_cursor = None;
            return;
        }
        let next = match self.popup_cursor {
            None if delta >= 0 => 0,
            None => len - 1,
            Some(i) => (i as i32 + delta).rem_euclid(len),
        };
        self.popup_cursor = Some(next as usize);
    }

    /// Enter in a search box
    pub fn submit(&mut self) {
        match self.mode {
            InputMode::ResortSearch => {
                let choice = self
                    .popup_cursor
                    .and_then(|i| self.resort_matches.get(i))
                    .or_else(|| self.resort_matches.first())
                    .copied();
                match choice {
                    Some(idx) => {
                        self.select_resort(idx);
                        self.cancel_input();
                    }
                    None => {
                        let query = self.resort_query.trim();
                        self.status = Some(format!("No resort matches \"{query}\""));
                    }
                }
            }
            InputMode::RegionSearch => {
                // Picking a suggestion fills the input before searching
                if let Some(choice) = self.popup_cursor.and_then(|i| self.suggestions.get(i)) {
                    self.region_query = choice.clone();
                }
                self.submit_region_search();
                self.cancel_input();
            }
            InputMode::Normal => {}
        }
    }

    fn refresh_resort_matches(&mut self) {
        self.resort_matches = self.resort_index.matches(&self.resort_query, MAX_RESORT_MATCHES);
        self.popup_cursor = None;
    }

    /// Restart the debounce for autocomplete, or clear suggestions when the
    /// query is too short
    pub fn on_region_input_changed(&mut self, now: Instant) {
        self.invalidate_suggestions();
        self.popup_cursor = None;

        let query = self.region_query.trim();
        if query.chars().count() < self.settings.min_query_len {
            self.suggestions.clear();
            return;
        }
        self.debouncer.schedule(now, query.to_string());
    }

    /// Look up the typed region and highlight it when it arrives
    pub fn submit_region_search(&mut self) {
        let query = self.region_query.trim().to_string();
        if query.is_empty() {
            return;
        }
        let Some(worker) = &self.geocoder else {
            self.status = Some(OFFLINE.to_string());
            return;
        };
        if worker.send(Request::Region { query: query.clone() }) {
            self.pending_lookups += 1;
            self.status = Some(format!("Searching for {query}…"));
        } else {
            warn!("Geocoder worker is gone; dropping lookup for {:?}", query);
            self.status = Some(REGION_ERROR.to_string());
        }
    }

    pub fn clear_region(&mut self) {
        self.region = None;
    }

    /// Per-frame housekeeping: fire due autocomplete requests and apply
    /// finished geocoder responses
    pub fn tick(&mut self, now: Instant) {
        if let Some(query) = self.debouncer.fire(now) {
            self.request_suggestions(query);
        }

        let mut responses = Vec::new();
        if let Some(worker) = &self.geocoder {
            while let Some(response) = worker.try_recv() {
                responses.push(response);
            }
        }
        for response in responses {
            self.apply_response(response);
        }
    }

    fn request_suggestions(&mut self, query: String) {
        let Some(worker) = &self.geocoder else {
            return;
        };
        self.generation += 1;
        worker.send(Request::Suggest {
            generation: self.generation,
            query,
            limit: self.settings.suggestion_limit,
        });
    }

    pub(crate) fn apply_response(&mut self, response: Response) {
        match response {
            Response::Suggestions { generation, result } => {
                if generation != self.generation {
                    debug!("Dropping stale suggestions #{}", generation);
                    return;
                }
                match result {
                    Ok(places) => {
                        self.suggestions = places
                            .into_iter()
                            .take(self.settings.suggestion_limit)
                            .map(|p| p.display_name)
                            .collect();
                        self.popup_cursor = None;
                    }
                    Err(e) => warn!("Autocomplete error: {}", e),
                }
            }
            Response::Region { query, result } => {
                self.pending_lookups = self.pending_lookups.saturating_sub(1);
                let region = result.and_then(|place| {
                    Region::from_place(&place).ok_or(GeocodeError::NoGeometry)
                });
                match region {
                    Ok(region) => {
                        info!("Highlighting {:?} for query {:?}", region.name, query);
                        self.viewport.fit_bounds(&region.bounds);
                        self.status = None;
                        self.region = Some(region);
                    }
                    Err(GeocodeError::NoGeometry) => {
                        self.status = Some(REGION_NOT_FOUND.to_string());
                    }
                    Err(e) => {
                        warn!("Error fetching region {:?}: {}", query, e);
                        self.status = Some(REGION_ERROR.to_string());
                    }
                }
            }
        }
    }
}
