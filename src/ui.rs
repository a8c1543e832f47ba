use crate::app::{App, InputMode};
use crate::braille::BrailleCanvas;
use crate::map::{LabelKind, MapLayers, Overlay};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Widget},
    Frame,
};

const TABLE_WIDTH: u16 = 56;
const SEARCH_BOX_WIDTH: u16 = 52;
const REGION_COLOR: Color = Color::Rgb(255, 165, 0);

/// Screen areas for one frame
pub struct AppLayout {
    /// Map block including its border
    pub map: Rect,
    /// Drawable map area inside the border
    pub map_inner: Rect,
    pub table: Option<Rect>,
    pub status: Rect,
}

/// Split the terminal into map, optional resort table and status bar
pub fn layout(area: Rect, show_table: bool) -> AppLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let (map, table) = if show_table && rows[0].width > TABLE_WIDTH + 20 {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(TABLE_WIDTH)])
            .split(rows[0]);
        (cols[0], Some(cols[1]))
    } else {
        (rows[0], None)
    };

    AppLayout {
        map,
        map_inner: map_block().inner(map),
        table,
        status: rows[1],
    }
}

fn map_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Ski Resorts ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let areas = layout(frame.area(), app.show_table);

    render_map(frame, app, &areas);
    if let Some(table_area) = areas.table {
        render_table(frame, app, table_area);
    }
    render_tooltip(frame, app, areas.map_inner);
    if app.mode != InputMode::Normal {
        render_search(frame, app, areas.map_inner);
    }
    render_status_bar(frame, app, areas.status);
}

fn render_map(frame: &mut Frame, app: &App, areas: &AppLayout) {
    frame.render_widget(map_block(), areas.map);
    let inner = areas.map_inner;

    // Braille gives 2x4 resolution per character
    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let overlay = Overlay {
        region: app.region.as_ref(),
        focused: app.hovered.or_else(|| app.table_state.selected()),
    };
    let layers = app
        .map_renderer
        .render(inner.width as usize, inner.height as usize, &viewport, &overlay);

    let cursor_pos = app.mouse_pos.and_then(|(col, row)| {
        let inside = col >= inner.x
            && col < inner.x + inner.width
            && row >= inner.y
            && row < inner.y + inner.height;
        inside.then(|| (col - inner.x, row - inner.y))
    });

    frame.render_widget(MapWidget { layers, cursor_pos }, inner);
}

/// Braille layers with text labels and the cursor overlaid
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget {
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (col, row, glyph) in canvas.glyphs() {
            if col >= area.width as usize || row >= area.height as usize {
                continue;
            }
            let x = area.x + col as u16;
            let y = area.y + row as u16;
            buf[(x, y)].set_char(glyph).set_fg(color);
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front
        Self::render_layer(&self.layers.coastlines, Color::Cyan, area, buf);
        Self::render_layer(&self.layers.borders, Color::DarkGray, area, buf);
        Self::render_layer(&self.layers.states, Color::Yellow, area, buf);
        Self::render_layer(&self.layers.region, REGION_COLOR, area, buf);
        Self::render_layer(&self.layers.markers, Color::White, area, buf);
        Self::render_layer(&self.layers.focus, Color::LightMagenta, area, buf);

        for label in &self.layers.labels {
            if label.y >= area.height || label.x >= area.width {
                continue;
            }
            let style = match label.kind {
                LabelKind::Place => Style::default().fg(Color::Gray),
                LabelKind::Resort => Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            };

            let max_len = (area.width - label.x) as usize;
            for (i, ch) in label.text.chars().take(max_len.min(24)).enumerate() {
                buf[(area.x + label.x + i as u16, area.y + label.y)]
                    .set_char(ch)
                    .set_style(style);
            }
        }

        if let Some((cx, cy)) = self.cursor_pos {
            buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
        }
    }
}

/// Hover tooltip above the focused marker: bold name, then "location, country"
fn render_tooltip(frame: &mut Frame, app: &App, inner: Rect) {
    let Some(resort) = app.hovered.and_then(|i| app.resorts.get(i)) else {
        return;
    };
    let Some((lon, lat)) = resort.coords() else {
        return;
    };
    let (px, py) = app.viewport.project(lon, lat);
    if px < 0 || py < 0 {
        return;
    }
    let (cx, cy) = ((px / 2) as u16, (py / 4) as u16);
    if cx >= inner.width || cy >= inner.height {
        return;
    }

    let (title, detail) = resort.tooltip_lines();
    let text_width = title.chars().count().max(detail.chars().count()) as u16;
    let width = (text_width + 2).min(inner.width);
    let height = 4.min(inner.height);

    let x = inner.x + cx.saturating_sub(width / 2).min(inner.width - width);
    let y = if cy >= height {
        inner.y + cy - height
    } else {
        (inner.y + cy + 1).min(inner.y + inner.height - height)
    };
    let area = Rect::new(x, y, width, height);

    let tooltip = Paragraph::new(vec![
        Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD))),
        Line::from(detail),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(tooltip, area);
}

fn render_search(frame: &mut Frame, app: &App, inner: Rect) {
    let width = SEARCH_BOX_WIDTH.min(inner.width);
    if width < 4 || inner.height < 3 {
        return;
    }
    let box_area = Rect::new(inner.x, inner.y, width, 3);

    let (title, query) = match app.mode {
        InputMode::ResortSearch => (" Search ski resorts ".to_string(), &app.resort_query),
        _ if app.is_searching() => {
            (" Search region (searching…) ".to_string(), &app.region_query)
        }
        _ => (" Search region ".to_string(), &app.region_query),
    };

    let input = Paragraph::new(Line::from(vec![
        Span::raw(query.as_str()),
        Span::styled("▏", Style::default().fg(Color::Yellow)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(title),
    );
    frame.render_widget(Clear, box_area);
    frame.render_widget(input, box_area);

    let entries = app.popup_entries();
    if entries.is_empty() {
        return;
    }
    let popup_height = (entries.len() as u16 + 2).min(inner.height.saturating_sub(3));
    if popup_height < 3 {
        return;
    }
    let popup_area = Rect::new(inner.x, inner.y + 3, width, popup_height);

    let items: Vec<ListItem> = entries
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let style = if Some(i) == app.popup_cursor {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(text, style)))
        })
        .collect();

    frame.render_widget(Clear, popup_area);
    frame.render_widget(
        List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        ),
        popup_area,
    );
}

/// One row per loaded resort, numbered from 1, whether or not it has a marker
fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(["#", "Resort", "Location", "Country"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let rows = app.resorts.iter().enumerate().map(|(i, resort)| {
        let style = if resort.coords().is_some() {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Row::new([
            Cell::from((i + 1).to_string()),
            Cell::from(resort.name.as_str()),
            Cell::from(resort.location.as_str()),
            Cell::from(resort.country.as_str()),
        ])
        .style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" Resorts ({}) ", app.resorts.len())),
    )
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = app.table_state.clone();
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let settings = &app.map_renderer.settings;

    let mut spans = vec![
        Span::styled(" z", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" (", dim),
        Span::styled(app.lod_level(), Style::default().fg(Color::Magenta)),
        Span::styled(") ", dim),
        Span::styled(
            format!("[b]{} ", settings.base_layer.label()),
            Style::default().fg(Color::Green),
        ),
        Span::styled(
            "[L]abels ",
            Style::default().fg(if settings.show_labels { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled(
            "[m]arkers ",
            Style::default().fg(if settings.show_markers { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled("| ", dim),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!(" | {}/{} resorts", app.map_renderer.marker_count(), app.resorts.len()),
            dim,
        ),
    ];

    if let Some(region) = &app.region {
        spans.push(Span::styled(" | ", dim));
        spans.push(Span::styled(region.name.clone(), Style::default().fg(REGION_COLOR)));
    }

    match &app.status {
        Some(message) => {
            spans.push(Span::styled(" | ", dim));
            spans.push(Span::styled(message.clone(), Style::default().fg(Color::LightRed)));
        }
        None => spans.push(Span::styled(
            " | /:resort g:region x:clear t:table q:quit",
            dim,
        )),
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
