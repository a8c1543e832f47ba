use anyhow::Result;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use ski_map::app::{App, InputMode};
use ski_map::config::Config;
use ski_map::geocode::worker::GeocodeWorker;
use ski_map::geocode::Nominatim;
use ski_map::{data, logging, resorts, ui};
use std::time::{Duration, Instant};
use tracing::{info, warn};

fn main() -> Result<()> {
    let config = Config::parse();
    logging::init(config.log_file.as_deref())?;

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &config);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Build the app with base map, resorts and (unless offline) the geocoder
fn build_app(terminal: &DefaultTerminal, config: &Config) -> Result<App> {
    let size = terminal.size()?;
    let mut app = App::new(size.width, size.height, config.search_settings());

    if config.data_dir.exists() {
        data::load_all_geojson(&mut app.map_renderer, &config.data_dir)?;
    }
    if !app.map_renderer.has_data() {
        info!("No base map data in {}, using built-in outlines", config.data_dir.display());
        data::generate_simple_world(&mut app.map_renderer);
    }

    match resorts::load_resorts(&config.resorts) {
        Ok(list) => app.load_resorts(list),
        Err(e) => {
            warn!("Error loading CSV: {:#}", e);
            app.status = Some(format!("Could not load {}", config.resorts.display()));
        }
    }

    if !config.offline {
        match Nominatim::new(&config.geocoder_url, &config.user_agent) {
            Ok(geocoder) => app.attach_geocoder(GeocodeWorker::spawn(Box::new(geocoder))?),
            Err(e) => warn!("Geocoder unavailable: {}", e),
        }
    }

    Ok(app)
}

/// Mouse: wheel zooms at the cursor, left drag pans, hover shows tooltips
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => {
            app.click(mouse.column, mouse.row);
            return;
        }
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(),
        _ => {}
    }
    app.set_mouse_pos(mouse.column, mouse.row);
}

/// Keys while a search box is open
fn handle_search_key(app: &mut App, key: KeyEvent) {
    let now = Instant::now();
    match key.code {
        KeyCode::Esc => app.cancel_input(),
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => app.input_backspace(now),
        KeyCode::Down | KeyCode::Tab => app.move_popup_cursor(1),
        KeyCode::Up | KeyCode::BackTab => app.move_popup_cursor(-1),
        KeyCode::Char(c) => app.input_char(c, now),
        _ => {}
    }
}

fn handle_map_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        // Layers
        KeyCode::Char('b') | KeyCode::Char('B') => app.map_renderer.cycle_base_layer(),
        KeyCode::Char('L') => app.map_renderer.toggle_labels(),
        KeyCode::Char('m') | KeyCode::Char('M') => app.map_renderer.toggle_markers(),
        KeyCode::Char('t') | KeyCode::Char('T') => app.toggle_table(),

        // Table
        KeyCode::Char('J') | KeyCode::PageDown => app.select_next_row(),
        KeyCode::Char('K') | KeyCode::PageUp => app.select_previous_row(),
        KeyCode::Enter => app.jump_to_selected(),

        // Search
        KeyCode::Char('/') => app.start_resort_search(),
        KeyCode::Char('g') | KeyCode::Char('G') => app.start_region_search(),
        KeyCode::Char('x') | KeyCode::Char('X') => app.clear_region(),

        KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, config: &Config) -> Result<()> {
    let mut app = build_app(terminal, config)?;

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        // ~60fps
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.mode == InputMode::Normal {
                        handle_map_key(&mut app, key);
                    } else {
                        handle_search_key(&mut app, key);
                    }
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        app.tick(Instant::now());

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
