use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Ski resorts on a terminal world map, with place search
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// CSV file with Resort, Location, Country, Latitude, Longitude columns
    #[arg(short, long, env = "SKI_MAP_RESORTS", default_value = "Ski Resort List.csv")]
    pub resorts: PathBuf,

    /// Directory holding Natural Earth GeoJSON files
    #[arg(short, long, env = "SKI_MAP_DATA", default_value = "data")]
    pub data_dir: PathBuf,

    /// Root URL of the Nominatim service used for place search
    #[arg(
        long,
        env = "SKI_MAP_GEOCODER_URL",
        default_value = "https://nominatim.openstreetmap.org"
    )]
    pub geocoder_url: String,

    /// User agent sent to the geocoder
    #[arg(
        long,
        env = "SKI_MAP_USER_AGENT",
        default_value = concat!("ski-map/", env!("CARGO_PKG_VERSION"))
    )]
    pub user_agent: String,

    /// Quiet period after typing before suggestions are fetched
    #[arg(long, default_value_t = 300)]
    pub debounce_ms: u64,

    /// Shortest query that triggers suggestions
    #[arg(long, default_value_t = 3)]
    pub min_query_len: usize,

    /// Maximum number of suggestions shown
    #[arg(long, default_value_t = 5)]
    pub suggestion_limit: usize,

    /// Write logs to this file (the terminal is owned by the UI)
    #[arg(long, env = "SKI_MAP_LOG")]
    pub log_file: Option<PathBuf>,

    /// Disable place search over the network
    #[arg(long)]
    pub offline: bool,
}

/// Search behaviour handed to the app
#[derive(Clone, Debug)]
pub struct SearchSettings {
    pub debounce: Duration,
    pub min_query_len: usize,
    pub suggestion_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            min_query_len: 3,
            suggestion_limit: 5,
        }
    }
}

impl Config {
    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            debounce: Duration::from_millis(self.debounce_ms),
            min_query_len: self.min_query_len,
            suggestion_limit: self.suggestion_limit,
        }
    }
}
