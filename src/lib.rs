//! Terminal world map of ski resorts with place search.

pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod geo;
pub mod geocode;
pub mod logging;
pub mod map;
pub mod resorts;
pub mod search;
pub mod ui;
