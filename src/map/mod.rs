mod geometry;
mod projection;
mod renderer;
mod spatial;

pub use projection::{Viewport, POINT_LEVEL};
pub use renderer::{BaseLayer, Label, LabelKind, Lod, MapLayers, MapRenderer, Overlay};
pub use spatial::SpatialGrid;
