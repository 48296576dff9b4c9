pub mod boundary;
pub mod color;
pub mod compose;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod processing;
pub mod render;
pub mod types;

pub use compose::ChoroplethComposer;
pub use error::{BoundaryError, ColorError, ProjectError, Stage};
pub use processing::{CancelToken, PathProjector};
pub use types::{Choropleth, ColorMap, Region, RenderItem, Style};
