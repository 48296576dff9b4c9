use geo::{Coord, Rect};
use serde::Serialize;
use std::collections::HashMap;

/// A source-space coordinate as read from a boundary file.
pub type Point = Coord<f64>;

/// Axis-aligned bounds declared at the head of a boundary file.
pub type BBox = Rect<f64>;

pub type Rgba = image::Rgba<u8>;

/// Region name -> fill color.
pub type ColorMap = HashMap<String, Rgba>;

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub bbox: BBox,
    // Number of records the file header announced, subcounty parts included.
    pub declared_records: usize,
    pub counties: Vec<County>,
}

impl Region {
    pub fn county_count(&self) -> usize {
        self.counties.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct County {
    pub name: String,
    pub region_name: String,
    pub point_count: usize,
    pub points: Vec<Point>,
    pub subcounties: Vec<Subcounty>,
}

/// An extra polygon filed under an already named county (islands, exclaves).
#[derive(Debug, Clone, PartialEq)]
pub struct Subcounty {
    pub name: String,
    pub county_name: String,
    pub point_count: usize,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "cmd")]
pub enum PathCommand {
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
}

impl PathCommand {
    pub fn xy(&self) -> (f64, f64) {
        match *self {
            PathCommand::MoveTo { x, y } | PathCommand::LineTo { x, y } => (x, y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedPath {
    pub name: String,
    pub commands: Vec<PathCommand>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    pub name: String,
    pub path: ProjectedPath,
    pub fill: Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub scale: f64,
    pub stroke_width: f64,
    pub stroke_color: Rgba,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            scale: 10.0,
            stroke_width: 0.05,
            stroke_color: image::Rgba([0, 0, 0, 255]),
        }
    }
}

/// Everything a rendering backend needs, in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct Choropleth {
    // Bounding box extent in renderer space, before scaling.
    pub width: f64,
    pub height: f64,
    pub items: Vec<RenderItem>,
    pub style: Style,
    pub missing_colors: usize,
}
