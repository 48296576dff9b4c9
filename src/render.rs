use crate::types::{Choropleth, PathCommand, Rgba};
use anyhow::{anyhow, bail, Context, Result};
use image::{ImageBuffer, ImageOutputFormat, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::info;

// Largest raster edge we agree to allocate.
const MAX_RASTER_EDGE: u32 = 16_384;

/// A backend turning a composed map into file contents.
pub trait Renderer {
    fn render(&self, map: &Choropleth) -> Result<Vec<u8>>;
}

pub fn renderer_for(path: &Path) -> Result<Box<dyn Renderer>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| anyhow!("Output file has no extension: {:?}", path))?;

    match extension.as_str() {
        "svg" => Ok(Box::new(SvgRenderer)),
        "png" => Ok(Box::new(PngRenderer)),
        "json" => Ok(Box::new(JsonRenderer)),
        _ => Err(anyhow!("Unsupported output format: {}", extension)),
    }
}

/// Renders the whole map in memory before touching `path`.
pub fn write_output(path: &Path, map: &Choropleth) -> Result<()> {
    let renderer = renderer_for(path)?;
    let bytes = renderer.render(map)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }
    fs::write(path, &bytes).with_context(|| format!("Failed to write output: {:?}", path))?;

    info!(bytes = bytes.len(), "Wrote {:?}", path);
    Ok(())
}

pub struct SvgRenderer;

impl Renderer for SvgRenderer {
    fn render(&self, map: &Choropleth) -> Result<Vec<u8>> {
        let style = &map.style;
        let doc = svg_document(map, map.width * style.scale, map.height * style.scale)?;
        Ok(doc.into_bytes())
    }
}

/// SVG text for `map` on a `width` x `height` pixel canvas; coordinates are
/// scaled by the style's scale inside a group transform.
fn svg_document(map: &Choropleth, width: f64, height: f64) -> Result<String> {
    let style = &map.style;
    let mut out = String::new();

    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}px" height="{height}px" viewBox="0 0 {width} {height}">"#
    )?;
    writeln!(
        out,
        r#"<g transform="scale({})" stroke="{}" stroke-opacity="{}" stroke-width="{}" fill-rule="evenodd">"#,
        style.scale,
        svg_rgb(&style.stroke_color),
        opacity(&style.stroke_color),
        style.stroke_width
    )?;

    for item in &map.items {
        let fill = if item.fill.0[3] == 0 {
            r#"fill="none""#.to_string()
        } else {
            format!(
                r#"fill="{}" fill-opacity="{}""#,
                svg_rgb(&item.fill),
                opacity(&item.fill)
            )
        };
        writeln!(
            out,
            r#"<path data-name="{}" {} d="{}"/>"#,
            xml_escape(&item.name),
            fill,
            path_data(&item.path.commands)
        )?;
    }

    writeln!(out, "</g>")?;
    writeln!(out, "</svg>")?;
    Ok(out)
}

fn path_data(commands: &[PathCommand]) -> String {
    let mut d = String::new();
    for cmd in commands {
        let (op, (x, y)) = match cmd {
            PathCommand::MoveTo { .. } => ('M', cmd.xy()),
            PathCommand::LineTo { .. } => ('L', cmd.xy()),
        };
        if !d.is_empty() {
            if op == 'M' {
                d.push_str(" Z");
            }
            d.push(' ');
        }
        let _ = write!(d, "{op}{x} {y}");
    }
    if !d.is_empty() {
        d.push_str(" Z");
    }
    d
}

fn svg_rgb(color: &Rgba) -> String {
    let [r, g, b, _] = color.0;
    format!("rgb({r},{g},{b})")
}

fn opacity(color: &Rgba) -> f64 {
    f64::from(color.0[3]) / 255.0
}

fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Rasterises the SVG document with resvg and encodes it as PNG.
pub struct PngRenderer;

impl Renderer for PngRenderer {
    fn render(&self, map: &Choropleth) -> Result<Vec<u8>> {
        let img = rasterize(map)?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .context("Failed to encode PNG")?;
        Ok(bytes)
    }
}

pub fn rasterize(map: &Choropleth) -> Result<RgbaImage> {
    let scale = map.style.scale;
    let width = (map.width * scale).ceil().max(1.0);
    let height = (map.height * scale).ceil().max(1.0);
    if width > f64::from(MAX_RASTER_EDGE) || height > f64::from(MAX_RASTER_EDGE) {
        bail!(
            "Raster of {}x{} pixels exceeds the {} pixel limit, lower the scale",
            width,
            height,
            MAX_RASTER_EDGE
        );
    }
    let (width, height) = (width as u32, height as u32);

    let svg = svg_document(map, f64::from(width), f64::from(height))?;
    let tree = usvg::Tree::from_str(&svg, &usvg::Options::default())
        .context("Failed to parse generated SVG")?;
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("Failed to allocate {}x{} pixmap", width, height))?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied pixels.
    let mut img: RgbaImage = ImageBuffer::new(width, height);
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(img)
}

#[derive(Serialize)]
struct JsonMap<'a> {
    width: f64,
    height: f64,
    scale: f64,
    stroke_width: f64,
    stroke_color: [u8; 4],
    missing_colors: usize,
    items: Vec<JsonItem<'a>>,
}

#[derive(Serialize)]
struct JsonItem<'a> {
    name: &'a str,
    fill: [u8; 4],
    commands: &'a [PathCommand],
}

/// Dumps the ordered render items for backends living outside this crate.
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, map: &Choropleth) -> Result<Vec<u8>> {
        let doc = JsonMap {
            width: map.width,
            height: map.height,
            scale: map.style.scale,
            stroke_width: map.style.stroke_width,
            stroke_color: map.style.stroke_color.0,
            missing_colors: map.missing_colors,
            items: map
                .items
                .iter()
                .map(|item| JsonItem {
                    name: &item.name,
                    fill: item.fill.0,
                    commands: &item.path.commands,
                })
                .collect(),
        };
        Ok(serde_json::to_vec_pretty(&doc)?)
    }
}
