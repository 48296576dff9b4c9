use crate::error::ColorError;
use crate::types::{ColorMap, Rgba};

/// Fill used for regions without statistics: they render unfilled.
pub const TRANSPARENT: Rgba = image::Rgba([0, 0, 0, 0]);

pub fn lookup(colors: &ColorMap, name: &str) -> Option<Rgba> {
    colors.get(name).copied()
}

pub fn resolve(colors: &ColorMap, name: &str) -> Rgba {
    lookup(colors, name).unwrap_or(TRANSPARENT)
}

/// Accepts `r,g,b,a` decimal channels or `#rrggbb` / `#rrggbbaa`.
pub fn parse_color(text: &str) -> Result<Rgba, ColorError> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix('#') {
        return hex_to_rgba(hex);
    }

    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != 4 {
        return Err(ColorError::ChannelCount(text.to_string(), parts.len()));
    }
    let mut channels = [0u8; 4];
    for (channel, part) in channels.iter_mut().zip(parts) {
        *channel = parse_channel(part)?;
    }
    Ok(image::Rgba(channels))
}

pub fn parse_channel(text: &str) -> Result<u8, ColorError> {
    let text = text.trim();
    text.parse()
        .map_err(|_| ColorError::Channel(text.to_string()))
}

fn hex_to_rgba(hex: &str) -> Result<Rgba, ColorError> {
    if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorError::Hex(hex.to_string()));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorError::Hex(hex.to_string()))
    };
    let a = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok(image::Rgba([channel(0)?, channel(2)?, channel(4)?, a]))
}

/// `r,g,b,a` form, as accepted by [`parse_color`].
pub fn format_color(color: &Rgba) -> String {
    let [r, g, b, a] = color.0;
    format!("{r},{g},{b},{a}")
}
