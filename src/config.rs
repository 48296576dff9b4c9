use crate::color::parse_color;
use crate::types::Style;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub boundaries: PathBuf, // File, or directory of <region>.txt files
    pub region: String,
    pub statistics: Option<PathBuf>,
    pub year: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StyleConfig {
    pub scale: f64,
    pub stroke_width: f64,
    pub stroke_color: String, // "r,g,b,a" or hex
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            scale: 10.0,
            stroke_width: 0.05,
            stroke_color: "0,0,0,255".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ProcessingConfig {
    pub workers: usize, // 0 = one per CPU
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub path: PathBuf,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.style()?;
        if self.input.region.trim().is_empty() {
            bail!("input.region must not be empty");
        }
        Ok(())
    }

    pub fn style(&self) -> Result<Style> {
        let s = &self.style;
        if !(s.scale.is_finite() && s.scale > 0.0) {
            bail!("style.scale must be positive, got {}", s.scale);
        }
        if !(s.stroke_width.is_finite() && s.stroke_width > 0.0) {
            bail!("style.stroke_width must be positive, got {}", s.stroke_width);
        }
        let stroke_color = parse_color(&s.stroke_color)
            .with_context(|| format!("Invalid style.stroke_color: {:?}", s.stroke_color))?;
        Ok(Style {
            scale: s.scale,
            stroke_width: s.stroke_width,
            stroke_color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [input]
        boundaries = "regions"
        region = "AL"

        [output]
        path = "AL.svg"
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.input.region, "AL");
        assert!(config.input.statistics.is_none());
        assert_eq!(config.processing.workers, 0);
        assert_eq!(config.style().unwrap(), Style::default());
    }

    #[test]
    fn test_full_config() {
        let config = AppConfig::from_toml(
            r##"
            [input]
            boundaries = "regions/AL.txt"
            region = "AL"
            statistics = "stats"
            year = "2012"

            [style]
            scale = 4.0
            stroke_width = 0.1
            stroke_color = "#336699"

            [processing]
            workers = 8

            [output]
            path = "out/AL.png"
            "##,
        )
        .unwrap();
        let style = config.style().unwrap();
        assert_eq!(style.scale, 4.0);
        assert_eq!(style.stroke_color, image::Rgba([0x33, 0x66, 0x99, 255]));
        assert_eq!(config.input.year.as_deref(), Some("2012"));
        assert_eq!(config.processing.workers, 8);
    }

    #[test]
    fn test_rejects_non_positive_scale() {
        let bad = MINIMAL.replace("[output]", "[style]\nscale = 0.0\n[output]");
        assert!(AppConfig::from_toml(&bad).is_err());
    }

    #[test]
    fn test_rejects_bad_stroke_color() {
        let bad = MINIMAL.replace("[output]", "[style]\nstroke_color = \"1,2\"\n[output]");
        assert!(AppConfig::from_toml(&bad).is_err());
    }
}
