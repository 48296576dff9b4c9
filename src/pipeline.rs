use crate::compose::ChoroplethComposer;
use crate::config::AppConfig;
use crate::data;
use crate::processing::{CancelToken, PathProjector};
use crate::render;
use crate::types::ColorMap;
use anyhow::{Context, Result};
use tracing::info;

/// Load, compose and write one map. Nothing is written unless every
/// earlier step succeeded.
pub fn run(config: &AppConfig) -> Result<()> {
    run_with_cancel(config, &CancelToken::new())
}

pub fn run_with_cancel(config: &AppConfig, cancel: &CancelToken) -> Result<()> {
    let style = config.style()?;

    // 1. Load Data
    let region = data::load_region(&config.input.boundaries, &config.input.region)?;
    let colors = match &config.input.statistics {
        Some(path) => {
            data::load_statistics(path, &config.input.region, config.input.year.as_deref())?
        }
        None => {
            info!("No statistics configured, every county renders unfilled");
            ColorMap::new()
        }
    };

    // 2. Project and color
    let projector = PathProjector::new(config.processing.workers)
        .context("Failed to build projection thread pool")?;
    let composer = ChoroplethComposer::new(projector);
    let map = composer.compose(&region, &colors, style, cancel)?;

    // 3. Render
    render::write_output(&config.output.path, &map)?;

    info!("Generation complete!");
    Ok(())
}
