use crate::color::{lookup, TRANSPARENT};
use crate::error::ProjectError;
use crate::processing::{CancelToken, PathProjector};
use crate::types::{Choropleth, ColorMap, Region, RenderItem, Style};
use tracing::{debug, info};

pub struct ChoroplethComposer {
    projector: PathProjector,
}

impl ChoroplethComposer {
    pub fn new(projector: PathProjector) -> Self {
        Self { projector }
    }

    /// Joins projected county paths with their fill colors, keeping the
    /// region's county order as draw order.
    pub fn compose(
        &self,
        region: &Region,
        colors: &ColorMap,
        style: Style,
        cancel: &CancelToken,
    ) -> Result<Choropleth, ProjectError> {
        let paths = self.projector.project(region, cancel)?;

        let mut missing_colors = 0;
        let items: Vec<RenderItem> = paths
            .into_iter()
            .map(|path| {
                let fill = lookup(colors, &path.name).unwrap_or_else(|| {
                    debug!(county = %path.name, "no statistics, leaving unfilled");
                    missing_colors += 1;
                    TRANSPARENT
                });
                RenderItem {
                    name: path.name.clone(),
                    path,
                    fill,
                }
            })
            .collect();

        info!(
            counties = items.len(),
            missing_colors, "composed choropleth"
        );

        Ok(Choropleth {
            width: region.bbox.width(),
            height: region.bbox.height(),
            items,
            style,
            missing_colors,
        })
    }
}
