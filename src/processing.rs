use crate::error::ProjectError;
use crate::types::{BBox, County, PathCommand, Point, ProjectedPath, Region};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Shared flag that aborts a projection in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Turns county rings into closed renderer-space paths on a bounded pool.
pub struct PathProjector {
    pool: ThreadPool,
}

impl PathProjector {
    /// `workers == 0` lets rayon pick one thread per CPU.
    pub fn new(workers: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("projector-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Projects every county of `region`, one path per county in the
    /// region's order. Either every county succeeds or the call fails.
    pub fn project(
        &self,
        region: &Region,
        cancel: &CancelToken,
    ) -> Result<Vec<ProjectedPath>, ProjectError> {
        debug!(
            counties = region.counties.len(),
            workers = self.workers(),
            "projecting counties"
        );

        let bbox = &region.bbox;
        // One slot per county, written by index.
        let mut slots: Vec<Result<ProjectedPath, ProjectError>> =
            Vec::with_capacity(region.counties.len());

        self.pool.install(|| {
            region
                .counties
                .par_iter()
                .map(|county| {
                    if cancel.is_cancelled() {
                        return Err(ProjectError::Cancelled);
                    }
                    project_county(county, bbox)
                })
                .collect_into_vec(&mut slots)
        });

        if cancel.is_cancelled() {
            return Err(ProjectError::Cancelled);
        }
        slots.into_iter().collect()
    }
}

/// Renderer space: origin at the bbox minimum, y growing downwards.
#[inline]
pub fn to_render_space(point: &Point, bbox: &BBox) -> (f64, f64) {
    (point.x - bbox.min().x, bbox.max().y - point.y)
}

/// The county ring comes first; each subcounty ring (island, exclave)
/// follows as its own closed subpath.
pub fn project_county(county: &County, bbox: &BBox) -> Result<ProjectedPath, ProjectError> {
    let violation = |declared: usize, actual: usize| ProjectError::InvariantViolation {
        name: county.name.clone(),
        declared,
        actual,
    };

    let mut rings = vec![(county.point_count, &county.points)];
    rings.extend(county.subcounties.iter().map(|s| (s.point_count, &s.points)));

    let total: usize = rings.iter().map(|(_, points)| points.len() + 1).sum();
    let mut commands = Vec::with_capacity(total);
    for (declared, points) in rings {
        if points.is_empty() || points.len() != declared {
            return Err(violation(declared, points.len()));
        }
        push_ring(&mut commands, points, bbox);
    }

    Ok(ProjectedPath {
        name: county.name.clone(),
        commands,
    })
}

fn push_ring(commands: &mut Vec<PathCommand>, points: &[Point], bbox: &BBox) {
    let closed = points.len() > 1 && points.first() == points.last();

    for (i, point) in points.iter().enumerate() {
        let (x, y) = to_render_space(point, bbox);
        commands.push(if i == 0 {
            PathCommand::MoveTo { x, y }
        } else {
            PathCommand::LineTo { x, y }
        });
    }
    if !closed {
        let (x, y) = to_render_space(&points[0], bbox);
        commands.push(PathCommand::LineTo { x, y });
    }
}
