use std::fmt;
use thiserror::Error;

/// Which part of a boundary record was being read when parsing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BBox,
    CountyCount,
    Name,
    ParentRegion,
    PointCount,
    Point,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::BBox => "bbox",
            Stage::CountyCount => "county-count",
            Stage::Name => "name",
            Stage::ParentRegion => "parent-region",
            Stage::PointCount => "point-count",
            Stage::Point => "point",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("malformed {stage} at line {line}: {message}")]
    Parse {
        stage: Stage,
        line: usize,
        message: String,
    },
    #[error("input ended after line {line} while reading {stage}")]
    Truncated { stage: Stage, line: usize },
    #[error("{stage} count mismatch at line {line}: declared {declared}, found {found}")]
    CountMismatch {
        stage: Stage,
        line: usize,
        declared: usize,
        found: usize,
    },
    #[error("county '{name}' at line {line} declares zero points")]
    DegeneratePolygon { name: String, line: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectError {
    #[error("county '{name}' declares {declared} points but holds {actual}")]
    InvariantViolation {
        name: String,
        declared: usize,
        actual: usize,
    },
    #[error("projection cancelled")]
    Cancelled,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("expected 4 channels in '{0}', found {1}")]
    ChannelCount(String, usize),
    #[error("invalid channel value '{0}'")]
    Channel(String),
    #[error("invalid hex color '{0}'")]
    Hex(String),
}
