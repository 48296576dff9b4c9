//! Parser for the line-oriented boundary format.
//!
//! A boundary file looks like this:
//!
//! ```text
//! -88.473227   30.223334      <- bbox corner
//! -84.88908   35.008028       <- bbox corner
//! 67                          <- record count
//!
//! Autauga                     <- name
//! AL                          <- parent region
//! 25                          <- point count
//! -86.917595   32.664169      <- points, x and y split by exactly three spaces
//! ...
//! ```
//!
//! Blank lines separate records. Every numeric field is checked; nothing
//! malformed is replaced by a default.

use crate::error::{BoundaryError, Stage};
use crate::types::{BBox, County, Point, Region, Subcounty};
use geo::{coord, Rect};
use std::collections::HashMap;
use std::io::{BufRead, Lines};
use tracing::{debug, warn};

const SEPARATOR: &str = "   ";

// Declared counts come from untrusted input; never reserve more than this up front.
const PREALLOC_LIMIT: usize = 1024;

pub fn parse_region_str(input: &str) -> Result<Region, BoundaryError> {
    parse_region(input.as_bytes())
}

pub fn parse_region<R: BufRead>(reader: R) -> Result<Region, BoundaryError> {
    let mut sc = RecordReader::new(reader);

    let min = sc.point(Stage::BBox)?;
    let max = sc.point(Stage::BBox)?;
    let bbox = Rect::new(min, max);
    let declared = sc.count(Stage::CountyCount)?;

    let mut counties: Vec<County> = Vec::with_capacity(declared.min(PREALLOC_LIMIT));
    let mut by_name: HashMap<String, usize> =
        HashMap::with_capacity(declared.min(PREALLOC_LIMIT));
    let mut outside = 0;
    let mut subcounties = 0;

    for _ in 0..declared {
        let name = sc.name()?;
        let header_line = sc.line;
        let region_name = sc.text(Stage::ParentRegion)?;
        let point_count = sc.count(Stage::PointCount)?;
        if point_count == 0 {
            return Err(BoundaryError::DegeneratePolygon {
                name,
                line: header_line,
            });
        }

        let mut points = Vec::with_capacity(point_count.min(PREALLOC_LIMIT));
        for found in 0..point_count {
            points.push(sc.ring_point(point_count, found)?);
        }
        sc.ring_end(point_count)?;

        outside += points.iter().filter(|p| !contains(&bbox, p)).count();

        match by_name.get(&name) {
            Some(&i) => {
                debug!(county = %name, line = header_line, "filing repeated record as subcounty");
                subcounties += 1;
                let county_name = counties[i].name.clone();
                counties[i].subcounties.push(Subcounty {
                    county_name,
                    name,
                    point_count,
                    points,
                });
            }
            None => {
                by_name.insert(name.clone(), counties.len());
                counties.push(County {
                    name,
                    region_name,
                    point_count,
                    points,
                    subcounties: Vec::new(),
                });
            }
        }
    }

    sc.end(declared)?;

    if outside > 0 {
        warn!(points = outside, "points lie outside the declared bounding box");
    }
    debug!(
        counties = counties.len(),
        subcounties, "parsed boundary records"
    );

    Ok(Region {
        bbox,
        declared_records: declared,
        counties,
    })
}

fn contains(bbox: &BBox, p: &Point) -> bool {
    let (min, max) = (bbox.min(), bbox.max());
    (min.x..=max.x).contains(&p.x) && (min.y..=max.y).contains(&p.y)
}

fn parse_point(text: &str, stage: Stage, line: usize) -> Result<Point, BoundaryError> {
    let malformed = |message: String| BoundaryError::Parse {
        stage,
        line,
        message,
    };

    let trimmed = text.trim();
    let (xs, ys) = trimmed
        .split_once(SEPARATOR)
        .ok_or_else(|| malformed(format!("expected two values split by three spaces in '{trimmed}'")))?;
    if xs.ends_with(char::is_whitespace) || ys.starts_with(char::is_whitespace) {
        return Err(malformed(format!("separator is not exactly three spaces in '{trimmed}'")));
    }

    let x: f64 = xs
        .trim()
        .parse()
        .map_err(|_| malformed(format!("invalid x value '{xs}'")))?;
    let y: f64 = ys
        .trim()
        .parse()
        .map_err(|_| malformed(format!("invalid y value '{ys}'")))?;
    if !x.is_finite() || !y.is_finite() {
        return Err(malformed(format!("non-finite coordinate in '{trimmed}'")));
    }

    Ok(coord! { x: x, y: y })
}

struct RecordReader<R: BufRead> {
    lines: Lines<R>,
    line: usize,
    pending: Option<String>,
}

impl<R: BufRead> RecordReader<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            pending: None,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>, BoundaryError> {
        if let Some(text) = self.pending.take() {
            return Ok(Some(text));
        }
        match self.lines.next() {
            Some(line) => {
                self.line += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    fn required(&mut self, stage: Stage) -> Result<String, BoundaryError> {
        self.next_line()?.ok_or(BoundaryError::Truncated {
            stage,
            line: self.line,
        })
    }

    fn text(&mut self, stage: Stage) -> Result<String, BoundaryError> {
        Ok(self.required(stage)?.trim().to_string())
    }

    /// Record header: skips the blank separator lines in front of it.
    fn name(&mut self) -> Result<String, BoundaryError> {
        loop {
            let line = self.text(Stage::Name)?;
            if !line.is_empty() {
                return Ok(line);
            }
        }
    }

    fn count(&mut self, stage: Stage) -> Result<usize, BoundaryError> {
        let text = self.text(stage)?;
        text.parse().map_err(|_| BoundaryError::Parse {
            stage,
            line: self.line,
            message: format!("invalid count '{text}'"),
        })
    }

    fn point(&mut self, stage: Stage) -> Result<Point, BoundaryError> {
        let text = self.required(stage)?;
        parse_point(&text, stage, self.line)
    }

    fn ring_point(&mut self, declared: usize, found: usize) -> Result<Point, BoundaryError> {
        let text = self.required(Stage::Point)?;
        if text.trim().is_empty() {
            return Err(BoundaryError::CountMismatch {
                stage: Stage::Point,
                line: self.line,
                declared,
                found,
            });
        }
        parse_point(&text, Stage::Point, self.line)
    }

    /// After the declared points, the ring must stop: a blank line, a new
    /// record header or the end of input may follow, another point may not.
    fn ring_end(&mut self, declared: usize) -> Result<(), BoundaryError> {
        let mut extra = 0;
        let mut first_extra = 0;
        loop {
            let Some(text) = self.next_line()? else { break };
            if parse_point(&text, Stage::Point, self.line).is_err() {
                if extra == 0 {
                    // Not ours: hand the line back to the record loop.
                    self.pushback(text);
                }
                break;
            }
            if extra == 0 {
                first_extra = self.line;
            }
            extra += 1;
        }
        if extra > 0 {
            return Err(BoundaryError::CountMismatch {
                stage: Stage::Point,
                line: first_extra,
                declared,
                found: declared + extra,
            });
        }
        Ok(())
    }

    fn pushback(&mut self, text: String) {
        self.pending = Some(text);
    }

    /// Only blank lines may follow the last declared record.
    fn end(&mut self, declared: usize) -> Result<(), BoundaryError> {
        let mut extra = 0;
        let mut first_extra = 0;
        let mut in_record = false;
        while let Some(text) = self.next_line()? {
            let blank = text.trim().is_empty();
            if !blank && !in_record {
                if extra == 0 {
                    first_extra = self.line;
                }
                extra += 1;
            }
            in_record = !blank;
        }
        if extra > 0 {
            return Err(BoundaryError::CountMismatch {
                stage: Stage::CountyCount,
                line: first_extra,
                declared,
                found: declared + extra,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "0   0\n10   10\n1\n\nA\nXX\n4\n0   0\n10   0\n10   10\n0   10\n";

    #[test]
    fn test_parses_single_county() {
        let region = parse_region_str(SQUARE).unwrap();
        assert_eq!(region.bbox.min(), coord! { x: 0.0, y: 0.0 });
        assert_eq!(region.bbox.max(), coord! { x: 10.0, y: 10.0 });
        assert_eq!(region.declared_records, 1);
        assert_eq!(region.county_count(), 1);

        let county = &region.counties[0];
        assert_eq!(county.name, "A");
        assert_eq!(county.region_name, "XX");
        assert_eq!(county.point_count, 4);
        assert_eq!(county.points[2], coord! { x: 10.0, y: 10.0 });
    }

    #[test]
    fn test_bbox_corners_are_normalised() {
        let region = parse_region_str("5   -1\n-3   7\n0\n").unwrap();
        assert_eq!(region.bbox.min(), coord! { x: -3.0, y: -1.0 });
        assert_eq!(region.bbox.max(), coord! { x: 5.0, y: 7.0 });
    }

    #[test]
    fn test_zero_counties_is_valid_and_empty() {
        let region = parse_region_str("0   0\n1   1\n0\n\n").unwrap();
        assert!(region.counties.is_empty());
    }

    #[test]
    fn test_records_without_blank_separator() {
        let input = "0   0\n10   10\n2\nA\nXX\n1\n1   1\nB\nXX\n2\n2   2\n3   3\n";
        let region = parse_region_str(input).unwrap();
        let names: Vec<_> = region.counties.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(region.counties[1].points.len(), 2);
    }

    #[test]
    fn test_tokens_are_trimmed() {
        let input = "  0.5   1.5  \n10   10\n 0 \n";
        let region = parse_region_str(input).unwrap();
        assert_eq!(region.bbox.min(), coord! { x: 0.5, y: 1.5 });
    }

    #[test]
    fn test_repeated_name_becomes_subcounty() {
        let input = "0   0\n10   10\n3\n\nA\nXX\n1\n1   1\n\nB\nXX\n1\n2   2\n\nA\nXX\n2\n3   3\n4   4\n";
        let region = parse_region_str(input).unwrap();
        assert_eq!(region.declared_records, 3);
        assert_eq!(region.county_count(), 2);

        let a = &region.counties[0];
        assert_eq!(a.subcounties.len(), 1);
        assert_eq!(a.subcounties[0].county_name, "A");
        assert_eq!(a.subcounties[0].point_count, 2);
        assert!(region.counties[1].subcounties.is_empty());
    }

    #[test]
    fn test_truncated_points() {
        let input = "0   0\n10   10\n1\n\nA\nXX\n3\n0   0\n1   1\n";
        match parse_region_str(input) {
            Err(BoundaryError::Truncated { stage, .. }) => assert_eq!(stage, Stage::Point),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_counties() {
        let input = "0   0\n10   10\n2\n\nA\nXX\n1\n0   0\n";
        match parse_region_str(input) {
            Err(BoundaryError::Truncated { stage, .. }) => assert_eq!(stage, Stage::Name),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_is_truncated() {
        assert!(matches!(
            parse_region_str(""),
            Err(BoundaryError::Truncated {
                stage: Stage::BBox,
                line: 0
            })
        ));
    }

    #[test]
    fn test_malformed_coordinate_is_reported_with_line() {
        let input = "0   0\n10   10\n1\n\nA\nXX\n2\n0   0\n1   abc\n";
        match parse_region_str(input) {
            Err(BoundaryError::Parse { stage, line, .. }) => {
                assert_eq!(stage, Stage::Point);
                assert_eq!(line, 9);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_counts() {
        assert!(matches!(
            parse_region_str("0   0\n1   1\nmany\n"),
            Err(BoundaryError::Parse {
                stage: Stage::CountyCount,
                line: 3,
                ..
            })
        ));
        assert!(matches!(
            parse_region_str("0   0\n1   1\n1\nA\nXX\n-2\n"),
            Err(BoundaryError::Parse {
                stage: Stage::PointCount,
                ..
            })
        ));
    }

    #[test]
    fn test_separator_must_be_exactly_three_spaces() {
        for bad in ["0 0", "0  0", "0    0", "0\t0", "0   \t0", "0"] {
            let input = format!("{bad}\n1   1\n0\n");
            assert!(
                matches!(
                    parse_region_str(&input),
                    Err(BoundaryError::Parse {
                        stage: Stage::BBox,
                        line: 1,
                        ..
                    })
                ),
                "accepted '{bad}'"
            );
        }
    }

    #[test]
    fn test_non_finite_values_rejected() {
        assert!(parse_region_str("NaN   0\n1   1\n0\n").is_err());
        assert!(parse_region_str("0   inf\n1   1\n0\n").is_err());
    }

    #[test]
    fn test_zero_point_county_is_degenerate() {
        let input = "0   0\n1   1\n1\n\nEmpty\nXX\n0\n";
        match parse_region_str(input) {
            Err(BoundaryError::DegeneratePolygon { name, line }) => {
                assert_eq!(name, "Empty");
                assert_eq!(line, 5);
            }
            other => panic!("expected degenerate polygon, got {other:?}"),
        }
    }

    #[test]
    fn test_single_point_county_is_accepted() {
        let region = parse_region_str("0   0\n1   1\n1\n\nDot\nXX\n1\n0.5   0.5\n").unwrap();
        assert_eq!(region.counties[0].points.len(), 1);
    }

    #[test]
    fn test_blank_line_inside_ring_is_count_mismatch() {
        let input = "0   0\n10   10\n2\n\nA\nXX\n3\n0   0\n1   1\n\nB\nXX\n1\n2   2\n";
        match parse_region_str(input) {
            Err(BoundaryError::CountMismatch {
                stage,
                declared,
                found,
                ..
            }) => {
                assert_eq!(stage, Stage::Point);
                assert_eq!(declared, 3);
                assert_eq!(found, 2);
            }
            other => panic!("expected count mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_points_are_count_mismatch() {
        let input = "0   0\n10   10\n1\n\nA\nXX\n2\n0   0\n1   1\n2   2\n3   3\n";
        match parse_region_str(input) {
            Err(BoundaryError::CountMismatch {
                stage,
                line,
                declared,
                found,
            }) => {
                assert_eq!(stage, Stage::Point);
                assert_eq!(line, 10);
                assert_eq!(declared, 2);
                assert_eq!(found, 4);
            }
            other => panic!("expected count mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_records_are_count_mismatch() {
        let input = "0   0\n10   10\n1\n\nA\nXX\n1\n0   0\n\nB\nXX\n1\n1   1\n\n";
        match parse_region_str(input) {
            Err(BoundaryError::CountMismatch {
                stage,
                declared,
                found,
                ..
            }) => {
                assert_eq!(stage, Stage::CountyCount);
                assert_eq!(declared, 1);
                assert_eq!(found, 2);
            }
            other => panic!("expected count mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_huge_county_count_is_truncated_not_allocated() {
        match parse_region_str("0   0\n1   1\n18446744073709551615\n") {
            Err(BoundaryError::Truncated { stage, .. }) => assert_eq!(stage, Stage::Name),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn test_huge_point_count_is_truncated_not_allocated() {
        let input = "0   0\n1   1\n1\n\nA\nXX\n18446744073709551615\n0   0\n";
        match parse_region_str(input) {
            Err(BoundaryError::Truncated { stage, .. }) => assert_eq!(stage, Stage::Point),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn test_points_outside_bbox_are_kept() {
        let region = parse_region_str("0   0\n1   1\n1\n\nA\nXX\n1\n5   5\n").unwrap();
        assert_eq!(region.counties[0].points[0], coord! { x: 5.0, y: 5.0 });
    }
}
