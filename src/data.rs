use crate::boundary::parse_region;
use crate::color::parse_channel;
use crate::types::{ColorMap, Region};
use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Loads the boundary record of `region_name`. `path` is either the record
/// itself or a directory holding `<region>.txt` files.
pub fn load_region(path: &Path, region_name: &str) -> Result<Region> {
    let file_path = locate(path, &format!("{region_name}.txt"))
        .with_context(|| format!("No boundary record for region '{region_name}'"))?;

    info!("Loading boundaries from {:?}...", file_path);
    let file = File::open(&file_path)
        .with_context(|| format!("Failed to open boundary file: {:?}", file_path))?;
    let region = parse_region(BufReader::new(file))
        .with_context(|| format!("Failed to parse boundary file: {:?}", file_path))?;

    info!(
        counties = region.county_count(),
        records = region.declared_records,
        "Loaded region '{}'",
        region_name
    );
    Ok(region)
}

/// Loads `name,r,g,b,a` records. A directory is searched for
/// `<region><year>.csv`.
pub fn load_statistics(path: &Path, region_name: &str, year: Option<&str>) -> Result<ColorMap> {
    let file_name = format!("{}{}.csv", region_name, year.unwrap_or(""));
    let file_path = locate(path, &file_name)
        .with_context(|| format!("No statistics for region '{region_name}'"))?;

    info!("Loading statistics from {:?}...", file_path);
    let file = File::open(&file_path)
        .with_context(|| format!("Failed to open statistics file: {:?}", file_path))?;
    let colors = read_statistics(file)
        .with_context(|| format!("Failed to read statistics file: {:?}", file_path))?;

    info!("Loaded colors for {} regions", colors.len());
    Ok(colors)
}

pub fn read_statistics<R: Read>(reader: R) -> Result<ColorMap> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut colors = ColorMap::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(i as u64 + 1);
        if record.len() != 5 {
            bail!("Record at line {} has {} fields, expected name,r,g,b,a", line, record.len());
        }

        let name = record[0].to_string();
        if name.is_empty() {
            bail!("Record at line {} has an empty name", line);
        }
        let mut channels = [0u8; 4];
        for (c, field) in channels.iter_mut().zip(record.iter().skip(1)) {
            *c = parse_channel(field).with_context(|| format!("Record at line {}", line))?;
        }

        if colors.insert(name.clone(), image::Rgba(channels)).is_some() {
            warn!(name = %name, line, "duplicate statistics record, keeping the last one");
        }
    }
    Ok(colors)
}

fn locate(path: &Path, file_name: &str) -> Result<PathBuf> {
    if path.is_dir() {
        let candidate = path.join(file_name);
        if !candidate.is_file() {
            return Err(anyhow!("{:?} not found in {:?}", file_name, path));
        }
        Ok(candidate)
    } else if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(anyhow!("Path does not exist: {:?}", path))
    }
}
