use anyhow::{Context, Result};
use choropleth::color::{format_color, parse_color};
use choropleth::config::AppConfig;
use choropleth::{data, pipeline};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a choropleth map
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },
    /// Parse a boundary record and print a summary
    Inspect {
        #[arg(short, long, value_name = "PATH")]
        boundaries: PathBuf,

        #[arg(short, long)]
        region: String,
    },
}

#[derive(Args)]
struct Overrides {
    #[arg(long)]
    region: Option<String>,
    #[arg(long, value_name = "PATH")]
    boundaries: Option<PathBuf>,
    #[arg(long, value_name = "PATH")]
    statistics: Option<PathBuf>,
    #[arg(long)]
    year: Option<String>,
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    #[arg(long)]
    scale: Option<f64>,
    #[arg(long)]
    stroke_width: Option<f64>,
    /// "r,g,b,a" or "#rrggbb[aa]"
    #[arg(long)]
    stroke_color: Option<String>,
    /// Projection threads, 0 for one per CPU
    #[arg(long)]
    workers: Option<usize>,
}

impl Overrides {
    fn apply(self, config: &mut AppConfig) -> Result<()> {
        if let Some(v) = self.region {
            config.input.region = v;
        }
        if let Some(v) = self.boundaries {
            config.input.boundaries = v;
        }
        if let Some(v) = self.statistics {
            config.input.statistics = Some(v);
        }
        if let Some(v) = self.year {
            config.input.year = Some(v);
        }
        if let Some(v) = self.output {
            config.output.path = v;
        }
        if let Some(v) = self.scale {
            config.style.scale = v;
        }
        if let Some(v) = self.stroke_width {
            config.style.stroke_width = v;
        }
        if let Some(v) = self.stroke_color {
            // Normalise early so a typo fails before any input is read.
            let color = parse_color(&v).with_context(|| format!("Invalid --stroke-color {:?}", v))?;
            config.style.stroke_color = format_color(&color);
        }
        if let Some(v) = self.workers {
            config.processing.workers = v;
        }
        config.validate()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "choropleth=info",
        1 => "choropleth=debug",
        _ => "choropleth=trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Render { config, overrides } => {
            info!("Rendering map with config: {:?}", config);
            let mut app_config = AppConfig::load_from_file(&config)?;
            overrides.apply(&mut app_config)?;
            pipeline::run(&app_config)?;
        }
        Commands::Inspect { boundaries, region } => {
            let region_data = data::load_region(&boundaries, &region)?;
            let bbox = region_data.bbox;
            println!("region:      {}", region);
            println!("bbox:        ({}, {}) - ({}, {})", bbox.min().x, bbox.min().y, bbox.max().x, bbox.max().y);
            println!("records:     {}", region_data.declared_records);
            println!("counties:    {}", region_data.county_count());
            let subcounties: usize = region_data.counties.iter().map(|c| c.subcounties.len()).sum();
            println!("subcounties: {}", subcounties);
            let points: usize = region_data.counties.iter().map(|c| c.points.len()).sum();
            println!("points:      {}", points);
        }
    }

    Ok(())
}
