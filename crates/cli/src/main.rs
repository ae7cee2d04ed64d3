//! NetReach CLI - network service area analysis

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use netreach_algorithms::batch::{multi_service_area, MultiServiceAreaParams, CONTAINER_FILE};
use netreach_algorithms::network::{
    service_area, CostStrategy, Direction, NetworkProvider, ServiceAreaParams,
};
use netreach_core::io::{read_layer, read_line_layer, read_point_layer, GeoPackage};
use netreach_core::Feedback;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "netreach")]
#[command(author, version, about = "Network service area analysis", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a vector layer
    Info {
        /// Input layer (GeoJSON)
        input: PathBuf,
    },
    /// Service area analysis
    ServiceArea {
        #[command(subcommand)]
        algorithm: ServiceAreaCommands,
    },
}

#[derive(Subcommand)]
enum ServiceAreaCommands {
    /// One service area at a single travel-cost cutoff
    Single {
        #[command(flatten)]
        layers: LayerArgs,
        /// Travel-cost cutoff (layer units, or seconds with --strategy fastest)
        #[arg(long)]
        cutoff: f64,
        /// Output table name
        #[arg(long, default_value = "servicearea")]
        table: String,
        /// Output GeoPackage file
        output: PathBuf,
        #[command(flatten)]
        config: ProviderArgs,
    },
    /// Service areas for every distance class between two cutoffs
    Multi {
        #[command(flatten)]
        layers: LayerArgs,
        /// Smallest distance class (inclusive)
        #[arg(long, default_value = "0")]
        from_dist: u32,
        /// End of the distance range (exclusive)
        #[arg(long, default_value = "1000")]
        to_dist: u32,
        /// Distance between classes
        #[arg(long, default_value = "100")]
        interval: u32,
        /// Output directory for the container file
        out_dir: PathBuf,
        #[command(flatten)]
        config: ProviderArgs,
    },
}

#[derive(Args)]
struct LayerArgs {
    /// Start point layer (GeoJSON)
    #[arg(long)]
    points: PathBuf,
    /// Network line layer (GeoJSON)
    #[arg(long)]
    network: PathBuf,
}

#[derive(Args)]
struct ProviderArgs {
    /// Cost strategy: shortest, fastest
    #[arg(long, default_value = "shortest")]
    strategy: String,
    /// Vertex snapping tolerance (layer units)
    #[arg(long, default_value = "5.0")]
    tolerance: f64,
    /// Default speed in km/h (fastest strategy)
    #[arg(long, default_value = "5.0")]
    default_speed: f64,
    /// Attribute holding per-feature direction values
    #[arg(long)]
    direction_field: Option<String>,
    /// Direction value meaning forward-only
    #[arg(long, default_value = "")]
    value_forward: String,
    /// Direction value meaning backward-only
    #[arg(long, default_value = "")]
    value_backward: String,
    /// Direction value meaning both directions
    #[arg(long, default_value = "")]
    value_both: String,
    /// Attribute holding per-feature speeds (km/h)
    #[arg(long)]
    speed_field: Option<String>,
    /// Also write boundary point tables
    #[arg(long)]
    include_bounds: bool,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn parse_strategy(s: &str) -> Result<CostStrategy> {
    match s.to_lowercase().as_str() {
        "shortest" | "distance" => Ok(CostStrategy::Shortest),
        "fastest" | "time" => Ok(CostStrategy::Fastest),
        _ => anyhow::bail!("Unknown strategy: {}. Use shortest or fastest.", s),
    }
}

fn provider_params(config: &ProviderArgs) -> Result<ServiceAreaParams> {
    Ok(ServiceAreaParams {
        strategy: parse_strategy(&config.strategy)?,
        travel_cost: 0.0,
        direction_field: config.direction_field.clone(),
        value_forward: config.value_forward.clone(),
        value_backward: config.value_backward.clone(),
        value_both: config.value_both.clone(),
        default_direction: Direction::Both,
        speed_field: config.speed_field.clone(),
        default_speed: config.default_speed,
        tolerance: config.tolerance,
        include_bounds: config.include_bounds,
    })
}

/// Progress bar bridge into the algorithms' feedback seam
struct BarFeedback {
    bar: ProgressBar,
}

impl BarFeedback {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{bar:40.green} {pos:>3}% {msg}")
                .unwrap(),
        );
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Feedback for BarFeedback {
    fn set_progress(&mut self, percent: f64) {
        self.bar.set_position(percent.round() as u64);
    }

    fn push_info(&mut self, message: &str) {
        self.bar.set_message(message.to_string());
    }
}

fn done(name: &str, target: &str, elapsed: std::time::Duration) {
    println!("{name} saved to: {target}");
    println!("  Processing time: {elapsed:.2?}");
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let layer = read_layer(&input).context("Failed to read layer")?;

            println!("File: {}", input.display());
            println!("Features: {}", layer.len());
            if let Some(bbox) = layer.bounding_box() {
                println!(
                    "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                    bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
                );
            }

            let mut kinds: Vec<(&'static str, usize)> = Vec::new();
            for feature in layer.iter() {
                let kind = feature.geometry_kind();
                match kinds.iter_mut().find(|(k, _)| *k == kind) {
                    Some(entry) => entry.1 += 1,
                    None => kinds.push((kind, 1)),
                }
            }
            println!("\nGeometry types:");
            for (kind, count) in kinds {
                println!("  {kind}: {count}");
            }
        }

        // ── Service area ─────────────────────────────────────────────
        Commands::ServiceArea { algorithm } => match algorithm {
            ServiceAreaCommands::Single {
                layers,
                cutoff,
                table,
                output,
                config,
            } => {
                let mut params = provider_params(&config)?;
                params.travel_cost = cutoff;

                let starts =
                    read_point_layer(&layers.points).context("Failed to read start points")?;
                let network =
                    read_line_layer(&layers.network).context("Failed to read network")?;
                info!(
                    starts = starts.len(),
                    network = network.len(),
                    cutoff,
                    "computing service area"
                );

                let start = Instant::now();
                let result = service_area(&network, &starts, &params)
                    .context("Failed to compute service area")?;
                let elapsed = start.elapsed();

                let mut gpkg =
                    GeoPackage::create(&output).context("Failed to open output container")?;
                let table_ref = gpkg
                    .write_layer(&table, &result.lines)
                    .context("Failed to write output")?;
                if let Some(bounds) = &result.bounds {
                    gpkg.write_layer(&format!("{table}_bounds"), bounds)
                        .context("Failed to write bounds")?;
                }
                done("Service area", &table_ref.to_string(), elapsed);
            }

            ServiceAreaCommands::Multi {
                layers,
                from_dist,
                to_dist,
                interval,
                out_dir,
                config,
            } => {
                let params = MultiServiceAreaParams {
                    from_dist,
                    to_dist,
                    interval_dist: interval,
                    area: provider_params(&config)?,
                };

                let starts =
                    read_point_layer(&layers.points).context("Failed to read start points")?;
                let network =
                    read_line_layer(&layers.network).context("Failed to read network")?;

                let mut feedback = BarFeedback::new();
                let start = Instant::now();
                let result = multi_service_area(
                    &NetworkProvider,
                    &network,
                    &starts,
                    &out_dir,
                    &params,
                    &mut feedback,
                )
                .context("Failed to run service area batch")?;
                let elapsed = start.elapsed();
                feedback.finish();

                println!(
                    "Wrote {} distance classes to {}",
                    result.classes_written,
                    out_dir.join(CONTAINER_FILE).display()
                );
                done("Service area batch", &result.last.to_string(), elapsed);
            }
        },
    }

    Ok(())
}
