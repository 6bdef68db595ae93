//! Refuge CLI - protected-area labelling of species occurrence points

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use refuge_algorithms::config::PipelineConfig;
use refuge_algorithms::export::write_bundle;
use refuge_algorithms::labeling::{normalize_labels, spatial_join};
use refuge_algorithms::pipeline::Pipeline;
use refuge_algorithms::range::{filter_presence, filter_range_set, RangeFilterParams, PRESENCE_THRESHOLD};
use refuge_core::io::{
    read_geotiff, read_points, read_range_archive, write_geotiff, write_points_csv, GeoTiffOptions,
};
use refuge_core::{PointSchema, Raster};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "refuge")]
#[command(author, version, about = "Protected-area labelling of species occurrence points", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole pipeline and write the export bundle
    Run {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory relative input paths are resolved against
        #[arg(short, long)]
        base_dir: Option<PathBuf>,
        /// Output directory for the bundle
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Ecoregion GeoJSON aggregate
        #[arg(short, long)]
        ecoregions: Option<PathBuf>,
        /// Presence threshold for range rasters
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Show information about a raster, points CSV or range archive
    Info {
        /// Input file or directory
        input: PathBuf,
        #[command(flatten)]
        columns: ColumnArgs,
    },
    /// Label points with the protected-area raster
    Join {
        /// Points CSV
        points: PathBuf,
        /// Protected-area GeoTIFF
        raster: PathBuf,
        /// Output CSV
        output: PathBuf,
        /// Leave no-data samples empty instead of writing 0
        #[arg(long)]
        keep_nodata: bool,
        #[command(flatten)]
        columns: ColumnArgs,
    },
    /// Mask range-raster cells below the presence threshold
    FilterRange {
        /// Range GeoTIFF, zip archive or directory of GeoTIFFs
        input: PathBuf,
        /// Output GeoTIFF (single raster) or directory (archive)
        output: PathBuf,
        /// Cells strictly below this value become no-data
        #[arg(short, long, default_value_t = PRESENCE_THRESHOLD)]
        threshold: f64,
    },
}

/// Column names in a points CSV
#[derive(Args, Debug, Clone, PartialEq)]
struct ColumnArgs {
    /// Taxon column
    #[arg(long, default_value = "species")]
    taxon_column: String,
    /// Longitude column
    #[arg(long, default_value = "longitude")]
    lon_column: String,
    /// Latitude column
    #[arg(long, default_value = "latitude")]
    lat_column: String,
}

impl ColumnArgs {
    fn schema(&self) -> PointSchema {
        PointSchema {
            taxon_column: self.taxon_column.clone(),
            lon_column: self.lon_column.clone(),
            lat_column: self.lat_column.clone(),
            ..PointSchema::default()
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path, None)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result(raster: &Raster<f64>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn print_raster_info(input: &Path, raster: &Raster<f64>) {
    let (rows, cols) = raster.shape();
    let bounds = raster.bounds();
    let stats = raster.statistics();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!("Cell size: {}", raster.cell_size());
    println!(
        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y
    );
    if let Some(crs) = raster.crs() {
        println!("CRS: {}", crs);
    }
    if let Some(nodata) = raster.nodata() {
        println!("NoData: {}", nodata);
    }
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    if !raster.is_empty() {
        println!(
            "  Valid cells: {} ({:.1}%)",
            stats.valid_count,
            100.0 * stats.valid_count as f64 / raster.len() as f64
        );
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Run ──────────────────────────────────────────────────────
        Commands::Run {
            config,
            base_dir,
            output,
            ecoregions,
            threshold,
        } => {
            let mut cfg = match config {
                Some(path) => PipelineConfig::from_json_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            if let Some(dir) = base_dir {
                cfg.base_dir = dir;
            }
            if let Some(dir) = output {
                cfg.output_dir = dir;
            }
            if ecoregions.is_some() {
                cfg.ecoregions = ecoregions;
            }
            if let Some(t) = threshold {
                cfg.presence_threshold = t;
            }

            let start = Instant::now();
            let pb = spinner("Running pipeline...");
            let result = Pipeline::new(cfg.clone()).run().context("Pipeline failed")?;
            pb.set_message("Writing bundle...");
            let out_dir = cfg.output_path();
            let manifest = write_bundle(&result, &out_dir).context("Failed to write bundle")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            println!(
                "Points: {} ({} protected, {} unprotected; {} had no data before labelling)",
                manifest.point_count,
                manifest.protected.protected,
                manifest.protected.unprotected,
                manifest.joined.nodata
            );
            println!("Taxa: {}", manifest.taxa.join(", "));
            for (species, cells) in &manifest.ranges {
                println!("  {}: {} presence cells", species, cells);
            }
            done("Bundle", &out_dir, elapsed);
        }

        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input, columns } => {
            if is_csv(&input) {
                let table = read_points(&input, &columns.schema())
                    .with_context(|| format!("Failed to read points {}", input.display()))?;
                println!("File: {}", input.display());
                println!("Points: {}", table.len());
                if let Some(b) = table.bounds() {
                    println!(
                        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                        b.min_x, b.min_y, b.max_x, b.max_y
                    );
                }
                if !table.schema().extra_columns.is_empty() {
                    println!("Extra columns: {}", table.schema().extra_columns.join(", "));
                }
                println!("\nTaxa:");
                for (taxon, n) in table.count_by_taxon() {
                    println!("  {}: {}", taxon, n);
                }
            } else if is_tiff(&input) {
                let raster = read_raster(&input)?;
                print_raster_info(&input, &raster);
            } else {
                let ranges = read_range_archive(&input, &[])
                    .with_context(|| format!("Failed to read range archive {}", input.display()))?;
                println!("Archive: {}", input.display());
                println!("Species: {}", ranges.len());
                for (species, raster) in ranges.iter() {
                    println!(
                        "  {}: {} x {}, {} valid cells",
                        species,
                        raster.cols(),
                        raster.rows(),
                        raster.valid_count()
                    );
                }
            }
        }

        // ── Join ─────────────────────────────────────────────────────
        Commands::Join {
            points,
            raster,
            output,
            keep_nodata,
            columns,
        } => {
            let table = read_points(&points, &columns.schema())
                .with_context(|| format!("Failed to read points {}", points.display()))?;
            let protected = read_raster(&raster)?;

            let start = Instant::now();
            let joined = spatial_join(&table, &protected).context("Spatial join failed")?;
            let labeled = if keep_nodata {
                joined.table
            } else {
                normalize_labels(&joined.table)?
            };
            let elapsed = start.elapsed();

            write_points_csv(&labeled, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            if let Some(counts) = labeled.protected_counts() {
                println!(
                    "Protected: {}, unprotected: {}, no data: {}",
                    counts.protected, counts.unprotected, counts.nodata
                );
            }
            done("Labelled points", &output, elapsed);
        }

        // ── Filter range ─────────────────────────────────────────────
        Commands::FilterRange {
            input,
            output,
            threshold,
        } => {
            let params = RangeFilterParams { threshold };
            params.validate()?;

            if is_tiff(&input) {
                let raster = read_raster(&input)?;
                let start = Instant::now();
                let filtered = filter_presence(&raster, threshold);
                let elapsed = start.elapsed();
                write_result(&filtered, &output)?;
                println!(
                    "Presence cells: {} of {}",
                    filtered.valid_count(),
                    filtered.len()
                );
                done("Filtered range", &output, elapsed);
            } else {
                if is_tiff(&output) {
                    bail!("Output for an archive must be a directory, got {}", output.display());
                }
                let pb = spinner("Reading range archive...");
                let ranges = read_range_archive(&input, &[])
                    .with_context(|| format!("Failed to read range archive {}", input.display()))?;
                pb.finish_and_clear();

                let start = Instant::now();
                let filtered = filter_range_set(&ranges, params)?;
                let elapsed = start.elapsed();

                std::fs::create_dir_all(&output)
                    .with_context(|| format!("Failed to create {}", output.display()))?;
                for (species, raster) in filtered.iter() {
                    let path = output.join(format!("{}.tif", species));
                    write_result(raster, &path)?;
                    println!("  {}: {} presence cells", species, raster.valid_count());
                }
                done("Filtered ranges", &output, elapsed);
            }
        }
    }

    Ok(())
}
