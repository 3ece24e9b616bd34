//! hydrotrace CLI - Stream network extraction from DEM flow derivatives

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hydrotrace_algorithms::filter::FilterConfig;
use hydrotrace_algorithms::pipeline::{run_pipeline, PipelineConfig};
use hydrotrace_algorithms::qa::render_markdown;
use hydrotrace_algorithms::watershed::{delineate_from_outlet, WatershedParams};
use hydrotrace_core::io::{read_geotiff, write_geotiff, write_network_geojson, GeoTiffOptions};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hydrotrace")]
#[command(author, version, about = "Stream network extraction from DEM flow derivatives", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Extract stream networks at one or more accumulation thresholds
    Extract {
        /// Input D8 flow direction raster (codes 1-8, 0 = pit)
        #[arg(long)]
        flow_dir: PathBuf,
        /// Input flow accumulation raster (upstream cell counts)
        #[arg(long)]
        flow_acc: PathBuf,
        /// Output directory for per-threshold GeoJSON networks
        #[arg(short, long)]
        output: PathBuf,
        /// Flow accumulation thresholds in cells
        #[arg(
            short,
            long,
            value_delimiter = ',',
            default_values_t = vec![100u32, 250, 500, 1000]
        )]
        thresholds: Vec<u32>,
        /// Minimum channel length in meters
        #[arg(long, default_value = "25.0")]
        min_length: f64,
        /// Minimum contributing drainage area in square kilometers
        #[arg(long, default_value = "0.01")]
        min_drainage_area: f64,
        /// Segments below this sinuosity are suspect straight-line artifacts
        #[arg(long, default_value = "1.1")]
        sinuosity_threshold: f64,
        /// Straightness is only penalized below this length in meters
        #[arg(long, default_value = "100.0")]
        sinuosity_length_cap: f64,
        /// Also write qa_report.md and qa_report.json
        #[arg(long)]
        report: bool,
    },
    /// Delineate the watershed draining to an outlet cell
    Watershed {
        /// Input D8 flow direction raster (codes 1-8, 0 = pit)
        #[arg(long)]
        flow_dir: PathBuf,
        /// Input flow accumulation raster (upstream cell counts)
        #[arg(long)]
        flow_acc: PathBuf,
        /// Outlet pour point as "row,col"
        #[arg(long)]
        outlet: String,
        /// Snap search radius in cells (0 disables snapping)
        #[arg(long, default_value = "0")]
        snap_radius: usize,
        /// Output watershed mask file (1 = inside, 0 = outside)
        #[arg(short, long)]
        output: PathBuf,
    },
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

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_flow_dir(path: &PathBuf) -> Result<hydrotrace_core::Raster<u8>> {
    let pb = spinner("Reading flow direction...");
    let raster: hydrotrace_core::Raster<u8> =
        read_geotiff(path, None).context("Failed to read flow direction raster")?;
    pb.finish_and_clear();
    info!("Flow direction: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn read_flow_acc(path: &PathBuf) -> Result<hydrotrace_core::Raster<f64>> {
    let pb = spinner("Reading flow accumulation...");
    let raster: hydrotrace_core::Raster<f64> =
        read_geotiff(path, None).context("Failed to read flow accumulation raster")?;
    pb.finish_and_clear();
    info!("Flow accumulation: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_mask(raster: &hydrotrace_core::Raster<u8>, path: &PathBuf) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_outlet(s: &str) -> Result<(usize, usize)> {
    let parts: Vec<&str> = s.trim().split(',').collect();
    if parts.len() != 2 {
        anyhow::bail!("Outlet must be 'row,col', got: {}", s);
    }
    let row: usize = parts[0].trim().parse().context("Invalid row")?;
    let col: usize = parts[1].trim().parse().context("Invalid col")?;
    Ok((row, col))
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_flow_acc(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
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
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        // ── Extract ──────────────────────────────────────────────────
        Commands::Extract {
            flow_dir,
            flow_acc,
            output,
            thresholds,
            min_length,
            min_drainage_area,
            sinuosity_threshold,
            sinuosity_length_cap,
            report,
        } => {
            let config = PipelineConfig {
                thresholds,
                filter: FilterConfig {
                    min_length_m: min_length,
                    min_drainage_area_sqkm: min_drainage_area,
                    sinuosity_threshold,
                    sinuosity_length_cap_m: sinuosity_length_cap,
                },
            };

            let dir = read_flow_dir(&flow_dir)?;
            let acc = read_flow_acc(&flow_acc)?;
            std::fs::create_dir_all(&output).context("Failed to create output directory")?;

            let start = Instant::now();
            let pb = spinner("Extracting stream networks...");
            let run = run_pipeline(&dir, &acc, &config)
                .context("Failed to extract stream networks")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            for tr in &run.runs {
                let path = output.join(format!("streams_t{}.geojson", tr.threshold));
                write_network_geojson(&tr.network, dir.crs(), &path)
                    .context("Failed to write network GeoJSON")?;
                println!(
                    "t={}: {} segments, {:.2} km, max order {}, {} dropped -> {}",
                    tr.threshold,
                    tr.network.len(),
                    tr.network.total_length_km(),
                    tr.network.max_order(),
                    tr.dropped.len(),
                    path.display()
                );
            }

            if report {
                let md_path = output.join("qa_report.md");
                std::fs::write(&md_path, render_markdown(&run.report))
                    .context("Failed to write QA report")?;
                let json = serde_json::to_string_pretty(&run.report)
                    .context("Failed to serialize QA report")?;
                std::fs::write(output.join("qa_report.json"), json)
                    .context("Failed to write QA report JSON")?;
                println!("QA report saved to: {}", md_path.display());

                for rec in &run.report.overall.recommendations {
                    info!("recommendation: {}", rec.message());
                }
            }

            done("Stream networks", &output, elapsed);
        }

        // ── Watershed ────────────────────────────────────────────────
        Commands::Watershed {
            flow_dir,
            flow_acc,
            outlet,
            snap_radius,
            output,
        } => {
            let outlet = parse_outlet(&outlet)?;
            let dir = read_flow_dir(&flow_dir)?;
            let acc = read_flow_acc(&flow_acc)?;

            let start = Instant::now();
            let pb = spinner("Delineating watershed...");
            let outcome = delineate_from_outlet(
                &dir,
                &acc,
                &WatershedParams {
                    outlet,
                    snap_radius,
                },
            )
            .context("Failed to delineate watershed")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            println!(
                "Outlet: ({}, {})  Cells: {}  Area: {:.4} sq km",
                outcome.outlet.0, outcome.outlet.1, outcome.stats.cells, outcome.stats.area_sqkm
            );
            write_mask(&outcome.mask, &output)?;
            done("Watershed mask", &output, elapsed);
        }
    }

    Ok(())
}
