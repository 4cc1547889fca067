mod args;
mod validators;

use anyhow::{Context, Result};
use args::Args;
use tile_archiver::{fetch, Config};

/// Rough average size of a satellite tile, used for estimates.
const ESTIMATED_TILE_BYTES: f64 = 50_000f64;

#[tokio::main]
async fn main() -> Result<()> {
    let env = env_logger::Env::default()
        .filter_or(env_logger::DEFAULT_FILTER_ENV, "tile_archiver=info");
    env_logger::Builder::from_env(env).init();

    let args = Args::parse()?;
    let dry_run = args.dry_run;
    let config: Config = args.into();

    let tile_count = config
        .tile_count()
        .context("failed counting tiles in bounding box")?;

    print_banner(&config, tile_count);

    if dry_run {
        eprintln!(
            "would download {} tiles (approx {}, assuming 50 kb per tile)",
            tile_count,
            pretty_bytes::converter::convert((tile_count as f64) * ESTIMATED_TILE_BYTES)
        );

        return Ok(());
    }

    let summary = fetch(&config)
        .await
        .with_context(|| format!("failed writing archive {}", config.output.display()))?;

    println!();
    println!("Download complete!");
    println!("  Downloaded:  {} tiles", summary.downloaded);
    println!("  Skipped:     {} tiles", summary.skipped);
    println!("  Output file: {}", summary.output.display());
    println!(
        "  File size:   {}",
        pretty_bytes::converter::convert(summary.file_size as f64)
    );

    Ok(())
}

fn print_banner(config: &Config, tile_count: u64) {
    let rule = "=".repeat(60);

    println!("{}", rule);
    println!("Satellite tile archiver");
    println!("{}", rule);
    println!("Bounds:      {}", config.bounding_box);
    println!("Zoom levels: {:?}", config.zoom_levels);
    println!("Tile server: {} ({})", config.server, config.url);
    println!("Tiles:       {}", tile_count);
    if let Some(max) = config.max_tiles {
        println!("Limit:       {} tiles", max);
    }
    println!("{}", rule);
}
