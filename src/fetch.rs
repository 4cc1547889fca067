use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::path::PathBuf;

use crate::archive::Archive;
use crate::config::Config;
use crate::error::Result;
use crate::transport::{fetch_tile, HttpTransport, Transport};

/// Outcome of a completed run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Summary {
    /// Tiles written to the archive.
    pub downloaded: usize,

    /// Tiles that were absent or failed every attempt.
    pub skipped: usize,

    pub output: PathBuf,

    /// Size of the finished archive in bytes.
    pub file_size: u64,
}

/// Fetch the tiles specified in `cfg` over HTTP and store them in a new
/// MBTiles archive.
///
/// Any existing file at the output path is replaced.
///
/// # Example
/// ```rust,no_run
/// use tile_archiver::{fetch, Config};
///
/// # #[tokio::main]
/// # async fn main() {
/// let config = Config {
///     zoom_levels: vec![14],
///     max_tiles: Some(10),
///     ..Config::default()
/// };
///
/// fetch(&config).await.expect("failed fetching tiles");
/// # }
/// ```
pub async fn fetch(cfg: &Config) -> Result<Summary> {
    let transport = HttpTransport::new(cfg.timeout, &cfg.user_agent)?;
    fetch_with(&transport, cfg).await
}

/// Like [`fetch`], but retrieves tiles through the given transport.
///
/// Tiles are fetched one at a time. Tiles the server doesn't have, or that
/// fail every retry, are skipped; only archive errors abort the run.
pub async fn fetch_with<T>(transport: &T, cfg: &Config) -> Result<Summary>
where
    T: Transport + Sync + ?Sized,
{
    // fail before the previous archive is removed
    cfg.url.validate()?;
    let zoom_levels = cfg.unique_zoom_levels();
    let metadata = cfg.metadata()?;
    let total = cfg.tile_count()?;
    info!(
        "{} tiles cover {} at zoom levels {:?}",
        total, cfg.bounding_box, zoom_levels
    );

    let mut archive = Archive::create(&cfg.output, &metadata, cfg.archive.clone())?;
    let mut skipped = 0;
    let cap_reached = |stored: usize| cfg.max_tiles.map_or(false, |max| stored >= max);

    for zoom in zoom_levels {
        if cap_reached(archive.inserted()) {
            break;
        }

        info!("downloading zoom level {}", zoom);
        let pb = progress_bar(cfg, cfg.bounding_box.count_tiles(&[zoom])?, zoom);

        for tile in cfg.bounding_box.tiles(zoom)? {
            if cap_reached(archive.inserted()) {
                break;
            }

            let url = cfg.url.tile_url(&tile)?;
            match fetch_tile(transport, &url, &cfg.retry).await {
                Some(data) => archive.insert(&tile, &data)?,
                None => {
                    debug!("skipping tile {}/{}/{}", tile.z, tile.x, tile.y);
                    skipped += 1;
                }
            }

            pb.inc(1);
            tokio::time::sleep(cfg.throttle).await;
        }

        pb.finish_and_clear();
    }

    let stats = archive.finalize()?;
    info!(
        "stored {} tiles, skipped {}, in {}",
        stats.tiles,
        skipped,
        cfg.output.display()
    );

    Ok(Summary {
        downloaded: stats.tiles,
        skipped,
        output: cfg.output.clone(),
        file_size: stats.file_size,
    })
}

fn progress_bar(cfg: &Config, len: u64, zoom: u8) -> ProgressBar {
    if !cfg.progress {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] {bar:60.cyan/blue} {pos:>7}/{len:7} ETA: {eta}")
            .progress_chars("##-"),
    );
    pb.set_message(&format!("zoom {}", zoom));

    pb
}
