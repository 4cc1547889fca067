use std::{path::PathBuf, time::Duration};

use crate::archive::{ArchiveOptions, Metadata};
use crate::bounding_box::{BoundingBox, Fixture};
use crate::error::Result;
use crate::server::TileServer;
use crate::transport::{RetryPolicy, DEFAULT_USER_AGENT};
use crate::url::UrlFormat;

/// Tile fetching configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// The region to download.
    pub bounding_box: BoundingBox,

    /// Zoom levels to download, fetched in the given order.
    pub zoom_levels: Vec<u8>,

    /// Server the tiles come from. Determines the archive's tile format.
    pub server: TileServer,

    /// The URL to download individual tiles from including the replacement
    /// specifiers `{x}`, `{y}` and `{z}`.
    pub url: UrlFormat,

    /// The archive file to create.
    pub output: PathBuf,

    /// Stop after this many tiles were stored.
    pub max_tiles: Option<usize>,

    /// Name and description recorded in the archive metadata.
    pub name: String,
    pub description: String,

    pub retry: RetryPolicy,

    /// Pause after every tile, successful or not.
    pub throttle: Duration,

    /// Timeout for fetching a single tile.
    ///
    /// Pass the zero duration to disable the timeout.
    pub timeout: Duration,

    pub user_agent: String,

    pub archive: ArchiveOptions,

    /// Whether to draw a progress bar on stderr.
    pub progress: bool,
}

impl Config {
    pub const DEFAULT_OUTPUT: &'static str = "israel-satellite-high-zoom.mbtiles";
    pub const DEFAULT_ZOOM_LEVELS: &'static [u8] = &[14, 15, 16, 17, 18];
    pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(50);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    /// The configured zoom levels in order, with repeats dropped.
    pub fn unique_zoom_levels(&self) -> Vec<u8> {
        let mut seen = Vec::with_capacity(self.zoom_levels.len());
        for &z in &self.zoom_levels {
            if !seen.contains(&z) {
                seen.push(z);
            }
        }
        seen
    }

    /// The archive metadata implied by this configuration.
    pub fn metadata(&self) -> Result<Metadata> {
        Metadata::new(
            self.name.as_str(),
            self.description.as_str(),
            self.server.tile_format(),
            self.bounding_box,
            &self.zoom_levels,
        )
    }

    /// Number of tiles covering the configured region at all zoom levels.
    pub fn tile_count(&self) -> Result<u64> {
        self.bounding_box.count_tiles(&self.unique_zoom_levels())
    }
}

impl Default for Config {
    fn default() -> Self {
        let server = TileServer::Esri;

        Self {
            bounding_box: Fixture::Israel.into(),
            zoom_levels: Self::DEFAULT_ZOOM_LEVELS.to_vec(),
            server,
            url: server.url_format(),
            output: PathBuf::from(Self::DEFAULT_OUTPUT),
            max_tiles: None,
            name: Metadata::DEFAULT_NAME.to_owned(),
            description: Metadata::DEFAULT_DESCRIPTION.to_owned(),
            retry: RetryPolicy::default(),
            throttle: Self::DEFAULT_THROTTLE,
            timeout: Self::DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            archive: ArchiveOptions::default(),
            progress: true,
        }
    }
}
