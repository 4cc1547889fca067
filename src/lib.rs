//! Download satellite tiles into a single MBTiles archive.
//!
//! **Use with caution.** Downloading tiles en-masse can hog down a tile
//! server easily, and public imagery servers have usage terms of their own.
//! Tiles are fetched one at a time with a short pause after each.
//!
//! The archive is always created from scratch. Tiles are stored in the
//! MBTiles `tiles` table with south-up (TMS) row numbering, the format tile
//! servers such as TileServer GL expect.
//!
//! # CLI Example
//!
//! ```bash
//! tile-archiver \
//!   --server esri \
//!   --zoom 14 15 \
//!   --max-tiles 1000 \
//!   --output israel.mbtiles
//! ```
//!
//! # Library Example
//! ```rust,no_run
//! use tile_archiver::{fetch, BoundingBox, Config};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = Config {
//!     bounding_box: BoundingBox::new(34.0, 29.0, 36.0, 33.5).unwrap(),
//!     zoom_levels: vec![14, 15],
//!     output: "./israel.mbtiles".into(),
//!     ..Config::default()
//! };
//!
//! let summary = fetch(&config).await.expect("failed fetching tiles");
//! println!("stored {} tiles", summary.downloaded);
//! # }
//! ```

mod archive;
mod bounding_box;
mod config;
mod error;
mod fetch;
mod server;
mod tile;
mod transport;
mod url;

pub use archive::{Archive, ArchiveOptions, ArchiveStats, Metadata};
pub use bounding_box::{BoundingBox, Fixture};
pub use config::Config;
pub use error::{Error, FetchError, Result};
pub use fetch::{fetch, fetch_with, Summary};
pub use server::{TileFormat, TileServer};
pub use tile::{Tile, MAX_ZOOM};
pub use transport::{fetch_tile, HttpTransport, Response, RetryPolicy, Transport};
pub use url::UrlFormat;
