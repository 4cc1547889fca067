//! The MBTiles archive the downloaded tiles are written into.
//!
//! An archive is always created from scratch: whatever exists at the target
//! path is removed first. Rows are written inside a long-running transaction
//! that is committed every `commit_interval` inserts, so a killed run keeps
//! everything up to the last commit.

use log::{debug, info, warn};
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::bounding_box::BoundingBox;
use crate::error::{Error, Result};
use crate::server::TileFormat;
use crate::tile::Tile;

/// Metadata written once into a freshly created archive.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    pub format: TileFormat,
    pub bounds: BoundingBox,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Metadata {
    pub const DEFAULT_NAME: &'static str = "Israel Satellite Tiles";
    pub const DEFAULT_DESCRIPTION: &'static str = "High resolution satellite tiles for Israel";
    const LAYER_TYPE: &'static str = "baselayer";

    /// Fails with [`Error::NoZoomLevels`] if `zoom_levels` is empty.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        format: TileFormat,
        bounds: BoundingBox,
        zoom_levels: &[u8],
    ) -> Result<Self> {
        let min_zoom = *zoom_levels.iter().min().ok_or(Error::NoZoomLevels)?;
        let max_zoom = *zoom_levels.iter().max().ok_or(Error::NoZoomLevels)?;

        Ok(Self {
            name: name.into(),
            description: description.into(),
            format,
            bounds,
            min_zoom,
            max_zoom,
        })
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("format", self.format.to_string()),
            ("bounds", self.bounds.to_string()),
            ("minzoom", self.min_zoom.to_string()),
            ("maxzoom", self.max_zoom.to_string()),
            ("type", Self::LAYER_TYPE.to_owned()),
            ("description", self.description.clone()),
        ]
    }
}

/// Durability knobs of an [`Archive`].
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveOptions {
    /// Commit after this many successful inserts.
    pub commit_interval: usize,

    /// Pause after closing the connection before looking for a leftover
    /// write-ahead log.
    pub settle_delay: Duration,

    /// Pause after forcing a checkpoint.
    pub checkpoint_delay: Duration,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            commit_interval: 100,
            settle_delay: Duration::from_secs(1),
            checkpoint_delay: Duration::from_millis(500),
        }
    }
}

/// Final numbers of a finalized archive.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ArchiveStats {
    pub tiles: usize,
    pub file_size: u64,
}

/// An open MBTiles archive with a pending write transaction.
#[derive(Debug)]
pub struct Archive {
    conn: Connection,
    path: PathBuf,
    options: ArchiveOptions,
    inserted: usize,
}

impl Archive {
    /// Creates a new archive at `path`, replacing whatever is there.
    ///
    /// A pre-existing file that cannot be removed is only warned about; the
    /// archive is then opened on top of it and its metadata rewritten.
    pub fn create(path: &Path, metadata: &Metadata, options: ArchiveOptions) -> Result<Self> {
        remove_existing(path);

        let conn = Connection::open(path).map_err(archive_err("open", path))?;

        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(archive_err("enable WAL on", path))?;

        conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS tiles (
                zoom_level INTEGER NOT NULL,
                tile_column INTEGER NOT NULL,
                tile_row INTEGER NOT NULL,
                tile_data BLOB NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS tile_index
                ON tiles (zoom_level, tile_column, tile_row);
            CREATE TABLE IF NOT EXISTS metadata (
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                UNIQUE(name)
            );
            DELETE FROM metadata;",
        )
        .map_err(archive_err("create schema in", path))?;

        {
            let mut stmt = conn
                .prepare("INSERT INTO metadata (name, value) VALUES (?1, ?2)")
                .map_err(archive_err("prepare metadata insert for", path))?;

            for (name, value) in metadata.rows() {
                stmt.execute(params![name, value])
                    .map_err(archive_err("write metadata to", path))?;
            }
        }

        conn.execute_batch("COMMIT; BEGIN;")
            .map_err(archive_err("commit metadata to", path))?;

        info!("created archive {}", path.display());

        Ok(Self {
            conn,
            path: path.to_owned(),
            options,
            inserted: 0,
        })
    }

    /// Writes a tile, converting its row to the south-up convention.
    pub fn insert(&mut self, tile: &Tile, data: &[u8]) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT OR REPLACE INTO tiles (zoom_level, tile_column, tile_row, tile_data)
                VALUES (?1, ?2, ?3, ?4)",
            )
            .and_then(|mut stmt| stmt.execute(params![tile.z, tile.x, tile.tms_row(), data]))
            .map_err(archive_err("insert tile into", &self.path))?;

        self.inserted += 1;

        if self.options.commit_interval > 0 && self.inserted % self.options.commit_interval == 0 {
            self.checkpoint()?;
            debug!("committed {} tiles", self.inserted);
        }

        Ok(())
    }

    /// Number of tiles inserted through this handle.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Commits the pending transaction and starts a new one.
    fn checkpoint(&mut self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT; BEGIN;")
            .map_err(archive_err("commit", &self.path))
    }

    /// Commits, closes, and merges any leftover write-ahead log so the
    /// archive is a single self-contained file.
    pub fn finalize(self) -> Result<ArchiveStats> {
        let Archive {
            conn,
            path,
            options,
            inserted,
        } = self;

        conn.execute_batch("COMMIT;")
            .map_err(archive_err("commit", &path))?;
        conn.close()
            .map_err(|(_, source)| archive_err("close", &path)(source))?;

        thread::sleep(options.settle_delay);

        let wal = wal_path(&path);
        if wal.exists() {
            info!("merging write-ahead log into {}", path.display());

            let conn = Connection::open(&path).map_err(archive_err("reopen", &path))?;
            conn.query_row("PRAGMA wal_checkpoint(FULL)", [], |row| row.get::<_, i64>(0))
                .map_err(archive_err("checkpoint", &path))?;
            conn.close()
                .map_err(|(_, source)| archive_err("close", &path)(source))?;

            thread::sleep(options.checkpoint_delay);
        }

        let file_size = fs::metadata(&path)?.len();

        Ok(ArchiveStats {
            tiles: inserted,
            file_size,
        })
    }
}

fn archive_err<'a>(step: &'static str, path: &'a Path) -> impl Fn(rusqlite::Error) -> Error + 'a {
    move |source| Error::Archive {
        step,
        path: path.to_owned(),
        source,
    }
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn wal_path(path: &Path) -> PathBuf {
    sidecar_path(path, "-wal")
}

/// Removes a previous archive and its journal sidecars, warning on failure.
///
/// The sidecars are left alone while the archive itself survives; they may
/// hold its last committed pages.
fn remove_existing(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("could not remove existing file {}: {}", path.display(), e);
            return;
        }
    }

    for target in [wal_path(path), sidecar_path(path, "-shm")].iter() {
        if target.exists() {
            if let Err(e) = fs::remove_file(target) {
                warn!("could not remove existing file {}: {}", target.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounding_box::Fixture;
    use tempfile::TempDir;

    fn metadata(zooms: &[u8]) -> Metadata {
        Metadata::new(
            Metadata::DEFAULT_NAME,
            Metadata::DEFAULT_DESCRIPTION,
            TileFormat::Jpg,
            Fixture::Israel.into(),
            zooms,
        )
        .unwrap()
    }

    fn fast() -> ArchiveOptions {
        ArchiveOptions {
            settle_delay: Duration::from_millis(0),
            checkpoint_delay: Duration::from_millis(0),
            ..ArchiveOptions::default()
        }
    }

    fn count(path: &Path, sql: &str) -> i64 {
        let conn = Connection::open(path).unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn metadata_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mbtiles");
        Archive::create(&path, &metadata(&[16, 14, 18]), fast())
            .unwrap()
            .finalize()
            .unwrap();

        let conn = Connection::open(&path).unwrap();
        let get = |name: &str| -> String {
            conn.query_row("SELECT value FROM metadata WHERE name = ?1", [name], |row| {
                row.get(0)
            })
            .unwrap()
        };

        assert_eq!(get("name"), "Israel Satellite Tiles");
        assert_eq!(get("format"), "jpg");
        assert_eq!(get("bounds"), "34.0,29.0,36.0,33.5");
        assert_eq!(get("minzoom"), "14");
        assert_eq!(get("maxzoom"), "18");
        assert_eq!(get("type"), "baselayer");
        assert_eq!(get("description"), "High resolution satellite tiles for Israel");
    }

    #[test]
    fn no_zoom_levels() {
        let res = Metadata::new("n", "d", TileFormat::Png, Fixture::Israel.into(), &[]);
        assert!(matches!(res, Err(Error::NoZoomLevels)));
    }

    #[test]
    fn recreate_keeps_one_row_per_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mbtiles");

        for _ in 0..3 {
            let mut archive = Archive::create(&path, &metadata(&[14]), fast()).unwrap();
            archive.insert(&Tile::new(1, 2, 14), b"tile").unwrap();
            archive.finalize().unwrap();
        }

        assert_eq!(count(&path, "SELECT COUNT(*) FROM metadata"), 7);
        assert_eq!(
            count(&path, "SELECT COUNT(*) FROM (SELECT DISTINCT name FROM metadata)"),
            7
        );
        assert_eq!(count(&path, "SELECT COUNT(*) FROM tiles"), 1);
    }

    #[test]
    fn insert_flips_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mbtiles");
        let mut archive = Archive::create(&path, &metadata(&[3]), fast()).unwrap();
        archive.insert(&Tile::new(5, 1, 3), &[0xff, 0xd8]).unwrap();
        assert_eq!(archive.inserted(), 1);
        archive.finalize().unwrap();

        let conn = Connection::open(&path).unwrap();
        let (z, col, row, data): (u8, u32, u32, Vec<u8>) = conn
            .query_row(
                "SELECT zoom_level, tile_column, tile_row, tile_data FROM tiles",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();

        assert_eq!((z, col, row, data), (3, 5, 6, vec![0xff, 0xd8]));
    }

    #[test]
    fn periodic_commits_survive_abandoned_handle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mbtiles");
        let mut archive = Archive::create(&path, &metadata(&[10]), fast()).unwrap();

        for i in 0..250 {
            archive.insert(&Tile::new(i, 0, 10), b"x").unwrap();
        }

        // Never finalized or dropped, like a killed process.
        std::mem::forget(archive);

        let rows = count(&path, "SELECT COUNT(*) FROM tiles");
        assert!(rows >= 200, "only {} rows committed", rows);
    }

    #[test]
    fn finalize_leaves_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mbtiles");
        let mut archive = Archive::create(&path, &metadata(&[12]), fast()).unwrap();
        for i in 0..5 {
            archive.insert(&Tile::new(i, i, 12), b"data").unwrap();
        }

        let stats = archive.finalize().unwrap();

        assert_eq!(stats.tiles, 5);
        assert!(stats.file_size > 0);
        assert!(!wal_path(&path).exists());
        assert_eq!(count(&path, "SELECT COUNT(*) FROM tiles"), 5);
    }

    #[test]
    fn create_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mbtiles");
        fs::write(&path, b"not a database").unwrap();

        Archive::create(&path, &metadata(&[14]), fast())
            .unwrap()
            .finalize()
            .unwrap();

        assert_eq!(count(&path, "SELECT COUNT(*) FROM tiles"), 0);
    }

    #[test]
    fn stale_sidecars_are_removed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mbtiles");
        fs::write(&path, b"old").unwrap();
        fs::write(wal_path(&path), b"old log").unwrap();
        fs::write(sidecar_path(&path, "-shm"), b"old index").unwrap();

        remove_existing(&path);

        assert!(!path.exists());
        assert!(!wal_path(&path).exists());
        assert!(!sidecar_path(&path, "-shm").exists());
    }

    #[test]
    fn sidecars_kept_when_archive_cannot_be_removed() {
        let dir = TempDir::new().unwrap();
        // a directory can't be removed with remove_file
        let path = dir.path().join("a.mbtiles");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("inner"), b"x").unwrap();
        fs::write(wal_path(&path), b"committed pages").unwrap();

        remove_existing(&path);

        assert!(path.exists());
        assert_eq!(fs::read(wal_path(&path)).unwrap(), b"committed pages".to_vec());
    }
}
