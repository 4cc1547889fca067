use async_trait::async_trait;
use reqwest::StatusCode;
use rusqlite::Connection;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use tile_archiver::{
    fetch_with, ArchiveOptions, Config, FetchError, Response, RetryPolicy, TileServer, Transport,
};

/// Stands in for a tile server: answers every URL with a small fake JPEG,
/// except for the URLs it was told to fail.
struct StubServer {
    flaky: Vec<String>,
    requests: Mutex<Vec<String>>,
}

impl StubServer {
    fn new() -> Self {
        Self {
            flaky: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for StubServer {
    async fn get(&self, url: &str) -> Result<Response, FetchError> {
        self.requests.lock().unwrap().push(url.to_owned());
        if self.flaky.iter().any(|f| f == url) {
            return Err(FetchError::Status(StatusCode::BAD_GATEWAY));
        }

        let mut body = vec![0xff, 0xd8, 0xff, 0xe0];
        body.extend_from_slice(url.as_bytes());
        Ok(Response::new(StatusCode::OK, body))
    }
}

fn config(dir: &TempDir) -> Config {
    Config {
        output: dir.path().join("israel.mbtiles"),
        zoom_levels: vec![14],
        server: TileServer::Esri,
        url: TileServer::Esri.url_format(),
        max_tiles: Some(10),
        retry: RetryPolicy {
            retry_delay: Duration::from_millis(0),
            ..RetryPolicy::default()
        },
        throttle: Duration::from_millis(0),
        archive: ArchiveOptions {
            settle_delay: Duration::from_millis(0),
            checkpoint_delay: Duration::from_millis(0),
            ..ArchiveOptions::default()
        },
        progress: false,
        ..Config::default()
    }
}

fn metadata(conn: &Connection, name: &str) -> String {
    conn.query_row("SELECT value FROM metadata WHERE name = ?1", [name], |row| {
        row.get(0)
    })
    .unwrap()
}

#[tokio::test]
async fn israel_zoom_14_capped_at_ten() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir);
    let server = StubServer::new();

    let summary = fetch_with(&server, &cfg).await.unwrap();

    assert_eq!(summary.downloaded, 10);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.output, cfg.output);
    assert!(summary.file_size > 0);
    assert_eq!(server.requests().len(), 10);
    assert!(server.requests()[0].starts_with(
        "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/14/"
    ));

    // checked before opening a reader, which would recreate the log
    let wal = dir.path().join("israel.mbtiles-wal");
    assert!(!wal.exists());

    let conn = Connection::open(&cfg.output).unwrap();
    let (rows, at_14, non_empty): (i64, i64, i64) = conn
        .query_row(
            "SELECT COUNT(*),
                    SUM(zoom_level = 14),
                    SUM(length(tile_data) > 0)
             FROM tiles",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!((rows, at_14, non_empty), (10, 10, 10));

    assert_eq!(metadata(&conn, "minzoom"), "14");
    assert_eq!(metadata(&conn, "maxzoom"), "14");
    assert_eq!(metadata(&conn, "format"), "jpg");
    assert_eq!(metadata(&conn, "bounds"), "34.0,29.0,36.0,33.5");
}

#[tokio::test]
async fn rows_use_tms_numbering() {
    let dir = TempDir::new().unwrap();
    let cfg = Config {
        max_tiles: Some(1),
        ..config(&dir)
    };
    let server = StubServer::new();

    fetch_with(&server, &cfg).await.unwrap();

    // the first tile in the box is its north-west corner
    let url = &server.requests()[0];
    assert!(url.ends_with("/14/6572/9739"), "{}", url);

    let conn = Connection::open(&cfg.output).unwrap();
    let (col, row): (u32, u32) = conn
        .query_row("SELECT tile_column, tile_row FROM tiles", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!((col, row), (9739, (1 << 14) - 1 - 6572));
}

#[tokio::test]
async fn failing_tile_is_retried_then_skipped() {
    let dir = TempDir::new().unwrap();
    let cfg = Config {
        max_tiles: Some(3),
        ..config(&dir)
    };
    let flaky = TileServer::Esri
        .url_format()
        .tile_url(&tile_archiver::Tile::new(9739, 6573, 14))
        .unwrap();
    let server = StubServer {
        flaky: vec![flaky.clone()],
        ..StubServer::new()
    };

    let summary = fetch_with(&server, &cfg).await.unwrap();

    assert_eq!(summary.downloaded, 3);
    assert_eq!(summary.skipped, 1);
    let attempts = server.requests().iter().filter(|u| **u == flaky).count();
    assert_eq!(attempts, 3);
}

#[tokio::test]
async fn rerun_starts_from_empty_archive() {
    let dir = TempDir::new().unwrap();
    let server = StubServer::new();

    fetch_with(&server, &config(&dir)).await.unwrap();
    let cfg = Config {
        max_tiles: Some(4),
        zoom_levels: vec![14, 15],
        ..config(&dir)
    };
    fetch_with(&server, &cfg).await.unwrap();

    let conn = Connection::open(&cfg.output).unwrap();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM tiles", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 4);
    assert_eq!(metadata(&conn, "maxzoom"), "15");

    let keys: i64 = conn
        .query_row("SELECT COUNT(*) FROM metadata", [], |row| row.get(0))
        .unwrap();
    assert_eq!(keys, 7);
}
