use std::fmt;
use std::str::FromStr;

use crate::url::UrlFormat;

const ESRI_URL: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";
const GOOGLE_URL: &str = "https://mt1.google.com/vt/lyrs=s&x={x}&y={y}&z={z}";

/// Image encoding of the tiles a server returns, as recorded in the archive's
/// `format` metadata.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TileFormat {
    Jpg,
    Png,
}

impl TileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileFormat::Jpg => "jpg",
            TileFormat::Png => "png",
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The public imagery servers tiles can be fetched from.
///
/// Google may throttle or require an API key for heavy use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TileServer {
    Esri,
    Google,
}

impl TileServer {
    pub const NAMES: &'static [&'static str] = &["esri", "google"];

    pub fn url_format(&self) -> UrlFormat {
        let template = match self {
            TileServer::Esri => ESRI_URL,
            TileServer::Google => GOOGLE_URL,
        };

        UrlFormat::from_string(template.to_owned())
    }

    /// Esri serves JPEG imagery, Google serves PNG.
    pub fn tile_format(&self) -> TileFormat {
        match self {
            TileServer::Esri => TileFormat::Jpg,
            TileServer::Google => TileFormat::Png,
        }
    }
}

impl FromStr for TileServer {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "esri" => Ok(TileServer::Esri),
            "google" => Ok(TileServer::Google),
            _ => Err("unrecognized tile server"),
        }
    }
}

impl fmt::Display for TileServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileServer::Esri => f.write_str("esri"),
            TileServer::Google => f.write_str("google"),
        }
    }
}
