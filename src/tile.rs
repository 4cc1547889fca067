use std::f64::consts::PI;

use crate::bounding_box::BoundingBox;
use crate::error::{Error, Result};

/// Highest zoom level whose tile indices fit into a `u32`.
pub const MAX_ZOOM: u8 = 31;

/// Latitude limit of the Web-Mercator projection (`atan(sinh(π))`).
pub const LAT_LIMIT: f64 = 85.051_128_779_806_59;

/// A slippy-map tile with x, y and z-coordinate, y growing southward.
/// ref: https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl Tile {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Builds a tile from a row index in the south-up (TMS) convention used
    /// by MBTiles.
    pub fn from_tms(x: u32, tms_row: u32, z: u8) -> Self {
        Self::new(x, flip_row(tms_row, z), z)
    }

    /// Returns the tile containing the given point (in degrees).
    ///
    /// Latitudes beyond the Web-Mercator limit are clamped, and points on the
    /// eastern or southern edge of the world map to the last tile.
    pub fn from_coords_and_zoom(lon_deg: f64, lat_deg: f64, zoom: u8) -> Result<Self> {
        let (x, y) = tile_fraction(lon_deg, lat_deg, zoom)?;
        Ok(Self::new(clamp_index(x.floor(), zoom), clamp_index(y.floor(), zoom), zoom))
    }

    /// Returns the last tile whose cell extends north-west of the given
    /// point. Unlike [`Tile::from_coords_and_zoom`], a point lying exactly on
    /// a tile border belongs to the tile before the border.
    pub(crate) fn ending_at(lon_deg: f64, lat_deg: f64, zoom: u8) -> Result<Self> {
        let (x, y) = tile_fraction(lon_deg, lat_deg, zoom)?;
        Ok(Self::new(
            clamp_index(x.ceil() - 1_f64, zoom),
            clamp_index(y.ceil() - 1_f64, zoom),
            zoom,
        ))
    }

    /// Row index of this tile in the south-up (TMS) convention.
    pub fn tms_row(&self) -> u32 {
        flip_row(self.y, self.z)
    }

    /// The lon/lat cell covered by this tile.
    pub fn bounds(&self) -> BoundingBox {
        let n = 2_f64.powi(i32::from(self.z));
        let lon = |x: f64| x / n * 360_f64 - 180_f64;
        let lat = |y: f64| (PI * (1_f64 - 2_f64 * y / n)).sinh().atan().to_degrees();

        BoundingBox {
            min_lon: lon(f64::from(self.x)),
            min_lat: lat(f64::from(self.y) + 1_f64),
            max_lon: lon(f64::from(self.x) + 1_f64),
            max_lat: lat(f64::from(self.y)),
        }
    }
}

/// Fractional tile coordinates of a point, before rounding down to an index.
fn tile_fraction(lon_deg: f64, lat_deg: f64, zoom: u8) -> Result<(f64, f64)> {
    if zoom > MAX_ZOOM {
        return Err(Error::InvalidZoom(zoom));
    }

    // scale factor
    let n = 2_f64.powi(i32::from(zoom));
    let lat_rad = lat_deg.clamp(-LAT_LIMIT, LAT_LIMIT).to_radians();

    let x = (lon_deg + 180_f64) / 360_f64 * n;
    let y = (1_f64 - lat_rad.tan().asinh() / PI) / 2_f64 * n;

    Ok((x, y))
}

fn clamp_index(index: f64, zoom: u8) -> u32 {
    let last = 2_f64.powi(i32::from(zoom)) - 1_f64;
    index.clamp(0_f64, last) as u32
}

/// Converts a row index between the north-up and south-up conventions. The
/// conversion is its own inverse.
fn flip_row(row: u32, z: u8) -> u32 {
    let last = ((1_u64 << z) - 1) as u32;
    last - row
}
