use std::fmt;

use crate::error::{Error, Result};
use crate::tile::Tile;

/// A bounding box in degrees, given as west/south/east/north edges.
///
/// # Example
/// ```rust
/// # use tile_archiver::BoundingBox;
/// let israel = BoundingBox::new(34.0, 29.0, 36.0, 33.5).unwrap();
/// assert_eq!(israel.to_string(), "34.0,29.0,36.0,33.5");
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from coordinates in degrees
    /// (-180 to 180° longitude, -90 to 90° latitude).
    ///
    /// Fails if a coordinate is out of range or the minimum isn't strictly
    /// below the maximum on either axis.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        let lon_ok = |v: f64| (-180_f64..=180_f64).contains(&v);
        let lat_ok = |v: f64| (-90_f64..=90_f64).contains(&v);

        if !(lon_ok(min_lon) && lon_ok(max_lon)) {
            return Err(Error::InvalidBoundingBox(format!(
                "longitudes {} and {} must be within [-180, 180]",
                min_lon, max_lon
            )));
        }
        if !(lat_ok(min_lat) && lat_ok(max_lat)) {
            return Err(Error::InvalidBoundingBox(format!(
                "latitudes {} and {} must be within [-90, 90]",
                min_lat, max_lat
            )));
        }
        if min_lon >= max_lon || min_lat >= max_lat {
            return Err(Error::InvalidBoundingBox(
                "minimum must be below maximum on both axes".to_owned(),
            ));
        }

        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Whether the two boxes share any area. Touching edges don't count.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon < other.max_lon
            && other.min_lon < self.max_lon
            && self.min_lat < other.max_lat
            && other.min_lat < self.max_lat
    }

    /// Creates an iterator over all tiles of a single zoom level that overlap
    /// the bounding box, in ascending x, then ascending y order.
    pub fn tiles(&self, zoom: u8) -> Result<impl Iterator<Item = Tile>> {
        let (nw, se) = self.corner_tiles(zoom)?;

        Ok((nw.x..=se.x).flat_map(move |x| (nw.y..=se.y).map(move |y| Tile::new(x, y, zoom))))
    }

    /// Creates an iterator over the tiles of every given zoom level, level by
    /// level in the order given.
    pub fn tiles_for_zooms(&self, zooms: &[u8]) -> Result<impl Iterator<Item = Tile>> {
        let per_zoom = zooms
            .iter()
            .map(|&z| self.tiles(z))
            .collect::<Result<Vec<_>>>()?;

        Ok(per_zoom.into_iter().flatten())
    }

    /// Number of tiles covering the box across the given zoom levels.
    pub fn count_tiles(&self, zooms: &[u8]) -> Result<u64> {
        zooms.iter().try_fold(0_u64, |acc, &z| {
            let (nw, se) = self.corner_tiles(z)?;
            let cols = u64::from(se.x - nw.x) + 1;
            let rows = u64::from(se.y - nw.y) + 1;
            Ok(acc + cols * rows)
        })
    }

    /// The north-west and south-east tiles spanning the box at `zoom`. An
    /// edge lying exactly on a tile border does not pull in the neighbouring
    /// tile.
    fn corner_tiles(&self, zoom: u8) -> Result<(Tile, Tile)> {
        let nw = Tile::from_coords_and_zoom(self.min_lon, self.max_lat, zoom)?;
        let se = Tile::ending_at(self.max_lon, self.min_lat, zoom)?;
        let se = Tile::new(se.x.max(nw.x), se.y.max(nw.y), zoom);

        Ok((nw, se))
    }
}

/// Formats as `min_lon,min_lat,max_lon,max_lat`, the MBTiles `bounds` form.
/// Whole degrees keep their decimal point (`34.0`).
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?},{:?},{:?},{:?}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// A bounding box fixture containing preset coordinates for a known geographic
/// region.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Fixture {
    Israel,
}

impl std::str::FromStr for Fixture {
    type Err = &'static str;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.to_lowercase().starts_with("israel") {
            return Ok(Fixture::Israel);
        }

        Err("unrecognized fixture")
    }
}

impl std::convert::From<Fixture> for BoundingBox {
    fn from(fixture: Fixture) -> Self {
        match fixture {
            Fixture::Israel => Self {
                min_lon: 34.0,
                min_lat: 29.0,
                max_lon: 36.0,
                max_lat: 33.5,
            },
        }
    }
}
