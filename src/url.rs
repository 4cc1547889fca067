use maplit::hashmap;
use std::fmt;
use strfmt::strfmt;

use crate::error::Result;
use crate::tile::Tile;

/// A tile URL template with the replacement specifiers `{x}`, `{y}` and `{z}`.
#[derive(Clone, PartialEq)]
pub struct UrlFormat {
    format_str: String,
}

impl UrlFormat {
    pub fn from_string(format_str: String) -> Self {
        Self { format_str }
    }

    pub fn tile_url(&self, tile: &Tile) -> Result<String> {
        let vars = hashmap! {
            "x".to_owned() => tile.x.to_string(),
            "y".to_owned() => tile.y.to_string(),
            "z".to_owned() => tile.z.to_string(),
        };

        Ok(strfmt(&self.format_str, &vars)?)
    }

    /// Checks that the template only uses known specifiers by formatting a
    /// sample tile.
    pub fn validate(&self) -> Result<()> {
        self.tile_url(&Tile::new(0, 0, 0)).map(|_| ())
    }
}

impl fmt::Debug for UrlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UrlFormat").field(&self.format_str).finish()
    }
}

impl fmt::Display for UrlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_str)
    }
}
