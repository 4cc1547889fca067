use tile_archiver::{Fixture, TileServer, UrlFormat, MAX_ZOOM};

pub fn is_numeric_min(min: usize) -> impl Fn(String) -> Result<(), String> {
    move |v: String| {
        let val = v
            .parse::<usize>()
            .map_err(|_| "must be numeric".to_owned())?;

        if val < min {
            return Err(format!("must be >= {}", min));
        }

        Ok(())
    }
}

pub fn is_zoom(v: String) -> Result<(), String> {
    let val = v.parse::<u8>().map_err(|_| "must be numeric".to_owned())?;

    if val > MAX_ZOOM {
        return Err(format!("must be <= {}", MAX_ZOOM));
    }

    Ok(())
}

pub fn is_longitude(v: String) -> Result<(), String> {
    is_within(v, 180f64)
}

pub fn is_latitude(v: String) -> Result<(), String> {
    is_within(v, 90f64)
}

fn is_within(v: String, limit: f64) -> Result<(), String> {
    let val = v.parse::<f64>().map_err(|_| "must be numeric".to_owned())?;

    if val < -limit {
        return Err(format!("must be >= -{}°", limit));
    } else if val > limit {
        return Err(format!("must be <= {}°", limit));
    }

    Ok(())
}

pub fn is_bb_fixture(v: String) -> Result<(), String> {
    v.parse::<Fixture>()
        .map(|_| ())
        .map_err(|_| "invalid fixture".to_owned())
}

pub fn is_server(v: String) -> Result<(), String> {
    v.parse::<TileServer>()
        .map(|_| ())
        .map_err(|_| format!("must be one of {}", TileServer::NAMES.join(", ")))
}

pub fn is_url_template(v: String) -> Result<(), String> {
    UrlFormat::from_string(v)
        .validate()
        .map_err(|_| "may only contain the format specifiers `{x}`, `{y}` and `{z}`".to_owned())
}
