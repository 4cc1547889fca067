use anyhow::{Context, Result};
use clap::{
    app_from_crate, crate_authors, crate_description, crate_name, crate_version,
    value_t, values_t, AppSettings, Arg, ArgMatches,
};
use reqwest::StatusCode;
use std::{path::PathBuf, time::Duration};

use crate::validators::*;
use tile_archiver::{BoundingBox, Config, Fixture, TileServer, UrlFormat};

const SERVER_ARG: &str = "server";
const URL_ARG: &str = "url";
const ZOOM_ARG: &str = "zoom";
const OUTPUT_ARG: &str = "output";
const MAX_TILES_ARG: &str = "max_tiles";
const BBOX_FIXTURE_ARG: &str = "fixture";
const BBOX_NORTH_ARG: &str = "north";
const BBOX_SOUTH_ARG: &str = "south";
const BBOX_WEST_ARG: &str = "west";
const BBOX_EAST_ARG: &str = "east";
const TIMEOUT_ARG: &str = "timeout";
const REQUEST_RETRIES_ARG: &str = "num_retries";
const RETRY_NOT_FOUND_ARG: &str = "retry_not_found";
const NAME_ARG: &str = "name";
const DESCRIPTION_ARG: &str = "description";
const DRY_RUN_ARG: &str = "dry_run";

pub struct Args {
    pub bounding_box: BoundingBox,
    pub server: TileServer,
    pub url: Option<String>,
    pub zoom_levels: Vec<u8>,
    pub output: PathBuf,
    pub max_tiles: Option<usize>,
    pub retries: u8,
    pub timeout: Duration,
    pub retry_not_found: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    pub dry_run: bool,
}

impl std::convert::From<Args> for Config {
    fn from(args: Args) -> Self {
        let defaults = Config::default();
        let server = args.server;

        let mut retry = defaults.retry.clone();
        retry.max_attempts = args.retries;
        if args.retry_not_found {
            retry.absent_statuses.retain(|s| *s != StatusCode::NOT_FOUND);
        }

        Self {
            bounding_box: args.bounding_box,
            zoom_levels: args.zoom_levels,
            server,
            url: args
                .url
                .map(UrlFormat::from_string)
                .unwrap_or_else(|| server.url_format()),
            output: args.output,
            max_tiles: args.max_tiles,
            name: args.name.unwrap_or(defaults.name),
            description: args.description.unwrap_or(defaults.description),
            retry,
            timeout: args.timeout,
            ..defaults
        }
    }
}

impl Args {
    pub fn parse() -> Result<Self> {
        let matches = get_matches();

        let bounding_box = match matches.value_of(BBOX_WEST_ARG) {
            // explicit edges win over the fixture
            Some(_) => BoundingBox::new(
                value_t!(matches, BBOX_WEST_ARG, f64).unwrap_or_else(|e| e.exit()),
                value_t!(matches, BBOX_SOUTH_ARG, f64).unwrap_or_else(|e| e.exit()),
                value_t!(matches, BBOX_EAST_ARG, f64).unwrap_or_else(|e| e.exit()),
                value_t!(matches, BBOX_NORTH_ARG, f64).unwrap_or_else(|e| e.exit()),
            )
            .context("invalid bounding box")?,
            None => value_t!(matches, BBOX_FIXTURE_ARG, Fixture)
                .unwrap_or_else(|e| e.exit())
                .into(),
        };

        let mut zoom_levels = if matches.is_present(ZOOM_ARG) {
            values_t!(matches, ZOOM_ARG, u8).unwrap_or_else(|e| e.exit())
        } else {
            Config::DEFAULT_ZOOM_LEVELS.to_vec()
        };
        zoom_levels.sort_unstable();
        zoom_levels.dedup();

        let max_tiles = if matches.is_present(MAX_TILES_ARG) {
            Some(value_t!(matches, MAX_TILES_ARG, usize).unwrap_or_else(|e| e.exit()))
        } else {
            None
        };

        Ok(Self {
            bounding_box,
            server: value_t!(matches, SERVER_ARG, TileServer).unwrap_or_else(|e| e.exit()),
            url: matches.value_of(URL_ARG).map(str::to_owned),
            zoom_levels,
            output: PathBuf::from(matches.value_of_os(OUTPUT_ARG).unwrap_or_default()),
            max_tiles,
            retries: value_t!(matches, REQUEST_RETRIES_ARG, u8).unwrap_or_else(|e| e.exit()),
            timeout: Duration::from_secs(
                value_t!(matches, TIMEOUT_ARG, u64).unwrap_or_else(|e| e.exit()),
            ),
            retry_not_found: matches.is_present(RETRY_NOT_FOUND_ARG),
            name: matches.value_of(NAME_ARG).map(str::to_owned),
            description: matches.value_of(DESCRIPTION_ARG).map(str::to_owned),
            dry_run: matches.is_present(DRY_RUN_ARG),
        })
    }
}

fn get_matches() -> ArgMatches<'static> {
    app_from_crate!()
        .setting(AppSettings::GlobalVersion)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name(OUTPUT_ARG)
                .help("The MBTiles file to create. An existing file is replaced.")
                .default_value(Config::DEFAULT_OUTPUT)
                .takes_value(true)
                .short("o")
                .long("output"),
        )
        .arg(
            Arg::with_name(SERVER_ARG)
                .help("The tile server to fetch from. esri serves JPEG, google serves PNG.")
                .validator(is_server)
                .default_value("esri")
                .takes_value(true)
                .short("s")
                .long("server"),
        )
        .arg(
            Arg::with_name(URL_ARG)
                .help("Override the server's URL with one containing the format specifiers `{x}`, `{y}` and `{z}`. The tile format is still taken from --server.")
                .validator(is_url_template)
                .takes_value(true)
                .short("u")
                .long("url"),
        )
        .arg(
            Arg::with_name(MAX_TILES_ARG)
                .help("Stop after this many tiles were downloaded")
                .validator(is_numeric_min(1))
                .takes_value(true)
                .short("m")
                .long("max-tiles"),
        )
        .arg(
            Arg::with_name(ZOOM_ARG)
                .help("The zoom levels to fetch [default: 14 15 16 17 18]")
                .validator(is_zoom)
                .takes_value(true)
                .multiple(true)
                .use_delimiter(true)
                .short("z")
                .long("zoom"),
        )
        .arg(
            Arg::with_name(BBOX_FIXTURE_ARG)
                .help("Use a known, named bounding box (eg. Israel)")
                .validator(is_bb_fixture)
                .default_value("israel")
                .takes_value(true)
                .short("f")
                .long("fixture"),
        )
        .arg(
            Arg::with_name(BBOX_WEST_ARG)
                .help("Longitude of west bounding box boundary (in degrees)")
                .requires_all(&[BBOX_SOUTH_ARG, BBOX_EAST_ARG, BBOX_NORTH_ARG])
                .validator(is_longitude)
                .takes_value(true)
                .allow_hyphen_values(true)
                .long("west"),
        )
        .arg(
            Arg::with_name(BBOX_SOUTH_ARG)
                .help("Latitude of south bounding box boundary (in degrees)")
                .requires_all(&[BBOX_WEST_ARG, BBOX_EAST_ARG, BBOX_NORTH_ARG])
                .validator(is_latitude)
                .takes_value(true)
                .allow_hyphen_values(true)
                .long("south"),
        )
        .arg(
            Arg::with_name(BBOX_EAST_ARG)
                .help("Longitude of east bounding box boundary (in degrees)")
                .requires_all(&[BBOX_WEST_ARG, BBOX_SOUTH_ARG, BBOX_NORTH_ARG])
                .validator(is_longitude)
                .takes_value(true)
                .allow_hyphen_values(true)
                .long("east"),
        )
        .arg(
            Arg::with_name(BBOX_NORTH_ARG)
                .help("Latitude of north bounding box boundary (in degrees)")
                .requires_all(&[BBOX_WEST_ARG, BBOX_SOUTH_ARG, BBOX_EAST_ARG])
                .validator(is_latitude)
                .takes_value(true)
                .allow_hyphen_values(true)
                .long("north"),
        )
        .arg(
            Arg::with_name(REQUEST_RETRIES_ARG)
                .help("The amount of attempts made for a single tile.")
                .validator(is_numeric_min(1))
                .default_value("3")
                .takes_value(true)
                .long("retries"),
        )
        .arg(
            Arg::with_name(TIMEOUT_ARG)
                .help("The timeout (in seconds) for fetching a single tile. Pass 0 for no timeout.")
                .validator(is_numeric_min(0))
                .default_value("15")
                .takes_value(true)
                .short("t")
                .long("timeout"),
        )
        .arg(
            Arg::with_name(RETRY_NOT_FOUND_ARG)
                .help("Retry tiles answered with 404 instead of skipping them right away (some servers answer 404 when throttling)")
                .takes_value(false)
                .long("retry-not-found"),
        )
        .arg(
            Arg::with_name(NAME_ARG)
                .help("Name recorded in the archive metadata")
                .takes_value(true)
                .long("name"),
        )
        .arg(
            Arg::with_name(DESCRIPTION_ARG)
                .help("Description recorded in the archive metadata")
                .takes_value(true)
                .long("description"),
        )
        .arg(
            Arg::with_name(DRY_RUN_ARG)
                .help("Don't actually fetch anything, just determine how many tiles would be fetched.")
                .takes_value(false)
                .long("dry-run"),
        )
        .get_matches()
}
