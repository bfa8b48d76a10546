use clap::Parser;
use indoor_route_lib::utils::DEFAULT_FLOOR_HEIGHT;
use indoor_route_lib::{Config, FloorLayout, Point3D, preprocess::DEFAULT_PROXIMITY_THRESHOLD};
use std::path::PathBuf;
use std::str::FromStr;

/// A query point given as `lat,lng,FLOOR`
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPoint {
    pub lat: f64,
    pub lng: f64,
    pub floor: String,
}

impl QueryPoint {
    /// Place the point on its floor
    pub fn locate(&self, layout: &FloorLayout) -> indoor_route_lib::Result<Point3D> {
        layout.locate(&self.floor, self.lat, self.lng)
    }
}

impl FromStr for QueryPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [lat, lng, floor] = parts.as_slice() else {
            return Err(format!("expected `lat,lng,FLOOR`, got `{}`", s));
        };

        let lat: f64 = lat
            .parse()
            .map_err(|e| format!("invalid latitude `{}`: {}", lat, e))?;
        let lng: f64 = lng
            .parse()
            .map_err(|e| format!("invalid longitude `{}`: {}", lng, e))?;
        if floor.is_empty() {
            return Err("floor name must not be empty".to_string());
        }

        Ok(Self {
            lat,
            lng,
            floor: floor.to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Indoor Route - Find the shortest walkable route through a multi-floor indoor map
pub struct Settings {
    /// Route map JSON file (polylines per floor plus elevator groups)
    #[clap(short, long, value_name = "FILE")]
    pub map: PathBuf,

    /// Start point as `lat,lng,FLOOR`
    #[clap(short, long, allow_hyphen_values = true)]
    pub start: QueryPoint,

    /// End point as `lat,lng,FLOOR`
    #[clap(short, long, allow_hyphen_values = true)]
    pub end: QueryPoint,

    /// Floor names from the lowest floor up
    #[clap(long, value_delimiter = ',', default_value = "B1,F1,F2")]
    pub floors: Vec<String>,

    /// Elevation difference between consecutive floors
    #[clap(long, default_value_t = DEFAULT_FLOOR_HEIGHT)]
    pub floor_height: f64,

    /// Maximum distance between a query point and the segment it snaps onto
    #[clap(long, default_value_t = DEFAULT_PROXIMITY_THRESHOLD)]
    pub proximity_threshold: f64,

    /// Keep dead-end nodes in the graph
    #[clap(long, default_value = "false")]
    pub no_prune: bool,

    /// Print every search step instead of only the final route
    #[clap(long, default_value = "false")]
    pub steps: bool,

    /// Print machine-readable JSON
    #[clap(long, default_value = "false")]
    pub json: bool,

    /// Verbose logging when RUST_LOG is unset
    #[clap(short, long, default_value = "false")]
    pub verbose: bool,
}

impl Settings {
    /// Parse settings from the command line, exiting on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn layout(&self) -> FloorLayout {
        FloorLayout::new(self.floors.clone(), self.floor_height)
    }

    /// Library configuration for these settings
    pub fn config(&self) -> Config {
        Config {
            proximity_threshold: self.proximity_threshold,
            layout: self.layout(),
            prune: !self.no_prune,
        }
    }
}
