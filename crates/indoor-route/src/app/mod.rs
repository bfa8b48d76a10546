//! Application module
//!
//! Loads a route map, resolves the query points onto their floors and prints
//! either the final route or a trace of every search step.

pub(crate) mod settings;

use crate::app::settings::Settings;
use indoor_route_lib::{
    Navigator, PlannedRoute, Point3D, RouteError, RouteMap, SearchStep, SteppedNavigation,
};
use serde::Serialize;
use std::io::Write;

/// Errors surfaced by the command-line front end
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Stable machine-readable code for this error
    pub fn kind(&self) -> &'static str {
        match self {
            CliError::Route(e) => e.kind(),
            CliError::Output(_) => "OUTPUT",
            CliError::Json(_) => "JSON",
        }
    }
}

/// One line of a step trace
#[derive(Debug, Clone, Serialize)]
struct StepRecord {
    step: usize,
    current: Point3D,
    cost: f64,
    relaxed: Vec<Point3D>,
    next: Option<Point3D>,
    closed: usize,
}

#[derive(Debug, Serialize)]
struct ErrorRecord<'a> {
    error: &'a str,
    message: String,
}

/// Load the map named in `settings` and answer the query
pub fn run(settings: &Settings, out: &mut impl Write) -> Result<(), CliError> {
    #[cfg(feature = "profiling")]
    profiling::scope!("app::run");

    let map = RouteMap::load_from_file(&settings.map)?;
    let stats = map.stats();
    tracing::info!(
        "Loaded {} polyline(s) with {} point(s) on {} floor(s), {} elevator(s)",
        stats.polyline_count,
        stats.total_points,
        stats.floor_count,
        stats.elevator_count
    );

    execute(settings, &map, out)
}

/// Answer the query in `settings` against an already loaded map
pub fn execute(settings: &Settings, map: &RouteMap, out: &mut impl Write) -> Result<(), CliError> {
    let config = settings.config();
    let start = settings.start.locate(&config.layout)?;
    let end = settings.end.locate(&config.layout)?;
    let navigator = Navigator::new(config);

    if settings.steps {
        let stepped = navigator.step_navigate(map, &start, &end)?;
        trace_steps(&navigator, stepped, settings.json, out)
    } else {
        let route = navigator.navigate(map, &start, &end)?;
        tracing::info!(
            "Found route with {} point(s) across {} floor(s), cost {}",
            route.points.len(),
            route.floors.len(),
            route.total_cost
        );
        write_route(&route, settings.json, out)
    }
}

/// Report an error on `out`, as JSON when requested
pub fn write_error(error: &CliError, json: bool, out: &mut impl Write) -> std::io::Result<()> {
    if json {
        let record = ErrorRecord {
            error: error.kind(),
            message: error.to_string(),
        };
        let encoded = serde_json::to_string(&record).map_err(std::io::Error::other)?;
        writeln!(out, "{}", encoded)
    } else {
        writeln!(out, "error[{}]: {}", error.kind(), error)
    }
}

fn write_route(route: &PlannedRoute, json: bool, out: &mut impl Write) -> Result<(), CliError> {
    if json {
        serde_json::to_writer_pretty(&mut *out, route)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "Route cost: {}", route.total_cost)?;
    writeln!(out, "Floors: {}", route.floors.join(" -> "))?;
    for (i, point) in route.points.iter().enumerate() {
        writeln!(out, "{:>4}  {}", i, point)?;
    }
    Ok(())
}

fn trace_steps(
    navigator: &Navigator,
    mut stepped: SteppedNavigation,
    json: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    tracing::debug!(
        "Stepping over {} prepared segment(s)",
        stepped.segments().len()
    );

    let mut records = Vec::new();
    let path = loop {
        match stepped.step() {
            SearchStep::Expanded(report) => {
                let search = stepped.search();
                let record = StepRecord {
                    step: search.steps(),
                    current: report.point,
                    cost: search.cost(report.current).unwrap_or_default(),
                    relaxed: report.relaxed.iter().map(|r| r.point).collect(),
                    next: report.next.map(|id| search.graph().node(id).point),
                    closed: report.closed.len(),
                };
                if !json {
                    let next = match &record.next {
                        Some(point) => point.to_string(),
                        None => "-".to_string(),
                    };
                    writeln!(
                        out,
                        "step {:>4}: expand {} (cost {}), relaxed {}, next {}",
                        record.step,
                        record.current,
                        record.cost,
                        record.relaxed.len(),
                        next
                    )?;
                }
                records.push(record);
            }
            SearchStep::Found(path) => break path,
            SearchStep::Exhausted => return Err(RouteError::NoPathFound.into()),
        }
    };

    let route = navigator.to_planned_route(path);
    if json {
        #[derive(Serialize)]
        struct Trace<'a> {
            steps: &'a [StepRecord],
            route: &'a PlannedRoute,
        }
        serde_json::to_writer_pretty(
            &mut *out,
            &Trace {
                steps: &records,
                route: &route,
            },
        )?;
        writeln!(out)?;
        Ok(())
    } else {
        write_route(&route, false, out)
    }
}
