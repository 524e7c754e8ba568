use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use drivegraph::osm;
use drivegraph::{PathResult, PathStatus, Router, RouterOptions};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct GraphLoadError(PathBuf, #[source] osm::Error);

#[derive(Debug, thiserror::Error)]
#[error("no route: {0:?}")]
struct NoRouteError(PathStatus);

#[derive(Debug, thiserror::Error)]
#[error("unknown node: {0}")]
struct UnknownNodeError(i64);

#[derive(Debug, thiserror::Error)]
#[error("graph has no nodes")]
struct EmptyGraphError;

/// Format of the OSM file
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum FormatArg {
    /// Detect from the file contents
    #[default]
    Auto,
    /// Uncompressed OSM XML
    Xml,
    /// Gzip-compressed OSM XML
    XmlGz,
    /// Bzip2-compressed OSM XML
    XmlBz2,
}

impl From<FormatArg> for osm::FileFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => osm::FileFormat::Unknown,
            FormatArg::Xml => osm::FileFormat::Xml,
            FormatArg::XmlGz => osm::FileFormat::XmlGz,
            FormatArg::XmlBz2 => osm::FileFormat::XmlBz2,
        }
    }
}

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The path to the OSM file
    osm_file: PathBuf,

    /// Format of the OSM file
    #[arg(long, value_enum, default_value_t)]
    format: FormatArg,

    /// Only load nodes within min_lon,min_lat,max_lon,max_lat
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    bbox: Option<[f64; 4]>,

    /// Give up routing after expanding this many nodes
    #[arg(long)]
    step_limit: Option<usize>,

    /// Print normalized base map coordinates instead of GeoJSON
    #[arg(long)]
    projected: bool,

    /// Log more (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log less (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find a route between the nodes closest to two positions
    #[command(allow_negative_numbers = true)]
    Route {
        /// Latitude of the start point
        start_lat: f64,

        /// Longitude of the start point
        start_lon: f64,

        /// Latitude of the end point
        end_lat: f64,

        /// Longitude of the end point
        end_lon: f64,
    },

    /// Find a route between two nodes
    #[command(allow_negative_numbers = true)]
    RouteNodes {
        /// Id of the start node
        from: i64,

        /// Id of the end node
        to: i64,
    },

    /// Print the road-network node closest to a position
    #[command(allow_negative_numbers = true)]
    Nearest { lat: f64, lon: f64 },

    /// Print the position of a node
    #[command(allow_negative_numbers = true)]
    Node { id: i64 },
}

fn parse_bbox(s: &str) -> Result<[f64; 4], String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{v:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    values
        .try_into()
        .map_err(|v: Vec<f64>| format!("expected 4 comma-separated values, got {}", v.len()))
}

fn log_level(verbose: u8, quiet: u8) -> log::LevelFilter {
    match verbose as i16 - quiet as i16 {
        i16::MIN..=-2 => log::LevelFilter::Off,
        -1 => log::LevelFilter::Error,
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    colog::default_builder()
        .filter_level(log_level(cli.verbose, cli.quiet))
        .init();

    let options = RouterOptions {
        osm: osm::Options {
            profile: &osm::CAR_PROFILE,
            file_format: cli.format.into(),
            bbox: cli.bbox.unwrap_or_default(),
        },
        step_limit: cli.step_limit,
        spatial_index: true,
    };
    let router = load_router(options, &cli.osm_file)?;

    match cli.command {
        Command::Route {
            start_lat,
            start_lon,
            end_lat,
            end_lon,
        } => {
            let result = router.find_path_by_coords(start_lat, start_lon, end_lat, end_lon);
            print_route(&router, &result, cli.projected)?;
        }

        Command::RouteNodes { from, to } => {
            let result = router.find_path(from, to);
            print_route(&router, &result, cli.projected)?;
        }

        Command::Nearest { lat, lon } => {
            let id = router.nearest_node(lat, lon).ok_or(EmptyGraphError)?;
            print_node(&router, id)?;
        }

        Command::Node { id } => print_node(&router, id)?,
    }

    Ok(())
}

fn load_router<P: AsRef<Path>>(
    options: RouterOptions<'static>,
    path: P,
) -> Result<Router<'static>, GraphLoadError> {
    let mut router = Router::new(options);
    match router.build_graph(path.as_ref()) {
        Ok(()) => Ok(router),
        Err(e) => Err(GraphLoadError(PathBuf::from(path.as_ref()), e)),
    }
}

fn print_node(router: &Router<'_>, id: i64) -> Result<(), UnknownNodeError> {
    let (lat, lon) = router.node_coordinates(id).ok_or(UnknownNodeError(id))?;
    println!("{id} {lat} {lon}");
    Ok(())
}

fn print_route(
    router: &Router<'_>,
    result: &PathResult,
    projected: bool,
) -> Result<(), NoRouteError> {
    if !result.found() {
        return Err(NoRouteError(result.status));
    }

    if projected {
        let path = router.project_path(&result.node_ids);
        for [x, y] in path.points {
            println!("{x} {y}");
        }
        return Ok(());
    }

    println!("{{");
    println!("  \"type\": \"FeatureCollection\",");
    println!("  \"features\": [");
    println!("    {{");
    println!("      \"type\": \"Feature\",");
    println!("      \"properties\": {{");
    println!("        \"distance_km\": {:.3},", result.distance / 1000.0);
    println!(
        "        \"straight_line_distance_km\": {:.3}",
        result.straight_line_distance / 1000.0
    );
    println!("      }},");

    println!("      \"geometry\": {{");
    println!("        \"type\": \"LineString\",");
    println!("        \"coordinates\": [");

    let mut positions = result
        .node_ids
        .iter()
        .filter_map(|&id| router.node_coordinates(id))
        .peekable();
    while let Some((lat, lon)) = positions.next() {
        let suffix = if positions.peek().is_some() { "," } else { "" };
        println!("          [{lon}, {lat}]{suffix}");
    }

    println!("        ]");
    println!("      }}");
    println!("    }}");
    println!("  ]");
    println!("}}");

    Ok(())
}
