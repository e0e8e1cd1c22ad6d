use std::env;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use controller::{MapConfig, MapController};
use foundation::time::Time;
use foundation::viewport::Viewport;
use layers::colormap::Rgb;
use layers::temperature::TileCoord;
use tools::{CliError, encode_ppm, load_collection, parse_center, parse_size, placement_json, tile_viewport};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Temperature map tiles and label placement from the command line")]
struct Args {
    /// JSON config file (falls back to $THERMAP_CONFIG, then built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rasterize one temperature tile to a PPM image
    RenderTile {
        #[arg(long)]
        z: i32,

        #[arg(long)]
        x: i64,

        #[arg(long)]
        y: i64,

        /// Label points GeoJSON; labels placed on the tile are printed as JSON
        #[arg(long)]
        labels: Option<PathBuf>,

        #[arg(long, default_value = "tile.ppm")]
        out: PathBuf,
    },

    /// Print the decluttered label placement for a viewport as JSON
    Labels {
        #[arg(long)]
        labels: PathBuf,

        #[arg(long)]
        zoom: f64,

        /// Map center as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        center: String,

        /// Surface size as WxH pixels
        #[arg(long, default_value = "1024x768")]
        size: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), CliError> {
    let args = Args::parse();
    let config = match args.config.or_else(|| env::var_os("THERMAP_CONFIG").map(PathBuf::from)) {
        Some(path) => MapConfig::from_path(path)?,
        None => MapConfig::default(),
    };

    match args.command {
        Command::RenderTile { z, x, y, labels, out } => render_tile(config, TileCoord::new(x, y, z), labels, out),
        Command::Labels {
            labels,
            zoom,
            center,
            size,
        } => {
            let viewport = Viewport::new(parse_center(&center)?, zoom, parse_size(&size)?);
            print_labels(config, viewport, labels)
        }
    }
}

fn render_tile(config: MapConfig, coord: TileCoord, labels: Option<PathBuf>, out: PathBuf) -> Result<(), CliError> {
    if !(0..=30).contains(&coord.z) {
        return Err(CliError::Arg(format!("zoom out of range: {}", coord.z)));
    }
    let viewport = tile_viewport(coord, foundation::math::TILE_SIZE_PX);
    let mut map = MapController::new(config, viewport)?;

    let size = viewport.size_px.x as u32;
    let rgba = map.render_tile_rgba(coord);
    let ppm = encode_ppm(size, &rgba, Rgb::new(0xff, 0xff, 0xff));
    fs::write(&out, ppm).map_err(|source| CliError::Io {
        path: out.clone(),
        source,
    })?;
    info!(z = coord.z, x = coord.x, y = coord.y, out = %out.display(), "tile written");

    if let Some(path) = labels {
        let collection = load_collection(&path)?;
        map.load_labels(Time::default(), &collection);
        map.on_animation_frame(Time::default());
        if let Some(placement) = map.labels() {
            println!("{}", placement_json(placement));
        }
    }
    Ok(())
}

fn print_labels(config: MapConfig, viewport: Viewport, labels: PathBuf) -> Result<(), CliError> {
    let collection = load_collection(&labels)?;
    let mut map = MapController::new(config, viewport)?;
    map.load_labels(Time::default(), &collection);
    map.on_animation_frame(Time::default());
    if let Some(placement) = map.labels() {
        let pretty = serde_json::to_string_pretty(&placement_json(placement))
            .map_err(|e| CliError::Arg(e.to_string()))?;
        println!("{pretty}");
    }
    Ok(())
}
