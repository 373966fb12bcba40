use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use stoon_map::{GameMap, GridPosition, MapService, NewMap, TilePatch, ViewQuery};
use stoon_persist::{Database, StoreConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stoon", about = "Generate, inspect and edit stoon map stores")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML store config (`data_dir`, `pretty`)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory; overrides the config file
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and store the deterministic 10x10 test map
    CreateTest,
    /// Create a map from a JSON file: {name, width, height, tiles, zoom}
    Create {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print a map as JSON
    Get { id: String },
    /// List stored maps
    List,
    /// Merge a JSON patch into one tile
    UpdateTile {
        id: String,
        #[arg(long, allow_negative_numbers = true)]
        x: i32,
        #[arg(long, allow_negative_numbers = true)]
        y: i32,
        /// Tile fields, e.g. '{"height": 2.5, "centerType": "mountain"}'
        #[arg(short, long)]
        patch: String,
    },
    /// Print the tiles within a radius of a position
    View {
        id: String,
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        /// View distance in grid units (inclusive)
        #[arg(short = 'r', long)]
        distance: f64,
    },
}

/// One line of `list` output.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MapSummary {
    id: Option<String>,
    name: String,
    width: u32,
    height: u32,
    tiles: usize,
    updated_at: String,
}

impl From<&GameMap> for MapSummary {
    fn from(map: &GameMap) -> Self {
        Self {
            id: map.id.map(|id| id.to_hex()),
            name: map.name.clone(),
            width: map.width,
            height: map.height,
            tiles: map.tiles.len(),
            updated_at: map.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct VisibleTiles<'a> {
    tiles: &'a [stoon_map::MapTile],
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_ref(), cli.data_dir.as_ref())?;
    let db = Database::open(config).context("opening document store")?;
    let service = MapService::new(&db)?;

    let mut stdout = std::io::stdout().lock();
    run(cli.command, &service, &mut stdout)?;

    drop(service);
    db.close();
    Ok(())
}

fn load_config(file: Option<&PathBuf>, data_dir: Option<&PathBuf>) -> Result<StoreConfig> {
    let mut config = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_yaml::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => StoreConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn run(command: Commands, service: &MapService, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::CreateTest => {
            let map = service.create_test_map()?;
            print_json(out, &map)?;
        }
        Commands::Create { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let new_map: NewMap = serde_json::from_str(&text)
                .with_context(|| format!("parsing map JSON in {}", file.display()))?;
            let map = service.create_map(new_map)?;
            print_json(out, &map)?;
        }
        Commands::Get { id } => match service.get_map(&id)? {
            Some(map) => print_json(out, &map)?,
            None => bail!("map {id} not found"),
        },
        Commands::List => {
            let maps = service.list_maps()?;
            let summaries: Vec<MapSummary> = maps.iter().map(MapSummary::from).collect();
            print_json(out, &summaries)?;
        }
        Commands::UpdateTile { id, x, y, patch } => {
            let patch: TilePatch =
                serde_json::from_str(&patch).context("parsing tile patch JSON")?;
            if !service.update_map_tile(&id, x, y, &patch)? {
                bail!("map {id} or tile ({x}, {y}) not found");
            }
            writeln!(out, "tile ({x}, {y}) updated")?;
        }
        Commands::View { id, x, y, distance } => {
            let query = ViewQuery::new(GridPosition::new(x, y), distance);
            match service.visible_tiles(&id, &query)? {
                Some(tiles) => print_json(out, &VisibleTiles { tiles: &tiles })?,
                None => bail!("map {id} not found"),
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
