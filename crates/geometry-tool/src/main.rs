use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    fs::{self, File},
    io::{self, BufReader},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use geometry_asset::{
    asset::geometry::{self as mesh_asset, GeometryAsset},
    error::{AssetError, FormatError},
    geometry::Geometry,
    hash::ContentHash,
    pack::{self, PackError, PackedGeometry},
    settings::GeometryImportSettings,
    thumbnail::ProjectionThumbnail,
};
use log::{error, info};

#[derive(Parser)]
#[command(name = "geometry-tool")]
#[command(about = "Import, inspect and pack geometry assets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save an importer buffer as asset files
    Import {
        raw: PathBuf,
        destination: PathBuf,
        /// JSON file with import settings
        #[arg(long)]
        settings: Option<PathBuf>,
        #[arg(long, default_value_t = ProjectionThumbnail::default().size)]
        thumbnail_size: u32,
    },
    /// Pack an asset for the engine runtime
    Pack { asset: PathBuf, output: PathBuf },
    /// Print the header and LOD layout of an asset
    Info { asset: PathBuf },
}

#[derive(Debug)]
enum ToolError {
    Io(PathBuf, io::Error),
    Settings(serde_json::Error),
    Format(FormatError),
    Asset(AssetError),
    Pack(PackError),
    NothingSaved,
}

impl Display for ToolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::Io(path, err) => write!(f, "{}: {}", path.display(), err),
            ToolError::Settings(err) => write!(f, "Bad import settings: {}", err),
            ToolError::Format(err) => Display::fmt(err, f),
            ToolError::Asset(err) => Display::fmt(err, f),
            ToolError::Pack(err) => Display::fmt(err, f),
            ToolError::NothingSaved => write!(f, "No asset file was written"),
        }
    }
}

impl Error for ToolError {}

fn read_file(path: &Path) -> Result<Vec<u8>, ToolError> {
    fs::read(path).map_err(|err| ToolError::Io(path.to_owned(), err))
}

fn import_raw(
    raw: &Path,
    destination: &Path,
    settings: Option<&Path>,
    thumbnail_size: u32,
) -> Result<(), ToolError> {
    let settings = match settings {
        Some(path) => serde_json::from_slice(&read_file(path)?).map_err(ToolError::Settings)?,
        None => GeometryImportSettings::default(),
    };
    let geometry = Geometry::from_raw(&read_file(raw)?, settings).map_err(ToolError::Format)?;

    let renderer = ProjectionThumbnail {
        size: thumbnail_size,
    };
    let saved = mesh_asset::save(&geometry, destination, &renderer);
    if saved.is_empty() {
        return Err(ToolError::NothingSaved);
    }
    for path in saved {
        println!("{}", path.display());
    }
    Ok(())
}

fn pack_file(asset: &Path, output: &Path) -> Result<(), ToolError> {
    let asset = mesh_asset::load(asset).map_err(ToolError::Asset)?;
    let blob = pack::pack_asset(&asset).map_err(ToolError::Pack)?;
    fs::write(output, &blob).map_err(|err| ToolError::Io(output.to_owned(), err))?;
    info!("Packed {} bytes to {}", blob.len(), output.display());
    Ok(())
}

fn print_info(path: &Path, asset: &GeometryAsset) -> Result<(), ToolError> {
    let file = File::open(path).map_err(|err| ToolError::Io(path.to_owned(), err))?;
    let digest = ContentHash::digest_from_reader(BufReader::new(file))
        .map_err(|err| ToolError::Io(path.to_owned(), err))?;

    let info = &asset.info;
    println!("type:        {}", info.asset_type);
    println!("id:          {}", info.id);
    println!("imported:    {:?}", info.import_date);
    match &info.hash {
        Some(hash) => println!("hash:        {}", hash),
        None => println!("hash:        none"),
    }
    println!("thumbnail:   {} bytes", info.thumbnail.len());
    println!("file digest: {}", digest);
    println!("settings:    {:?}", asset.geometry.settings());

    let group = asset.lod_group();
    println!("group {:?}", group.name());
    for lod in group.lods() {
        println!("  lod {:?} threshold {}", lod.name(), lod.threshold());
        for submesh in lod.submeshes() {
            println!(
                "    {:?}: {} vertices x {} bytes, {} indices x {} bytes, {:?}",
                submesh.name(),
                submesh.vertex_count(),
                submesh.element_size(),
                submesh.index_count(),
                submesh.index_size(),
                submesh.primitive_topology()
            );
        }
    }

    let blob = pack::pack_asset(asset).map_err(ToolError::Pack)?;
    let packed = PackedGeometry::parse(&blob).map_err(ToolError::Format)?;
    println!(
        "packed:      {} bytes, single mesh: {}, hierarchy {} bytes",
        blob.len(),
        packed.is_single_mesh(),
        packed.hierarchy_size()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Import {
            raw,
            destination,
            settings,
            thumbnail_size,
        } => import_raw(&raw, &destination, settings.as_deref(), thumbnail_size),
        Command::Pack { asset, output } => pack_file(&asset, &output),
        Command::Info { asset } => mesh_asset::load(&asset)
            .map_err(ToolError::Asset)
            .and_then(|loaded| print_info(&asset, &loaded)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
