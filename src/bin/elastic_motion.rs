use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use elastic_motion::{
    FitMode, PixelSurface, Rgba8, ScrubberConfig, SequenceScrubber, Viewport,
    catalog::{CatalogQuery, demo_products, filter_products},
    gridbeam::{GridBeamConfig, GridBeamRenderer},
    particles::{ParticleField, ParticleSettings},
};

#[derive(Parser, Debug)]
#[command(name = "elastic-motion", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate the grid/beam background for a while and write a PNG.
    Gridbeam(GridbeamArgs),
    /// Simulate the particle field for a while and write a PNG.
    Particles(ParticlesArgs),
    /// Render the scrubber at a scroll progress from a directory of frames.
    Scrub(ScrubArgs),
    /// Filter the demo product catalog and print matches as JSON.
    Catalog(CatalogArgs),
}

#[derive(Parser, Debug)]
struct GridbeamArgs {
    /// Scene config JSON; when given, the seed/accent/density flags are
    /// ignored in favor of the file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated seconds at 60 fps before capturing.
    #[arg(long, default_value_t = 5.0)]
    seconds: f64,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    #[arg(long, default_value_t = 720.0)]
    height: f64,

    /// Beam accent color as a hex string.
    #[arg(long, default_value = "#00e5ff")]
    accent: String,

    /// Spawn-rate multiplier in [0, 1].
    #[arg(long, default_value_t = 1.0)]
    density: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ParticlesArgs {
    #[arg(long, default_value_t = 5.0)]
    seconds: f64,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    #[arg(long, default_value_t = 720.0)]
    height: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ScrubArgs {
    /// Directory of frame images, used in sorted filename order.
    #[arg(long)]
    frames: PathBuf,

    /// Scroll progress through the pinned range, in [0, 1].
    #[arg(long)]
    progress: f64,

    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    #[arg(long, default_value_t = 720.0)]
    height: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct CatalogArgs {
    /// Exact category filter.
    #[arg(long)]
    category: Option<String>,

    /// Case-insensitive search over title and description.
    #[arg(long, default_value = "")]
    search: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Gridbeam(args) => cmd_gridbeam(args),
        Command::Particles(args) => cmd_particles(args),
        Command::Scrub(args) => cmd_scrub(args),
        Command::Catalog(args) => cmd_catalog(args),
    }
}

fn read_gridbeam_config(path: &Path) -> anyhow::Result<GridBeamConfig> {
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let config =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse scene config JSON")?;
    Ok(config)
}

fn cmd_gridbeam(args: GridbeamArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => read_gridbeam_config(path)?,
        None => GridBeamConfig {
            accent_color: Rgba8::from_hex(&args.accent)?,
            seed: args.seed,
            beams: elastic_motion::gridbeam::BeamSettings {
                density: args.density,
                ..Default::default()
            },
            ..GridBeamConfig::default()
        },
    };
    let mut renderer = GridBeamRenderer::new(args.width, args.height, 1.0, config, false)?;
    let dt = 1.0 / 60.0;
    let steps = (args.seconds.max(0.0) / dt).round() as u64;
    for _ in 0..steps {
        renderer.tick(dt)?;
    }
    let flat = renderer.flattened()?;
    write_surface_png(&flat, &args.out)
}

fn cmd_particles(args: ParticlesArgs) -> anyhow::Result<()> {
    let mut field = ParticleField::new(
        args.width,
        args.height,
        1.0,
        ParticleSettings::default(),
        args.seed,
        false,
    )?;
    let dt = 1.0 / 60.0;
    let steps = (args.seconds.max(0.0) / dt).round() as u64;
    for _ in 0..steps {
        field.tick(dt);
    }
    write_surface_png(field.surface(), &args.out)
}

fn cmd_scrub(args: ScrubArgs) -> anyhow::Result<()> {
    let mut paths: Vec<PathBuf> = fs::read_dir(&args.frames)
        .with_context(|| format!("read frames dir '{}'", args.frames.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    paths.sort();
    anyhow::ensure!(!paths.is_empty(), "no frame files in '{}'", args.frames.display());

    let config = ScrubberConfig {
        frame_count: paths.len(),
        pin_heights: 3.0,
        fit: FitMode::Cover,
    };
    let viewport = Viewport::new(args.width, args.height)?;
    let mut scrubber = SequenceScrubber::new(config, viewport, 1.0)?;

    for (i, path) in paths.iter().enumerate() {
        let bytes =
            fs::read(path).with_context(|| format!("read frame '{}'", path.display()))?;
        match elastic_motion::decode_frame(&bytes) {
            Ok(frame) => scrubber.on_frame_decoded(i, frame)?,
            Err(err) => {
                eprintln!("skipping '{}': {err}", path.display());
                scrubber.on_frame_failed(i)?;
            }
        }
    }

    // Drive the scroll position to the requested progress through the pin.
    let scroll_y = args.progress.clamp(0.0, 1.0) * 3.0 * args.height;
    scrubber.on_scroll(scroll_y);
    eprintln!(
        "frame {} of {}",
        scrubber.drawn_frame().map_or_else(|| "-".to_owned(), |i| i.to_string()),
        paths.len()
    );
    write_surface_png(scrubber.surface(), &args.out)
}

fn cmd_catalog(args: CatalogArgs) -> anyhow::Result<()> {
    let products = demo_products();
    let query = CatalogQuery {
        category: args.category,
        search: args.search,
    };
    let hits = filter_products(&products, &query);
    println!("{}", serde_json::to_string_pretty(&hits)?);
    Ok(())
}

fn write_surface_png(surface: &PixelSurface, out: &PathBuf) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let (w, h) = surface.device_size();
    let data = unpremultiply(surface.data());
    image::save_buffer_with_format(
        out,
        &data,
        w as u32,
        h as u32,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn unpremultiply(premul: &[u8]) -> Vec<u8> {
    let mut out = premul.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in px.iter_mut().take(3) {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}
