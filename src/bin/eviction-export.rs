use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eviction_export::viz::{ImageFormat, register_font_file};
use eviction_export::{
    ExportCache, ExportConfig, ExportFormat, ExportRequest, MemoryStore, ProducerSet,
    derive_bundle_key, derive_key,
};

#[derive(Parser, Debug)]
#[command(
    name = "eviction-export",
    version,
    about = "Build, cache and bundle Eviction Lab report exports"
)]
struct Cli {
    #[command(flatten)]
    config: ExportConfig,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the storage key and public URL of an export.
    Key(KeyArgs),
    /// Return the URL of a stored export, generating and uploading it on a miss.
    Export(ExportArgs),
    /// Produce a file locally without touching storage.
    Render(RenderArgs),
    /// Draw one chart or legend for a request.
    Chart(ChartArgs),
}

#[derive(Args, Debug)]
struct RequestArg {
    /// JSON export request
    #[arg(short, long)]
    request: PathBuf,
}

#[derive(Args, Debug)]
struct KeyArgs {
    #[command(flatten)]
    input: RequestArg,
    /// File extension (e.g. pdf, xlsx); `zip` prints the bundle key
    #[arg(short, long, default_value = "zip")]
    ext: String,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    input: RequestArg,
    /// Single format; omit to bundle every format the request lists.
    #[arg(short, long)]
    format: Option<String>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: RequestArg,
    #[arg(short, long)]
    format: String,
    #[arg(short, long)]
    out: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ChartKind {
    Bar,
    Line,
    MapLegend,
}

#[derive(Args, Debug)]
struct ChartArgs {
    #[command(flatten)]
    input: RequestArg,
    #[arg(short, long, value_enum)]
    kind: ChartKind,
    /// Output path (.svg or .png)
    #[arg(short, long)]
    out: PathBuf,
    /// Feature whose map legend to draw (0-based)
    #[arg(long, default_value_t = 0)]
    feature: usize,
}

fn read_request(path: &Path) -> Result<ExportRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading request {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing request {}", path.display()))
}

/// Cache that generates locally and keeps nothing.
fn local_cache(config: ExportConfig) -> Result<ExportCache> {
    Ok(ExportCache::new(
        config,
        Arc::new(MemoryStore::new()),
        ProducerSet::builtin(),
    )?)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Key(args) => cmd_key(&cli.config, args),
        Command::Export(args) => cmd_export(cli.config, args),
        Command::Render(args) => cmd_render(cli.config, args),
        Command::Chart(args) => cmd_chart(cli.config, args),
    }
}

fn cmd_key(config: &ExportConfig, args: KeyArgs) -> Result<()> {
    let request = read_request(&args.input.request)?;
    let key = if args.ext.eq_ignore_ascii_case("zip") {
        derive_bundle_key(&request)
    } else {
        derive_key(&request, &args.ext)
    };
    println!("{key}");
    println!("{}", config.object_url(&key));
    Ok(())
}

fn cmd_export(config: ExportConfig, args: ExportArgs) -> Result<()> {
    let request = read_request(&args.input.request)?;
    let cache = ExportCache::from_config(config)?;
    let url = match args.format {
        Some(f) => cache.get_or_create(&request, f.parse::<ExportFormat>()?)?,
        None => cache.get_or_create_bundle(&request)?,
    };
    println!("{url}");
    Ok(())
}

fn cmd_render(config: ExportConfig, args: RenderArgs) -> Result<()> {
    let request = read_request(&args.input.request)?;
    request.validate()?;
    let format = args.format.parse::<ExportFormat>()?;
    let artifact = local_cache(config)?.create(&request, format)?;
    std::fs::write(&args.out, &artifact.bytes)
        .with_context(|| format!("writing {}", args.out.display()))?;
    eprintln!(
        "Wrote {} ({} bytes) to {}",
        artifact.cache_key,
        artifact.bytes.len(),
        args.out.display()
    );
    Ok(())
}

fn cmd_chart(config: ExportConfig, args: ChartArgs) -> Result<()> {
    let request = read_request(&args.input.request)?;
    let image_format = match args.out.extension().and_then(|e| e.to_str()) {
        Some(e) if e.eq_ignore_ascii_case("png") => {
            let Some(font) = config.font_path.as_ref() else {
                bail!("PNG output needs --font-path or EXPORT_FONT_PATH");
            };
            register_font_file(font)?;
            ImageFormat::Png
        }
        _ => ImageFormat::Svg,
    };
    let cache = local_cache(config)?;
    let ctx = cache.context(&request)?.with_image_format(image_format);
    let image = match args.kind {
        ChartKind::Bar => ctx.bar_chart()?,
        ChartKind::Line => ctx.line_chart()?,
        ChartKind::MapLegend => {
            let feature = request
                .features
                .get(args.feature)
                .with_context(|| format!("request has no feature {}", args.feature))?;
            ctx.map_legend(feature)?
        }
    };
    std::fs::write(&args.out, &image.bytes)
        .with_context(|| format!("writing {}", args.out.display()))?;
    eprintln!("Wrote chart to {}", args.out.display());
    Ok(())
}
