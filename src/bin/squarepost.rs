use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "squarepost", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process images into framed squares.
    Process(ProcessArgs),
    /// Manage saved frame templates.
    Template(TemplateArgs),
}

#[derive(Parser, Debug)]
struct ProcessArgs {
    /// Input image paths.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output side length in pixels (clamped to [300, 2000]).
    #[arg(long, default_value_t = squarepost::DEFAULT_TARGET_SIZE)]
    size: u32,

    /// Force an output format instead of choosing by alpha.
    #[arg(long, value_enum)]
    format: Option<FormatChoice>,

    /// Frame configuration JSON file. Falls back to the stored active
    /// configuration, then to an empty frame.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Brightness percent, 100 = unchanged.
    #[arg(long, default_value_t = 100.0)]
    brightness: f32,

    /// Contrast percent, 100 = unchanged.
    #[arg(long, default_value_t = 100.0)]
    contrast: f32,

    /// Saturation percent, 100 = unchanged.
    #[arg(long, default_value_t = 100.0)]
    saturation: f32,

    /// Blur in pixels, 0 = none.
    #[arg(long, default_value_t = 0.0)]
    blur: f32,

    /// Named filter applied last.
    #[arg(long, value_enum, default_value_t = FilterChoice::None)]
    filter: FilterChoice,

    /// Write one file per image into this directory.
    #[arg(long, conflicts_with = "zip")]
    out_dir: Option<PathBuf>,

    /// Pack all outputs into a single zip archive at this path.
    #[arg(long)]
    zip: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct TemplateArgs {
    /// Template storage directory (defaults to ./.squarepost).
    #[arg(long, default_value = ".squarepost")]
    store: PathBuf,

    #[command(subcommand)]
    cmd: TemplateCommand,
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// List saved templates, oldest first.
    List,
    /// Save a frame configuration JSON file under a name.
    Save { name: String, config: PathBuf },
    /// Print a saved template as JSON.
    Show { name: String },
    /// Delete a saved template.
    Delete { name: String },
    /// Make a saved template the active configuration.
    Use { name: String },
    /// Export all templates plus the active configuration as JSON.
    Export {
        #[arg(default_value = squarepost::store::DEFAULT_EXPORT_NAME)]
        out: PathBuf,
    },
    /// Import templates from an exported JSON file.
    Import { path: PathBuf },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Jpeg,
    Png,
    Webp,
}

impl From<FormatChoice> for squarepost::OutputFormat {
    fn from(c: FormatChoice) -> Self {
        match c {
            FormatChoice::Jpeg => Self::Jpeg,
            FormatChoice::Png => Self::Png,
            FormatChoice::Webp => Self::Webp,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FilterChoice {
    None,
    Grayscale,
    Sepia,
}

impl From<FilterChoice> for squarepost::NamedFilter {
    fn from(c: FilterChoice) -> Self {
        match c {
            FilterChoice::None => Self::None,
            FilterChoice::Grayscale => Self::Grayscale,
            FilterChoice::Sepia => Self::Sepia,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Process(args) => cmd_process(args),
        Command::Template(args) => cmd_template(args),
    }
}

fn read_frame_config(path: &Path) -> anyhow::Result<squarepost::FrameConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read frame config '{}'", path.display()))?;
    let cfg = serde_json::from_str(&raw).with_context(|| "parse frame config JSON")?;
    Ok(cfg)
}

fn cmd_process(args: ProcessArgs) -> anyhow::Result<()> {
    let frame_cfg = match &args.config {
        Some(path) => read_frame_config(path)?,
        None => {
            let store = squarepost::TemplateStore::new(squarepost::FsKvStore::new(".squarepost")?);
            store.active_config()?.unwrap_or_default()
        }
    };

    let opts = squarepost::ProcessOptions {
        target_size: args.size,
        format: args.format.map(Into::into),
        filters: squarepost::FilterConfig {
            brightness: args.brightness,
            contrast: args.contrast,
            saturation: args.saturation,
            blur: args.blur,
            filter: args.filter.into(),
        },
    };

    let inputs: Vec<Vec<u8>> = args
        .inputs
        .iter()
        .map(|p| fs::read(p).with_context(|| format!("read input '{}'", p.display())))
        .collect::<anyhow::Result<_>>()?;

    let results = squarepost::process_batch(&inputs, Some(&frame_cfg), &opts)?;

    let mut processed = Vec::new();
    for (path, result) in args.inputs.iter().zip(results) {
        match result {
            Ok(image) => processed.push(image),
            Err(err) => tracing::error!(input = %path.display(), %err, "image failed"),
        }
    }
    if processed.is_empty() {
        anyhow::bail!("no images processed successfully");
    }

    if let Some(zip_path) = &args.zip {
        let bytes = squarepost::build_archive(&processed)?;
        fs::write(zip_path, bytes)
            .with_context(|| format!("write archive '{}'", zip_path.display()))?;
        println!("wrote {} ({} images)", zip_path.display(), processed.len());
        return Ok(());
    }

    let out_dir = args.out_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("create output dir '{}'", out_dir.display()))?;
    for (i, image) in processed.iter().enumerate() {
        let name = format!("image-{}.{}", i + 1, image.format.extension());
        let path = out_dir.join(&name);
        fs::write(&path, &image.bytes)
            .with_context(|| format!("write output '{}'", path.display()))?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_template(args: TemplateArgs) -> anyhow::Result<()> {
    let mut store = squarepost::TemplateStore::new(squarepost::FsKvStore::new(&args.store)?);

    match args.cmd {
        TemplateCommand::List => {
            let templates = store.templates()?;
            if templates.is_empty() {
                println!("no templates saved");
            }
            for t in templates {
                println!("{}", t.name);
            }
        }
        TemplateCommand::Save { name, config } => {
            let cfg = read_frame_config(&config)?;
            store.save_template(&name, &cfg)?;
            println!("saved template '{name}'");
        }
        TemplateCommand::Show { name } => {
            let cfg = store
                .get_template(&name)?
                .with_context(|| format!("no template named '{name}'"))?;
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
        TemplateCommand::Delete { name } => {
            store.delete_template(&name)?;
            println!("deleted template '{name}'");
        }
        TemplateCommand::Use { name } => {
            let cfg = store
                .get_template(&name)?
                .with_context(|| format!("no template named '{name}'"))?;
            store.set_active_config(&cfg)?;
            println!("active configuration set to '{name}'");
        }
        TemplateCommand::Export { out } => {
            let json = store.export_json()?;
            fs::write(&out, json).with_context(|| format!("write '{}'", out.display()))?;
            println!("exported to {}", out.display());
        }
        TemplateCommand::Import { path } => {
            let raw =
                fs::read_to_string(&path).with_context(|| format!("read '{}'", path.display()))?;
            let count = store.import_json(&raw)?;
            println!("imported {count} templates");
        }
    }
    Ok(())
}
