use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};

use markshot::{GenerateOpts, Rgba8, RenderRequest};

#[derive(Parser, Debug)]
#[command(name = "markshot", version)]
struct Cli {
    /// The base sentence to render.
    #[arg(long)]
    sentence: String,

    /// Substring of the sentence to style per demo variant.
    #[arg(long, default_value = "")]
    highlight: String,

    /// Output filename prefix (no path separators).
    #[arg(long, default_value = "demo")]
    basename: String,

    /// Output directory; created if missing.
    #[arg(long, default_value = "demos")]
    output_dir: PathBuf,

    /// Base font size in points.
    #[arg(long, default_value_t = 48.0)]
    font_size: f32,

    /// Default font family for unstyled text.
    #[arg(long, default_value = "sans-serif")]
    font_family: String,

    /// Default text color (hex, e.g. #ffffff).
    #[arg(long, default_value = "#ffffff")]
    color: String,

    /// Highlight span color (hex).
    #[arg(long, default_value = "#0099ff")]
    highlight_color: String,

    /// Optional wrap width in pixels; unset lays out on a single line.
    #[arg(long)]
    max_width: Option<f32>,

    /// Alternate demo-spec table (JSON array of suffix/attribute/value rows).
    #[arg(long)]
    specs: Option<PathBuf>,

    /// Backend to use.
    #[arg(long, value_enum, default_value_t = BackendChoice::Cpu)]
    backend: BackendChoice,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Cpu,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let specs = match &cli.specs {
        Some(path) => markshot::load_specs(path)?,
        None => markshot::builtin_specs(cli.font_size),
    };

    let opts = GenerateOpts {
        out_dir: cli.output_dir.clone(),
        family: cli.font_family.clone(),
        size_pt: cli.font_size,
        color: Rgba8::parse(&cli.color).with_context(|| "parse --color")?,
        highlight_color: Rgba8::parse(&cli.highlight_color)
            .with_context(|| "parse --highlight-color")?,
        max_width_px: cli.max_width,
        margin_px: 24,
    };

    let kind = match cli.backend {
        BackendChoice::Cpu => markshot::BackendKind::Cpu,
    };
    let mut backend = markshot::create_backend(kind)?;

    let req = RenderRequest {
        sentence: cli.sentence,
        highlight: cli.highlight,
        basename: cli.basename,
    };

    let written = markshot::generate_all(&req, &specs, backend.as_mut(), &opts)?;
    for path in &written {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}
