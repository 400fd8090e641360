//! The feature demo generator: one output image per demo spec.

use std::path::PathBuf;

use anyhow::Context as _;

use crate::{
    error::{MarkshotError, MarkshotResult},
    markup::{PX_PER_PT, Rgba8, escape_text},
    render::{RenderBackend, TextOptions},
    specs::DemoSpec,
};

/// User-supplied inputs for one invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderRequest {
    /// The base sentence to render.
    pub sentence: String,
    /// Substring to style per-spec. Empty or unmatched means no span.
    pub highlight: String,
    /// Output filename prefix, joined with each spec suffix.
    pub basename: String,
}

/// Generation settings shared across all specs of one run.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerateOpts {
    /// Output directory; created if missing.
    pub out_dir: PathBuf,
    /// Default font family for unstyled text.
    pub family: String,
    /// Base font size in points.
    pub size_pt: f32,
    /// Default text color.
    pub color: Rgba8,
    /// Color applied to the highlight span in every variant.
    pub highlight_color: Rgba8,
    /// Optional wrap width in pixels.
    pub max_width_px: Option<f32>,
    /// Margin added on every side of the measured text extents.
    pub margin_px: u32,
}

impl Default for GenerateOpts {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("demos"),
            family: "sans-serif".to_string(),
            size_pt: 48.0,
            color: Rgba8::WHITE,
            highlight_color: Rgba8 {
                r: 0,
                g: 0x99,
                b: 0xff,
                a: 255,
            },
            max_width_px: None,
            margin_px: 24,
        }
    }
}

/// Build the markup for one spec: the escaped sentence with the first
/// occurrence of the highlight wrapped in a single span.
///
/// The span always carries `foreground = highlight_color`; the spec's
/// attribute is merged in, replacing the foreground when the spec showcases
/// the foreground itself. An empty or unmatched highlight yields the escaped
/// plain sentence with no span.
pub fn build_markup(
    sentence: &str,
    highlight: &str,
    highlight_color: Rgba8,
    spec: &DemoSpec,
) -> String {
    let Some(start) = (!highlight.is_empty())
        .then(|| sentence.find(highlight))
        .flatten()
    else {
        return escape_text(sentence);
    };
    let end = start + highlight.len();

    let mut attrs: Vec<(&str, String)> = vec![("foreground", highlight_color.to_hex())];
    match attrs.iter().position(|(name, _)| *name == spec.attribute) {
        Some(i) => attrs[i].1 = spec.value.clone(),
        None => attrs.push((spec.attribute.as_str(), spec.value.clone())),
    }

    let attrs_str = attrs
        .iter()
        .map(|(name, value)| format!("{name}='{}'", escape_text(value)))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "{}<span {}>{}</span>{}",
        escape_text(&sentence[..start]),
        attrs_str,
        escape_text(highlight),
        escape_text(&sentence[end..]),
    )
}

/// Render one image per spec, in table order, into `opts.out_dir`.
///
/// Fail-fast: an error on one spec aborts the remaining ones; images already
/// written stay on disk and the error names the failing spec suffix and the
/// count of images written before it.
#[tracing::instrument(skip(req, specs, backend, opts), fields(basename = %req.basename))]
pub fn generate_all(
    req: &RenderRequest,
    specs: &[DemoSpec],
    backend: &mut dyn RenderBackend,
    opts: &GenerateOpts,
) -> MarkshotResult<Vec<PathBuf>> {
    if req.sentence.is_empty() {
        return Err(MarkshotError::validation("sentence must be non-empty"));
    }
    if req.basename.is_empty() || req.basename.contains(['/', '\\']) {
        return Err(MarkshotError::validation(
            "basename must be non-empty and contain no path separators",
        ));
    }
    if let Some(spec) = specs.iter().find(|s| s.suffix.contains(['/', '\\'])) {
        return Err(MarkshotError::validation(format!(
            "spec suffix '{}' must contain no path separators",
            spec.suffix
        )));
    }

    std::fs::create_dir_all(&opts.out_dir)
        .with_context(|| format!("create output dir '{}'", opts.out_dir.display()))?;

    let text_opts = TextOptions {
        family: opts.family.clone(),
        size_px: opts.size_pt * PX_PER_PT,
        color: opts.color,
        max_width_px: opts.max_width_px,
    };

    let mut written = Vec::with_capacity(specs.len());
    for spec in specs {
        let markup = build_markup(&req.sentence, &req.highlight, opts.highlight_color, spec);
        let path = opts
            .out_dir
            .join(format!("{}{}.png", req.basename, spec.suffix));

        render_one(backend, &markup, &text_opts, opts.margin_px, &path).map_err(|e| {
            MarkshotError::render(format!(
                "spec '{}': {e} ({} image(s) already written)",
                spec.suffix,
                written.len()
            ))
        })?;

        tracing::debug!(suffix = %spec.suffix, path = %path.display(), "wrote demo image");
        written.push(path);
    }

    Ok(written)
}

fn render_one(
    backend: &mut dyn RenderBackend,
    markup: &str,
    text_opts: &TextOptions,
    margin_px: u32,
    path: &std::path::Path,
) -> MarkshotResult<()> {
    let (w, h) = backend.measure(markup, text_opts)?;
    // Saturate rather than overflow; oversized surfaces are rejected by the
    // backend's own dimension guards.
    let pad = margin_px.saturating_mul(2);
    let mut surface = backend.create_surface(w.saturating_add(pad), h.saturating_add(pad))?;
    backend.paint(&mut surface, markup, text_opts)?;
    let png = backend.encode_png(&surface)?;
    std::fs::write(path, png).with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}
