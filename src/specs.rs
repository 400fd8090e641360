//! The fixed table of feature demos.

use std::path::Path;

use anyhow::Context as _;

use crate::error::{MarkshotError, MarkshotResult};
use crate::markup::UNITS_PER_PT;

/// One row of the demo table: which attribute to showcase, with what value,
/// and the output filename suffix it produces.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DemoSpec {
    /// Output filename suffix, e.g. `_color` for `<basename>_color.png`.
    pub suffix: String,
    /// Span attribute name in the markup dialect.
    pub attribute: String,
    /// Attribute value, verbatim.
    pub value: String,
}

impl DemoSpec {
    fn new(suffix: &str, attribute: &str, value: impl Into<String>) -> Self {
        Self {
            suffix: suffix.to_string(),
            attribute: attribute.to_string(),
            value: value.into(),
        }
    }
}

/// The built-in ordered table of 8 feature demos.
///
/// `base_size_pt` scales the `_size` variant (1.4x the base font size); all
/// other rows are constants.
pub fn builtin_specs(base_size_pt: f32) -> Vec<DemoSpec> {
    let size_units = (base_size_pt * 1.4 * UNITS_PER_PT).round() as i64;
    vec![
        DemoSpec::new("_color", "foreground", "#0099ff"),
        DemoSpec::new("_size", "size", size_units.to_string()),
        DemoSpec::new("_family", "font_family", "Courier New"),
        DemoSpec::new("_weight", "weight", "bold"),
        DemoSpec::new("_style", "style", "italic"),
        DemoSpec::new("_underline", "underline", "single"),
        DemoSpec::new("_strike", "strikethrough", "true"),
        DemoSpec::new("_rise", "rise", "10000"),
    ]
}

/// Load an alternate spec table from a JSON file (an array of rows with
/// `suffix`, `attribute` and `value` fields).
pub fn load_specs(path: &Path) -> MarkshotResult<Vec<DemoSpec>> {
    let f = std::fs::File::open(path)
        .with_context(|| format!("open spec table '{}'", path.display()))?;
    let r = std::io::BufReader::new(f);
    let specs: Vec<DemoSpec> = serde_json::from_reader(r)
        .map_err(|e| MarkshotError::serde(format!("parse spec table JSON: {e}")))?;
    if specs.is_empty() {
        return Err(MarkshotError::validation("spec table must be non-empty"));
    }
    Ok(specs)
}
