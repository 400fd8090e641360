#![forbid(unsafe_code)]

pub mod error;
pub mod generate;
pub mod markup;
pub mod render;
pub mod specs;

pub use error::{MarkshotError, MarkshotResult};
pub use generate::{GenerateOpts, RenderRequest, build_markup, generate_all};
pub use markup::{MarkupDoc, Rgba8, SpanAttr, StyledSpan, escape_text, unescape_text};
pub use render::{BackendKind, RenderBackend, Surface, TextOptions, create_backend};
pub use specs::{DemoSpec, builtin_specs, load_specs};
