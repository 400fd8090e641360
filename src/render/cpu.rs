use std::borrow::Cow;
use std::collections::HashMap;

use image::ImageEncoder as _;

use crate::{
    error::{MarkshotError, MarkshotResult},
    markup::{FontStyleKind, MarkupDoc, PX_PER_PT, SpanAttr, UNITS_PER_PT},
    render::{RenderBackend, Surface, TextOptions},
};

/// RGBA8 brush carried through Parley layout, extended with the baseline
/// rise so each glyph run knows its vertical offset at draw time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TextBrush {
    pub(crate) color: crate::markup::Rgba8,
    pub(crate) rise_px: f32,
}

impl Default for TextBrush {
    fn default() -> Self {
        Self {
            color: crate::markup::Rgba8::WHITE,
            rise_px: 0.0,
        }
    }
}

/// CPU text backend: Parley for shaping/layout, `vello_cpu` for
/// rasterization.
///
/// Parley contexts are stateful (font collection, shaping scratch space) and
/// are reused across renders; the backend is not safe for concurrent use.
pub struct CpuBackend {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    font_cache: HashMap<(u64, u32), vello_cpu::peniko::FontData>,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            font_cache: HashMap::new(),
        }
    }

    /// Parse the markup and build a styled Parley layout.
    fn layout(
        &mut self,
        markup: &str,
        opts: &TextOptions,
    ) -> MarkshotResult<parley::Layout<TextBrush>> {
        if !opts.size_px.is_finite() || opts.size_px <= 0.0 {
            return Err(MarkshotError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let doc = MarkupDoc::parse(markup)?;
        let default_brush = TextBrush {
            color: opts.color,
            rise_px: 0.0,
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, &doc.text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(opts.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(opts.size_px));
        builder.push_default(parley::style::StyleProperty::Brush(default_brush));

        // Effective brush per span, inherited through the parent chain so a
        // span that sets only `rise` keeps the surrounding color. Spans are in
        // open order, so later pushes (inner spans) win on overlap.
        let mut brushes: Vec<TextBrush> = Vec::with_capacity(doc.spans.len());
        for span in &doc.spans {
            let mut brush = span.parent.map_or(default_brush, |p| brushes[p]);
            let mut brush_touched = false;

            for attr in &span.attrs {
                match attr {
                    SpanAttr::Foreground(color) => {
                        brush.color = *color;
                        brush_touched = true;
                    }
                    SpanAttr::Rise(units) => {
                        brush.rise_px = units / UNITS_PER_PT * PX_PER_PT;
                        brush_touched = true;
                    }
                    SpanAttr::Size(units) => builder.push(
                        parley::style::StyleProperty::FontSize(units / UNITS_PER_PT * PX_PER_PT),
                        span.range.clone(),
                    ),
                    SpanAttr::FontFamily(name) => builder.push(
                        parley::style::StyleProperty::FontStack(parley::style::FontStack::Source(
                            Cow::Owned(name.clone()),
                        )),
                        span.range.clone(),
                    ),
                    SpanAttr::Weight(w) => builder.push(
                        parley::style::StyleProperty::FontWeight(parley::style::FontWeight::new(
                            f32::from(*w),
                        )),
                        span.range.clone(),
                    ),
                    SpanAttr::Style(kind) => {
                        let style = match kind {
                            FontStyleKind::Normal => parley::style::FontStyle::Normal,
                            FontStyleKind::Italic => parley::style::FontStyle::Italic,
                            FontStyleKind::Oblique => parley::style::FontStyle::Oblique(None),
                        };
                        builder.push(parley::style::StyleProperty::FontStyle(style), span.range.clone());
                    }
                    SpanAttr::Underline(on) => builder.push(
                        parley::style::StyleProperty::Underline(*on),
                        span.range.clone(),
                    ),
                    SpanAttr::Strikethrough(on) => builder.push(
                        parley::style::StyleProperty::Strikethrough(*on),
                        span.range.clone(),
                    ),
                }
            }

            if brush_touched && !span.range.is_empty() {
                builder.push(
                    parley::style::StyleProperty::Brush(brush),
                    span.range.clone(),
                );
            }
            brushes.push(brush);
        }

        let mut layout: parley::Layout<TextBrush> = builder.build(&doc.text);
        if let Some(w) = opts.max_width_px {
            layout.break_all_lines(Some(w));
            layout.align(
                Some(w),
                parley::Alignment::Start,
                parley::AlignmentOptions::default(),
            );
        } else {
            layout.break_all_lines(None);
        }

        Ok(layout)
    }

    fn font_data_for(
        &mut self,
        blob: &parley::fontique::Blob<u8>,
        index: u32,
    ) -> vello_cpu::peniko::FontData {
        let key = (blob.id(), index);
        if let Some(f) = self.font_cache.get(&key) {
            return f.clone();
        }
        let bytes: &[u8] = blob.as_ref();
        let data =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes.to_vec()), index);
        self.font_cache.insert(key, data.clone());
        data
    }
}

impl RenderBackend for CpuBackend {
    fn measure(&mut self, markup: &str, opts: &TextOptions) -> MarkshotResult<(u32, u32)> {
        let layout = self.layout(markup, opts)?;
        let w = layout.width().ceil().max(1.0) as u32;
        let h = layout.height().ceil().max(1.0) as u32;
        Ok((w, h))
    }

    fn create_surface(&mut self, width: u32, height: u32) -> MarkshotResult<Surface> {
        Surface::new(width, height)
    }

    fn paint(
        &mut self,
        surface: &mut Surface,
        markup: &str,
        opts: &TextOptions,
    ) -> MarkshotResult<()> {
        let layout = self.layout(markup, opts)?;

        let width_u16: u16 = surface
            .width()
            .try_into()
            .map_err(|_| MarkshotError::render("surface width exceeds u16"))?;
        let height_u16: u16 = surface
            .height()
            .try_into()
            .map_err(|_| MarkshotError::render("surface height exceeds u16"))?;

        let mut ctx = vello_cpu::RenderContext::new(width_u16, height_u16);
        let dx = f64::from(((surface.width() as f32 - layout.width()) / 2.0).max(0.0));
        let dy = f64::from(((surface.height() as f32 - layout.height()) / 2.0).max(0.0));
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((dx, dy)));

        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let style = run.style();
                let brush = style.brush;
                let rise = brush.rise_px;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.color.r,
                    brush.color.g,
                    brush.color.b,
                    brush.color.a,
                ));

                let font = {
                    let f = run.run().font();
                    self.font_data_for(&f.data, f.index)
                };
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y - rise,
                });
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);

                // Decoration rects share the text brush color. y-down
                // coordinates: the metrics offsets are relative to the
                // baseline, which `rise` also shifts.
                let metrics = run.run().metrics();
                let x0 = f64::from(run.offset());
                let x1 = f64::from(run.offset() + run.advance());
                if let Some(dec) = &style.underline {
                    let offset = dec.offset.unwrap_or(metrics.underline_offset);
                    let size = dec.size.unwrap_or(metrics.underline_size);
                    let top = f64::from(run.baseline() - offset - rise);
                    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                        x0,
                        top,
                        x1,
                        top + f64::from(size),
                    ));
                }
                if let Some(dec) = &style.strikethrough {
                    let offset = dec.offset.unwrap_or(metrics.strikethrough_offset);
                    let size = dec.size.unwrap_or(metrics.strikethrough_size);
                    let top = f64::from(run.baseline() - offset - rise);
                    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                        x0,
                        top,
                        x1,
                        top + f64::from(size),
                    ));
                }
            }
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width_u16, height_u16);
        ctx.render_to_pixmap(&mut pixmap);
        surface.data_mut().copy_from_slice(pixmap.data_as_u8_slice());
        Ok(())
    }

    fn encode_png(&mut self, surface: &Surface) -> MarkshotResult<Vec<u8>> {
        let straight = unpremul_rgba8(surface.data());
        let mut out = Vec::new();
        let enc = image::codecs::png::PngEncoder::new(std::io::Cursor::new(&mut out));
        enc.write_image(
            &straight,
            surface.width(),
            surface.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| MarkshotError::render(format!("encode png: {e}")))?;
        Ok(out)
    }
}

/// Convert premultiplied RGBA8 into straight-alpha RGBA8 for PNG output.
fn unpremul_rgba8(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpremul_inverts_premultiplication() {
        // 50% alpha red, premultiplied.
        let premul = [128u8, 0, 0, 128];
        let straight = unpremul_rgba8(&premul);
        assert_eq!(straight[3], 128);
        assert!(straight[0] >= 254);
        assert_eq!(&straight[1..3], &[0, 0]);
    }

    #[test]
    fn unpremul_leaves_opaque_and_transparent_untouched() {
        let data = [10u8, 20, 30, 255, 0, 0, 0, 0];
        assert_eq!(unpremul_rgba8(&data), data);
    }
}
