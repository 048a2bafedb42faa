//! Content-stream composition: walks a page's container tree depth-first,
//! accumulating transforms, and emits the low-level drawing operators.

use crate::{
    container::{Container, ImagePlacement, LineShape, RectShape, RenderObject, TextRun},
    font::Font,
    image::Image,
    properties::{PenStyle, PropertyTable},
    Colour, PDFError, Pt, Transform,
};
use id_arena::{Arena, Id};
use std::collections::HashMap;
use std::io::Write;

/// Everything a content stream needs to resolve while rendering: parsed
/// fonts for glyph lookup, the canonical property instances, and the
/// object numbers behind the per-page `F{n}`/`I{n}` resource names.
pub(crate) struct RenderContext<'a> {
    pub fonts: &'a Arena<Font>,
    pub properties: &'a PropertyTable,
    pub font_numbers: &'a HashMap<Id<Font>, u32>,
    pub image_numbers: &'a HashMap<Id<Image>, u32>,
}

/// The fonts and images a single page actually references, in first-use
/// order. Built lazily by walking the page's tree at save time.
#[derive(Default)]
pub(crate) struct PageResources {
    pub fonts: Vec<Id<Font>>,
    pub images: Vec<Id<Image>>,
}

/// Walk a container tree collecting the resources it uses; repeated use on
/// one page registers a resource only once (first use wins).
pub(crate) fn collect_resources(
    container: &Container,
    properties: &PropertyTable,
    resources: &mut PageResources,
) -> Result<(), PDFError> {
    for child in container.children() {
        match child {
            RenderObject::Text(run) => {
                let handle = run.handle.ok_or_else(unattached)?;
                let font = properties.font(handle).font();
                if !resources.fonts.contains(&font) {
                    resources.fonts.push(font);
                }
            }
            RenderObject::Image(placement) => {
                if !resources.images.contains(&placement.image) {
                    resources.images.push(placement.image);
                }
            }
            RenderObject::Container(inner) => {
                collect_resources(inner, properties, resources)?;
            }
            RenderObject::Line(_) | RenderObject::Rect(_) => {}
        }
    }
    Ok(())
}

fn unattached() -> PDFError {
    PDFError::StructuralGraph(
        "render object was never attached to a container".to_string(),
    )
}

/// Render a container's children into content-stream bytes. `acc` is the
/// transform accumulated from the page down to this container's parent;
/// each child composes on top of it.
pub(crate) fn render_container(
    container: &Container,
    acc: Transform,
    content: &mut Vec<u8>,
    ctx: &RenderContext,
) -> Result<(), PDFError> {
    let acc = acc.prepend(container.transform);
    for child in container.children() {
        match child {
            RenderObject::Text(run) => render_text(run, acc, content, ctx)?,
            RenderObject::Line(line) => render_line(line, acc, content, ctx)?,
            RenderObject::Rect(rect) => render_rect(rect, acc, content, ctx)?,
            RenderObject::Image(placement) => render_image(placement, acc, content, ctx)?,
            RenderObject::Container(inner) => render_container(inner, acc, content, ctx)?,
        }
    }
    Ok(())
}

fn render_text(
    run: &TextRun,
    acc: Transform,
    content: &mut Vec<u8>,
    ctx: &RenderContext,
) -> Result<(), PDFError> {
    let handle = run.handle.ok_or_else(unattached)?;
    let attrs = ctx.properties.font(handle);
    let font = &ctx.fonts[attrs.font()];
    let number = ctx.font_numbers.get(&attrs.font()).ok_or_else(|| {
        PDFError::StructuralGraph(format!(
            "font `{}` was used but never registered",
            attrs.family()
        ))
    })?;
    let size = attrs.size();

    // the run's local placement, then any text rotation about its origin,
    // then everything accumulated above it
    let mut full = acc.prepend(Transform::translation(run.x, run.y));
    if attrs.rotation() != 0.0 {
        full = full.prepend(Transform::rotation(attrs.rotation()));
    }

    writeln!(content, "q")?;
    write_fill_colour(content, attrs.colour())?;
    writeln!(content, "BT\n/F{} {} Tf", number, *size)?;
    if full.is_scaled() {
        writeln!(
            content,
            "{} {} {} {} {} {} Tm",
            full.a, full.b, full.c, full.d, full.e, full.f
        )?;
    } else {
        // a pure translation folds into the text position
        writeln!(content, "{} {} Td", full.e, full.f)?;
    }
    write!(content, "<")?;
    for ch in run.text.chars() {
        write!(content, "{:04x}", font.glyph_id(ch).unwrap_or(0))?;
    }
    writeln!(content, "> Tj\nET")?;

    if attrs.style().underline {
        let (position, thickness) = font.underline_metrics(size);
        let width = font.text_width(&run.text, size);
        let x1 = full.transform_x(Pt(0.0), position);
        let y1 = full.transform_y(Pt(0.0), position);
        let x2 = full.transform_x(width, position);
        let y2 = full.transform_y(width, position);
        write_stroke_colour(content, attrs.colour())?;
        writeln!(content, "{} w\n{} {} m\n{} {} l\nS", *thickness, *x1, *y1, *x2, *y2)?;
    }
    writeln!(content, "Q")?;
    Ok(())
}

fn render_line(
    line: &LineShape,
    acc: Transform,
    content: &mut Vec<u8>,
    ctx: &RenderContext,
) -> Result<(), PDFError> {
    let handle = line.pen_handle.ok_or_else(unattached)?;
    let pen = ctx.properties.pen(handle);

    // endpoints map through the accumulated transform directly, so no `cm`
    // is needed even for rotated containers
    let x1 = acc.transform_x(line.x1, line.y1);
    let y1 = acc.transform_y(line.x1, line.y1);
    let x2 = acc.transform_x(line.x2, line.y2);
    let y2 = acc.transform_y(line.x2, line.y2);

    writeln!(content, "q")?;
    write_pen(content, pen.width(), pen.colour(), pen.style())?;
    writeln!(content, "{} {} m\n{} {} l\nS\nQ", *x1, *y1, *x2, *y2)?;
    Ok(())
}

fn render_rect(
    rect: &RectShape,
    acc: Transform,
    content: &mut Vec<u8>,
    ctx: &RenderContext,
) -> Result<(), PDFError> {
    writeln!(content, "q")?;
    if acc.is_scaled() {
        writeln!(
            content,
            "{} {} {} {} {} {} cm",
            acc.a, acc.b, acc.c, acc.d, acc.e, acc.f
        )?;
    }
    let (x, y) = if acc.is_scaled() {
        (rect.rect.x1, rect.rect.y1)
    } else {
        (
            acc.transform_x(rect.rect.x1, rect.rect.y1),
            acc.transform_y(rect.rect.x1, rect.rect.y1),
        )
    };

    if let Some(handle) = rect.brush_handle {
        write_fill_colour(content, ctx.properties.brush(handle).colour())?;
    }
    if let Some(handle) = rect.pen_handle {
        let pen = ctx.properties.pen(handle);
        write_pen(content, pen.width(), pen.colour(), pen.style())?;
    }
    writeln!(
        content,
        "{} {} {} {} re",
        *x,
        *y,
        *rect.rect.width(),
        *rect.rect.height()
    )?;
    match (rect.brush_handle.is_some(), rect.pen_handle.is_some()) {
        (true, true) => writeln!(content, "B")?,
        (true, false) => writeln!(content, "f")?,
        (false, true) => writeln!(content, "S")?,
        // nothing to paint with; close the path silently
        (false, false) => writeln!(content, "n")?,
    }
    writeln!(content, "Q")?;
    Ok(())
}

fn render_image(
    placement: &ImagePlacement,
    acc: Transform,
    content: &mut Vec<u8>,
    ctx: &RenderContext,
) -> Result<(), PDFError> {
    let number = ctx.image_numbers.get(&placement.image).ok_or_else(|| {
        PDFError::StructuralGraph("image was used but never registered".to_string())
    })?;

    writeln!(content, "q")?;
    if acc.is_scaled() {
        writeln!(
            content,
            "{} {} {} {} {} {} cm",
            acc.a, acc.b, acc.c, acc.d, acc.e, acc.f
        )?;
    }
    let (x, y) = if acc.is_scaled() {
        (placement.rect.x1, placement.rect.y1)
    } else {
        (
            acc.transform_x(placement.rect.x1, placement.rect.y1),
            acc.transform_y(placement.rect.x1, placement.rect.y1),
        )
    };
    writeln!(
        content,
        "{} 0 0 {} {} {} cm\n/I{} Do\nQ",
        *placement.rect.width(),
        *placement.rect.height(),
        *x,
        *y,
        number
    )?;
    Ok(())
}

fn write_pen(
    content: &mut Vec<u8>,
    width: Pt,
    colour: Colour,
    style: PenStyle,
) -> Result<(), std::io::Error> {
    writeln!(content, "{} w", *width)?;
    match style {
        PenStyle::Solid => {}
        PenStyle::Dashed => writeln!(content, "[4 2] 0 d")?,
        PenStyle::Dotted => writeln!(content, "[1 2] 0 d")?,
    }
    write_stroke_colour(content, colour)
}

fn write_fill_colour(content: &mut Vec<u8>, colour: Colour) -> Result<(), std::io::Error> {
    match colour {
        Colour::RGB { r, g, b } => writeln!(content, "{r} {g} {b} rg"),
        Colour::CMYK { c, m, y, k } => writeln!(content, "{c} {m} {y} {k} k"),
        Colour::Grey { g } => writeln!(content, "{g} g"),
    }
}

fn write_stroke_colour(content: &mut Vec<u8>, colour: Colour) -> Result<(), std::io::Error> {
    match colour {
        Colour::RGB { r, g, b } => writeln!(content, "{r} {g} {b} RG"),
        Colour::CMYK { c, m, y, k } => writeln!(content, "{c} {m} {y} {k} K"),
        Colour::Grey { g } => writeln!(content, "{g} G"),
    }
}
