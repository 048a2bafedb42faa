//! The renderable-object tree: containers with local transforms holding
//! ordered text, line, rectangle, image and sub-container nodes.

use crate::{
    image::Image,
    properties::{
        BrushAttributes, BrushHandle, FontAttributes, FontHandle, PenAttributes, PenHandle,
        PropertyTable,
    },
    Pt, Rect, Transform,
};
use id_arena::Id;

/// A positioned run of text. The carried attributes resolve to their
/// canonical instance when the run is attached to a container.
#[derive(Debug, Clone)]
pub struct TextRun {
    pub text: String,
    /// Baseline origin of the run, in container-local coordinates
    pub x: Pt,
    pub y: Pt,
    pub(crate) style: FontAttributes,
    pub(crate) handle: Option<FontHandle>,
}

impl TextRun {
    pub fn new<S: ToString>(text: S, x: Pt, y: Pt, style: FontAttributes) -> TextRun {
        TextRun {
            text: text.to_string(),
            x,
            y,
            style,
            handle: None,
        }
    }

    pub fn style(&self) -> &FontAttributes {
        &self.style
    }
}

/// A straight stroked line between two container-local points
#[derive(Debug, Clone)]
pub struct LineShape {
    pub x1: Pt,
    pub y1: Pt,
    pub x2: Pt,
    pub y2: Pt,
    pub(crate) pen: PenAttributes,
    pub(crate) pen_handle: Option<PenHandle>,
}

impl LineShape {
    pub fn new(x1: Pt, y1: Pt, x2: Pt, y2: Pt, pen: PenAttributes) -> LineShape {
        LineShape {
            x1,
            y1,
            x2,
            y2,
            pen,
            pen_handle: None,
        }
    }
}

/// A rectangle, optionally stroked with a pen and/or filled with a brush
#[derive(Debug, Clone)]
pub struct RectShape {
    pub rect: Rect,
    pub(crate) pen: Option<PenAttributes>,
    pub(crate) brush: Option<BrushAttributes>,
    pub(crate) pen_handle: Option<PenHandle>,
    pub(crate) brush_handle: Option<BrushHandle>,
}

impl RectShape {
    pub fn new(rect: Rect, pen: Option<PenAttributes>, brush: Option<BrushAttributes>) -> RectShape {
        RectShape {
            rect,
            pen,
            brush,
            pen_handle: None,
            brush_handle: None,
        }
    }
}

/// A placed image, scaled into a container-local rectangle
#[derive(Debug, Clone)]
pub struct ImagePlacement {
    pub image: Id<Image>,
    pub rect: Rect,
}

/// Everything that can be attached to a [Container]. A closed set: the
/// serializer matches on it exhaustively, one rendering arm per variant.
#[derive(Debug, Clone)]
pub enum RenderObject {
    Text(TextRun),
    Line(LineShape),
    Rect(RectShape),
    Image(ImagePlacement),
    Container(Container),
}

/// A node in the renderable tree. Each container has a size, a transform
/// relative to its parent, and an ordered list of children; attachment order
/// is paint order (z-order). Children belong to exactly one container.
#[derive(Debug, Clone)]
pub struct Container {
    pub width: Pt,
    pub height: Pt,
    /// This container's transform relative to its parent
    pub transform: Transform,
    children: Vec<RenderObject>,
}

impl Container {
    pub fn new(width: Pt, height: Pt) -> Container {
        Container {
            width,
            height,
            transform: Transform::identity(),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Container {
        self.transform = transform;
        self
    }

    /// Attach a render object to this container. This is the on-attach hook:
    /// every attribute bag the object carries is resolved to its canonical
    /// registered instance here, so the object is ready to serialize and the
    /// document's registries see it exactly once.
    pub fn attach(&mut self, mut obj: RenderObject, properties: &mut PropertyTable) {
        match &mut obj {
            RenderObject::Text(run) => {
                run.handle = Some(properties.resolve_font(&mut run.style));
            }
            RenderObject::Line(line) => {
                line.pen_handle = Some(properties.resolve_pen(&mut line.pen));
            }
            RenderObject::Rect(rect) => {
                rect.pen_handle = rect.pen.as_mut().map(|pen| properties.resolve_pen(pen));
                rect.brush_handle = rect
                    .brush
                    .as_mut()
                    .map(|brush| properties.resolve_brush(brush));
            }
            // a sub-container's children were resolved when they were
            // attached to it
            RenderObject::Image(_) | RenderObject::Container(_) => {}
        }
        self.children.push(obj);
    }

    pub fn children(&self) -> &[RenderObject] {
        &self.children
    }
}
