use crate::{container::Container, pagesize::PageSize, Pt, Rect};

/// Margins are used when sizing a page's root container. There is no control
/// preventing content from overflowing the margins; they determine where the
/// root container sits on the page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Margins {
    pub top: Pt,
    pub right: Pt,
    pub bottom: Pt,
    pub left: Pt,
}

impl Margins {
    /// Create margins by specifying individual components in a clockwise
    /// fashion starting at the top (in the same order as CSS margins)
    pub fn trbl(top: Pt, right: Pt, bottom: Pt, left: Pt) -> Margins {
        Margins {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Create margins where all values are equal
    pub fn all(value: Pt) -> Margins {
        Margins {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Create margins by specifying different values for vertical (top and
    /// bottom) and horizontal (left and right) margins
    pub fn symmetric(vertical: Pt, horizontal: Pt) -> Margins {
        Margins {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    /// Create margins where all values are 0.0
    pub fn empty() -> Margins {
        Margins::all(Pt(0.0))
    }
}

/// A single page: its physical size, the content area within the margins,
/// and the root of its renderable-object tree. Pages are ordered within the
/// document; each owns its tree exclusively.
pub struct Page {
    /// The physical size of the page
    pub media_box: Rect,
    /// Where content lives, i.e. within the margins
    pub content_box: Rect,
    /// The root container, sized to the content box and translated to its
    /// lower-left corner
    pub root: Container,
}

impl Page {
    pub fn new(size: PageSize, margins: Margins) -> Page {
        let media_box = Rect::new(Pt(0.0), Pt(0.0), size.0, size.1);
        let content_box = Rect::new(
            margins.left,
            margins.bottom,
            size.0 - margins.right,
            size.1 - margins.top,
        );
        let root = Container::new(content_box.width(), content_box.height()).with_transform(
            crate::Transform::translation(content_box.x1, content_box.y1),
        );
        Page {
            media_box,
            content_box,
            root,
        }
    }
}
