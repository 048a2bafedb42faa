mod colour;
pub use colour::*;

/// Containers and the render objects they hold
pub mod container;
pub use container::{Container, ImagePlacement, LineShape, RectShape, RenderObject, TextRun};

pub(crate) mod content;

mod document;
pub use document::*;

mod error;
pub use error::*;

mod font;
pub use font::*;

mod image;
pub use self::image::*;

mod info;
pub use info::*;

/// Greedy flow layout of text runs across chains of containers
pub mod layout;
pub use layout::{ContainerProvider, FlowLayout};

mod page;
pub use page::*;

/// Standard page sizes
pub mod pagesize;
pub use pagesize::PageSize;

/// Canonical attribute interning: fonts, brushes, and pens
pub mod properties;
pub use properties::{
    BrushAttributes, BrushHandle, FontAttributes, FontHandle, FontStyle, PenAttributes,
    PenHandle, PenStyle,
};

mod rect;
pub use rect::*;

pub(crate) mod refs;

/// Binary sfnt font-container parsing
pub mod sfnt;
pub use sfnt::SfntFace;

mod transform;
pub use transform::*;

mod units;
pub use units::*;

pub(crate) mod writer;
