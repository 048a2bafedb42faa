//! Visual attribute bags and their per-document canonical registry.
//!
//! Every attribute bag (font, brush, pen) has a *registered* counterpart: a
//! single shared, immutable instance per distinct canonical key within one
//! document. The registry guarantees identical attributes serialize as one
//! resource definition, referenced from each use.

use crate::{colour::colours, font::Font, Colour, PDFError, Pt};
use id_arena::Id;
use std::collections::HashMap;

/// Deterministic, culture-invariant number formatting for canonical keys.
/// NaN gets a stable token so it still participates consistently.
fn key_num(v: f32) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        format!("{v:.3}")
    }
}

/// Handle to a registered (canonical) font attribute instance
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FontHandle(pub(crate) usize);

/// Handle to a registered (canonical) brush attribute instance
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BrushHandle(pub(crate) usize);

/// Handle to a registered (canonical) pen attribute instance
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PenHandle(pub(crate) usize);

/// Font style flags, all participating in the canonical key
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikeout: bool,
}

impl FontStyle {
    fn key_fragment(&self) -> String {
        format!(
            "b{}i{}u{}s{}",
            self.bold as u8, self.italic as u8, self.underline as u8, self.strikeout as u8
        )
    }
}

/// Dash pattern applied by a pen
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum PenStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl PenStyle {
    fn key_fragment(&self) -> &'static str {
        match self {
            PenStyle::Solid => "solid",
            PenStyle::Dashed => "dashed",
            PenStyle::Dotted => "dotted",
        }
    }
}

/// Text drawing attributes: which font, at what size and colour, with which
/// style flags, rotation, and line-feed override.
///
/// Mutating a bag invalidates its cached registration; mutating a canonical
/// (registered) instance is an error.
#[derive(Debug, Clone)]
pub struct FontAttributes {
    font: Id<Font>,
    family: String,
    size: Pt,
    colour: Colour,
    style: FontStyle,
    rotation: f32,
    line_feed: Option<Pt>,
    canonical: bool,
    registered: Option<FontHandle>,
}

impl FontAttributes {
    /// Create attributes for a document font. The family name is captured
    /// from the parsed face and discriminates the canonical key.
    pub fn new(font_id: Id<Font>, font: &Font, size: Pt) -> FontAttributes {
        FontAttributes {
            font: font_id,
            family: font.name().to_string(),
            size,
            colour: colours::BLACK,
            style: FontStyle::default(),
            rotation: 0.0,
            line_feed: None,
            canonical: false,
            registered: None,
        }
    }

    pub fn font(&self) -> Id<Font> {
        self.font
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn size(&self) -> Pt {
        self.size
    }

    pub fn colour(&self) -> Colour {
        self.colour
    }

    pub fn style(&self) -> FontStyle {
        self.style
    }

    /// Text rotation in degrees, counter-clockwise about the text origin
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// The vertical advance between wrapped lines: the explicit override if
    /// one was set, otherwise twice the nominal font size
    pub fn line_feed(&self) -> Pt {
        self.line_feed.unwrap_or(self.size * 2.0)
    }

    fn mutable(&mut self, attribute: &'static str) -> Result<&mut Self, PDFError> {
        if self.canonical {
            return Err(PDFError::ImmutableProperty { attribute });
        }
        self.registered = None;
        Ok(self)
    }

    pub fn set_size(&mut self, size: Pt) -> Result<(), PDFError> {
        self.mutable("size")?.size = size;
        Ok(())
    }

    pub fn set_colour(&mut self, colour: Colour) -> Result<(), PDFError> {
        self.mutable("colour")?.colour = colour;
        Ok(())
    }

    pub fn set_style(&mut self, style: FontStyle) -> Result<(), PDFError> {
        self.mutable("style")?.style = style;
        Ok(())
    }

    pub fn set_rotation(&mut self, degrees: f32) -> Result<(), PDFError> {
        self.mutable("rotation")?.rotation = degrees;
        Ok(())
    }

    pub fn set_line_feed(&mut self, line_feed: Option<Pt>) -> Result<(), PDFError> {
        self.mutable("line_feed")?.line_feed = line_feed;
        Ok(())
    }

    fn key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.family,
            key_num(*self.size),
            self.colour.key_fragment(),
            self.style.key_fragment(),
            key_num(self.rotation),
            self.line_feed
                .map(|lf| key_num(*lf))
                .unwrap_or_else(|| "default".to_string()),
        )
    }
}

/// Fill attributes: a single colour
#[derive(Debug, Clone)]
pub struct BrushAttributes {
    colour: Colour,
    canonical: bool,
    registered: Option<BrushHandle>,
}

impl BrushAttributes {
    pub fn new(colour: Colour) -> BrushAttributes {
        BrushAttributes {
            colour,
            canonical: false,
            registered: None,
        }
    }

    pub fn colour(&self) -> Colour {
        self.colour
    }

    pub fn set_colour(&mut self, colour: Colour) -> Result<(), PDFError> {
        if self.canonical {
            return Err(PDFError::ImmutableProperty {
                attribute: "colour",
            });
        }
        self.registered = None;
        self.colour = colour;
        Ok(())
    }

    fn key(&self) -> String {
        self.colour.key_fragment()
    }
}

/// Stroke attributes: width, colour and dash style
#[derive(Debug, Clone)]
pub struct PenAttributes {
    width: Pt,
    colour: Colour,
    style: PenStyle,
    canonical: bool,
    registered: Option<PenHandle>,
}

impl PenAttributes {
    pub fn new(width: Pt, colour: Colour) -> PenAttributes {
        PenAttributes {
            width,
            colour,
            style: PenStyle::Solid,
            canonical: false,
            registered: None,
        }
    }

    pub fn width(&self) -> Pt {
        self.width
    }

    pub fn colour(&self) -> Colour {
        self.colour
    }

    pub fn style(&self) -> PenStyle {
        self.style
    }

    fn mutable(&mut self, attribute: &'static str) -> Result<&mut Self, PDFError> {
        if self.canonical {
            return Err(PDFError::ImmutableProperty { attribute });
        }
        self.registered = None;
        Ok(self)
    }

    pub fn set_width(&mut self, width: Pt) -> Result<(), PDFError> {
        self.mutable("width")?.width = width;
        Ok(())
    }

    pub fn set_colour(&mut self, colour: Colour) -> Result<(), PDFError> {
        self.mutable("colour")?.colour = colour;
        Ok(())
    }

    pub fn set_style(&mut self, style: PenStyle) -> Result<(), PDFError> {
        self.mutable("style")?.style = style;
        Ok(())
    }

    fn key(&self) -> String {
        format!(
            "{}|{}|{}",
            key_num(*self.width),
            self.colour.key_fragment(),
            self.style.key_fragment(),
        )
    }
}

/// An interned-value store: canonical key to index into the canonical
/// instance list
struct Registry<T> {
    by_key: HashMap<String, usize>,
    items: Vec<T>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Registry {
            by_key: HashMap::new(),
            items: Vec::new(),
        }
    }
}

impl<T: Clone> Registry<T> {
    fn resolve(&mut self, key: String, make_canonical: impl FnOnce(usize) -> T) -> usize {
        if let Some(&idx) = self.by_key.get(&key) {
            return idx;
        }
        let idx = self.items.len();
        self.items.push(make_canonical(idx));
        self.by_key.insert(key, idx);
        idx
    }
}

/// The per-document registries for font, brush and pen attributes. Owned by
/// the [Document](crate::Document); never process-global.
#[derive(Default)]
pub struct PropertyTable {
    fonts: Registry<FontAttributes>,
    brushes: Registry<BrushAttributes>,
    pens: Registry<PenAttributes>,
}

impl PropertyTable {
    /// Resolve a font attribute bag to its canonical instance, creating it
    /// on first use. The bag caches the handle until it is next mutated.
    pub fn resolve_font(&mut self, bag: &mut FontAttributes) -> FontHandle {
        if let Some(handle) = bag.registered {
            return handle;
        }
        let idx = self.fonts.resolve(bag.key(), |idx| {
            let mut canonical = bag.clone();
            canonical.canonical = true;
            canonical.registered = Some(FontHandle(idx));
            canonical
        });
        let handle = FontHandle(idx);
        bag.registered = Some(handle);
        handle
    }

    pub fn resolve_brush(&mut self, bag: &mut BrushAttributes) -> BrushHandle {
        if let Some(handle) = bag.registered {
            return handle;
        }
        let idx = self.brushes.resolve(bag.key(), |idx| {
            let mut canonical = bag.clone();
            canonical.canonical = true;
            canonical.registered = Some(BrushHandle(idx));
            canonical
        });
        let handle = BrushHandle(idx);
        bag.registered = Some(handle);
        handle
    }

    pub fn resolve_pen(&mut self, bag: &mut PenAttributes) -> PenHandle {
        if let Some(handle) = bag.registered {
            return handle;
        }
        let idx = self.pens.resolve(bag.key(), |idx| {
            let mut canonical = bag.clone();
            canonical.canonical = true;
            canonical.registered = Some(PenHandle(idx));
            canonical
        });
        let handle = PenHandle(idx);
        bag.registered = Some(handle);
        handle
    }

    pub fn font(&self, handle: FontHandle) -> &FontAttributes {
        &self.fonts.items[handle.0]
    }

    pub fn brush(&self, handle: BrushHandle) -> &BrushAttributes {
        &self.brushes.items[handle.0]
    }

    pub fn pen(&self, handle: PenHandle) -> &PenAttributes {
        &self.pens.items[handle.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sfnt::fixtures::FontFixture;
    use id_arena::Arena;

    fn font_arena() -> (Arena<Font>, Id<Font>) {
        let mut fonts = Arena::new();
        let font = Font::from_bytes(FontFixture::default().build(), 0).unwrap();
        let id = fonts.alloc(font);
        (fonts, id)
    }

    #[test]
    fn equal_bags_resolve_to_the_same_instance() {
        let (fonts, id) = font_arena();
        let mut table = PropertyTable::default();

        let mut a = FontAttributes::new(id, &fonts[id], Pt(12.0));
        let mut b = FontAttributes::new(id, &fonts[id], Pt(12.0));
        // resolution order must not matter
        let hb = table.resolve_font(&mut b);
        let ha = table.resolve_font(&mut a);
        assert_eq!(ha, hb);
        assert!(std::ptr::eq(table.font(ha), table.font(hb)));
    }

    #[test]
    fn different_keys_resolve_to_different_instances() {
        let (fonts, id) = font_arena();
        let mut table = PropertyTable::default();

        let mut a = FontAttributes::new(id, &fonts[id], Pt(12.0));
        let mut b = FontAttributes::new(id, &fonts[id], Pt(14.0));
        assert_ne!(table.resolve_font(&mut a), table.resolve_font(&mut b));
    }

    #[test]
    fn canonical_instances_are_immutable() {
        let (fonts, id) = font_arena();
        let mut table = PropertyTable::default();

        let mut bag = FontAttributes::new(id, &fonts[id], Pt(12.0));
        let handle = table.resolve_font(&mut bag);
        let mut canonical = table.font(handle).clone();
        let err = canonical.set_size(Pt(99.0)).unwrap_err();
        assert!(matches!(
            err,
            PDFError::ImmutableProperty { attribute: "size" }
        ));
    }

    #[test]
    fn mutation_invalidates_the_cached_registration() {
        let (fonts, id) = font_arena();
        let mut table = PropertyTable::default();

        let mut bag = FontAttributes::new(id, &fonts[id], Pt(12.0));
        let first = table.resolve_font(&mut bag);
        bag.set_size(Pt(14.0)).unwrap();
        assert!(bag.registered.is_none());
        let second = table.resolve_font(&mut bag);
        assert_ne!(first, second);

        // mutating back re-resolves to the original canonical instance
        bag.set_size(Pt(12.0)).unwrap();
        assert_eq!(table.resolve_font(&mut bag), first);
    }

    #[test]
    fn nan_values_key_deterministically() {
        let mut table = PropertyTable::default();
        let mut a = BrushAttributes::new(Colour::new_grey(f32::NAN));
        let mut b = BrushAttributes::new(Colour::new_grey(f32::NAN));
        assert_eq!(table.resolve_brush(&mut a), table.resolve_brush(&mut b));
    }

    #[test]
    fn pens_key_on_width_colour_and_style() {
        let mut table = PropertyTable::default();
        let mut a = PenAttributes::new(Pt(1.0), colours::BLACK);
        let mut b = PenAttributes::new(Pt(1.0), colours::BLACK);
        let mut c = PenAttributes::new(Pt(1.0), colours::BLACK);
        c.set_style(PenStyle::Dashed).unwrap();
        assert_eq!(table.resolve_pen(&mut a), table.resolve_pen(&mut b));
        assert_ne!(table.resolve_pen(&mut a), table.resolve_pen(&mut c));
    }

    #[test]
    fn default_line_feed_is_twice_the_size() {
        let (fonts, id) = font_arena();
        let mut bag = FontAttributes::new(id, &fonts[id], Pt(12.0));
        assert_eq!(bag.line_feed(), Pt(24.0));
        bag.set_line_feed(Some(Pt(15.0))).unwrap();
        assert_eq!(bag.line_feed(), Pt(15.0));
    }
}
