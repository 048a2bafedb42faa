use crate::{sfnt::SfntFace, PDFError, Pt};
use log::debug;
use std::path::Path;

/// A parsed font. Fonts can be TTF or OTF files (plain or collections) and
/// are embedded in their entirety in the generated PDF, so large fonts may
/// dramatically increase the size of the output.
///
/// Typically, fonts are referred to throughout user applications by their
/// arena id within the document, not by any typed references.
pub struct Font {
    /// The metric and naming data parsed out of the font file
    pub face: SfntFace,
    /// The raw font file bytes, embedded verbatim at save time
    pub data: Vec<u8>,
}

impl Font {
    /// Parse a font from raw bytes, taking ownership of them. `face_index`
    /// selects a face within a TrueType collection; pass 0 for plain files.
    pub fn from_bytes(data: Vec<u8>, face_index: u32) -> Result<Font, PDFError> {
        let face = SfntFace::parse(&data, face_index)?;
        debug!("loaded font `{}`", face.full_name);
        Ok(Font { face, data })
    }

    /// Load and parse a font file. The file handle only lives for the read;
    /// parse failures propagate after it is already closed.
    pub fn load_file<P: AsRef<Path>>(path: P, face_index: u32) -> Result<Font, PDFError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data, face_index)
    }

    /// The full human-readable name of the font
    pub fn name(&self) -> &str {
        &self.face.full_name
    }

    /// The PostScript name of the font, used as its base name when embedding
    pub fn postscript_name(&self) -> &str {
        &self.face.postscript_name
    }

    fn scaling(&self, size: Pt) -> f32 {
        *size / self.face.units_per_em as f32
    }

    /// The distance from the baseline to the top of the font at the given size
    pub fn ascent(&self, size: Pt) -> Pt {
        Pt(self.scaling(size) * self.face.ascender as f32)
    }

    /// The distance from the baseline to the bottom of the font at the given
    /// size. Note: this is usually negative
    pub fn descent(&self, size: Pt) -> Pt {
        Pt(self.scaling(size) * self.face.descender as f32)
    }

    /// The default distance between two consecutive baselines at the given
    /// size: ascent − descent + line gap
    pub fn line_height(&self, size: Pt) -> Pt {
        let s = self.scaling(size);
        Pt(s * (self.face.ascender as f32 - self.face.descender as f32
            + self.face.line_gap as f32))
    }

    /// Underline offset from the baseline and stroke thickness at the given
    /// size, from the `post` table
    pub fn underline_metrics(&self, size: Pt) -> (Pt, Pt) {
        let s = self.scaling(size);
        (
            Pt(s * self.face.underline_position as f32),
            Pt(s * self.face.underline_thickness as f32),
        )
    }

    /// The italic angle of the font in degrees
    pub fn italic_angle(&self) -> f32 {
        self.face.italic_angle
    }

    /// The glyph index for a character, falling back to the replacement
    /// character's glyph and then to `?`
    pub fn glyph_id(&self, ch: char) -> Option<u16> {
        self.face
            .glyph_id(ch)
            .or_else(|| self.face.glyph_id('\u{FFFD}'))
            .or_else(|| self.face.glyph_id('?'))
    }

    /// A glyph's advance width normalized to 1000 units per em, the scale
    /// PDF width arrays use
    pub fn glyph_width_1000(&self, glyph: u16) -> f32 {
        self.face.advance_width(glyph) as f32 * 1000.0 / self.face.units_per_em as f32
    }

    /// The horizontal advance of a single character at the given font size
    pub fn char_width(&self, ch: char, size: Pt) -> Pt {
        let advance = self
            .glyph_id(ch)
            .map(|gid| self.face.advance_width(gid))
            .unwrap_or(0);
        Pt(self.scaling(size) * advance as f32)
    }

    /// The horizontal advance of a string at the given font size: one width
    /// lookup per character, no shaping
    pub fn text_width(&self, text: &str, size: Pt) -> Pt {
        text.chars().map(|ch| self.char_width(ch, size)).sum()
    }

    /// The EM-to-H factor: the ratio between the em square and the capital-H
    /// height, used to convert between nominal cap-height sizing and raw em
    /// sizing. Falls back to the ascender when the `OS/2` table predates cap
    /// height.
    pub fn h_height_factor(&self) -> f32 {
        let cap = self.face.cap_height.unwrap_or(self.face.ascender);
        self.face.units_per_em as f32 / cap as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sfnt::fixtures::FontFixture;

    fn font() -> Font {
        Font::from_bytes(FontFixture::default().build(), 0).unwrap()
    }

    #[test]
    fn metric_queries_scale_with_size() {
        let font = font();
        assert_eq!(font.ascent(Pt(10.0)), Pt(8.0));
        assert_eq!(font.descent(Pt(10.0)), Pt(-2.0));
        assert_eq!(font.line_height(Pt(10.0)), Pt(10.0));
    }

    #[test]
    fn char_and_text_widths() {
        let font = font();
        // fixture glyphs advance 500/1000 em: half the font size per character
        assert_eq!(font.char_width('a', Pt(20.0)), Pt(10.0));
        assert_eq!(font.text_width("ab cd", Pt(20.0)), Pt(50.0));
    }

    #[test]
    fn h_height_factor_uses_cap_height() {
        let font = font();
        // fixture: 1000 units/em, cap height 700
        assert!((font.h_height_factor() - 1000.0 / 700.0).abs() < 1e-6);
    }

    #[test]
    fn glyph_width_normalized_to_milliunits() {
        let font = Font::from_bytes(
            FontFixture {
                units_per_em: 2048,
                advances: vec![1024; 4],
                ..FontFixture::default()
            }
            .build(),
            0,
        )
        .unwrap();
        assert!((font.glyph_width_1000(1) - 500.0).abs() < 1e-3);
    }
}
