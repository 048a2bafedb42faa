//! Binary parsing of sfnt-container font files (TrueType and OpenType).
//!
//! This reads exactly the tables the layout engine and serializer need:
//! `head` (units per em, bounding box), `hhea` (line metrics, metric count),
//! `OS/2` (weight, cap/x heights), `post` (italic angle, underline metrics),
//! `name` (font names), `hmtx` (advance widths), and optionally `cmap`
//! (character to glyph mapping). All multi-byte fields are big-endian.

use crate::PDFError;
use log::trace;
use std::collections::HashMap;

/// TrueType-outline sfnt version marker (1.0 fixed-point).
const VERSION_TRUETYPE: u32 = 0x0001_0000;
/// OpenType-with-CFF-data sfnt version marker, `OTTO`.
const VERSION_OTTO: u32 = 0x4F54_544F;

/// A bounds-checked big-endian reader over a byte slice. `context` names the
/// table currently being parsed so truncation errors can identify it.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    context: &'static str,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], context: &'static str) -> Reader<'a> {
        Reader {
            data,
            pos: 0,
            context,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PDFError> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len());
        match end {
            Some(end) => {
                let bytes = &self.data[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            None => Err(PDFError::font(
                self.context,
                format!("unexpected end of data at offset {}", self.pos),
            )),
        }
    }

    pub fn u16(&mut self) -> Result<u16, PDFError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn i16(&mut self) -> Result<i16, PDFError> {
        Ok(self.u16()? as i16)
    }

    pub fn u32(&mut self) -> Result<u32, PDFError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn tag(&mut self) -> Result<[u8; 4], PDFError> {
        let b = self.take(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], PDFError> {
        self.take(n)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), PDFError> {
        self.take(n).map(|_| ())
    }
}

/// A parsed sfnt font face: the metric and naming data needed for text
/// layout and font embedding, extracted in a single parse of the file.
#[derive(Debug, Clone)]
pub struct SfntFace {
    /// Design units per em square, from `head`
    pub units_per_em: u16,
    /// Font bounding box in design units, from `head`
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
    /// Line metrics in design units (FWORDs), from `hhea`
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    /// Weight class from `OS/2` (400 = regular, 700 = bold)
    pub weight_class: u16,
    /// Cap height and x-height in design units; only present when the
    /// `OS/2` table is version 2 or later
    pub cap_height: Option<i16>,
    pub x_height: Option<i16>,
    /// Italic angle in degrees from `post`, negative for right-leaning text
    pub italic_angle: f32,
    /// Underline metrics in design units, from `post`
    pub underline_position: i16,
    pub underline_thickness: i16,
    /// True when `post` declares the font monospaced
    pub is_fixed_pitch: bool,
    /// Name-id 4 from `name`: the full human-readable font name
    pub full_name: String,
    /// Name-id 6 from `name`: the PostScript name
    pub postscript_name: String,
    /// True when the face carries CFF outlines (`OTTO` flavour)
    pub has_cff: bool,
    /// Advance widths from `hmtx`, one per horizontal metric entry. Glyph
    /// indices past the end reuse the final entry.
    advance_widths: Vec<u16>,
    /// Character to glyph-index mapping from `cmap`, when present
    char_to_glyph: Option<HashMap<char, u16>>,
}

impl SfntFace {
    /// Parse face `face_index` out of `data`. Plain sfnt files hold a single
    /// face at index 0; TrueType collections (`ttcf`) hold several.
    pub fn parse(data: &[u8], face_index: u32) -> Result<SfntFace, PDFError> {
        let mut r = Reader::new(data, "sfnt header");

        // collections wrap per-face offset tables behind a ttcf header
        if data.len() >= 4 && &data[0..4] == b"ttcf" {
            r.context = "ttcf";
            r.tag()?;
            let _version = r.u32()?;
            let num_faces = r.u32()?;
            if face_index >= num_faces {
                return Err(PDFError::font(
                    "ttcf",
                    format!(
                        "face index {face_index} out of range: collection has {num_faces} faces"
                    ),
                ));
            }
            r.skip(face_index as usize * 4)?;
            let face_offset = r.u32()? as usize;
            if face_offset > data.len() {
                return Err(PDFError::font(
                    "ttcf",
                    format!("face offset {face_offset} lies beyond the file"),
                ));
            }
            r = Reader::new(data, "sfnt header");
            r.pos = face_offset;
        } else if face_index != 0 {
            return Err(PDFError::font(
                "sfnt header",
                format!("face index {face_index} out of range: file is not a collection"),
            ));
        }

        // offset subtable
        let version = r.u32()?;
        if version != VERSION_TRUETYPE && version != VERSION_OTTO {
            return Err(PDFError::font(
                "sfnt header",
                format!("unsupported sfnt version marker 0x{version:08x}"),
            ));
        }
        let num_tables = r.u16()?;
        let _search_range = r.u16()?;
        let _entry_selector = r.u16()?;
        let _range_shift = r.u16()?;

        // table directory: tag -> (absolute offset, length)
        let mut tables: HashMap<[u8; 4], (u32, u32)> = HashMap::new();
        r.context = "table directory";
        for _ in 0..num_tables {
            let tag = r.tag()?;
            let _checksum = r.u32()?;
            let offset = r.u32()?;
            let length = r.u32()?;
            tables.insert(tag, (offset, length));
        }
        trace!("font has {} tables", tables.len());

        // the version marker and the presence of CFF data must agree
        let has_cff = tables.contains_key(b"CFF ");
        if has_cff != (version == VERSION_OTTO) {
            return Err(PDFError::font(
                "table directory",
                if has_cff {
                    "file contains a `CFF ` table but is not marked `OTTO`"
                } else {
                    "file is marked `OTTO` but contains no `CFF ` table"
                },
            ));
        }

        for (name, tag) in [
            ("head", b"head" as &[u8; 4]),
            ("hhea", b"hhea"),
            ("OS/2", b"OS/2"),
            ("post", b"post"),
            ("name", b"name"),
            ("hmtx", b"hmtx"),
        ] {
            if !tables.contains_key(tag) {
                return Err(PDFError::font(name, "required table is missing"));
            }
        }

        let table = |tag: &[u8; 4], name: &'static str| table_reader(data, &tables, tag, name);

        // head: version, units per em, bounding box
        let mut head = table(b"head", "head")?;
        let head_version = head.u32()?;
        if head_version != 0x0001_0000 {
            return Err(PDFError::font(
                "head",
                format!("table version must be 1.0, found 0x{head_version:08x}"),
            ));
        }
        let _font_revision = head.u32()?;
        let _checksum_adjustment = head.u32()?;
        let _magic = head.u32()?;
        let _flags = head.u16()?;
        let units_per_em = head.u16()?;
        if units_per_em == 0 {
            return Err(PDFError::font("head", "unitsPerEm must be non-zero"));
        }
        head.skip(16)?; // created + modified timestamps
        let x_min = head.i16()?;
        let y_min = head.i16()?;
        let x_max = head.i16()?;
        let y_max = head.i16()?;

        // hhea: line metrics and the horizontal-metric count
        let mut hhea = table(b"hhea", "hhea")?;
        let _hhea_version = hhea.u32()?;
        let ascender = hhea.i16()?;
        let descender = hhea.i16()?;
        let line_gap = hhea.i16()?;
        let _advance_width_max = hhea.u16()?;
        hhea.skip(2 * 6)?; // min side bearings, extents, caret slope/offset
        hhea.skip(2 * 4)?; // reserved
        let _metric_data_format = hhea.i16()?;
        let number_of_hmetrics = hhea.u16()?;
        if number_of_hmetrics == 0 {
            return Err(PDFError::font("hhea", "numberOfHMetrics must be non-zero"));
        }

        // OS/2: the fields present depend on the table version
        let mut os2 = table(b"OS/2", "OS/2")?;
        let os2_version = os2.u16()?;
        let _x_avg_char_width = os2.i16()?;
        let weight_class = os2.u16()?;
        let _width_class = os2.u16()?;
        let _fs_type = os2.u16()?;
        os2.skip(2 * 11)?; // subscript/superscript/strikeout boxes, family class
        os2.skip(10)?; // panose
        if os2_version > 0 {
            os2.skip(4 * 4)?; // unicode range bits
        }
        let _vendor_id = os2.tag()?;
        let _fs_selection = os2.u16()?;
        let _first_char_index = os2.u16()?;
        let _last_char_index = os2.u16()?;
        let _typo_ascender = os2.i16()?;
        let _typo_descender = os2.i16()?;
        let _typo_line_gap = os2.i16()?;
        let _win_ascent = os2.u16()?;
        let _win_descent = os2.u16()?;
        if os2_version > 0 {
            os2.skip(4 * 2)?; // code page range bits
        }
        let (x_height, cap_height) = if os2_version > 1 {
            let x_height = os2.i16()?;
            let cap_height = os2.i16()?;
            let _default_char = os2.u16()?;
            (Some(x_height), Some(cap_height))
        } else {
            (None, None)
        };

        // post: italic angle (2.14-style fixed point), underline metrics
        let mut post = table(b"post", "post")?;
        let _post_version = post.u32()?;
        let angle_int = post.i16()?;
        let angle_frac = post.u16()?;
        let italic_angle = angle_int as f32 + angle_frac as f32 / 16384.0;
        let underline_position = post.i16()?;
        let underline_thickness = post.i16()?;
        let is_fixed_pitch = post.u32()? != 0;

        // name: full name (id 4) and PostScript name (id 6); when several
        // records carry the same id, the last one in table order wins
        let name_table = table(b"name", "name")?;
        let (full_name, postscript_name) = parse_name(name_table)?;

        // hmtx: (advance width, left side bearing) pairs
        let mut hmtx = table(b"hmtx", "hmtx")?;
        let mut advance_widths = Vec::with_capacity(number_of_hmetrics as usize);
        for _ in 0..number_of_hmetrics {
            advance_widths.push(hmtx.u16()?);
            let _lsb = hmtx.i16()?;
        }

        // cmap is not required: without one, character codes are used as
        // glyph indices directly
        let char_to_glyph = match tables.get(b"cmap") {
            Some(_) => Some(parse_cmap(table(b"cmap", "cmap")?)?),
            None => None,
        };

        trace!(
            "parsed font `{full_name}`: {units_per_em} units/em, {} metrics",
            advance_widths.len()
        );

        Ok(SfntFace {
            units_per_em,
            x_min,
            y_min,
            x_max,
            y_max,
            ascender,
            descender,
            line_gap,
            weight_class,
            cap_height,
            x_height,
            italic_angle,
            underline_position,
            underline_thickness,
            is_fixed_pitch,
            full_name,
            postscript_name,
            has_cff,
            advance_widths,
            char_to_glyph,
        })
    }

    /// The advance width of a glyph in design units. Glyph indices at or
    /// beyond the number of horizontal metrics reuse the last entry.
    pub fn advance_width(&self, glyph: u16) -> u16 {
        let idx = (glyph as usize).min(self.advance_widths.len() - 1);
        self.advance_widths[idx]
    }

    /// The number of horizontal metric entries the face carries. Every glyph
    /// index at or beyond this count shares the final entry's width.
    pub fn metric_count(&self) -> usize {
        self.advance_widths.len()
    }

    /// Map a character to its glyph index. Falls back to the character code
    /// itself when the font has no `cmap`; returns [None] for characters the
    /// `cmap` does not cover.
    pub fn glyph_id(&self, ch: char) -> Option<u16> {
        match &self.char_to_glyph {
            Some(map) => map.get(&ch).copied(),
            None => u16::try_from(ch as u32).ok(),
        }
    }

    /// Iterate the character to glyph mapping, when the font has one.
    pub fn char_map(&self) -> Option<impl Iterator<Item = (char, u16)> + '_> {
        self.char_to_glyph
            .as_ref()
            .map(|map| map.iter().map(|(&ch, &gid)| (ch, gid)))
    }
}

fn table_reader<'a>(
    data: &'a [u8],
    tables: &HashMap<[u8; 4], (u32, u32)>,
    tag: &[u8; 4],
    name: &'static str,
) -> Result<Reader<'a>, PDFError> {
    let &(offset, length) = tables
        .get(tag)
        .ok_or_else(|| PDFError::font(name, "required table is missing"))?;
    let (offset, length) = (offset as usize, length as usize);
    let end = offset.checked_add(length).filter(|&end| end <= data.len());
    match end {
        Some(end) => Ok(Reader::new(&data[offset..end], name)),
        None => Err(PDFError::font(name, "table extends beyond the file")),
    }
}

fn parse_name(mut r: Reader) -> Result<(String, String), PDFError> {
    let data = r.data;
    let _format = r.u16()?;
    let count = r.u16()?;
    let string_offset = r.u16()? as usize;

    let mut full_name = String::new();
    let mut postscript_name = String::new();

    for _ in 0..count {
        let platform_id = r.u16()?;
        let _encoding_id = r.u16()?;
        let _language_id = r.u16()?;
        let name_id = r.u16()?;
        let length = r.u16()? as usize;
        let offset = r.u16()? as usize;

        if name_id != 4 && name_id != 6 {
            continue;
        }

        let start = string_offset + offset;
        let end = start.checked_add(length).filter(|&end| end <= data.len());
        let bytes = match end {
            Some(end) => &data[start..end],
            None => {
                return Err(PDFError::font(
                    "name",
                    "name record string lies beyond the table",
                ))
            }
        };

        // platform 0 (Unicode) and 3 (Microsoft) strings are UTF-16BE;
        // everything else is treated as a single-byte codepage
        let value = if platform_id == 0 || platform_id == 3 {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        } else {
            bytes.iter().map(|&b| b as char).collect()
        };

        match name_id {
            4 => full_name = value,
            6 => postscript_name = value,
            _ => unreachable!(),
        }
    }

    Ok((full_name, postscript_name))
}

fn parse_cmap(mut r: Reader) -> Result<HashMap<char, u16>, PDFError> {
    let data = r.data;
    let _version = r.u16()?;
    let num_subtables = r.u16()?;

    // prefer a Unicode-capable subtable, fall back to whatever comes first
    let mut chosen: Option<usize> = None;
    let mut fallback: Option<usize> = None;
    for _ in 0..num_subtables {
        let platform_id = r.u16()?;
        let encoding_id = r.u16()?;
        let offset = r.u32()? as usize;
        if platform_id == 0 || (platform_id == 3 && (encoding_id == 1 || encoding_id == 10)) {
            chosen.get_or_insert(offset);
        }
        fallback.get_or_insert(offset);
    }
    let offset = match chosen.or(fallback) {
        Some(offset) if offset < data.len() => offset,
        _ => return Err(PDFError::font("cmap", "no usable mapping subtable")),
    };

    let mut sub = Reader::new(&data[offset..], "cmap");
    let format = sub.u16()?;
    let mut map = HashMap::new();
    match format {
        0 => {
            let _length = sub.u16()?;
            let _language = sub.u16()?;
            let glyphs = sub.bytes(256)?;
            for (code, &gid) in glyphs.iter().enumerate() {
                if gid != 0 {
                    if let Some(ch) = char::from_u32(code as u32) {
                        map.insert(ch, gid as u16);
                    }
                }
            }
        }
        4 => {
            let _length = sub.u16()?;
            let _language = sub.u16()?;
            let seg_count = sub.u16()? as usize / 2;
            sub.skip(2 * 3)?; // search range, entry selector, range shift
            let mut end_codes = Vec::with_capacity(seg_count);
            for _ in 0..seg_count {
                end_codes.push(sub.u16()?);
            }
            let _reserved = sub.u16()?;
            let mut start_codes = Vec::with_capacity(seg_count);
            for _ in 0..seg_count {
                start_codes.push(sub.u16()?);
            }
            let mut id_deltas = Vec::with_capacity(seg_count);
            for _ in 0..seg_count {
                id_deltas.push(sub.i16()?);
            }
            // position of the idRangeOffset array itself, for the relative
            // glyph-array indexing the format defines
            let range_offsets_pos = sub.pos;
            let mut range_offsets = Vec::with_capacity(seg_count);
            for _ in 0..seg_count {
                range_offsets.push(sub.u16()?);
            }

            for seg in 0..seg_count {
                let (start, end) = (start_codes[seg], end_codes[seg]);
                if start == 0xFFFF {
                    continue;
                }
                for code in start..=end.min(0xFFFE) {
                    let gid = if range_offsets[seg] == 0 {
                        (code as i32 + id_deltas[seg] as i32).rem_euclid(0x1_0000) as u16
                    } else {
                        let pos = range_offsets_pos
                            + seg * 2
                            + range_offsets[seg] as usize
                            + (code - start) as usize * 2;
                        let glyph_data = &data[offset..];
                        if pos + 2 > glyph_data.len() {
                            return Err(PDFError::font(
                                "cmap",
                                "glyph index array lies beyond the subtable",
                            ));
                        }
                        let raw = u16::from_be_bytes([glyph_data[pos], glyph_data[pos + 1]]);
                        if raw == 0 {
                            continue;
                        }
                        (raw as i32 + id_deltas[seg] as i32).rem_euclid(0x1_0000) as u16
                    };
                    if gid != 0 {
                        if let Some(ch) = char::from_u32(code as u32) {
                            map.insert(ch, gid);
                        }
                    }
                }
            }
        }
        other => {
            return Err(PDFError::font(
                "cmap",
                format!("unsupported subtable format {other}"),
            ))
        }
    }

    Ok(map)
}


#[cfg(test)]
mod tests {
    use super::fixtures::FontFixture;
    use super::*;

    #[test]
    fn parses_a_minimal_truetype_face() {
        let face = SfntFace::parse(&FontFixture::default().build(), 0).unwrap();
        assert_eq!(face.units_per_em, 1000);
        assert_eq!(face.ascender, 800);
        assert_eq!(face.descender, -200);
        assert_eq!(face.cap_height, Some(700));
        assert_eq!(face.full_name, "Loom Test Sans");
        assert_eq!(face.postscript_name, "LoomTestSans");
        assert_eq!(face.underline_position, -100);
        assert_eq!(face.underline_thickness, 50);
        assert!(!face.is_fixed_pitch);
        assert!(!face.has_cff);
    }

    #[test]
    fn cmap_maps_characters_to_glyphs() {
        let face = SfntFace::parse(&FontFixture::default().build(), 0).unwrap();
        assert_eq!(face.glyph_id(' '), Some(1));
        assert_eq!(face.glyph_id('a'), Some(2));
        assert_eq!(face.glyph_id('z'), Some(27));
        assert_eq!(face.glyph_id('!'), None);
    }

    #[test]
    fn missing_cmap_falls_back_to_identity() {
        let fixture = FontFixture {
            with_cmap: false,
            ..FontFixture::default()
        };
        let face = SfntFace::parse(&fixture.build(), 0).unwrap();
        assert_eq!(face.glyph_id('A'), Some('A' as u16));
    }

    #[test]
    fn width_carry_forward_past_last_metric() {
        let fixture = FontFixture {
            advances: vec![600, 500, 450],
            ..FontFixture::default()
        };
        let face = SfntFace::parse(&fixture.build(), 0).unwrap();
        assert_eq!(face.advance_width(0), 600);
        assert_eq!(face.advance_width(2), 450);
        // every glyph at or past the metric count reuses the last width
        assert_eq!(face.advance_width(3), 450);
        assert_eq!(face.advance_width(1000), 450);
    }

    #[test]
    fn rejects_missing_required_tables() {
        for tag in [*b"head", *b"hhea", *b"OS/2", *b"post", *b"name", *b"hmtx"] {
            let fixture = FontFixture {
                omit: vec![tag],
                ..FontFixture::default()
            };
            let err = SfntFace::parse(&fixture.build(), 0).unwrap_err();
            match err {
                PDFError::FontFormat { table, .. } => {
                    assert_eq!(table.as_bytes(), &tag[..table.len()]);
                }
                other => panic!("expected FontFormat error, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_unknown_version_marker() {
        let fixture = FontFixture {
            version: 0xDEAD_BEEF,
            ..FontFixture::default()
        };
        let err = SfntFace::parse(&fixture.build(), 0).unwrap_err();
        assert!(matches!(err, PDFError::FontFormat { .. }));
    }

    #[test]
    fn otto_marker_requires_cff_table() {
        // marked OTTO with a CFF table: accepted
        let fixture = FontFixture {
            version: VERSION_OTTO,
            ..FontFixture::default()
        };
        let face = SfntFace::parse(&fixture.build(), 0).unwrap();
        assert!(face.has_cff);

        // marked OTTO but the CFF table is gone: contradiction
        let fixture = FontFixture {
            version: VERSION_OTTO,
            omit: vec![*b"CFF "],
            ..FontFixture::default()
        };
        let err = SfntFace::parse(&fixture.build(), 0).unwrap_err();
        assert!(matches!(err, PDFError::FontFormat { .. }));
    }

    #[test]
    fn collection_faces_parse_by_index() {
        let data = FontFixture::default().build_collection(2);
        let face = SfntFace::parse(&data, 1).unwrap();
        assert_eq!(face.units_per_em, 1000);
    }

    #[test]
    fn collection_face_index_out_of_range() {
        let data = FontFixture::default().build_collection(2);
        let err = SfntFace::parse(&data, 2).unwrap_err();
        match err {
            PDFError::FontFormat { table, reason } => {
                assert_eq!(table, "ttcf");
                assert!(reason.contains("out of range"));
            }
            other => panic!("expected FontFormat error, got {other:?}"),
        }
    }

    #[test]
    fn nonzero_index_into_plain_file_fails() {
        let data = FontFixture::default().build();
        assert!(SfntFace::parse(&data, 1).is_err());
    }

    #[test]
    fn truncated_table_is_reported() {
        let mut data = FontFixture::default().build();
        data.truncate(data.len() - 40);
        assert!(matches!(
            SfntFace::parse(&data, 0),
            Err(PDFError::FontFormat { .. })
        ));
    }

    #[test]
    fn os2_version_zero_omits_later_fields() {
        let fixture = FontFixture {
            os2_version: 0,
            ..FontFixture::default()
        };
        let face = SfntFace::parse(&fixture.build(), 0).unwrap();
        assert_eq!(face.cap_height, None);
        assert_eq!(face.x_height, None);
    }
}
