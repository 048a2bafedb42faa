//! The emission half of the two-phase save: a byte writer that carries the
//! running offset explicitly, records each object's starting offset before
//! its first byte, and builds the cross-reference table from those records
//! in a single forward pass with no backpatching.

use crate::{refs::ObjId, PDFError};
use log::debug;
use std::io::Write;

pub(crate) struct ObjectWriter<W: Write> {
    w: W,
    /// Running count of bytes written so far; every recorded offset is a
    /// snapshot of this
    offset: usize,
    /// (object number, starting byte offset), in emission order
    offsets: Vec<(u32, usize)>,
    started: bool,
}

impl<W: Write> ObjectWriter<W> {
    pub fn new(w: W) -> ObjectWriter<W> {
        ObjectWriter {
            w,
            offset: 0,
            offsets: Vec::new(),
            started: false,
        }
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), PDFError> {
        self.w.write_all(bytes)?;
        self.offset += bytes.len();
        Ok(())
    }

    pub fn write_str(&mut self, s: &str) -> Result<(), PDFError> {
        self.write(s.as_bytes())
    }

    /// Write the file header. Initializing the output target twice is a
    /// structural error.
    pub fn begin_document(&mut self) -> Result<(), PDFError> {
        if self.started {
            return Err(PDFError::StructuralGraph(
                "output target was already initialized".to_string(),
            ));
        }
        self.started = true;
        self.write_str("%PDF-1.4\n")?;
        // binary marker comment so transports treat the file as binary
        self.write(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'])
    }

    /// Start an object: its offset is recorded from the running counter
    /// *before* any of its bytes are written.
    pub fn begin_object(&mut self, id: ObjId) -> Result<(), PDFError> {
        self.offsets.push((id.0, self.offset));
        self.write_str(&format!("{} 0 obj\n", id.0))
    }

    pub fn end_object(&mut self) -> Result<(), PDFError> {
        self.write_str("endobj\n")
    }

    /// Emit a complete dictionary object. `body` is the dictionary interior,
    /// without the enclosing `<<`/`>>`.
    pub fn dict_object(&mut self, id: ObjId, body: &str) -> Result<(), PDFError> {
        self.begin_object(id)?;
        self.write_str(&format!("<< {body} >>\n"))?;
        self.end_object()
    }

    /// Emit a complete stream object. `extra` holds dictionary entries
    /// beyond `/Length`, e.g. a filter.
    pub fn stream_object(&mut self, id: ObjId, extra: &str, data: &[u8]) -> Result<(), PDFError> {
        self.begin_object(id)?;
        if extra.is_empty() {
            self.write_str(&format!("<< /Length {} >>\n", data.len()))?;
        } else {
            self.write_str(&format!("<< /Length {} {extra} >>\n", data.len()))?;
        }
        self.write_str("stream\n")?;
        self.write(data)?;
        self.write_str("\nendstream\n")?;
        self.end_object()
    }

    /// Write the cross-reference table and trailer from the recorded
    /// offsets. Every object number from 1 to `count` must have been
    /// emitted exactly once.
    pub fn finish(
        mut self,
        count: u32,
        root: ObjId,
        info: Option<ObjId>,
    ) -> Result<(), PDFError> {
        let mut by_id: Vec<Option<usize>> = vec![None; count as usize];
        for &(id, offset) in &self.offsets {
            if id == 0 || id > count {
                return Err(PDFError::StructuralGraph(format!(
                    "object {id} was emitted but never registered"
                )));
            }
            let slot = &mut by_id[id as usize - 1];
            if slot.is_some() {
                return Err(PDFError::StructuralGraph(format!(
                    "object {id} was emitted twice"
                )));
            }
            *slot = Some(offset);
        }

        let xref_start = self.offset;
        self.write_str(&format!("xref\n0 {}\n", count + 1))?;
        self.write_str("0000000000 65535 f \n")?;
        for (idx, slot) in by_id.iter().enumerate() {
            match slot {
                Some(offset) => self.write_str(&format!("{offset:010} 00000 n \n"))?,
                None => {
                    return Err(PDFError::StructuralGraph(format!(
                        "object {} was registered but never emitted",
                        idx + 1
                    )))
                }
            }
        }

        let mut trailer = format!("/Size {} /Root {} 0 R", count + 1, root.0);
        if let Some(info) = info {
            trailer.push_str(&format!(" /Info {} 0 R", info.0));
        }
        self.write_str(&format!(
            "trailer\n<< {trailer} >>\nstartxref\n{xref_start}\n%%EOF\n"
        ))?;
        debug!("emitted {count} objects, xref at {xref_start}");
        self.w.flush()?;
        Ok(())
    }
}

/// Encode a string as a PDF text string. Latin-1 text becomes a literal
/// string with non-ASCII bytes octal-escaped; anything wider falls back to
/// a BOM-prefixed UTF-16BE hex string, the other encoding conforming
/// readers accept.
pub(crate) fn literal_string(s: &str) -> String {
    if s.chars().any(|ch| ch as u32 > 0xFF) {
        let mut out = String::with_capacity(4 * s.len() + 6);
        out.push_str("<FEFF");
        for unit in s.encode_utf16() {
            out.push_str(&format!("{unit:04X}"));
        }
        out.push('>');
        return out;
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('(');
    for ch in s.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ' '..='~' => out.push(ch),
            _ => out.push_str(&format!("\\{:03o}", ch as u32 as u8)),
        }
    }
    out.push(')');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_recorded_before_object_bytes() {
        let mut out = Vec::new();
        let mut w = ObjectWriter::new(&mut out);
        w.begin_document().unwrap();
        let before = w.offset;
        w.dict_object(ObjId(1), "/Type /Catalog /Pages 2 0 R").unwrap();
        assert_eq!(w.offsets, vec![(1, before)]);
        // the recorded offset points exactly at "1 0 obj"
        assert!(out[before..].starts_with(b"1 0 obj"));
    }

    #[test]
    fn double_begin_document_is_fatal() {
        let mut out = Vec::new();
        let mut w = ObjectWriter::new(&mut out);
        w.begin_document().unwrap();
        assert!(matches!(
            w.begin_document(),
            Err(PDFError::StructuralGraph(_))
        ));
    }

    #[test]
    fn finish_requires_every_registered_object() {
        let mut out = Vec::new();
        let mut w = ObjectWriter::new(&mut out);
        w.begin_document().unwrap();
        w.dict_object(ObjId(1), "/Type /Catalog").unwrap();
        // object 2 was registered but never emitted
        assert!(matches!(
            w.finish(2, ObjId(1), None),
            Err(PDFError::StructuralGraph(_))
        ));
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let mut out = Vec::new();
        let mut w = ObjectWriter::new(&mut out);
        w.begin_document().unwrap();
        w.dict_object(ObjId(1), "/Type /Catalog /Pages 2 0 R").unwrap();
        w.dict_object(ObjId(2), "/Type /Pages /Kids [] /Count 0").unwrap();
        let offsets = w.offsets.clone();
        w.finish(2, ObjId(1), None).unwrap();

        for (id, offset) in offsets {
            let tag = format!("{id} 0 obj");
            assert!(out[offset..].starts_with(tag.as_bytes()));
        }
        let text = String::from_utf8_lossy(&out);
        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.contains("xref\n0 3\n"));
        assert!(text.ends_with("%%EOF\n"));
    }

    #[test]
    fn literal_strings_escape_specials() {
        assert_eq!(literal_string("a(b)c\\"), "(a\\(b\\)c\\\\)");
        assert_eq!(literal_string("café"), "(caf\\351)");
    }

    #[test]
    fn wide_strings_become_utf16_hex() {
        assert_eq!(literal_string("日本"), "<FEFF65E5672C>");
        // a string with any non-Latin-1 char switches wholesale
        assert_eq!(literal_string("a€"), "<FEFF006120AC>");
    }
}
