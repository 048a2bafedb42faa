use crate::{
    container::RenderObject,
    content::{collect_resources, render_container, PageResources, RenderContext},
    font::Font,
    image::{Image, ImageColourSpace},
    info::Info,
    layout::{ContainerProvider, FlowLayout},
    page::Page,
    properties::{FontAttributes, PropertyTable},
    refs::{ObjectReferences, RefType},
    writer::ObjectWriter,
    PDFError, Pt, Transform,
};
use id_arena::{Arena, Id};
use log::debug;
use miniz_oxide::deflate::compress_to_vec_zlib;
use std::cell::Cell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

/// How a conforming reader should present the document, referenced from the
/// catalog when set.
#[derive(Debug, Default, Clone)]
pub struct ViewerPreferences {
    pub hide_toolbar: bool,
    pub hide_menubar: bool,
    pub fit_window: bool,
    pub center_window: bool,
}

/// A document is the main object that stores all the contents of the PDF
/// then renders it out with a call to [Document::save]
#[derive(Default)]
pub struct Document {
    pub info: Option<Info>,
    pub viewer_preferences: Option<ViewerPreferences>,
    pub pages: Arena<Page>,
    pub page_order: Vec<Id<Page>>,
    pub fonts: Arena<Font>,
    pub images: Arena<Image>,
    /// The canonical attribute store shared by every page in this document.
    /// Two documents never share one.
    pub properties: PropertyTable,
    open_layouts: Rc<Cell<usize>>,
}

impl Document {
    pub fn new() -> Document {
        Document::default()
    }

    /// Sets information about the document. If not provided (or left empty),
    /// no information block will be written to the PDF
    pub fn set_info(&mut self, info: Info) {
        self.info = Some(info);
    }

    pub fn set_viewer_preferences(&mut self, preferences: ViewerPreferences) {
        self.viewer_preferences = Some(preferences);
    }

    /// Add a page to the end of the document, returning its id
    pub fn add_page(&mut self, page: Page) -> Id<Page> {
        let id = self.pages.alloc(page);
        self.page_order.push(id);
        id
    }

    /// Get the 0-based index of a page given its ID. Note that changing the
    /// page order after this call _will_ invalidate the returned page index
    pub fn index_of_page(&self, page: Id<Page>) -> Option<usize> {
        self.page_order.iter().position(|&p| p == page)
    }

    /// Add a font to the document structure. Fonts are stored "globally"
    /// within the document, so any page can use one by its id.
    pub fn add_font(&mut self, font: Font) -> Id<Font> {
        self.fonts.alloc(font)
    }

    /// Add an image to the document structure. Images are stored "globally"
    /// within the document and may be placed on any number of pages.
    pub fn add_image(&mut self, image: Image) -> Id<Image> {
        self.images.alloc(image)
    }

    /// Build an attribute bag for a font at a size, ready to resolve or
    /// customize further
    pub fn font_attributes(&self, font: Id<Font>, size: Pt) -> FontAttributes {
        FontAttributes::new(font, &self.fonts[font], size)
    }

    /// Attach a render object to a page's root container, resolving its
    /// attributes against this document's property store
    pub fn attach(&mut self, page: Id<Page>, obj: RenderObject) -> Result<(), PDFError> {
        let page = self.pages.get_mut(page).ok_or_else(|| {
            PDFError::StructuralGraph("page is not part of this document".to_string())
        })?;
        page.root.attach(obj, &mut self.properties);
        Ok(())
    }

    /// Open a flow layout fed by `provider`. The layout must be closed
    /// before the document can be saved.
    pub fn open_layout<P: ContainerProvider>(&self, provider: P) -> FlowLayout<P> {
        FlowLayout::new(provider, Rc::clone(&self.open_layouts))
    }

    /// Serialize the document. Object numbers are assigned sequentially in
    /// a registration pass, then every object is emitted in that same order
    /// with its byte offset recorded along the way, so the cross-reference
    /// table falls out of a single forward pass.
    pub fn save<W: Write>(&self, w: W) -> Result<(), PDFError> {
        if self.open_layouts.get() > 0 {
            return Err(PDFError::LayoutState(
                "layout manager not closed".to_string(),
            ));
        }

        // gather what each page actually uses, and from that the
        // document-wide font/image sets in first-use order
        let mut page_resources = Vec::with_capacity(self.page_order.len());
        let mut used_fonts: Vec<Id<Font>> = Vec::new();
        let mut used_images: Vec<Id<Image>> = Vec::new();
        for id in &self.page_order {
            let mut resources = PageResources::default();
            collect_resources(&self.pages[*id].root, &self.properties, &mut resources)?;
            for font in &resources.fonts {
                if !used_fonts.contains(font) {
                    used_fonts.push(*font);
                }
            }
            for image in &resources.images {
                if !used_images.contains(image) {
                    used_images.push(*image);
                }
            }
            page_resources.push(resources);
        }

        // registration pass
        let mut refs = ObjectReferences::new();
        let catalog_id = refs.gen(RefType::Catalog);
        let pages_id = refs.gen(RefType::Pages);
        let info = self.info.as_ref().filter(|info| !info.is_empty());
        let info_id = info.map(|_| refs.gen(RefType::Info));
        let prefs_id = self
            .viewer_preferences
            .as_ref()
            .map(|_| refs.gen(RefType::ViewerPreferences));
        for i in 0..self.page_order.len() {
            refs.gen(RefType::Page(i));
            refs.gen(RefType::ContentForPage(i));
        }
        let mut font_numbers: HashMap<Id<Font>, u32> = HashMap::new();
        for (f, id) in used_fonts.iter().enumerate() {
            font_numbers.insert(*id, refs.gen(RefType::Font(f)).0);
            refs.gen(RefType::CidFont(f));
            refs.gen(RefType::FontDescriptor(f));
            refs.gen(RefType::FontData(f));
            if self.fonts[*id].face.char_map().is_some() {
                refs.gen(RefType::ToUnicode(f));
            }
        }
        let mut image_numbers: HashMap<Id<Image>, u32> = HashMap::new();
        for (m, id) in used_images.iter().enumerate() {
            image_numbers.insert(*id, refs.gen(RefType::Image(m)).0);
        }
        debug!(
            "registered {} objects: {} pages, {} fonts, {} images",
            refs.count(),
            self.page_order.len(),
            used_fonts.len(),
            used_images.len()
        );

        // emission pass, same order as registration
        let mut writer = ObjectWriter::new(w);
        writer.begin_document()?;

        let mut catalog = format!("/Type /Catalog /Pages {} 0 R", pages_id.0);
        if let Some(prefs_id) = prefs_id {
            catalog.push_str(&format!(" /ViewerPreferences {} 0 R", prefs_id.0));
        }
        writer.dict_object(catalog_id, &catalog)?;

        let kids = (0..self.page_order.len())
            .map(|i| Ok(format!("{} 0 R", refs.require(RefType::Page(i))?.0)))
            .collect::<Result<Vec<_>, PDFError>>()?
            .join(" ");
        writer.dict_object(
            pages_id,
            &format!(
                "/Type /Pages /Kids [{kids}] /Count {}",
                self.page_order.len()
            ),
        )?;

        if let (Some(info), Some(info_id)) = (info, info_id) {
            writer.dict_object(info_id, &info.dict_body())?;
        }
        if let (Some(prefs), Some(prefs_id)) = (&self.viewer_preferences, prefs_id) {
            writer.dict_object(prefs_id, &viewer_preferences_body(prefs))?;
        }

        let ctx = RenderContext {
            fonts: &self.fonts,
            properties: &self.properties,
            font_numbers: &font_numbers,
            image_numbers: &image_numbers,
        };
        for (i, id) in self.page_order.iter().enumerate() {
            let page = &self.pages[*id];
            let content_id = refs.require(RefType::ContentForPage(i))?;
            writer.dict_object(
                refs.require(RefType::Page(i))?,
                &page_body(page, pages_id.0, content_id.0, &page_resources[i], &ctx),
            )?;

            let mut content = Vec::new();
            render_container(&page.root, Transform::identity(), &mut content, &ctx)?;
            writer.stream_object(content_id, "", &content)?;
        }

        for (f, id) in used_fonts.iter().enumerate() {
            write_font(&mut writer, &refs, f, &self.fonts[*id])?;
        }
        for (m, id) in used_images.iter().enumerate() {
            write_image(&mut writer, &refs, m, &self.images[*id])?;
        }

        writer.finish(refs.count(), catalog_id, info_id)
    }
}

fn viewer_preferences_body(prefs: &ViewerPreferences) -> String {
    let mut body = String::new();
    if prefs.hide_toolbar {
        body.push_str("/HideToolbar true ");
    }
    if prefs.hide_menubar {
        body.push_str("/HideMenubar true ");
    }
    if prefs.fit_window {
        body.push_str("/FitWindow true ");
    }
    if prefs.center_window {
        body.push_str("/CenterWindow true ");
    }
    body.trim_end().to_string()
}

fn page_body(
    page: &Page,
    pages: u32,
    content: u32,
    resources: &PageResources,
    ctx: &RenderContext,
) -> String {
    let mut body = format!(
        "/Type /Page /Parent {} 0 R /MediaBox [{} {} {} {}] /Contents {} 0 R",
        pages,
        *page.media_box.x1,
        *page.media_box.y1,
        *page.media_box.x2,
        *page.media_box.y2,
        content
    );
    body.push_str(" /Resources <<");
    if !resources.fonts.is_empty() {
        body.push_str(" /Font <<");
        for id in &resources.fonts {
            let n = ctx.font_numbers[id];
            body.push_str(&format!(" /F{n} {n} 0 R"));
        }
        body.push_str(" >>");
    }
    if !resources.images.is_empty() {
        body.push_str(" /XObject <<");
        for id in &resources.images {
            let n = ctx.image_numbers[id];
            body.push_str(&format!(" /I{n} {n} 0 R"));
        }
        body.push_str(" >>");
    }
    body.push_str(" >>");
    body
}

/// Emit the full object chain for one embedded font: the Type0 wrapper, the
/// CID font with its width array, the descriptor, the verbatim font file,
/// and (when the face carries a `cmap`) a ToUnicode CMap for text extraction.
fn write_font<W: Write>(
    writer: &mut ObjectWriter<W>,
    refs: &ObjectReferences,
    f: usize,
    font: &Font,
) -> Result<(), PDFError> {
    let face = &font.face;
    let font_id = refs.require(RefType::Font(f))?;
    let cid_id = refs.require(RefType::CidFont(f))?;
    let descriptor_id = refs.require(RefType::FontDescriptor(f))?;
    let data_id = refs.require(RefType::FontData(f))?;
    let to_unicode = face
        .char_map()
        .map(|_| refs.require(RefType::ToUnicode(f)))
        .transpose()?;

    let base_name = if face.postscript_name.is_empty() {
        format!("Font{}", font_id.0)
    } else {
        face.postscript_name.replace(' ', "")
    };

    let mut type0 = format!(
        "/Type /Font /Subtype /Type0 /BaseFont /{base_name} /Encoding /Identity-H /DescendantFonts [{} 0 R]",
        cid_id.0
    );
    if let Some(to_unicode) = to_unicode {
        type0.push_str(&format!(" /ToUnicode {} 0 R", to_unicode.0));
    }
    writer.dict_object(font_id, &type0)?;

    // one explicit width per metric entry; everything past the end shares
    // the final width, which is exactly what /DW expresses
    let widths = (0..face.metric_count() as u16)
        .map(|gid| format!("{}", font.glyph_width_1000(gid)))
        .collect::<Vec<_>>()
        .join(" ");
    let default_width = font.glyph_width_1000(face.metric_count() as u16 - 1);
    let subtype = if face.has_cff {
        "CIDFontType0"
    } else {
        "CIDFontType2"
    };
    let mut cid = format!(
        "/Type /Font /Subtype /{subtype} /BaseFont /{base_name} \
         /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
         /FontDescriptor {} 0 R /DW {default_width} /W [0 [{widths}]]",
        descriptor_id.0
    );
    if !face.has_cff {
        cid.push_str(" /CIDToGIDMap /Identity");
    }
    writer.dict_object(cid_id, &cid)?;

    let scale = 1000.0 / face.units_per_em as f32;
    let mut flags = 1 << 2;
    if face.is_fixed_pitch {
        flags |= 1;
    }
    if face.italic_angle != 0.0 {
        flags |= 1 << 6;
    }
    let cap_height = face.cap_height.unwrap_or(face.ascender);
    let stem_v = 10.0 + 0.244 * (face.weight_class as f32 - 50.0);
    let font_file = if face.has_cff {
        "FontFile3"
    } else {
        "FontFile2"
    };
    writer.dict_object(
        descriptor_id,
        &format!(
            "/Type /FontDescriptor /FontName /{base_name} /Flags {flags} \
             /FontBBox [{} {} {} {}] /ItalicAngle {} /Ascent {} /Descent {} \
             /CapHeight {} /StemV {stem_v} /{font_file} {} 0 R",
            face.x_min as f32 * scale,
            face.y_min as f32 * scale,
            face.x_max as f32 * scale,
            face.y_max as f32 * scale,
            face.italic_angle,
            face.ascender as f32 * scale,
            face.descender as f32 * scale,
            cap_height as f32 * scale,
            data_id.0
        ),
    )?;

    if face.has_cff {
        writer.stream_object(data_id, "/Subtype /OpenType", &font.data)?;
    } else {
        writer.stream_object(data_id, &format!("/Length1 {}", font.data.len()), &font.data)?;
    }

    if let Some(to_unicode) = to_unicode {
        let cmap = to_unicode_cmap(font);
        let compressed = compress_to_vec_zlib(&cmap, 8);
        writer.stream_object(to_unicode, "/Filter /FlateDecode", &compressed)?;
    }
    Ok(())
}

/// Build the ToUnicode CMap mapping glyph ids back to their characters, so
/// text can be copied out of the document.
fn to_unicode_cmap(font: &Font) -> Vec<u8> {
    let mut pairs: Vec<(u16, char)> = font
        .face
        .char_map()
        .map(|map| map.map(|(ch, gid)| (gid, ch)).collect())
        .unwrap_or_default();
    pairs.sort_unstable();

    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <ffff>\n\
         endcodespacerange\n",
    );
    // bfchar blocks are capped at 100 entries apiece
    for chunk in pairs.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, ch) in chunk {
            let mut units = [0u16; 2];
            let encoded = ch.encode_utf16(&mut units);
            cmap.push_str(&format!("<{gid:04x}> <"));
            for unit in encoded {
                cmap.push_str(&format!("{unit:04x}"));
            }
            cmap.push_str(">\n");
        }
        cmap.push_str("endbfchar\n");
    }
    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap.into_bytes()
}

fn write_image<W: Write>(
    writer: &mut ObjectWriter<W>,
    refs: &ObjectReferences,
    m: usize,
    image: &Image,
) -> Result<(), PDFError> {
    let id = refs.require(RefType::Image(m))?;
    let colour_space = match image.colour_space {
        ImageColourSpace::DeviceRGB => "DeviceRGB",
        ImageColourSpace::DeviceGray => "DeviceGray",
    };
    writer.stream_object(
        id,
        &format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} \
             /ColorSpace /{colour_space} /BitsPerComponent 8 /Filter /DCTDecode",
            image.width, image.height
        ),
        &image.data,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Container, TextRun};
    use crate::page::Margins;
    use crate::pagesize;
    use crate::sfnt::fixtures::FontFixture;

    fn doc_with_font() -> (Document, Id<Font>) {
        let mut doc = Document::new();
        let font = Font::from_bytes(FontFixture::default().build(), 0).unwrap();
        let id = doc.add_font(font);
        (doc, id)
    }

    #[test]
    fn empty_document_saves() {
        let doc = Document::new();
        let mut out = Vec::new();
        doc.save(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.contains("/Type /Catalog"));
        assert!(text.contains("/Count 0"));
        assert!(text.ends_with("%%EOF\n"));
    }

    #[test]
    fn unused_fonts_are_not_embedded() {
        let (mut doc, _) = doc_with_font();
        doc.add_page(Page::new(pagesize::LETTER, Margins::empty()));
        let mut out = Vec::new();
        doc.save(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(!text.contains("/Type /Font"));
    }

    #[test]
    fn text_on_a_page_pulls_in_its_font() {
        let (mut doc, font) = doc_with_font();
        let page = doc.add_page(Page::new(pagesize::LETTER, Margins::empty()));
        let style = doc.font_attributes(font, Pt(12.0));
        doc.attach(
            page,
            RenderObject::Text(TextRun::new("hello", Pt(10.0), Pt(700.0), style)),
        )
        .unwrap();
        let mut out = Vec::new();
        doc.save(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("/Subtype /Type0"));
        assert!(text.contains("/Subtype /CIDFontType2"));
        assert!(text.contains("/BaseFont /LoomTestSans"));
        assert!(text.contains("/ToUnicode"));
        // fixture advances are all 500/1000 em
        assert!(text.contains("/DW 500"));
    }

    #[test]
    fn same_attributes_share_one_font_resource() {
        let (mut doc, font) = doc_with_font();
        let page = doc.add_page(Page::new(pagesize::LETTER, Margins::empty()));
        let style_a = doc.font_attributes(font, Pt(12.0));
        let style_b = doc.font_attributes(font, Pt(12.0));
        doc.attach(
            page,
            RenderObject::Text(TextRun::new("one", Pt(10.0), Pt(700.0), style_a)),
        )
        .unwrap();
        doc.attach(
            page,
            RenderObject::Text(TextRun::new("two", Pt(10.0), Pt(650.0), style_b)),
        )
        .unwrap();
        let mut out = Vec::new();
        doc.save(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        let first = text.find("/Font << /F").unwrap();
        assert_eq!(text[first + 1..].find("/Font << /F"), None);
        // both runs reference the same resource name
        let resources = &text[first..text[first..].find(">>").unwrap() + first];
        assert_eq!(resources.matches(" 0 R").count(), 1);
    }

    #[test]
    fn underlined_text_draws_a_rule_from_the_post_metrics() {
        let (mut doc, font) = doc_with_font();
        let page = doc.add_page(Page::new(pagesize::LETTER, Margins::empty()));
        let mut style = doc.font_attributes(font, Pt(12.0));
        style
            .set_style(crate::properties::FontStyle {
                underline: true,
                ..Default::default()
            })
            .unwrap();
        doc.attach(
            page,
            RenderObject::Text(TextRun::new("hi", Pt(10.0), Pt(700.0), style)),
        )
        .unwrap();
        let mut out = Vec::new();
        doc.save(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        // fixture post: position -100, thickness 50, 1000/em; at 12pt the
        // rule sits 1.2pt under the baseline, 0.6pt thick, one 6pt advance
        // per character
        assert!(text.contains("0.6 w"));
        assert!(text.contains("10 698.8 m"));
        assert!(text.contains("22 698.8 l\nS"));
    }

    #[test]
    fn rotated_text_emits_a_matrix_instead_of_a_position() {
        let (mut doc, font) = doc_with_font();
        let page = doc.add_page(Page::new(pagesize::LETTER, Margins::empty()));
        let mut style = doc.font_attributes(font, Pt(12.0));
        style.set_rotation(90.0).unwrap();
        doc.attach(
            page,
            RenderObject::Text(TextRun::new("up", Pt(10.0), Pt(700.0), style)),
        )
        .unwrap();
        let mut out = Vec::new();
        doc.save(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains(" Tm\n"));
        assert!(!text.contains(" Td\n"));
    }

    #[test]
    fn attach_to_foreign_page_fails() {
        let (mut doc, font) = doc_with_font();
        let mut other = Document::new();
        let foreign = other.add_page(Page::new(pagesize::LETTER, Margins::empty()));
        let style = doc.font_attributes(font, Pt(12.0));
        let err = doc
            .attach(
                foreign,
                RenderObject::Text(TextRun::new("x", Pt(0.0), Pt(0.0), style)),
            )
            .unwrap_err();
        assert!(matches!(err, PDFError::StructuralGraph(_)));
    }

    #[test]
    fn container_transforms_reach_the_content_stream() {
        let (mut doc, font) = doc_with_font();
        let page = doc.add_page(Page::new(
            pagesize::LETTER,
            Margins::all(Pt(36.0)),
        ));
        let style = doc.font_attributes(font, Pt(12.0));
        let mut inner = Container::new(Pt(100.0), Pt(100.0))
            .with_transform(Transform::translation(Pt(50.0), Pt(20.0)));
        inner.attach(
            RenderObject::Text(TextRun::new("deep", Pt(1.0), Pt(2.0), style)),
            &mut doc.properties,
        );
        doc.attach(page, RenderObject::Container(inner)).unwrap();
        let mut out = Vec::new();
        doc.save(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        // page margin (36) + container offset + run position, folded into Td
        assert!(text.contains("87 58 Td"));
    }
}
