use pdf_loom::pagesize;
use pdf_loom::{Container, Document, Info, Margins, Page, Pt, RenderObject, TextRun};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let font_path = std::env::args()
        .nth(1)
        .expect("usage: lorem <font.ttf> [out.pdf]");
    let out_path = std::env::args().nth(2).unwrap_or_else(|| "lorem.pdf".into());

    let mut doc = Document::new();
    let font = doc.add_font(pdf_loom::Font::load_file(&font_path, 0)?);

    let mut info = Info::new();
    info.title("Lorem Ipsum").author("pdf-loom");
    doc.set_info(info);

    let margins = Margins::all(Pt::from_inches(1.0));
    let content = Page::new(pagesize::A4, margins.clone()).content_box;
    let (width, height) = (content.width(), content.height());

    let mut layout = doc.open_layout(move || Container::new(width, height));
    layout.open()?;

    let title = doc.font_attributes(font, Pt(24.0));
    layout.add(
        TextRun::new("Lorem Ipsum\n", Pt::ZERO, Pt::ZERO, title),
        &mut doc,
    )?;

    let body = doc.font_attributes(font, Pt(12.0));
    for _ in 0..4 {
        let paragraph = format!("{}\n\n", lipsum::lipsum(200));
        layout.add(
            TextRun::new(paragraph, Pt::ZERO, Pt::ZERO, body.clone()),
            &mut doc,
        )?;
    }

    for container in layout.close()? {
        let page = doc.add_page(Page::new(pagesize::A4, margins.clone()));
        doc.attach(page, RenderObject::Container(container))?;
    }

    doc.save(std::fs::File::create(&out_path)?)?;
    println!("wrote {out_path}");
    Ok(())
}
