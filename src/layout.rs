//! Greedy flow layout: wraps text runs into lines inside a chain of
//! containers, asking its provider for a fresh container whenever the
//! current one runs out of vertical room.
//!
//! A layout moves through three states: `Init` (created, no container bound
//! yet), `Open` (laying out content), and `Closed` (finalized, containers
//! handed back). [Document::save][crate::Document::save] refuses to run
//! while any layout opened through it is still un-closed.

use crate::{
    container::{Container, RenderObject, TextRun},
    document::Document,
    properties::FontAttributes,
    PDFError, Pt,
};
use std::cell::Cell;
use std::rc::Rc;

/// Supplies the next container in the chain when the current one fills up.
/// Implemented for any `FnMut() -> Container` closure.
pub trait ContainerProvider {
    fn next_container(&mut self) -> Container;
}

impl<F: FnMut() -> Container> ContainerProvider for F {
    fn next_container(&mut self) -> Container {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowState {
    Init,
    Open,
    Closed,
}

pub struct FlowLayout<P: ContainerProvider> {
    provider: P,
    state: FlowState,
    current: Option<Container>,
    filled: Vec<Container>,
    /// horizontal pen position from the container's left edge
    cursor_x: Pt,
    /// vertical distance consumed from the container's top edge
    cursor_y: Pt,
    open_layouts: Rc<Cell<usize>>,
}

impl<P: ContainerProvider> Drop for FlowLayout<P> {
    fn drop(&mut self) {
        // a layout dropped without close() can never add content again, so
        // it stops counting against the save guard
        if self.state != FlowState::Closed {
            self.open_layouts.set(self.open_layouts.get() - 1);
        }
    }
}

impl<P: ContainerProvider> FlowLayout<P> {
    pub(crate) fn new(provider: P, open_layouts: Rc<Cell<usize>>) -> FlowLayout<P> {
        open_layouts.set(open_layouts.get() + 1);
        FlowLayout {
            provider,
            state: FlowState::Init,
            current: None,
            filled: Vec::new(),
            cursor_x: Pt::ZERO,
            cursor_y: Pt::ZERO,
            open_layouts,
        }
    }

    /// Bind the first container from the provider and start accepting
    /// content.
    pub fn open(&mut self) -> Result<(), PDFError> {
        if self.state != FlowState::Init {
            return Err(PDFError::LayoutState(
                "layout manager was already opened".to_string(),
            ));
        }
        self.current = Some(self.provider.next_container());
        self.state = FlowState::Open;
        Ok(())
    }

    /// Lay out a text run at the cursor, wrapping greedily at the last
    /// space whenever a character would overrun the container's width.
    /// Newlines in the run force a break and are consumed, not emitted.
    pub fn add(&mut self, run: TextRun, doc: &mut Document) -> Result<(), PDFError> {
        if self.state != FlowState::Open {
            return Err(PDFError::LayoutState(
                "layout manager is not open".to_string(),
            ));
        }

        let style = run.style().clone();
        let size = style.size();
        let line_feed = style.line_feed();
        let chars: Vec<char> = run.text.chars().collect();

        // pull the metrics out up front so the font borrow ends before the
        // property table is touched
        let (ascent, widths) = {
            let font = &doc.fonts[style.font()];
            let widths: Vec<Pt> = chars.iter().map(|&ch| font.char_width(ch, size)).collect();
            (font.ascent(size), widths)
        };
        let mut start = 0;
        let mut i = 0;
        let mut width = self.cursor_x;
        // index just past the most recent space on this line, if any
        let mut candidate: Option<usize> = None;
        let mut wrapped = false;

        while i < chars.len() {
            let ch = chars[i];
            if ch == '\n' {
                let x = if start == 0 && !wrapped {
                    self.cursor_x
                } else {
                    Pt::ZERO
                };
                self.emit(&chars[start..i], x, &style, ascent, doc);
                self.line_feed(line_feed);
                start = i + 1;
                i = start;
                width = self.cursor_x;
                candidate = None;
                wrapped = true;
                continue;
            }

            let w = widths[i];
            // spaces are allowed to hang past the right edge
            if ch != ' ' && width + w > self.container().width {
                let x = if start == 0 && !wrapped {
                    self.cursor_x
                } else {
                    Pt::ZERO
                };
                match candidate {
                    Some(b) if b > start => {
                        self.emit(&chars[start..b], x, &style, ascent, doc);
                        start = b;
                    }
                    _ if i > start => {
                        self.emit(&chars[start..i], x, &style, ascent, doc);
                        start = i;
                    }
                    // earlier content already advanced the cursor on this
                    // line, so wrap without consuming anything
                    _ if self.cursor_x > Pt::ZERO && !wrapped => {}
                    _ => {
                        // a single character wider than the container still
                        // makes forward progress: force it onto its own line
                        self.emit(&chars[start..=i], x, &style, ascent, doc);
                        start = i + 1;
                    }
                }
                self.line_feed(line_feed);
                i = start;
                width = self.cursor_x;
                candidate = None;
                wrapped = true;
                continue;
            }

            width += w;
            if ch == ' ' {
                candidate = Some(i + 1);
            }
            i += 1;
        }

        if !wrapped {
            // the whole run fit; reuse it at the cursor rather than copying
            let mut run = run;
            run.x = self.cursor_x;
            run.y = self.baseline(ascent);
            let container = self.current.as_mut().unwrap();
            container.attach(RenderObject::Text(run), &mut doc.properties);
        } else if start < chars.len() {
            self.emit(&chars[start..], Pt::ZERO, &style, ascent, doc);
        }
        self.cursor_x = width;
        Ok(())
    }

    /// Finalize the layout and hand back every container it filled, in
    /// order. Attach them to a page to render them.
    pub fn close(mut self) -> Result<Vec<Container>, PDFError> {
        if self.state != FlowState::Open {
            return Err(PDFError::LayoutState(
                "layout manager is not open".to_string(),
            ));
        }
        self.state = FlowState::Closed;
        self.open_layouts.set(self.open_layouts.get() - 1);
        let mut containers = std::mem::take(&mut self.filled);
        if let Some(current) = self.current.take() {
            containers.push(current);
        }
        Ok(containers)
    }

    fn container(&self) -> &Container {
        self.current.as_ref().unwrap()
    }

    fn baseline(&self, ascent: Pt) -> Pt {
        self.container().height - self.cursor_y - ascent
    }

    fn emit(
        &mut self,
        chars: &[char],
        x: Pt,
        style: &FontAttributes,
        ascent: Pt,
        doc: &mut Document,
    ) {
        // the space a line broke at is not carried onto either line
        let mut end = chars.len();
        while end > 0 && chars[end - 1] == ' ' {
            end -= 1;
        }
        if end == 0 {
            return;
        }
        let text: String = chars[..end].iter().collect();
        let run = TextRun::new(text, x, self.baseline(ascent), style.clone());
        let container = self.current.as_mut().unwrap();
        container.attach(RenderObject::Text(run), &mut doc.properties);
    }

    /// Reset to the left edge and move down one line, rolling over to a
    /// fresh container when the current one has no room left.
    fn line_feed(&mut self, line_feed: Pt) {
        self.cursor_x = Pt::ZERO;
        if self.cursor_y + line_feed > self.container().height {
            let full = self.current.take().unwrap();
            self.filled.push(full);
            self.current = Some(self.provider.next_container());
            self.cursor_y = Pt::ZERO;
        } else {
            self.cursor_y += line_feed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Font;
    use crate::sfnt::fixtures::FontFixture;
    use crate::Document;

    // the fixture face maps space and a..z with every advance 500/1000 em,
    // so at 20pt every character is 10pt wide
    fn test_doc() -> (Document, id_arena::Id<Font>) {
        let mut doc = Document::default();
        let font = Font::from_bytes(FontFixture::default().build(), 0).unwrap();
        let id = doc.add_font(font);
        (doc, id)
    }

    fn style(doc: &Document, id: id_arena::Id<Font>) -> FontAttributes {
        FontAttributes::new(id, &doc.fonts[id], Pt(20.0))
    }

    fn texts(containers: &[Container]) -> Vec<Vec<(String, f32, f32)>> {
        containers
            .iter()
            .map(|c| {
                c.children()
                    .iter()
                    .map(|child| match child {
                        RenderObject::Text(run) => (run.text.clone(), *run.x, *run.y),
                        other => panic!("unexpected child: {other:?}"),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn run_that_fits_is_kept_whole() {
        let (mut doc, id) = test_doc();
        let style = style(&doc, id);
        let mut layout = doc.open_layout(|| Container::new(Pt(100.0), Pt(200.0)));
        layout.open().unwrap();
        layout
            .add(TextRun::new("ab cd", Pt::ZERO, Pt::ZERO, style), &mut doc)
            .unwrap();
        let containers = layout.close().unwrap();
        let lines = texts(&containers);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 1);
        assert_eq!(lines[0][0].0, "ab cd");
        assert_eq!(lines[0][0].1, 0.0);
        // baseline sits one ascent below the top: 200 - 0 - 20 * 800/1000
        assert_eq!(lines[0][0].2, 184.0);
    }

    #[test]
    fn wraps_at_last_space() {
        let (mut doc, id) = test_doc();
        let style = style(&doc, id);
        let mut layout = doc.open_layout(|| Container::new(Pt(25.0), Pt(200.0)));
        layout.open().unwrap();
        layout
            .add(TextRun::new("ab cd", Pt::ZERO, Pt::ZERO, style.clone()), &mut doc)
            .unwrap();
        let containers = layout.close().unwrap();
        let lines = texts(&containers);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 2);
        assert_eq!(lines[0][0].0, "ab");
        assert_eq!(lines[0][1].0, "cd");
        // both lines restart at the left edge, one line feed (2 * 20) apart
        assert_eq!(lines[0][1].1, 0.0);
        assert_eq!(lines[0][0].2 - lines[0][1].2, 40.0);
    }

    #[test]
    fn newline_is_consumed_not_emitted() {
        let (mut doc, id) = test_doc();
        let style = style(&doc, id);
        let mut layout = doc.open_layout(|| Container::new(Pt(500.0), Pt(200.0)));
        layout.open().unwrap();
        layout
            .add(TextRun::new("ab\ncd", Pt::ZERO, Pt::ZERO, style), &mut doc)
            .unwrap();
        let containers = layout.close().unwrap();
        let lines = texts(&containers);
        assert_eq!(lines[0].len(), 2);
        assert_eq!(lines[0][0].0, "ab");
        assert_eq!(lines[0][1].0, "cd");
    }

    #[test]
    fn oversized_character_still_advances() {
        let (mut doc, id) = test_doc();
        let style = style(&doc, id);
        // 5pt wide container, 10pt characters
        let mut layout = doc.open_layout(|| Container::new(Pt(5.0), Pt(500.0)));
        layout.open().unwrap();
        layout
            .add(TextRun::new("abc", Pt::ZERO, Pt::ZERO, style), &mut doc)
            .unwrap();
        let containers = layout.close().unwrap();
        let lines = texts(&containers);
        assert_eq!(lines[0].len(), 3);
        assert_eq!(lines[0][0].0, "a");
        assert_eq!(lines[0][1].0, "b");
        assert_eq!(lines[0][2].0, "c");
    }

    #[test]
    fn requests_new_container_when_out_of_room() {
        let (mut doc, id) = test_doc();
        let style = style(&doc, id);
        // room for two 40pt lines per container
        let mut layout = doc.open_layout(|| Container::new(Pt(25.0), Pt(70.0)));
        layout.open().unwrap();
        layout
            .add(TextRun::new("ab cd ef gh", Pt::ZERO, Pt::ZERO, style), &mut doc)
            .unwrap();
        let containers = layout.close().unwrap();
        let lines = texts(&containers);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 2);
        assert_eq!(lines[1].len(), 2);
        assert_eq!(lines[1][0].0, "ef");
        assert_eq!(lines[1][1].0, "gh");
    }

    #[test]
    fn add_requires_open_state() {
        let (mut doc, id) = test_doc();
        let style = style(&doc, id);
        let mut layout = doc.open_layout(|| Container::new(Pt(25.0), Pt(80.0)));
        let err = layout
            .add(TextRun::new("ab", Pt::ZERO, Pt::ZERO, style), &mut doc)
            .unwrap_err();
        assert!(matches!(err, PDFError::LayoutState(_)));
    }

    #[test]
    fn unclosed_layout_blocks_save() {
        let (doc, _) = test_doc();
        let layout = doc.open_layout(|| Container::new(Pt(25.0), Pt(80.0)));
        let mut out: Vec<u8> = Vec::new();
        let err = doc.save(&mut out).unwrap_err();
        assert!(matches!(err, PDFError::LayoutState(_)));
        drop(layout);
    }
}
