//! Key handling and rendering for the rich-text description field.
//!
//! Wraps a [`RichText`] document for use inside a form screen. Formatting
//! shortcuts are Ctrl+b / Ctrl+i / Ctrl+k (bold, italic, code block) and
//! Alt+1..3 / Alt+0 (heading level, back to paragraph); all of them consume
//! the key event. Tab and Esc are left alone so the screen can move focus.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::richtext::{Block, BlockKind, EditorMode, RichText};
use crate::tui::colors;

#[derive(Debug)]
pub struct DescriptionEditor {
    doc: RichText,
}

impl DescriptionEditor {
    pub fn new() -> Self {
        DescriptionEditor {
            doc: RichText::new(EditorMode::Edit),
        }
    }

    /// Editor hydrated from a server-held HTML description.
    pub fn with_value(html: &str) -> Self {
        DescriptionEditor {
            doc: RichText::with_value(EditorMode::Edit, html),
        }
    }

    pub fn doc(&self) -> &RichText {
        &self.doc
    }

    /// Serialized HTML produced since the last call, if any.
    pub fn take_change(&mut self) -> Option<String> {
        self.doc.take_change()
    }

    /// Short indicator of pending marks, e.g. `B I` while both are on.
    pub fn marks_hint(&self) -> String {
        let mut parts = Vec::new();
        if self.doc.bold_pending() {
            parts.push("B");
        }
        if self.doc.italic_pending() {
            parts.push("I");
        }
        parts.join(" ")
    }

    /// Feed a key event; returns true when the editor consumed it.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('b') => {
                    self.doc.toggle_bold();
                    true
                }
                KeyCode::Char('i') => {
                    self.doc.toggle_italic();
                    true
                }
                KeyCode::Char('k') => {
                    self.doc.toggle_code();
                    true
                }
                _ => false,
            };
        }
        if key.modifiers.contains(KeyModifiers::ALT) {
            return match key.code {
                KeyCode::Char('1') => {
                    self.doc.toggle_heading(1);
                    true
                }
                KeyCode::Char('2') => {
                    self.doc.toggle_heading(2);
                    true
                }
                KeyCode::Char('3') => {
                    self.doc.toggle_heading(3);
                    true
                }
                KeyCode::Char('0') => {
                    self.doc.set_paragraph();
                    true
                }
                _ => false,
            };
        }
        match key.code {
            KeyCode::Char(c) => self.doc.insert_char(c),
            KeyCode::Enter => self.doc.newline(),
            KeyCode::Backspace => self.doc.backspace(),
            KeyCode::Left => self.doc.move_left(),
            KeyCode::Right => self.doc.move_right(),
            KeyCode::Up => self.doc.move_up(),
            KeyCode::Down => self.doc.move_down(),
            KeyCode::Home => self.doc.move_home(),
            KeyCode::End => self.doc.move_end(),
            _ => return false,
        }
        true
    }

    /// Render the document as styled lines. When `focused`, the cursor cell
    /// is drawn reversed.
    pub fn lines(&self, focused: bool) -> Vec<Line<'static>> {
        let (crow, ccol) = self.doc.cursor();
        let mut out = Vec::new();
        for (i, block) in self.doc.blocks().iter().enumerate() {
            let cursor = (focused && i == crow).then_some(ccol);
            match block.kind {
                BlockKind::Code => out.extend(code_lines(block, cursor)),
                _ => out.push(block_line(block, cursor)),
            }
        }
        out
    }
}

fn base_style(kind: BlockKind) -> Style {
    match kind {
        BlockKind::Heading(_) => Style::default()
            .fg(colors::ACCENT)
            .add_modifier(Modifier::BOLD),
        BlockKind::Code => Style::default().bg(colors::CODE_BG),
        BlockKind::Paragraph => Style::default(),
    }
}

/// A paragraph or heading as one line, marks applied span by span.
fn block_line(block: &Block, cursor: Option<usize>) -> Line<'static> {
    let base = base_style(block.kind);
    let mut out: Vec<Span<'static>> = Vec::new();
    let mut offset = 0usize;
    for s in &block.spans {
        let mut style = base;
        if s.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if s.italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        let len = s.text.chars().count();
        match cursor {
            Some(col) if col >= offset && col < offset + len => {
                let local = col - offset;
                let chars: Vec<char> = s.text.chars().collect();
                let before: String = chars[..local].iter().collect();
                let under = chars[local].to_string();
                let after: String = chars[local + 1..].iter().collect();
                if !before.is_empty() {
                    out.push(Span::styled(before, style));
                }
                out.push(Span::styled(under, style.add_modifier(Modifier::REVERSED)));
                if !after.is_empty() {
                    out.push(Span::styled(after, style));
                }
            }
            _ => out.push(Span::styled(s.text.clone(), style)),
        }
        offset += len;
    }
    if let Some(col) = cursor {
        if col >= offset {
            out.push(Span::styled(" ", base.add_modifier(Modifier::REVERSED)));
        }
    }
    if out.is_empty() {
        out.push(Span::styled(String::new(), base));
    }
    Line::from(out)
}

/// A code block split on its literal newlines, one rendered line each.
fn code_lines(block: &Block, cursor: Option<usize>) -> Vec<Line<'static>> {
    let style = base_style(BlockKind::Code);
    let text = block.text();
    let mut lines = Vec::new();
    let mut offset = 0usize;
    for part in text.split('\n') {
        let len = part.chars().count();
        let line = match cursor {
            Some(col) if col >= offset && col <= offset + len => {
                cursor_line(part, col - offset, style)
            }
            _ => Line::from(Span::styled(part.to_string(), style)),
        };
        lines.push(line);
        offset += len + 1;
    }
    lines
}

fn cursor_line(text: &str, col: usize, style: Style) -> Line<'static> {
    let chars: Vec<char> = text.chars().collect();
    let before: String = chars[..col.min(chars.len())].iter().collect();
    let (under, after) = if col < chars.len() {
        (
            chars[col].to_string(),
            chars[col + 1..].iter().collect::<String>(),
        )
    } else {
        (" ".to_string(), String::new())
    };
    Line::from(vec![
        Span::styled(before, style),
        Span::styled(under, style.add_modifier(Modifier::REVERSED)),
        Span::styled(after, style),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn type_str(ed: &mut DescriptionEditor, text: &str) {
        for c in text.chars() {
            assert!(ed.handle_key(&key(KeyCode::Char(c), KeyModifiers::NONE)));
        }
    }

    #[test]
    fn test_ctrl_b_is_consumed_and_bolds() {
        let mut ed = DescriptionEditor::new();
        assert!(ed.handle_key(&key(KeyCode::Char('b'), KeyModifiers::CONTROL)));
        type_str(&mut ed, "kalın");
        assert!(ed.handle_key(&key(KeyCode::Char('b'), KeyModifiers::CONTROL)));
        type_str(&mut ed, " düz");
        assert_eq!(
            ed.take_change().unwrap(),
            "<p><strong>kalın</strong> düz</p>"
        );
    }

    #[test]
    fn test_tab_and_esc_pass_through() {
        let mut ed = DescriptionEditor::new();
        assert!(!ed.handle_key(&key(KeyCode::Tab, KeyModifiers::NONE)));
        assert!(!ed.handle_key(&key(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(ed.take_change().is_none());
    }

    #[test]
    fn test_alt_digit_sets_heading() {
        let mut ed = DescriptionEditor::new();
        type_str(&mut ed, "başlık");
        assert!(ed.handle_key(&key(KeyCode::Char('2'), KeyModifiers::ALT)));
        assert_eq!(ed.take_change().unwrap(), "<h2>başlık</h2>");
        assert!(ed.handle_key(&key(KeyCode::Char('0'), KeyModifiers::ALT)));
        assert_eq!(ed.take_change().unwrap(), "<p>başlık</p>");
    }

    #[test]
    fn test_lines_draw_cursor_when_focused() {
        let mut ed = DescriptionEditor::new();
        type_str(&mut ed, "ab");
        let focused = ed.lines(true);
        assert_eq!(focused.len(), 1);
        // Cursor sits past the end, rendered as a reversed space cell.
        let has_reversed = focused[0]
            .spans
            .iter()
            .any(|s| s.style.add_modifier.contains(Modifier::REVERSED));
        assert!(has_reversed);
        let unfocused = ed.lines(false);
        let has_reversed = unfocused[0]
            .spans
            .iter()
            .any(|s| s.style.add_modifier.contains(Modifier::REVERSED));
        assert!(!has_reversed);
    }

    #[test]
    fn test_code_block_renders_one_line_per_newline() {
        let mut ed = DescriptionEditor::new();
        type_str(&mut ed, "birinci");
        assert!(ed.handle_key(&key(KeyCode::Char('k'), KeyModifiers::CONTROL)));
        assert!(ed.handle_key(&key(KeyCode::Enter, KeyModifiers::NONE)));
        type_str(&mut ed, "ikinci");
        assert_eq!(ed.lines(false).len(), 2);
    }
}
