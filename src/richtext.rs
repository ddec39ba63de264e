//! Rich text document model behind the task description field.
//!
//! The document is a sequence of blocks (paragraphs, headings, code blocks)
//! holding bold/italic-marked spans. Serialization targets the HTML subset
//! the server stores: `<p>`, `<h1>`-`<h3>`, `<pre><code>`, `<strong>`,
//! `<em>`, with `& < > "` entity-escaped. The same subset is parsed back
//! when hydrating a stored description.
//!
//! The model owns content and cursor only; key handling and drawing live in
//! [`crate::tui::editor`]. All mutations are no-ops in view mode, and a
//! programmatic [`RichText::set_value`] never raises the change flag, so a
//! view-mode field can never emit.

/// Interaction mode, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Edit,
    View,
}

/// Block-level element kind. Heading levels are clamped to 1..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    Code,
}

/// A run of text with uniform inline marks. Code blocks carry a single
/// unmarked span and may contain raw newlines.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub spans: Vec<Span>,
}

impl Block {
    fn empty(kind: BlockKind) -> Self {
        Block {
            kind,
            spans: Vec::new(),
        }
    }

    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn char_len(&self) -> usize {
        self.spans.iter().map(|s| s.text.chars().count()).sum()
    }

    fn explode(&self) -> Vec<(char, bool, bool)> {
        self.spans
            .iter()
            .flat_map(|s| s.text.chars().map(move |c| (c, s.bold, s.italic)))
            .collect()
    }

    /// Regroup a char sequence into spans, merging adjacent equal marks.
    fn rebuild(kind: BlockKind, chars: Vec<(char, bool, bool)>) -> Self {
        let mut spans: Vec<Span> = Vec::new();
        for (c, bold, italic) in chars {
            match spans.last_mut() {
                Some(last) if last.bold == bold && last.italic == italic => last.text.push(c),
                _ => spans.push(Span {
                    text: c.to_string(),
                    bold,
                    italic,
                }),
            }
        }
        Block { kind, spans }
    }
}

/// The editable document plus cursor and pending inline marks.
#[derive(Debug, Clone)]
pub struct RichText {
    mode: EditorMode,
    blocks: Vec<Block>,
    row: usize,
    col: usize,
    bold_on: bool,
    italic_on: bool,
    changed: bool,
}

impl RichText {
    pub fn new(mode: EditorMode) -> Self {
        RichText {
            mode,
            blocks: vec![Block::empty(BlockKind::Paragraph)],
            row: 0,
            col: 0,
            bold_on: false,
            italic_on: false,
            changed: false,
        }
    }

    pub fn with_value(mode: EditorMode, html: &str) -> Self {
        let mut field = RichText::new(mode);
        field.set_value(html);
        field
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Cursor as (block index, char offset within the block).
    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn bold_pending(&self) -> bool {
        self.bold_on
    }

    pub fn italic_pending(&self) -> bool {
        self.italic_on
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.spans.is_empty())
    }

    fn editable(&self) -> bool {
        self.mode == EditorMode::Edit
    }

    fn block(&self) -> &Block {
        &self.blocks[self.row]
    }

    fn in_code(&self) -> bool {
        self.block().kind == BlockKind::Code
    }

    // -- mutations -----------------------------------------------------------

    pub fn insert_char(&mut self, c: char) {
        if !self.editable() {
            return;
        }
        let (bold, italic) = if self.in_code() {
            (false, false)
        } else {
            (self.bold_on, self.italic_on)
        };
        let kind = self.block().kind;
        let mut chars = self.block().explode();
        let at = self.col.min(chars.len());
        chars.insert(at, (c, bold, italic));
        self.blocks[self.row] = Block::rebuild(kind, chars);
        self.col = at + 1;
        self.changed = true;
    }

    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            self.insert_char(c);
        }
    }

    /// Enter: a literal newline inside a code block, otherwise the block is
    /// split at the cursor and the remainder becomes a new paragraph.
    pub fn newline(&mut self) {
        if !self.editable() {
            return;
        }
        if self.in_code() {
            self.insert_char('\n');
            return;
        }
        let kind = self.block().kind;
        let mut chars = self.block().explode();
        let at = self.col.min(chars.len());
        let tail = chars.split_off(at);
        self.blocks[self.row] = Block::rebuild(kind, chars);
        self.blocks
            .insert(self.row + 1, Block::rebuild(BlockKind::Paragraph, tail));
        self.row += 1;
        self.col = 0;
        self.changed = true;
    }

    /// Backspace: remove the char before the cursor, or merge the current
    /// block into the previous one when at column zero.
    pub fn backspace(&mut self) {
        if !self.editable() {
            return;
        }
        if self.col > 0 {
            let kind = self.block().kind;
            let mut chars = self.block().explode();
            let at = (self.col - 1).min(chars.len().saturating_sub(1));
            chars.remove(at);
            self.blocks[self.row] = Block::rebuild(kind, chars);
            self.col = at;
            self.changed = true;
        } else if self.row > 0 {
            let removed = self.blocks.remove(self.row);
            self.row -= 1;
            let prev = &self.blocks[self.row];
            let col = prev.char_len();
            let kind = prev.kind;
            let mut chars = prev.explode();
            if kind == BlockKind::Code {
                // Merged text loses its marks inside a code block.
                chars.extend(removed.text().chars().map(|c| (c, false, false)));
            } else {
                chars.extend(removed.explode());
            }
            self.blocks[self.row] = Block::rebuild(kind, chars);
            self.col = col;
            self.changed = true;
        }
    }

    pub fn toggle_bold(&mut self) {
        if self.editable() && !self.in_code() {
            self.bold_on = !self.bold_on;
        }
    }

    pub fn toggle_italic(&mut self) {
        if self.editable() && !self.in_code() {
            self.italic_on = !self.italic_on;
        }
    }

    /// Toggle the block at the cursor between code and paragraph form.
    /// Entering a code block flattens inline marks; leaving one splits the
    /// text on newlines into consecutive paragraphs.
    pub fn toggle_code(&mut self) {
        if !self.editable() {
            return;
        }
        if self.in_code() {
            self.code_to_paragraphs();
        } else {
            let text = self.block().text();
            let chars = text.chars().map(|c| (c, false, false)).collect();
            self.blocks[self.row] = Block::rebuild(BlockKind::Code, chars);
            self.changed = true;
        }
    }

    fn code_to_paragraphs(&mut self) {
        let text = self.block().text();
        let lines: Vec<&str> = text.split('\n').collect();

        // Keep the cursor on the same character across the split.
        let mut line_idx = 0;
        let mut line_col = self.col;
        for (i, line) in lines.iter().enumerate() {
            let len = line.chars().count();
            line_idx = i;
            if line_col <= len {
                break;
            }
            line_col -= len + 1;
        }

        let replacements: Vec<Block> = lines
            .iter()
            .map(|line| Block::rebuild(BlockKind::Paragraph, line.chars().map(|c| (c, false, false)).collect()))
            .collect();
        let row = self.row;
        self.blocks.splice(row..=row, replacements);
        self.row = row + line_idx;
        self.col = line_col.min(self.blocks[self.row].char_len());
        self.changed = true;
    }

    /// Demote the block at the cursor to a plain paragraph.
    pub fn set_paragraph(&mut self) {
        if !self.editable() {
            return;
        }
        match self.block().kind {
            BlockKind::Paragraph => {}
            BlockKind::Code => self.code_to_paragraphs(),
            BlockKind::Heading(_) => {
                self.blocks[self.row].kind = BlockKind::Paragraph;
                self.changed = true;
            }
        }
    }

    /// Toggle the block at the cursor to/from the given heading level.
    /// Inside a code block this does nothing; demote it first.
    pub fn toggle_heading(&mut self, level: u8) {
        if !self.editable() || self.in_code() {
            return;
        }
        let level = level.clamp(1, 3);
        self.blocks[self.row].kind = match self.block().kind {
            BlockKind::Heading(current) if current == level => BlockKind::Paragraph,
            _ => BlockKind::Heading(level),
        };
        self.changed = true;
    }

    // -- cursor --------------------------------------------------------------

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = self.block().char_len();
        }
    }

    pub fn move_right(&mut self) {
        if self.col < self.block().char_len() {
            self.col += 1;
        } else if self.row + 1 < self.blocks.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.col = self.col.min(self.block().char_len());
        }
    }

    pub fn move_down(&mut self) {
        if self.row + 1 < self.blocks.len() {
            self.row += 1;
            self.col = self.col.min(self.block().char_len());
        }
    }

    pub fn move_home(&mut self) {
        self.col = 0;
    }

    pub fn move_end(&mut self) {
        self.col = self.block().char_len();
    }

    // -- value in/out --------------------------------------------------------

    /// Serialize the document to its HTML subset.
    pub fn html(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block.kind {
                BlockKind::Paragraph => {
                    out.push_str("<p>");
                    render_spans(&mut out, &block.spans);
                    out.push_str("</p>");
                }
                BlockKind::Heading(level) => {
                    out.push_str(&format!("<h{level}>"));
                    render_spans(&mut out, &block.spans);
                    out.push_str(&format!("</h{level}>"));
                }
                BlockKind::Code => {
                    out.push_str("<pre><code>");
                    out.push_str(&escape(&block.text()));
                    out.push_str("</code></pre>");
                }
            }
        }
        out
    }

    /// Adopt an externally supplied value. When it equals the current
    /// serialization this is a no-op and the cursor stays put; otherwise the
    /// document is reparsed and the cursor clamped. Never raises the change
    /// flag.
    pub fn set_value(&mut self, html: &str) {
        if html == self.html() {
            return;
        }
        self.blocks = parse_html(html);
        self.row = self.row.min(self.blocks.len() - 1);
        self.col = self.col.min(self.block().char_len());
    }

    /// Drain the pending change: the serialized document if a user mutation
    /// happened since the last drain, `None` otherwise (always `None` in
    /// view mode, where mutations are inert).
    pub fn take_change(&mut self) -> Option<String> {
        if !self.changed {
            return None;
        }
        self.changed = false;
        Some(self.html())
    }
}

fn render_spans(out: &mut String, spans: &[Span]) {
    for span in spans {
        if span.text.is_empty() {
            continue;
        }
        if span.bold {
            out.push_str("<strong>");
        }
        if span.italic {
            out.push_str("<em>");
        }
        out.push_str(&escape(&span.text));
        if span.italic {
            out.push_str("</em>");
        }
        if span.bold {
            out.push_str("</strong>");
        }
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "#39" | "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => None,
    }
}

/// Parse the HTML subset back into blocks. Unknown tags are skipped, text
/// outside any block opens an implicit paragraph, and an unparseable or
/// empty document yields a single empty paragraph.
fn parse_html(input: &str) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut kind: Option<BlockKind> = None;
    let mut chars: Vec<(char, bool, bool)> = Vec::new();
    let mut bold = 0usize;
    let mut italic = 0usize;

    let mut close_block = |kind: &mut Option<BlockKind>, chars: &mut Vec<(char, bool, bool)>, blocks: &mut Vec<Block>| {
        if let Some(k) = kind.take() {
            blocks.push(Block::rebuild(k, std::mem::take(chars)));
        }
    };

    let mut push_text = |text: &str, kind: &mut Option<BlockKind>, chars: &mut Vec<(char, bool, bool)>, bold: usize, italic: usize| {
        let mut rest = text;
        while !rest.is_empty() {
            let c;
            if let Some(tail) = rest.strip_prefix('&') {
                if let Some(semi) = tail.find(';') {
                    if let Some(decoded) = decode_entity(&tail[..semi]) {
                        c = decoded;
                        rest = &tail[semi + 1..];
                    } else {
                        c = '&';
                        rest = tail;
                    }
                } else {
                    c = '&';
                    rest = tail;
                }
            } else {
                let mut it = rest.chars();
                c = it.next().unwrap();
                rest = it.as_str();
            }

            let in_code = *kind == Some(BlockKind::Code);
            if kind.is_none() {
                if c.is_whitespace() {
                    continue;
                }
                *kind = Some(BlockKind::Paragraph);
            }
            let c = if !in_code && (c == '\n' || c == '\t') { ' ' } else { c };
            chars.push((c, bold > 0 && !in_code, italic > 0 && !in_code));
        }
    };

    let mut rest = input;
    while !rest.is_empty() {
        match rest.find('<') {
            Some(lt) => {
                let (text, tail) = rest.split_at(lt);
                push_text(text, &mut kind, &mut chars, bold, italic);
                let Some(gt) = tail.find('>') else {
                    push_text(tail, &mut kind, &mut chars, bold, italic);
                    break;
                };
                let raw = tail[1..gt].trim();
                let closing = raw.starts_with('/');
                let name = raw
                    .trim_start_matches('/')
                    .trim_end_matches('/')
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_ascii_lowercase();
                match (name.as_str(), closing) {
                    ("p", false) => {
                        close_block(&mut kind, &mut chars, &mut blocks);
                        kind = Some(BlockKind::Paragraph);
                    }
                    ("h1" | "h2" | "h3", false) => {
                        close_block(&mut kind, &mut chars, &mut blocks);
                        let level = name.as_bytes()[1] - b'0';
                        kind = Some(BlockKind::Heading(level));
                    }
                    ("pre", false) => {
                        close_block(&mut kind, &mut chars, &mut blocks);
                        kind = Some(BlockKind::Code);
                    }
                    ("p" | "h1" | "h2" | "h3" | "pre", true) => {
                        close_block(&mut kind, &mut chars, &mut blocks);
                    }
                    ("strong" | "b", false) => bold += 1,
                    ("strong" | "b", true) => bold = bold.saturating_sub(1),
                    ("em" | "i", false) => italic += 1,
                    ("em" | "i", true) => italic = italic.saturating_sub(1),
                    ("br", _) => {
                        if kind == Some(BlockKind::Code) {
                            chars.push(('\n', false, false));
                        }
                    }
                    _ => {}
                }
                rest = &tail[gt + 1..];
            }
            None => {
                push_text(rest, &mut kind, &mut chars, bold, italic);
                break;
            }
        }
    }
    close_block(&mut kind, &mut chars, &mut blocks);

    if blocks.is_empty() {
        blocks.push(Block::empty(BlockKind::Paragraph));
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit() -> RichText {
        RichText::new(EditorMode::Edit)
    }

    #[test]
    fn test_empty_document_serializes_to_empty_paragraph() {
        assert_eq!(edit().html(), "<p></p>");
        assert!(edit().is_empty());
    }

    #[test]
    fn test_plain_typing() {
        let mut field = edit();
        field.insert_str("merhaba");
        assert_eq!(field.html(), "<p>merhaba</p>");
        assert_eq!(field.cursor(), (0, 7));
    }

    #[test]
    fn test_bold_toggle_is_idempotent() {
        let mut field = edit();
        field.insert_str("a");
        field.toggle_bold();
        field.insert_str("bc");
        field.toggle_bold();
        field.insert_str("d");
        assert_eq!(field.html(), "<p>a<strong>bc</strong>d</p>");

        // Toggling twice with nothing typed in between changes nothing.
        field.toggle_bold();
        field.toggle_bold();
        field.insert_str("e");
        assert_eq!(field.html(), "<p>a<strong>bc</strong>de</p>");
    }

    #[test]
    fn test_nested_marks_bold_wraps_italic() {
        let mut field = edit();
        field.toggle_bold();
        field.toggle_italic();
        field.insert_str("xy");
        assert_eq!(field.html(), "<p><strong><em>xy</em></strong></p>");
    }

    #[test]
    fn test_adjacent_equal_marks_merge() {
        let mut field = edit();
        field.toggle_bold();
        field.insert_str("ab");
        field.insert_str("cd");
        assert_eq!(field.blocks()[0].spans.len(), 1);
        assert_eq!(field.html(), "<p><strong>abcd</strong></p>");
    }

    #[test]
    fn test_heading_toggle_returns_to_paragraph() {
        let mut field = edit();
        field.insert_str("Plan");
        field.toggle_heading(2);
        assert_eq!(field.html(), "<h2>Plan</h2>");
        field.toggle_heading(2);
        assert_eq!(field.html(), "<p>Plan</p>");
        field.toggle_heading(1);
        field.toggle_heading(3);
        assert_eq!(field.html(), "<h3>Plan</h3>");
    }

    #[test]
    fn test_code_block_round_trip_preserves_cursor_line() {
        let mut field = edit();
        field.insert_str("one");
        field.toggle_code();
        field.newline();
        field.insert_str("two");
        assert_eq!(field.html(), "<pre><code>one\ntwo</code></pre>");

        // Cursor sits after "two"; leaving the code block lands on the
        // second paragraph at the same offset.
        field.toggle_code();
        assert_eq!(field.html(), "<p>one</p><p>two</p>");
        assert_eq!(field.cursor(), (1, 3));
    }

    #[test]
    fn test_code_block_flattens_marks() {
        let mut field = edit();
        field.toggle_bold();
        field.insert_str("ab");
        field.toggle_code();
        assert_eq!(field.html(), "<pre><code>ab</code></pre>");
        field.insert_str("!");
        assert_eq!(field.html(), "<pre><code>ab!</code></pre>");
    }

    #[test]
    fn test_newline_splits_and_backspace_merges() {
        let mut field = edit();
        field.insert_str("abcd");
        field.move_left();
        field.move_left();
        field.newline();
        assert_eq!(field.html(), "<p>ab</p><p>cd</p>");
        assert_eq!(field.cursor(), (1, 0));
        field.backspace();
        assert_eq!(field.html(), "<p>abcd</p>");
        assert_eq!(field.cursor(), (0, 2));
    }

    #[test]
    fn test_escaping() {
        let mut field = edit();
        field.insert_str("a<b> & \"c\"");
        assert_eq!(field.html(), "<p>a&lt;b&gt; &amp; &quot;c&quot;</p>");
    }

    #[test]
    fn test_parse_round_trip() {
        let html = "<h2>Plan</h2><p>a <strong>b</strong> <em>c</em></p><pre><code>x\ny</code></pre>";
        let field = RichText::with_value(EditorMode::Edit, html);
        assert_eq!(field.html(), html);
    }

    #[test]
    fn test_parse_decodes_entities_and_skips_unknown_tags() {
        let field = RichText::with_value(
            EditorMode::Edit,
            "<p><span class=\"x\">a &amp; b</span> &lt;ok&gt;</p>",
        );
        assert_eq!(field.blocks()[0].text(), "a & b <ok>");
    }

    #[test]
    fn test_equal_resupply_keeps_cursor() {
        let mut field = edit();
        field.insert_str("abc");
        field.move_left();
        let value = field.take_change().unwrap();
        field.set_value(&value);
        assert_eq!(field.cursor(), (0, 2));
    }

    #[test]
    fn test_different_resupply_reparses_and_clamps_cursor() {
        let mut field = edit();
        field.insert_str("uzun bir satır");
        field.set_value("<p>kısa</p>");
        assert_eq!(field.blocks()[0].text(), "kısa");
        let (row, col) = field.cursor();
        assert_eq!(row, 0);
        assert!(col <= 4);
    }

    #[test]
    fn test_take_change_drains_once() {
        let mut field = edit();
        assert_eq!(field.take_change(), None);
        field.insert_char('a');
        assert_eq!(field.take_change(), Some("<p>a</p>".to_string()));
        assert_eq!(field.take_change(), None);
    }

    #[test]
    fn test_view_mode_is_inert() {
        let mut field = RichText::with_value(EditorMode::View, "<p>sabit</p>");
        field.insert_str("x");
        field.toggle_bold();
        field.toggle_heading(1);
        field.backspace();
        assert_eq!(field.html(), "<p>sabit</p>");
        assert_eq!(field.take_change(), None);

        // Programmatic value changes never emit either.
        field.set_value("<p>yeni</p>");
        assert_eq!(field.take_change(), None);
        assert_eq!(field.blocks()[0].text(), "yeni");
    }
}
