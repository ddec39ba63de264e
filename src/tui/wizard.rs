//! Step engine behind the form screens.
//!
//! A wizard is an ordered, non-empty list of step titles plus a single
//! active index. Step content and state live in the owning screen; the
//! engine only decides which step is visible and renders the tab line.

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::tui::colors;

#[derive(Debug)]
pub struct Wizard {
    titles: Vec<&'static str>,
    active: usize,
}

impl Wizard {
    /// `titles` must be non-empty.
    pub fn new(titles: Vec<&'static str>) -> Self {
        assert!(!titles.is_empty(), "a wizard needs at least one step");
        Wizard { titles, active: 0 }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_last(&self) -> bool {
        self.active + 1 == self.titles.len()
    }

    /// Advance one step, clamped at the last.
    pub fn next(&mut self) {
        if self.active + 1 < self.titles.len() {
            self.active += 1;
        }
    }

    /// Retreat one step, clamped at zero.
    pub fn prev(&mut self) {
        self.active = self.active.saturating_sub(1);
    }

    /// Jump straight to a step; out-of-range clamps to the last.
    pub fn set_active(&mut self, index: usize) {
        self.active = index.min(self.titles.len() - 1);
    }

    /// Terminal signal: true only from the last step. The owning screen
    /// answers it by validating and submitting its draft.
    pub fn finish(&self) -> bool {
        self.is_last()
    }

    /// Tab line, `[1] Main  [2] Users  [3] Constants`, active step
    /// highlighted. Alt+number jumps match the bracketed digits.
    pub fn tab_line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for (i, title) in self.titles.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw("  "));
            }
            let label = format!("[{}] {}", i + 1, title);
            let style = if i == self.active {
                Style::default()
                    .fg(colors::ACCENT)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors::DIM)
            };
            spans.push(Span::styled(label, style));
        }
        Line::from(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three() -> Wizard {
        Wizard::new(vec!["Main", "Users", "Constants"])
    }

    #[test]
    fn test_next_clamps_at_last() {
        let mut w = three();
        w.next();
        w.next();
        assert_eq!(w.active(), 2);
        assert!(w.is_last());
        w.next();
        assert_eq!(w.active(), 2);
    }

    #[test]
    fn test_prev_clamps_at_zero() {
        let mut w = three();
        w.prev();
        assert_eq!(w.active(), 0);
        w.next();
        w.prev();
        assert_eq!(w.active(), 0);
    }

    #[test]
    fn test_set_active_clamps_out_of_range() {
        let mut w = three();
        w.set_active(1);
        assert_eq!(w.active(), 1);
        w.set_active(99);
        assert_eq!(w.active(), 2);
    }

    #[test]
    fn test_finish_only_from_last_step() {
        let mut w = three();
        assert!(!w.finish());
        w.set_active(2);
        assert!(w.finish());
    }
}
