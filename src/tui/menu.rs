//! Role-filtered main menu.
//!
//! Sections and entries come from the navigation catalog, already filtered
//! for the signed-in role. Selecting a wizard entry switches the screen in
//! place; selecting a flat page exits the TUI so the command layer can print
//! it on the plain terminal.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::widgets::ListState;
use ratatui::Frame;

use crate::nav::{self, NavTarget};
use crate::session::{format_role, Identity};
use crate::tui::colors;

/// One visible row of the menu.
#[derive(Debug)]
enum MenuRow {
    Header(&'static str),
    Item(NavTarget),
    Logout,
    Quit,
}

/// How the menu wants to leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuExit {
    Open(NavTarget),
    Logout,
    Quit,
}

#[derive(Debug)]
pub struct MenuScreen {
    rows: Vec<MenuRow>,
    list_state: ListState,
    status_message: String,
}

impl MenuScreen {
    pub fn new(identity: &Identity) -> Self {
        let mut rows = Vec::new();
        for section in nav::sections_for(identity.role) {
            rows.push(MenuRow::Header(section.title));
            for item in section.items {
                rows.push(MenuRow::Item(item));
            }
        }
        rows.push(MenuRow::Header("Session"));
        rows.push(MenuRow::Logout);
        rows.push(MenuRow::Quit);

        let mut list_state = ListState::default();
        let first = rows.iter().position(|r| !matches!(r, MenuRow::Header(_)));
        list_state.select(first);
        MenuScreen {
            rows,
            list_state,
            status_message: String::new(),
        }
    }

    /// Show a message in the status bar until the next keypress. Wizard
    /// outcomes and mount failures land here.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    fn select_prev(&mut self) {
        let Some(mut i) = self.list_state.selected() else {
            return;
        };
        while i > 0 {
            i -= 1;
            if !matches!(self.rows[i], MenuRow::Header(_)) {
                self.list_state.select(Some(i));
                return;
            }
        }
    }

    fn select_next(&mut self) {
        let Some(mut i) = self.list_state.selected() else {
            return;
        };
        while i + 1 < self.rows.len() {
            i += 1;
            if !matches!(self.rows[i], MenuRow::Header(_)) {
                self.list_state.select(Some(i));
                return;
            }
        }
    }

    /// Handle one key; `Some` when the menu is done.
    pub fn handle_key(&mut self, key: &KeyEvent) -> Option<MenuExit> {
        self.status_message.clear();
        match key.code {
            KeyCode::Up => self.select_prev(),
            KeyCode::Down => self.select_next(),
            KeyCode::Enter => {
                if let Some(i) = self.list_state.selected() {
                    match self.rows.get(i) {
                        Some(MenuRow::Item(target)) => return Some(MenuExit::Open(*target)),
                        Some(MenuRow::Logout) => return Some(MenuExit::Logout),
                        Some(MenuRow::Quit) => return Some(MenuExit::Quit),
                        _ => {}
                    }
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => return Some(MenuExit::Quit),
            _ => {}
        }
        None
    }

    pub fn render(&mut self, f: &mut Frame, identity: &Identity) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.render_header(f, chunks[0], identity);
        self.render_list(f, chunks[1]);
        self.render_status_bar(f, chunks[2]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect, identity: &Identity) {
        let name = identity
            .full_name
            .clone()
            .unwrap_or_else(|| identity.user_code.clone());
        let header_text = vec![Line::from(vec![
            Span::styled(
                "PROJECT MANAGEMENT",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled(
                format!("{} ({})", name, format_role(identity.role)),
                Style::default().fg(colors::DIM),
            ),
        ])];

        let header = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_list(&mut self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .rows
            .iter()
            .map(|row| match row {
                MenuRow::Header(title) => ListItem::new(Line::from(Span::styled(
                    title.to_string(),
                    Style::default()
                        .fg(colors::ACCENT)
                        .add_modifier(Modifier::BOLD),
                ))),
                MenuRow::Item(target) => {
                    ListItem::new(Line::from(format!("  {}", target.label())))
                }
                MenuRow::Logout => ListItem::new(Line::from("  Logout")),
                MenuRow::Quit => ListItem::new(Line::from("  Quit")),
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Menu"))
            .highlight_style(
                Style::default()
                    .bg(colors::SELECT_BG)
                    .fg(colors::SELECT_FG),
            )
            .highlight_symbol("► ");

        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = if self.status_message.is_empty() {
            "Use ↑↓ to navigate, Enter to select, q/Esc to quit".to_string()
        } else {
            self.status_message.clone()
        };
        let status = Paragraph::new(status_text)
            .style(
                Style::default()
                    .bg(colors::STATUS_BG)
                    .fg(colors::STATUS_FG),
            )
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use crossterm::event::KeyModifiers;

    fn identity(role: Role) -> Identity {
        Identity {
            key: "k".to_string(),
            user_code: "u1".to_string(),
            role,
            full_name: Some("Test Kişi".to_string()),
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn selected_target(menu: &MenuScreen) -> Option<NavTarget> {
        match menu.rows[menu.list_state.selected().unwrap()] {
            MenuRow::Item(t) => Some(t),
            _ => None,
        }
    }

    #[test]
    fn test_initial_selection_skips_the_first_header() {
        let menu = MenuScreen::new(&identity(Role::Admin));
        assert_eq!(selected_target(&menu), Some(NavTarget::Dashboard));
    }

    #[test]
    fn test_arrow_navigation_skips_headers() {
        let mut menu = MenuScreen::new(&identity(Role::Admin));
        // Dashboard is alone in its section; the next row down is a header.
        menu.handle_key(&key(KeyCode::Down));
        assert_eq!(selected_target(&menu), Some(NavTarget::AddProject));
        menu.handle_key(&key(KeyCode::Up));
        assert_eq!(selected_target(&menu), Some(NavTarget::Dashboard));
        menu.handle_key(&key(KeyCode::Up));
        assert_eq!(selected_target(&menu), Some(NavTarget::Dashboard));
    }

    #[test]
    fn test_member_menu_has_no_admin_entries() {
        let menu = MenuScreen::new(&identity(Role::Member));
        let has_admin_item = menu.rows.iter().any(|r| {
            matches!(
                r,
                MenuRow::Item(NavTarget::AddUser)
                    | MenuRow::Item(NavTarget::Users)
                    | MenuRow::Item(NavTarget::AddProject)
            )
        });
        assert!(!has_admin_item);
    }

    #[test]
    fn test_enter_opens_the_selected_target() {
        let mut menu = MenuScreen::new(&identity(Role::Member));
        assert_eq!(
            menu.handle_key(&key(KeyCode::Enter)),
            Some(MenuExit::Open(NavTarget::Dashboard))
        );
        assert_eq!(menu.handle_key(&key(KeyCode::Esc)), Some(MenuExit::Quit));
    }

    #[test]
    fn test_last_rows_are_logout_and_quit() {
        let mut menu = MenuScreen::new(&identity(Role::Member));
        for _ in 0..50 {
            menu.handle_key(&key(KeyCode::Down));
        }
        assert_eq!(menu.handle_key(&key(KeyCode::Enter)), Some(MenuExit::Quit));
        menu.handle_key(&key(KeyCode::Up));
        assert_eq!(
            menu.handle_key(&key(KeyCode::Enter)),
            Some(MenuExit::Logout)
        );
    }
}
