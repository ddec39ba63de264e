//! Login screen.
//!
//! A small centered form with an email field and a masked password field.
//! Submission is synchronous; a rejected login or unreachable server shows
//! up in the status line and leaves the form editable.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::api::ApiClient;
use crate::session::{self, Identity, SessionStore};
use crate::tui::colors;
use crate::tui::input::InputField;

const MSG_CREDENTIALS_REQUIRED: &str = "E-posta ve şifre zorunludur.";

const FIELD_EMAIL: usize = 0;
const FIELD_PASSWORD: usize = 1;

/// How the login screen wants to leave.
pub enum LoginExit {
    Authenticated(Identity),
    Cancelled,
}

#[derive(Debug)]
pub struct LoginScreen {
    email: InputField,
    password: InputField,
    active: usize,
    status: Option<String>,
}

impl LoginScreen {
    pub fn new() -> Self {
        LoginScreen {
            email: InputField::new(),
            password: InputField::masked(),
            active: FIELD_EMAIL,
            status: None,
        }
    }

    /// Handle one key; `Some` when the screen is done.
    pub fn handle_key(
        &mut self,
        key: &KeyEvent,
        client: &ApiClient,
        store: &SessionStore,
    ) -> Option<LoginExit> {
        match key.code {
            KeyCode::Esc => return Some(LoginExit::Cancelled),
            KeyCode::Tab | KeyCode::Down => {
                self.active = (self.active + 1) % 2;
                return None;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.active = (self.active + 1) % 2;
                return None;
            }
            KeyCode::Enter => {
                if self.active == FIELD_EMAIL {
                    self.active = FIELD_PASSWORD;
                    return None;
                }
                return self.submit(client, store);
            }
            _ => {}
        }
        let field = if self.active == FIELD_EMAIL {
            &mut self.email
        } else {
            &mut self.password
        };
        field.handle_key(key);
        None
    }

    fn submit(&mut self, client: &ApiClient, store: &SessionStore) -> Option<LoginExit> {
        if self.email.is_empty() || self.password.is_empty() {
            self.status = Some(MSG_CREDENTIALS_REQUIRED.to_string());
            return None;
        }
        match session::login(client, store, self.email.value(), self.password.value()) {
            Ok(identity) => Some(LoginExit::Authenticated(identity)),
            Err(e) => {
                self.status = Some(e.user_message());
                None
            }
        }
    }

    pub fn render(&self, f: &mut Frame) {
        let area = centered_rect(50, 40, f.area());
        f.render_widget(Clear, area);
        let outer = Block::default().borders(Borders::ALL).title(" pmt login ");
        let inner = outer.inner(area);
        f.render_widget(outer, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        self.render_field(f, rows[0], "Email", &self.email, self.active == FIELD_EMAIL);
        self.render_field(
            f,
            rows[1],
            "Password",
            &self.password,
            self.active == FIELD_PASSWORD,
        );

        if let Some(status) = &self.status {
            let line = Paragraph::new(status.clone()).style(Style::default().fg(colors::ERROR));
            f.render_widget(line, rows[2]);
        }
        let hint = Paragraph::new(Line::from("Enter login | Tab next field | Esc quit"))
            .style(Style::default().fg(colors::DIM));
        f.render_widget(hint, rows[3]);
    }

    fn render_field(&self, f: &mut Frame, area: Rect, title: &str, field: &InputField, focused: bool) {
        let border = if focused { colors::FOCUS } else { colors::DIM };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(format!(" {title} "));
        let widget = Paragraph::new(field.line(focused)).block(block);
        f.render_widget(widget, area);
    }
}

/// A rect centered in `r`, sized as percentages of it.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn fixture() -> (LoginScreen, ApiClient, SessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let screen = LoginScreen::new();
        let client = ApiClient::new("http://127.0.0.1:1").unwrap();
        let store = SessionStore::new(dir.path());
        (screen, client, store, dir)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_tab_cycles_fields_and_esc_cancels() {
        let (mut screen, client, store, _dir) = fixture();
        assert_eq!(screen.active, FIELD_EMAIL);
        assert!(screen.handle_key(&key(KeyCode::Tab), &client, &store).is_none());
        assert_eq!(screen.active, FIELD_PASSWORD);
        assert!(screen.handle_key(&key(KeyCode::Tab), &client, &store).is_none());
        assert_eq!(screen.active, FIELD_EMAIL);
        assert!(matches!(
            screen.handle_key(&key(KeyCode::Esc), &client, &store),
            Some(LoginExit::Cancelled)
        ));
    }

    #[test]
    fn test_empty_submit_sets_status_without_network() {
        let (mut screen, client, store, _dir) = fixture();
        screen.active = FIELD_PASSWORD;
        assert!(screen.handle_key(&key(KeyCode::Enter), &client, &store).is_none());
        assert_eq!(screen.status.as_deref(), Some(MSG_CREDENTIALS_REQUIRED));
    }

    #[test]
    fn test_typing_lands_in_the_active_field() {
        let (mut screen, client, store, _dir) = fixture();
        screen.handle_key(&key(KeyCode::Char('a')), &client, &store);
        screen.handle_key(&key(KeyCode::Tab), &client, &store);
        screen.handle_key(&key(KeyCode::Char('p')), &client, &store);
        assert_eq!(screen.email.value(), "a");
        assert_eq!(screen.password.value(), "p");
    }
}
