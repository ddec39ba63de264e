//! Screen coordinator for the interactive UI.
//!
//! [`App`] owns one active screen at a time (login, menu, or a wizard) and
//! drives it through a draw/poll loop. Wizards launched from the menu fall
//! back onto a fresh menu when they finish; wizards mounted directly from a
//! subcommand leave the UI instead. Flat pages are never rendered here: the
//! menu exits with [`AppExit::OpenPage`] and the command layer prints the
//! page on the restored terminal.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent};
use ratatui::{backend::Backend, Frame, Terminal};

use crate::api::ApiClient;
use crate::nav::{self, NavTarget};
use crate::session::{self, Identity, SessionStore};
use crate::tui::login::{LoginExit, LoginScreen};
use crate::tui::menu::{MenuExit, MenuScreen};
use crate::tui::project_form::{FormExit, ProjectFormScreen};
use crate::tui::task_form::{TaskAddScreen, TaskEditScreen};

/// The active screen; exactly one owns the frame.
#[derive(Debug)]
enum Screen {
    Login(LoginScreen),
    Menu(MenuScreen),
    ProjectForm(ProjectFormScreen),
    TaskAdd(TaskAddScreen),
    TaskEdit(TaskEditScreen),
}

/// Why the UI loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppExit {
    Quit,
    /// The session was cleared from the menu.
    Logout,
    /// A standalone wizard submitted; the message prints after teardown.
    Done(String),
    /// A flat page was picked off the menu; printed after teardown.
    OpenPage(NavTarget),
}

#[derive(Debug)]
pub struct App {
    client: ApiClient,
    store: SessionStore,
    identity: Option<Identity>,
    screen: Screen,
    /// Mounted directly on a wizard; finishing it leaves the UI instead of
    /// returning to the menu.
    standalone: bool,
}

impl App {
    /// Menu when a valid session exists, the login screen otherwise.
    pub fn menu(client: ApiClient, store: SessionStore) -> Self {
        match session::resolve(&client, &store) {
            Ok(identity) => {
                let screen = Screen::Menu(MenuScreen::new(&identity));
                App {
                    client,
                    store,
                    identity: Some(identity),
                    screen,
                    standalone: false,
                }
            }
            Err(_) => App {
                client,
                store,
                identity: None,
                screen: Screen::Login(LoginScreen::new()),
                standalone: false,
            },
        }
    }

    /// Project wizard mounted directly; `code` switches it to the edit flow.
    pub fn project_wizard(
        client: ApiClient,
        store: SessionStore,
        code: Option<&str>,
    ) -> Result<Self, String> {
        let identity = session::resolve(&client, &store).map_err(|e| e.user_message())?;
        if !nav::permitted(identity.role, NavTarget::AddProject) {
            return Err("This command needs an administrator account.".to_string());
        }
        let form = match code {
            Some(code) => ProjectFormScreen::edit(&client, code)?,
            None => ProjectFormScreen::create(&client)?,
        };
        Ok(App {
            client,
            store,
            identity: Some(identity),
            screen: Screen::ProjectForm(form),
            standalone: true,
        })
    }

    /// Task wizard mounted directly; `task_id` switches it to the edit flow.
    pub fn task_wizard(
        client: ApiClient,
        store: SessionStore,
        task_id: Option<&str>,
    ) -> Result<Self, String> {
        let identity = session::resolve(&client, &store).map_err(|e| e.user_message())?;
        let screen = match task_id {
            Some(id) => Screen::TaskEdit(TaskEditScreen::new(&client, &identity, id)?),
            None => Screen::TaskAdd(TaskAddScreen::new(&client, &identity)?),
        };
        Ok(App {
            client,
            store,
            identity: Some(identity),
            screen,
            standalone: true,
        })
    }

    /// Drive the UI until a screen asks to leave.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<AppExit> {
        loop {
            terminal.draw(|f| self.render(f))?;
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if let Some(exit) = self.handle_key(&key) {
                        return Ok(exit);
                    }
                }
            }
            if let Some(exit) = self.tick() {
                return Ok(exit);
            }
        }
    }

    fn render(&mut self, f: &mut Frame) {
        match &mut self.screen {
            Screen::Login(login) => login.render(f),
            Screen::Menu(menu) => {
                if let Some(identity) = &self.identity {
                    menu.render(f, identity);
                }
            }
            Screen::ProjectForm(form) => form.render(f),
            Screen::TaskAdd(form) => form.render(f),
            Screen::TaskEdit(form) => form.render(f),
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> Option<AppExit> {
        match &mut self.screen {
            Screen::Login(login) => {
                match login.handle_key(key, &self.client, &self.store) {
                    Some(LoginExit::Authenticated(identity)) => {
                        self.screen = Screen::Menu(MenuScreen::new(&identity));
                        self.identity = Some(identity);
                    }
                    Some(LoginExit::Cancelled) => return Some(AppExit::Quit),
                    None => {}
                }
                None
            }
            Screen::Menu(menu) => match menu.handle_key(key) {
                Some(MenuExit::Open(target)) => self.open_target(target),
                Some(MenuExit::Logout) => {
                    if let Err(e) = session::logout(&self.store) {
                        self.menu_status(format!("Could not clear the session: {e}"));
                        return None;
                    }
                    Some(AppExit::Logout)
                }
                Some(MenuExit::Quit) => Some(AppExit::Quit),
                None => None,
            },
            Screen::ProjectForm(form) => {
                let exit = form.handle_key(key);
                exit.and_then(|exit| self.leave_wizard(exit))
            }
            Screen::TaskAdd(form) => {
                let exit = form.handle_key(key);
                exit.and_then(|exit| self.leave_wizard(exit))
            }
            Screen::TaskEdit(form) => {
                let exit = form.handle_key(key);
                exit.and_then(|exit| self.leave_wizard(exit))
            }
        }
    }

    /// Apply background completions from the active wizard.
    fn tick(&mut self) -> Option<AppExit> {
        let exit = match &mut self.screen {
            Screen::ProjectForm(form) => form.tick(),
            Screen::TaskAdd(form) => form.tick(),
            Screen::TaskEdit(form) => form.tick(),
            _ => None,
        };
        exit.and_then(|exit| self.leave_wizard(exit))
    }

    /// Menu selection: wizard targets swap in as screens, everything else
    /// leaves the UI for the command layer to print.
    fn open_target(&mut self, target: NavTarget) -> Option<AppExit> {
        let identity = self.identity.clone()?;
        match target {
            NavTarget::AddProject => match ProjectFormScreen::create(&self.client) {
                Ok(form) => {
                    self.screen = Screen::ProjectForm(form);
                    None
                }
                Err(msg) => {
                    self.menu_status(msg);
                    None
                }
            },
            NavTarget::AddTask => match TaskAddScreen::new(&self.client, &identity) {
                Ok(form) => {
                    self.screen = Screen::TaskAdd(form);
                    None
                }
                Err(msg) => {
                    self.menu_status(msg);
                    None
                }
            },
            _ => Some(AppExit::OpenPage(target)),
        }
    }

    /// A wizard finished or was cancelled.
    fn leave_wizard(&mut self, exit: FormExit) -> Option<AppExit> {
        if self.standalone {
            return Some(match exit {
                FormExit::Done(message) => AppExit::Done(message),
                FormExit::Cancelled => AppExit::Quit,
            });
        }
        let Some(identity) = &self.identity else {
            return Some(AppExit::Quit);
        };
        let mut menu = MenuScreen::new(identity);
        if let FormExit::Done(message) = exit {
            menu.set_status(message);
        }
        self.screen = Screen::Menu(menu);
        None
    }

    fn menu_status(&mut self, message: String) {
        if let Screen::Menu(menu) = &mut self.screen {
            menu.set_status(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use tempfile::tempdir;

    fn fixture(standalone: bool) -> (App, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let client = ApiClient::new("http://127.0.0.1:1").unwrap();
        let store = SessionStore::new(dir.path());
        let identity = Identity {
            key: "k".to_string(),
            user_code: "u1".to_string(),
            role: Role::Admin,
            full_name: Some("Admin".to_string()),
        };
        let screen = Screen::Menu(MenuScreen::new(&identity));
        let app = App {
            client,
            store,
            identity: Some(identity),
            screen,
            standalone,
        };
        (app, dir)
    }

    #[test]
    fn test_menu_without_session_starts_on_login() {
        let dir = tempdir().unwrap();
        let client = ApiClient::new("http://127.0.0.1:1").unwrap();
        let store = SessionStore::new(dir.path());
        let app = App::menu(client, store);
        assert!(matches!(app.screen, Screen::Login(_)));
        assert!(app.identity.is_none());
    }

    #[test]
    fn test_flat_target_exits_for_the_command_layer() {
        let (mut app, _dir) = fixture(false);
        let exit = app.open_target(NavTarget::Tasks);
        assert_eq!(exit, Some(AppExit::OpenPage(NavTarget::Tasks)));
    }

    #[test]
    fn test_menu_launched_wizard_done_lands_back_on_menu() {
        let (mut app, _dir) = fixture(false);
        let exit = app.leave_wizard(FormExit::Done("Kaydedildi.".to_string()));
        assert!(exit.is_none());
        assert!(matches!(app.screen, Screen::Menu(_)));
    }

    #[test]
    fn test_standalone_wizard_done_exits_with_message() {
        let (mut app, _dir) = fixture(true);
        let exit = app.leave_wizard(FormExit::Done("Kaydedildi.".to_string()));
        assert_eq!(exit, Some(AppExit::Done("Kaydedildi.".to_string())));
        let exit = app.leave_wizard(FormExit::Cancelled);
        assert_eq!(exit, Some(AppExit::Quit));
    }

    #[test]
    fn test_project_wizard_requires_admin_from_cached_session() {
        let dir = tempdir().unwrap();
        let client = ApiClient::new("http://127.0.0.1:1").unwrap();
        let store = SessionStore::new(dir.path());
        // A complete cached session is trusted without a network round trip.
        store
            .save(&crate::session::Session {
                key: "k".to_string(),
                user_code: Some("u2".to_string()),
                role: Some(Role::Member),
                full_name: None,
            })
            .unwrap();
        let err = App::project_wizard(client, store, None).unwrap_err();
        assert!(err.contains("administrator"));
    }
}
