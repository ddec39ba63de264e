//! Project wizard: three steps (Main, Users, Constants) over one
//! [`ProjectDraft`], driving both the create and the edit flow.
//!
//! Main-step inputs live in [`InputField`]s and are committed into the draft
//! on every step switch and before submit. Users and constants mutate the
//! draft immediately; their eager save buttons run through [`SaveState`].
//! Submission and eager saves run on worker threads; the screen applies
//! their completions in [`ProjectFormScreen::tick`].

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use serde_json::Value;

use crate::api::ApiClient;
use crate::draft::ProjectDraft;
use crate::fields::{format_member_role, ConstantKind, MemberRole, SaveState};
use crate::models::{ProjectForEditData, UserRef, UsersForProjectData};
use crate::tui::colors;
use crate::tui::input::InputField;
use crate::tui::jobs::Jobs;
use crate::tui::wizard::Wizard;

const STEP_MAIN: usize = 0;
const STEP_USERS: usize = 1;
const STEP_CONSTANTS: usize = 2;

const MAIN_DEFINITION: usize = 0;
const MAIN_MANAGER: usize = 1;
const MAIN_DATE_START: usize = 2;
const MAIN_DATE_END: usize = 3;
const MAIN_FIELDS: usize = 4;

#[derive(Clone, Debug)]
enum FormMode {
    Create,
    Edit { project_code: String },
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum UsersFocus {
    Available,
    Selected,
    SaveBtn,
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum ConstFocus {
    Input,
    List,
    SaveBtn,
}

/// Completions delivered by worker threads.
#[derive(Debug)]
enum FormMsg {
    UsersSaved(bool, String),
    ConstantsSaved(bool, String),
    Submitted(Result<String, String>),
}

/// How the wizard wants to leave.
pub enum FormExit {
    /// Submitted successfully; the message goes to the menu status bar.
    Done(String),
    Cancelled,
}

#[derive(Debug)]
pub struct ProjectFormScreen {
    mode: FormMode,
    client: ApiClient,
    wizard: Wizard,
    draft: ProjectDraft,
    users_pool: Vec<UserRef>,

    definition: InputField,
    date_start: InputField,
    date_end: InputField,
    manager_index: Option<usize>,
    main_focus: usize,

    users_focus: UsersFocus,
    avail_cursor: usize,
    selected_cursor: usize,
    users_save: SaveState,

    const_focus: ConstFocus,
    const_kind_idx: usize,
    const_input: InputField,
    const_cursor: usize,
    constants_save: SaveState,

    jobs: Jobs<FormMsg>,
    status_line: Option<(String, bool)>,
    submitting: bool,
}

impl ProjectFormScreen {
    /// Create-flow screen. Fetches the candidate user pool once, before the
    /// first frame; a failed fetch aborts the mount.
    pub fn create(client: &ApiClient) -> Result<Self, String> {
        let users = fetch_user_pool(client)?;
        Ok(Self::build(FormMode::Create, client.clone(), ProjectDraft::new(), users))
    }

    /// Edit-flow screen. Fetches the project's current shape and hydrates
    /// the draft from it.
    pub fn edit(client: &ApiClient, project_code: &str) -> Result<Self, String> {
        let env = client
            .get::<ProjectForEditData>(
                "project/getProjectForEdit",
                &[("project_code", project_code.to_string())],
            )
            .map_err(|e| e.user_message().to_string())?;
        if !env.status {
            return Err(env.user_message().to_string());
        }
        let data = env.data.unwrap_or_else(|| ProjectForEditData {
            users: Vec::new(),
            details: Default::default(),
        });
        let draft = ProjectDraft::from_edit_response(&data);
        Ok(Self::build(
            FormMode::Edit {
                project_code: project_code.to_string(),
            },
            client.clone(),
            draft,
            data.users,
        ))
    }

    fn build(mode: FormMode, client: ApiClient, draft: ProjectDraft, users_pool: Vec<UserRef>) -> Self {
        let definition = InputField::with_value(&draft.definition);
        let date_start = InputField::with_value(&draft.date_start);
        let date_end = InputField::with_value(&draft.date_end);
        let manager_index = draft
            .manager_code
            .as_ref()
            .and_then(|code| users_pool.iter().position(|u| &u.code == code));
        ProjectFormScreen {
            mode,
            client,
            wizard: Wizard::new(vec!["Main", "Users", "Constants"]),
            draft,
            users_pool,
            definition,
            date_start,
            date_end,
            manager_index,
            main_focus: MAIN_DEFINITION,
            users_focus: UsersFocus::Available,
            avail_cursor: 0,
            selected_cursor: 0,
            users_save: SaveState::default(),
            const_focus: ConstFocus::Input,
            const_kind_idx: 0,
            const_input: InputField::new(),
            const_cursor: 0,
            constants_save: SaveState::default(),
            jobs: Jobs::new(),
            status_line: None,
            submitting: false,
        }
    }

    /// Copy the main-step inputs into the draft.
    fn commit_main(&mut self) {
        self.draft.definition = self.definition.value().to_string();
        self.draft.date_start = self.date_start.value().to_string();
        self.draft.date_end = self.date_end.value().to_string();
    }

    /// Pool entries still offerable on the users step: everyone except the
    /// manager and the already-selected.
    fn available(&self) -> Vec<UserRef> {
        self.users_pool
            .iter()
            .filter(|u| self.draft.manager_code.as_deref() != Some(u.code.as_str()))
            .filter(|u| !self.draft.extra_users.iter().any(|s| s.code == u.code))
            .cloned()
            .collect()
    }

    fn cycle_manager(&mut self, delta: isize) {
        if self.users_pool.is_empty() {
            return;
        }
        let len = self.users_pool.len() as isize;
        let next = match self.manager_index {
            None => {
                if delta >= 0 {
                    0
                } else {
                    len - 1
                }
            }
            Some(i) => (i as isize + delta).rem_euclid(len),
        } as usize;
        self.manager_index = Some(next);
        self.draft.set_manager(Some(self.users_pool[next].code.clone()));
        // The cascade may have dropped a selected user.
        self.users_save.mark_dirty();
        self.selected_cursor = self
            .selected_cursor
            .min(self.draft.extra_users.len().saturating_sub(1));
    }

    /// Handle one key; `Some` when the wizard is done.
    pub fn handle_key(&mut self, key: &KeyEvent) -> Option<FormExit> {
        self.status_line = None;
        match key.code {
            KeyCode::Esc => return Some(FormExit::Cancelled),
            KeyCode::PageDown => {
                self.commit_main();
                self.wizard.next();
                return None;
            }
            KeyCode::PageUp => {
                self.commit_main();
                self.wizard.prev();
                return None;
            }
            _ => {}
        }
        if key.modifiers.contains(KeyModifiers::ALT) {
            if let KeyCode::Char(c @ '1'..='9') = key.code {
                self.commit_main();
                self.wizard.set_active((c as u8 - b'1') as usize);
                return None;
            }
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
            if self.wizard.finish() {
                self.submit();
            } else {
                self.status_line =
                    Some(("Finish from the last step (PgDn to reach it).".to_string(), false));
            }
            return None;
        }
        match self.wizard.active() {
            STEP_MAIN => self.handle_main_key(key),
            STEP_USERS => self.handle_users_key(key),
            STEP_CONSTANTS => self.handle_constants_key(key),
            _ => {}
        }
        None
    }

    fn handle_main_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Tab => {
                self.main_focus = (self.main_focus + 1) % MAIN_FIELDS;
                return;
            }
            KeyCode::BackTab => {
                self.main_focus = (self.main_focus + MAIN_FIELDS - 1) % MAIN_FIELDS;
                return;
            }
            _ => {}
        }
        match self.main_focus {
            MAIN_DEFINITION => {
                self.definition.handle_key(key);
            }
            MAIN_MANAGER => match key.code {
                KeyCode::Left => self.cycle_manager(-1),
                KeyCode::Right | KeyCode::Enter => self.cycle_manager(1),
                _ => {}
            },
            MAIN_DATE_START => {
                self.date_start.handle_key(key);
            }
            MAIN_DATE_END => {
                self.date_end.handle_key(key);
            }
            _ => {}
        }
    }

    fn handle_users_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Tab => {
                self.users_focus = match self.users_focus {
                    UsersFocus::Available => UsersFocus::Selected,
                    UsersFocus::Selected => UsersFocus::SaveBtn,
                    UsersFocus::SaveBtn => UsersFocus::Available,
                };
                return;
            }
            KeyCode::BackTab => {
                self.users_focus = match self.users_focus {
                    UsersFocus::Available => UsersFocus::SaveBtn,
                    UsersFocus::Selected => UsersFocus::Available,
                    UsersFocus::SaveBtn => UsersFocus::Selected,
                };
                return;
            }
            _ => {}
        }
        match self.users_focus {
            UsersFocus::Available => {
                let avail = self.available();
                match key.code {
                    KeyCode::Up => self.avail_cursor = self.avail_cursor.saturating_sub(1),
                    KeyCode::Down => {
                        if self.avail_cursor + 1 < avail.len() {
                            self.avail_cursor += 1;
                        }
                    }
                    KeyCode::Enter => {
                        if let Some(user) = avail.get(self.avail_cursor) {
                            if self.draft.add_user(&user.code, &user.full_name) {
                                self.users_save.mark_dirty();
                            }
                        }
                        let remaining = self.available().len();
                        self.avail_cursor = self.avail_cursor.min(remaining.saturating_sub(1));
                    }
                    _ => {}
                }
            }
            UsersFocus::Selected => match key.code {
                KeyCode::Up => self.selected_cursor = self.selected_cursor.saturating_sub(1),
                KeyCode::Down => {
                    if self.selected_cursor + 1 < self.draft.extra_users.len() {
                        self.selected_cursor += 1;
                    }
                }
                KeyCode::Delete | KeyCode::Backspace => {
                    let code = self
                        .draft
                        .extra_users
                        .get(self.selected_cursor)
                        .map(|u| u.code.clone());
                    if let Some(code) = code {
                        if self.draft.remove_user(&code) {
                            self.users_save.mark_dirty();
                        }
                    }
                    self.selected_cursor = self
                        .selected_cursor
                        .min(self.draft.extra_users.len().saturating_sub(1));
                }
                KeyCode::Left => self.cycle_selected_role(-1),
                KeyCode::Right => self.cycle_selected_role(1),
                _ => {}
            },
            UsersFocus::SaveBtn => {
                if key.code == KeyCode::Enter {
                    self.press_users_save();
                }
            }
        }
    }

    fn cycle_selected_role(&mut self, delta: isize) {
        let Some(user) = self.draft.extra_users.get(self.selected_cursor) else {
            return;
        };
        let code = user.code.clone();
        let idx = MemberRole::ALL
            .iter()
            .position(|r| *r == user.role)
            .unwrap_or(MemberRole::ALL.len() - 1);
        let next = (idx as isize + delta).rem_euclid(MemberRole::ALL.len() as isize) as usize;
        if self.draft.set_user_role(&code, MemberRole::ALL[next]) {
            self.users_save.mark_dirty();
        }
    }

    fn handle_constants_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Tab => {
                self.const_focus = match self.const_focus {
                    ConstFocus::Input => ConstFocus::List,
                    ConstFocus::List => ConstFocus::SaveBtn,
                    ConstFocus::SaveBtn => ConstFocus::Input,
                };
                return;
            }
            KeyCode::BackTab => {
                self.const_focus = match self.const_focus {
                    ConstFocus::Input => ConstFocus::SaveBtn,
                    ConstFocus::List => ConstFocus::Input,
                    ConstFocus::SaveBtn => ConstFocus::List,
                };
                return;
            }
            _ => {}
        }
        let kind = ConstantKind::ALL[self.const_kind_idx];
        match self.const_focus {
            ConstFocus::Input => match key.code {
                KeyCode::Enter => {
                    if self.draft.add_constant(kind, self.const_input.value()).is_some() {
                        self.const_input.clear();
                        self.constants_save.mark_dirty();
                    }
                }
                _ => {
                    self.const_input.handle_key(key);
                }
            },
            ConstFocus::List => match key.code {
                KeyCode::Left => {
                    self.const_kind_idx =
                        (self.const_kind_idx + ConstantKind::ALL.len() - 1) % ConstantKind::ALL.len();
                    self.const_cursor = 0;
                }
                KeyCode::Right => {
                    self.const_kind_idx = (self.const_kind_idx + 1) % ConstantKind::ALL.len();
                    self.const_cursor = 0;
                }
                KeyCode::Up => self.const_cursor = self.const_cursor.saturating_sub(1),
                KeyCode::Down => {
                    if self.const_cursor + 1 < self.draft.constants(kind).len() {
                        self.const_cursor += 1;
                    }
                }
                KeyCode::Delete | KeyCode::Backspace => {
                    let id = self.draft.constants(kind).get(self.const_cursor).map(|c| c.id);
                    if let Some(id) = id {
                        if self.draft.remove_constant(kind, id) {
                            self.constants_save.mark_dirty();
                        }
                    }
                    self.const_cursor = self
                        .const_cursor
                        .min(self.draft.constants(kind).len().saturating_sub(1));
                }
                _ => {}
            },
            ConstFocus::SaveBtn => {
                if key.code == KeyCode::Enter {
                    self.press_constants_save();
                }
            }
        }
    }

    fn press_users_save(&mut self) {
        if !self.users_save.begin() {
            return;
        }
        self.eager_save(|ok, message| FormMsg::UsersSaved(ok, message));
    }

    fn press_constants_save(&mut self) {
        if !self.constants_save.begin() {
            return;
        }
        self.eager_save(|ok, message| FormMsg::ConstantsSaved(ok, message));
    }

    /// Run one eager sub-save. In the create flow there is nothing on the
    /// server yet, so the save completes trivially; the edit flow pushes the
    /// whole current draft through the update endpoint.
    fn eager_save<F>(&mut self, wrap: F)
    where
        F: Fn(bool, String) -> FormMsg + Send + 'static,
    {
        let mode = self.mode.clone();
        match mode {
            FormMode::Create => {
                self.jobs.spawn(move || wrap(true, String::new()));
            }
            FormMode::Edit { project_code } => {
                self.commit_main();
                let payload = self.draft.update_payload(&project_code);
                let client = self.client.clone();
                self.jobs.spawn(move || {
                    match client.put::<Value, _>("project/updateProject", &payload) {
                        Ok(env) => wrap(env.status, env.message),
                        Err(e) => wrap(false, e.user_message().to_string()),
                    }
                });
            }
        }
    }

    fn submit(&mut self) {
        if self.submitting {
            return;
        }
        self.commit_main();
        if let Err(msg) = self.draft.validate() {
            self.status_line = Some((msg.to_string(), true));
            self.wizard.set_active(STEP_MAIN);
            return;
        }
        self.submitting = true;
        self.status_line = Some(("Submitting...".to_string(), false));
        let client = self.client.clone();
        match self.mode.clone() {
            FormMode::Create => {
                let payload = self.draft.payload();
                self.jobs.spawn(move || {
                    match client.post::<Value, _>("project/setProject", &payload) {
                        Ok(env) if env.status => FormMsg::Submitted(Ok(done_message(env.message))),
                        Ok(env) => FormMsg::Submitted(Err(env.user_message().to_string())),
                        Err(e) => FormMsg::Submitted(Err(e.user_message().to_string())),
                    }
                });
            }
            FormMode::Edit { project_code } => {
                let payload = self.draft.update_payload(&project_code);
                self.jobs.spawn(move || {
                    match client.put::<Value, _>("project/updateProject", &payload) {
                        Ok(env) if env.status => FormMsg::Submitted(Ok(done_message(env.message))),
                        Ok(env) => FormMsg::Submitted(Err(env.user_message().to_string())),
                        Err(e) => FormMsg::Submitted(Err(e.user_message().to_string())),
                    }
                });
            }
        }
    }

    /// Apply finished background work; `Some` when the wizard is done.
    pub fn tick(&mut self) -> Option<FormExit> {
        for msg in self.jobs.drain() {
            match msg {
                FormMsg::UsersSaved(ok, message) => {
                    self.users_save.complete(ok);
                    if !ok {
                        self.status_line = Some((message, true));
                    }
                }
                FormMsg::ConstantsSaved(ok, message) => {
                    self.constants_save.complete(ok);
                    if !ok {
                        self.status_line = Some((message, true));
                    }
                }
                FormMsg::Submitted(Ok(message)) => return Some(FormExit::Done(message)),
                FormMsg::Submitted(Err(message)) => {
                    self.submitting = false;
                    self.status_line = Some((message, true));
                }
            }
        }
        None
    }

    pub fn render(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(f.area());

        f.render_widget(Paragraph::new(self.wizard.tab_line()), chunks[0]);

        let title = match &self.mode {
            FormMode::Create => " New Project ".to_string(),
            FormMode::Edit { project_code } => format!(" Edit Project {project_code} "),
        };
        let outer = Block::default().borders(Borders::ALL).title(title);
        let inner = outer.inner(chunks[1]);
        f.render_widget(outer, chunks[1]);

        match self.wizard.active() {
            STEP_MAIN => self.render_main(f, inner),
            STEP_USERS => self.render_users(f, inner),
            STEP_CONSTANTS => self.render_constants(f, inner),
            _ => {}
        }

        self.render_status_bar(f, chunks[2]);
    }

    fn render_main(&self, f: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(area);

        render_input(
            f,
            rows[0],
            "Definition",
            &self.definition,
            self.main_focus == MAIN_DEFINITION,
        );

        let manager_label = match self.manager_index {
            Some(i) => self.users_pool[i].full_name.clone(),
            None => match &self.draft.manager_code {
                Some(code) => code.clone(),
                None => "(none)".to_string(),
            },
        };
        let focused = self.main_focus == MAIN_MANAGER;
        let border = if focused { colors::FOCUS } else { colors::DIM };
        let manager = Paragraph::new(format!("◄ {manager_label} ►")).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(" Manager "),
        );
        f.render_widget(manager, rows[1]);

        let dates = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[2]);
        render_input(
            f,
            dates[0],
            "Start date (YYYY-MM-DD)",
            &self.date_start,
            self.main_focus == MAIN_DATE_START,
        );
        render_input(
            f,
            dates[1],
            "End date (YYYY-MM-DD)",
            &self.date_end,
            self.main_focus == MAIN_DATE_END,
        );
    }

    fn render_users(&self, f: &mut Frame, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let avail = self.available();
        let avail_lines = list_lines(
            avail.iter().map(|u| u.full_name.clone()),
            self.avail_cursor,
            self.users_focus == UsersFocus::Available,
        );
        let avail_widget = Paragraph::new(avail_lines).block(panel_block(
            format!(" Available ({}) ", avail.len()),
            self.users_focus == UsersFocus::Available,
        ));
        f.render_widget(avail_widget, cols[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(cols[1]);

        let selected_lines = list_lines(
            self.draft
                .extra_users
                .iter()
                .map(|u| format!("{}  [{}]", u.full_name, format_member_role(u.role))),
            self.selected_cursor,
            self.users_focus == UsersFocus::Selected,
        );
        let selected_widget = Paragraph::new(selected_lines).block(panel_block(
            format!(" Selected ({}) ", self.draft.extra_users.len()),
            self.users_focus == UsersFocus::Selected,
        ));
        f.render_widget(selected_widget, right[0]);

        render_save_button(f, right[1], self.users_save, self.users_focus == UsersFocus::SaveBtn);
    }

    fn render_constants(&self, f: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        let mut kind_spans = Vec::new();
        for (i, kind) in ConstantKind::ALL.iter().enumerate() {
            if i > 0 {
                kind_spans.push(Span::raw("  "));
            }
            let label = format!("{} ({})", kind.heading(), self.draft.constants(*kind).len());
            let style = if i == self.const_kind_idx {
                Style::default()
                    .fg(colors::ACCENT)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors::DIM)
            };
            kind_spans.push(Span::styled(label, style));
        }
        f.render_widget(Paragraph::new(Line::from(kind_spans)), rows[0]);

        render_input(
            f,
            rows[1],
            "New value",
            &self.const_input,
            self.const_focus == ConstFocus::Input,
        );

        let kind = ConstantKind::ALL[self.const_kind_idx];
        let lines = list_lines(
            self.draft.constants(kind).iter().map(|c| c.name.clone()),
            self.const_cursor,
            self.const_focus == ConstFocus::List,
        );
        let list_widget = Paragraph::new(lines).block(panel_block(
            format!(" {} ", kind.heading()),
            self.const_focus == ConstFocus::List,
        ));
        f.render_widget(list_widget, rows[2]);

        render_save_button(
            f,
            rows[3],
            self.constants_save,
            self.const_focus == ConstFocus::SaveBtn,
        );
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let (text, is_error) = match &self.status_line {
            Some((msg, err)) if !msg.is_empty() => (msg.clone(), *err),
            _ => {
                let hint = match self.wizard.active() {
                    STEP_MAIN => "Tab field | ←→ manager | PgUp/PgDn step | Esc cancel",
                    STEP_USERS => "Tab panel | Enter add, Del remove | ←→ role | Save with Enter",
                    _ => "Tab focus | ←→ vocabulary | Enter add, Del remove | Ctrl+S finish",
                };
                (hint.to_string(), false)
            }
        };
        let style = if is_error {
            Style::default().bg(colors::ERROR).fg(colors::STATUS_FG)
        } else {
            Style::default().bg(colors::STATUS_BG).fg(colors::STATUS_FG)
        };
        f.render_widget(
            Paragraph::new(text).style(style).alignment(Alignment::Left),
            area,
        );
    }
}

/// The selectable user pool for the create flow.
fn fetch_user_pool(client: &ApiClient) -> Result<Vec<UserRef>, String> {
    match client.get::<UsersForProjectData>("general/getUsersForProject", &[]) {
        Ok(env) if env.status => Ok(env.data.map(|d| d.users).unwrap_or_default()),
        Ok(env) => Err(env.user_message().to_string()),
        Err(e) => Err(e.user_message().to_string()),
    }
}

fn done_message(message: String) -> String {
    if message.is_empty() {
        "Saved.".to_string()
    } else {
        message
    }
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused { colors::FOCUS } else { colors::DIM };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title)
}

fn render_input(f: &mut Frame, area: Rect, title: &str, field: &InputField, focused: bool) {
    let widget = Paragraph::new(field.line(focused)).block(panel_block(format!(" {title} "), focused));
    f.render_widget(widget, area);
}

fn render_save_button(f: &mut Frame, area: Rect, state: SaveState, focused: bool) {
    let bg = match state {
        SaveState::Idle => colors::SAVE_IDLE,
        SaveState::Saving => colors::SAVE_BUSY,
        SaveState::Succeeded => colors::SAVE_OK,
        SaveState::Failed => colors::ERROR,
    };
    let button = Paragraph::new(state.label())
        .alignment(Alignment::Center)
        .style(Style::default().bg(bg).fg(colors::STATUS_FG))
        .block(panel_block(String::new(), focused));
    f.render_widget(button, area);
}

/// Rows with a manual highlight on the cursor while the panel is focused.
fn list_lines(
    items: impl Iterator<Item = String>,
    cursor: usize,
    focused: bool,
) -> Vec<Line<'static>> {
    items
        .enumerate()
        .map(|(i, text)| {
            if focused && i == cursor {
                Line::from(Span::styled(
                    format!("► {text}"),
                    Style::default().bg(colors::SELECT_BG).fg(colors::SELECT_FG),
                ))
            } else {
                Line::from(format!("  {text}"))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pool() -> Vec<UserRef> {
        vec![
            UserRef {
                code: "u1".to_string(),
                full_name: "Ayşe Kaya".to_string(),
            },
            UserRef {
                code: "u2".to_string(),
                full_name: "Mehmet Demir".to_string(),
            },
            UserRef {
                code: "u3".to_string(),
                full_name: "Zeynep Çelik".to_string(),
            },
        ]
    }

    fn create_screen() -> ProjectFormScreen {
        let client = ApiClient::new("http://127.0.0.1:1").unwrap();
        ProjectFormScreen::build(FormMode::Create, client, ProjectDraft::new(), pool())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_manager_cycling_wraps_and_cascades() {
        let mut screen = create_screen();
        screen.draft.add_user("u1", "Ayşe Kaya");
        screen.cycle_manager(1);
        assert_eq!(screen.draft.manager_code.as_deref(), Some("u1"));
        // Promoting a selected member to manager drops them from the list.
        assert!(screen.draft.extra_users.is_empty());
        screen.cycle_manager(-1);
        assert_eq!(screen.draft.manager_code.as_deref(), Some("u3"));
    }

    #[test]
    fn test_available_excludes_manager_and_selected() {
        let mut screen = create_screen();
        screen.cycle_manager(1); // manager = u1
        screen.draft.add_user("u2", "Mehmet Demir");
        let avail = screen.available();
        assert_eq!(avail.len(), 1);
        assert_eq!(avail[0].code, "u3");
    }

    #[test]
    fn test_enter_on_available_selects_with_viewer_default() {
        let mut screen = create_screen();
        screen.wizard.set_active(STEP_USERS);
        screen.handle_key(&key(KeyCode::Enter));
        assert_eq!(screen.draft.extra_users.len(), 1);
        assert_eq!(screen.draft.extra_users[0].code, "u1");
        assert_eq!(screen.draft.extra_users[0].role, MemberRole::Viewer);
    }

    #[test]
    fn test_role_cycling_on_selected_row() {
        let mut screen = create_screen();
        screen.draft.add_user("u2", "Mehmet Demir");
        screen.users_focus = UsersFocus::Selected;
        screen.wizard.set_active(STEP_USERS);
        screen.handle_key(&key(KeyCode::Right));
        assert_eq!(screen.draft.extra_users[0].role, MemberRole::Admin);
        screen.handle_key(&key(KeyCode::Left));
        assert_eq!(screen.draft.extra_users[0].role, MemberRole::Viewer);
    }

    #[test]
    fn test_constants_input_appends_and_clears() {
        let mut screen = create_screen();
        screen.wizard.set_active(STEP_CONSTANTS);
        for c in "Acil".chars() {
            screen.handle_key(&key(KeyCode::Char(c)));
        }
        screen.handle_key(&key(KeyCode::Enter));
        assert_eq!(screen.draft.constants(ConstantKind::Status).len(), 1);
        assert_eq!(screen.draft.constants(ConstantKind::Status)[0].name, "Acil");
        assert!(screen.const_input.is_empty());
    }

    #[test]
    fn test_create_mode_eager_save_completes_locally() {
        let mut screen = create_screen();
        screen.draft.add_user("u1", "Ayşe Kaya");
        screen.press_users_save();
        assert!(screen.users_save.is_saving());
        // Pressing again while in flight is a no-op.
        screen.press_users_save();
        for _ in 0..200 {
            if screen.tick().is_some() {
                unreachable!("eager save never finishes the wizard");
            }
            if screen.users_save == SaveState::Succeeded {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(screen.users_save, SaveState::Succeeded);
        // A later mutation re-arms the button.
        screen.draft.add_user("u2", "Mehmet Demir");
        screen.users_save.mark_dirty();
        assert_eq!(screen.users_save, SaveState::Idle);
    }

    #[test]
    fn test_submit_without_definition_jumps_to_main() {
        let mut screen = create_screen();
        screen.wizard.set_active(STEP_CONSTANTS);
        screen.submit();
        assert!(!screen.submitting);
        assert_eq!(screen.wizard.active(), STEP_MAIN);
        let (msg, is_error) = screen.status_line.clone().unwrap();
        assert!(is_error);
        assert_eq!(msg, crate::draft::MSG_DEFINITION_REQUIRED);
    }

    #[test]
    fn test_step_switch_commits_main_inputs() {
        let mut screen = create_screen();
        for c in "Portal".chars() {
            screen.handle_key(&key(KeyCode::Char(c)));
        }
        assert!(screen.draft.definition.is_empty());
        screen.handle_key(&key(KeyCode::PageDown));
        assert_eq!(screen.draft.definition, "Portal");
        assert_eq!(screen.wizard.active(), STEP_USERS);
    }
}
