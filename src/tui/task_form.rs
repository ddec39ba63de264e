//! Task wizards: creation and editing share the step layout (Main,
//! Assignment, Attachments) but run over different drafts.
//!
//! The create flow hangs everything off the picked project: switching
//! projects clears the dependent vocabulary selections and refetches the
//! member pool on a worker thread, with stale responses dropped through
//! [`Jobs::invalidate`]. The edit flow arrives with its vocabularies and
//! member pools already in the fetched details, so it never refetches.
//! Both submit on Ctrl+S from the last step.

use std::path::Path;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use serde_json::Value;

use crate::api::ApiClient;
use crate::attach::{format_file_size, AttachmentCollector, SIZE_WARN_BYTES};
use crate::draft::{TaskDraft, TaskEditDraft, MAX_TITLE_CHARS};
use crate::fields::ConstantKind;
use crate::models::{
    ProjectMeta, ProjectOption, ProjectUserRef, ProjectUsersData, ProjectsForTaskData,
    TaskEditDetails, TaskEditPools, TaskEditTask, TaskFileRow,
};
use crate::session::Identity;
use crate::tui::colors;
use crate::tui::editor::DescriptionEditor;
use crate::tui::input::InputField;
use crate::tui::jobs::Jobs;
use crate::tui::project_form::FormExit;
use crate::tui::wizard::Wizard;

const STEP_MAIN: usize = 0;
const STEP_ASSIGN: usize = 1;
const STEP_FILES: usize = 2;

const ADD_PROJECT: usize = 0;
const ADD_TITLE: usize = 1;
const ADD_DESCRIPTION: usize = 2;
const ADD_DATE_START: usize = 3;
const ADD_DATE_END: usize = 4;
const ADD_STATUS: usize = 5;
const ADD_PRIORITY: usize = 6;
const ADD_TYPE: usize = 7;
const ADD_FIELDS: usize = 8;

const EDIT_TITLE: usize = 0;
const EDIT_DESCRIPTION: usize = 1;
const EDIT_DATE_START: usize = 2;
const EDIT_DATE_END: usize = 3;
const EDIT_STATUS: usize = 4;
const EDIT_PRIORITY: usize = 5;
const EDIT_TYPE: usize = 6;
const EDIT_FIELDS: usize = 7;

#[derive(Clone, Copy, PartialEq, Debug)]
enum AssignFocus {
    Search,
    Selected,
    NewSubtask,
    Subtasks,
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum AttachFocus {
    PathInput,
    Files,
}

/// Completions delivered by worker threads.
#[derive(Debug)]
enum TaskMsg {
    /// Vocabulary and member pool for the picked project.
    Refs(Result<(ProjectMeta, Vec<ProjectUserRef>), String>),
    Submitted(Result<String, String>),
}

// ---------------------------------------------------------------------------
// Creation

#[derive(Debug)]
pub struct TaskAddScreen {
    client: ApiClient,
    identity: Identity,
    wizard: Wizard,
    draft: TaskDraft,

    projects: Vec<ProjectOption>,
    project_index: Option<usize>,
    vocab: Option<ProjectMeta>,
    users_pool: Vec<ProjectUserRef>,
    loading_refs: bool,

    title: InputField,
    editor: DescriptionEditor,
    date_start: InputField,
    date_end: InputField,
    main_focus: usize,

    assign_focus: AssignFocus,
    search: InputField,
    match_cursor: usize,
    selected_cursor: usize,
    subtask_input: InputField,
    subtask_cursor: usize,
    member_cursor: usize,

    attach_focus: AttachFocus,
    path_input: InputField,
    file_cursor: usize,

    jobs: Jobs<TaskMsg>,
    status_line: Option<(String, bool)>,
    submitting: bool,
}

impl TaskAddScreen {
    /// Mounts with the caller's project options already fetched; a failed
    /// fetch aborts the mount.
    pub fn new(client: &ApiClient, identity: &Identity) -> Result<Self, String> {
        let projects = fetch_task_projects(client, &identity.user_code)?;
        Ok(Self::build(client.clone(), identity.clone(), projects))
    }

    fn build(client: ApiClient, identity: Identity, projects: Vec<ProjectOption>) -> Self {
        TaskAddScreen {
            client,
            identity,
            wizard: Wizard::new(vec!["Main", "Assignment", "Attachments"]),
            draft: TaskDraft::new(),
            projects,
            project_index: None,
            vocab: None,
            users_pool: Vec::new(),
            loading_refs: false,
            title: InputField::new(),
            editor: DescriptionEditor::new(),
            date_start: InputField::new(),
            date_end: InputField::new(),
            main_focus: ADD_PROJECT,
            assign_focus: AssignFocus::Search,
            search: InputField::new(),
            match_cursor: 0,
            selected_cursor: 0,
            subtask_input: InputField::new(),
            subtask_cursor: 0,
            member_cursor: 0,
            attach_focus: AttachFocus::PathInput,
            path_input: InputField::new(),
            file_cursor: 0,
            jobs: Jobs::new(),
            status_line: None,
            submitting: false,
        }
    }

    /// Copy the main-step inputs into the draft.
    fn commit_main(&mut self) {
        self.draft.title = self.title.value().to_string();
        self.draft.description = self.editor.doc().html();
        self.draft.start_date = self.date_start.value().to_string();
        self.draft.end_date = self.date_end.value().to_string();
    }

    /// Move to the adjacent project; an actual change restarts the
    /// vocabulary/member fetch and drops whatever the old fetch returns.
    fn cycle_project(&mut self, delta: isize) {
        if self.projects.is_empty() {
            return;
        }
        let len = self.projects.len() as isize;
        let next = match self.project_index {
            None => {
                if delta >= 0 {
                    0
                } else {
                    len - 1
                }
            }
            Some(i) => (i as isize + delta).rem_euclid(len),
        } as usize;
        self.project_index = Some(next);
        let code = self.projects[next].code.clone();
        if self.draft.project_code.as_deref() == Some(code.as_str()) {
            return;
        }
        self.draft.select_project(Some(code.clone()));
        self.vocab = None;
        self.users_pool.clear();
        self.jobs.invalidate();
        self.loading_refs = true;
        let client = self.client.clone();
        self.jobs.spawn(move || fetch_project_refs(&client, &code));
    }

    fn vocab_list(&self, kind: ConstantKind) -> &[String] {
        match &self.vocab {
            Some(meta) => match kind {
                ConstantKind::Status => &meta.statuses,
                ConstantKind::Priority => &meta.priorities,
                ConstantKind::Type => &meta.types,
            },
            None => &[],
        }
    }

    fn vocab_value(&self, kind: ConstantKind) -> &str {
        match kind {
            ConstantKind::Status => &self.draft.status_definition,
            ConstantKind::Priority => &self.draft.priority_definition,
            ConstantKind::Type => &self.draft.type_definition,
        }
    }

    fn cycle_vocab(&mut self, kind: ConstantKind, delta: isize) {
        let list = self.vocab_list(kind);
        if list.is_empty() {
            return;
        }
        let len = list.len() as isize;
        let next = match list.iter().position(|v| v == self.vocab_value(kind)) {
            None => {
                if delta >= 0 {
                    0
                } else {
                    len - 1
                }
            }
            Some(i) => (i as isize + delta).rem_euclid(len),
        } as usize;
        let value = list[next].clone();
        match kind {
            ConstantKind::Status => self.draft.status_definition = value,
            ConstantKind::Priority => self.draft.priority_definition = value,
            ConstantKind::Type => self.draft.type_definition = value,
        }
    }

    /// Focus walk over the main step; the vocabulary selectors are absent
    /// until a project is picked, so the walk skips them.
    fn bump_main_focus(&mut self, delta: isize) {
        let len = ADD_FIELDS as isize;
        let mut next = self.main_focus as isize;
        for _ in 0..ADD_FIELDS {
            next = (next + delta).rem_euclid(len);
            let field = next as usize;
            let vocab_field = matches!(field, ADD_STATUS | ADD_PRIORITY | ADD_TYPE);
            if !vocab_field || self.vocab.is_some() {
                self.main_focus = field;
                return;
            }
        }
    }

    /// Handle one key; `Some` when the wizard is done.
    pub fn handle_key(&mut self, key: &KeyEvent) -> Option<FormExit> {
        self.status_line = None;
        // The description editor gets first refusal so its shortcuts
        // (Ctrl+B/I/K, Alt+heading) win while it has focus. Tab, Esc,
        // paging and Ctrl+S pass through it.
        if self.wizard.active() == STEP_MAIN
            && self.main_focus == ADD_DESCRIPTION
            && self.editor.handle_key(key)
        {
            if let Some(html) = self.editor.take_change() {
                self.draft.description = html;
            }
            return None;
        }
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
            STEP_ASSIGN => self.handle_assign_key(key),
            STEP_FILES => self.handle_files_key(key),
            _ => {}
        }
        None
    }

    fn handle_main_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Tab => {
                self.bump_main_focus(1);
                return;
            }
            KeyCode::BackTab => {
                self.bump_main_focus(-1);
                return;
            }
            _ => {}
        }
        match self.main_focus {
            ADD_PROJECT => match key.code {
                KeyCode::Left => self.cycle_project(-1),
                KeyCode::Right | KeyCode::Enter => self.cycle_project(1),
                _ => {}
            },
            ADD_TITLE => {
                if matches!(key.code, KeyCode::Char(_))
                    && self.title.value().chars().count() >= MAX_TITLE_CHARS
                {
                    self.status_line = Some((
                        format!("Title is capped at {MAX_TITLE_CHARS} characters."),
                        false,
                    ));
                    return;
                }
                self.title.handle_key(key);
            }
            ADD_DATE_START => {
                self.date_start.handle_key(key);
            }
            ADD_DATE_END => {
                self.date_end.handle_key(key);
            }
            ADD_STATUS => {
                if let Some(delta) = selector_delta(key) {
                    self.cycle_vocab(ConstantKind::Status, delta);
                }
            }
            ADD_PRIORITY => {
                if let Some(delta) = selector_delta(key) {
                    self.cycle_vocab(ConstantKind::Priority, delta);
                }
            }
            ADD_TYPE => {
                if let Some(delta) = selector_delta(key) {
                    self.cycle_vocab(ConstantKind::Type, delta);
                }
            }
            _ => {}
        }
    }

    fn handle_assign_key(&mut self, key: &KeyEvent) {
        if let Some(focus) = assign_focus_switch(key, self.assign_focus) {
            self.assign_focus = focus;
            return;
        }
        match self.assign_focus {
            AssignFocus::Search => {
                let matches = self
                    .draft
                    .assignable_matches(&self.users_pool, self.search.value());
                match key.code {
                    KeyCode::Up => self.match_cursor = self.match_cursor.saturating_sub(1),
                    KeyCode::Down => {
                        if self.match_cursor + 1 < matches.len() {
                            self.match_cursor += 1;
                        }
                    }
                    KeyCode::Enter => {
                        if let Some(user) = matches.get(self.match_cursor) {
                            self.draft.add_user(user.clone());
                            self.search.clear();
                            self.match_cursor = 0;
                        }
                    }
                    _ => {
                        if self.search.handle_key(key) {
                            self.match_cursor = 0;
                        }
                    }
                }
            }
            AssignFocus::Selected => match key.code {
                KeyCode::Up => self.selected_cursor = self.selected_cursor.saturating_sub(1),
                KeyCode::Down => {
                    if self.selected_cursor + 1 < self.draft.users.len() {
                        self.selected_cursor += 1;
                    }
                }
                KeyCode::Delete | KeyCode::Backspace => {
                    if let Some(user) = self.draft.users.get(self.selected_cursor) {
                        let id = user.id.clone();
                        self.draft.remove_user(&id);
                        self.selected_cursor = self
                            .selected_cursor
                            .min(self.draft.users.len().saturating_sub(1));
                        self.member_cursor = 0;
                    }
                }
                _ => {}
            },
            AssignFocus::NewSubtask => match key.code {
                KeyCode::Enter => {
                    let value = self.subtask_input.value().to_string();
                    if self.draft.add_subtask(&value).is_some() {
                        self.subtask_input.clear();
                        self.subtask_cursor = self.draft.subtasks.len() - 1;
                    }
                }
                _ => {
                    self.subtask_input.handle_key(key);
                }
            },
            AssignFocus::Subtasks => match key.code {
                KeyCode::Up => self.subtask_cursor = self.subtask_cursor.saturating_sub(1),
                KeyCode::Down => {
                    if self.subtask_cursor + 1 < self.draft.subtasks.len() {
                        self.subtask_cursor += 1;
                    }
                }
                KeyCode::Left => self.cycle_member(-1),
                KeyCode::Right => self.cycle_member(1),
                KeyCode::Enter => {
                    let subtask_id = self.draft.subtasks.get(self.subtask_cursor).map(|s| s.id);
                    let user_id = self.draft.users.get(self.member_cursor).map(|u| u.id.clone());
                    if let (Some(sid), Some(uid)) = (subtask_id, user_id) {
                        self.draft.toggle_subtask_user(sid, &uid);
                    }
                }
                KeyCode::Delete | KeyCode::Backspace => {
                    if let Some(subtask) = self.draft.subtasks.get(self.subtask_cursor) {
                        let id = subtask.id;
                        self.draft.remove_subtask(id);
                        self.subtask_cursor = self
                            .subtask_cursor
                            .min(self.draft.subtasks.len().saturating_sub(1));
                    }
                }
                _ => {}
            },
        }
    }

    fn cycle_member(&mut self, delta: isize) {
        if self.draft.users.is_empty() {
            return;
        }
        let len = self.draft.users.len() as isize;
        self.member_cursor = (self.member_cursor as isize + delta).rem_euclid(len) as usize;
    }

    fn handle_files_key(&mut self, key: &KeyEvent) {
        attach_key(
            key,
            &mut self.attach_focus,
            &mut self.path_input,
            &mut self.file_cursor,
            &mut self.draft.attachments,
            &mut self.status_line,
        );
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
        let payload = self.draft.payload(&self.identity.user_code);
        let client = self.client.clone();
        self.jobs.spawn(move || {
            match client.post::<Value, _>("tasks/setTask", &payload) {
                Ok(env) if env.status => TaskMsg::Submitted(Ok(done_message(env.message))),
                Ok(env) => TaskMsg::Submitted(Err(env.user_message().to_string())),
                Err(e) => TaskMsg::Submitted(Err(e.user_message().to_string())),
            }
        });
    }

    /// Apply finished background work; `Some` when the wizard is done.
    pub fn tick(&mut self) -> Option<FormExit> {
        for msg in self.jobs.drain() {
            match msg {
                TaskMsg::Refs(Ok((meta, users))) => {
                    self.vocab = Some(meta);
                    self.users_pool = users;
                    self.loading_refs = false;
                }
                TaskMsg::Refs(Err(message)) => {
                    self.loading_refs = false;
                    self.status_line = Some((message, true));
                }
                TaskMsg::Submitted(Ok(message)) => return Some(FormExit::Done(message)),
                TaskMsg::Submitted(Err(message)) => {
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

        let outer = Block::default().borders(Borders::ALL).title(" New Task ");
        let inner = outer.inner(chunks[1]);
        f.render_widget(outer, chunks[1]);

        match self.wizard.active() {
            STEP_MAIN => self.render_main(f, inner),
            STEP_ASSIGN => self.render_assign(f, inner),
            STEP_FILES => self.render_files(f, inner),
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
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area);

        let project_label = match self.project_index {
            Some(i) => self.projects[i].definition.clone(),
            None => "(none)".to_string(),
        };
        render_selector(
            f,
            rows[0],
            " Project ",
            &project_label,
            self.main_focus == ADD_PROJECT,
        );

        render_input(f, rows[1], "Title", &self.title, self.main_focus == ADD_TITLE);
        render_editor(f, rows[2], &self.editor, self.main_focus == ADD_DESCRIPTION);

        let dates = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[3]);
        render_input(
            f,
            dates[0],
            "Start date (YYYY-MM-DD)",
            &self.date_start,
            self.main_focus == ADD_DATE_START,
        );
        render_input(
            f,
            dates[1],
            "End date (YYYY-MM-DD)",
            &self.date_end,
            self.main_focus == ADD_DATE_END,
        );

        if self.vocab.is_some() {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(33),
                    Constraint::Percentage(33),
                    Constraint::Percentage(34),
                ])
                .split(rows[4]);
            for (i, (kind, title, field)) in [
                (ConstantKind::Status, " Status ", ADD_STATUS),
                (ConstantKind::Priority, " Priority ", ADD_PRIORITY),
                (ConstantKind::Type, " Type ", ADD_TYPE),
            ]
            .into_iter()
            .enumerate()
            {
                let value = self.vocab_value(kind);
                let label = if value.is_empty() { "(pick)" } else { value };
                render_selector(f, cols[i], title, label, self.main_focus == field);
            }
        } else {
            let note = if self.loading_refs {
                "Loading project vocabularies..."
            } else {
                "Select a project to load statuses, priorities and types."
            };
            let widget = Paragraph::new(note)
                .style(Style::default().fg(colors::DIM))
                .alignment(Alignment::Center);
            f.render_widget(widget, rows[4]);
        }
    }

    fn render_assign(&self, f: &mut Frame, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(cols[0]);

        render_input(
            f,
            left[0],
            "Search members",
            &self.search,
            self.assign_focus == AssignFocus::Search,
        );

        let matches = self
            .draft
            .assignable_matches(&self.users_pool, self.search.value());
        let match_lines = list_lines(
            matches.iter().map(|u| u.name.clone()),
            self.match_cursor,
            self.assign_focus == AssignFocus::Search,
        );
        let match_widget = Paragraph::new(match_lines).block(panel_block(
            format!(" Matches ({}) ", matches.len()),
            self.assign_focus == AssignFocus::Search,
        ));
        f.render_widget(match_widget, left[1]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(40),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(cols[1]);

        let selected_lines = list_lines(
            self.draft.users.iter().map(|u| u.name.clone()),
            self.selected_cursor,
            self.assign_focus == AssignFocus::Selected,
        );
        let selected_widget = Paragraph::new(selected_lines).block(panel_block(
            format!(" Selected ({}) ", self.draft.users.len()),
            self.assign_focus == AssignFocus::Selected,
        ));
        f.render_widget(selected_widget, right[0]);

        render_input(
            f,
            right[1],
            "New subtask",
            &self.subtask_input,
            self.assign_focus == AssignFocus::NewSubtask,
        );

        let subtasks_focused = self.assign_focus == AssignFocus::Subtasks;
        let subtask_lines = list_lines(
            self.draft.subtasks.iter().map(|s| {
                let assigned: Vec<&str> = s
                    .assigned_user_ids
                    .iter()
                    .filter_map(|id| {
                        self.draft
                            .users
                            .iter()
                            .find(|u| &u.id == id)
                            .map(|u| u.name.as_str())
                    })
                    .collect();
                if assigned.is_empty() {
                    s.title.clone()
                } else {
                    format!("{}  ({})", s.title, assigned.join(", "))
                }
            }),
            self.subtask_cursor,
            subtasks_focused,
        );
        let toggle_target = self.draft.users.get(self.member_cursor).map(|u| u.name.as_str());
        let subtask_title =
            subtask_panel_title(self.draft.subtasks.len(), toggle_target, subtasks_focused);
        let subtask_widget =
            Paragraph::new(subtask_lines).block(panel_block(subtask_title, subtasks_focused));
        f.render_widget(subtask_widget, right[2]);
    }

    fn render_files(&self, f: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);
        render_input(
            f,
            rows[0],
            "Add file by path",
            &self.path_input,
            self.attach_focus == AttachFocus::PathInput,
        );
        render_file_panel(
            f,
            rows[1],
            &self.draft.attachments,
            self.file_cursor,
            self.attach_focus == AttachFocus::Files,
        );
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let (text, is_error) = match &self.status_line {
            Some((msg, err)) if !msg.is_empty() => (msg.clone(), *err),
            _ => {
                let editor_focused =
                    self.wizard.active() == STEP_MAIN && self.main_focus == ADD_DESCRIPTION;
                (step_hint(self.wizard.active(), editor_focused).to_string(), false)
            }
        };
        render_status(f, area, &text, is_error);
    }
}

// ---------------------------------------------------------------------------
// Editing

#[derive(Debug)]
pub struct TaskEditScreen {
    client: ApiClient,
    identity: Identity,
    wizard: Wizard,
    draft: TaskEditDraft,
    /// Files already on the server, shown read-only next to new uploads.
    server_files: Vec<TaskFileRow>,

    title: InputField,
    editor: DescriptionEditor,
    date_start: InputField,
    date_end: InputField,
    main_focus: usize,

    assign_focus: AssignFocus,
    search: InputField,
    match_cursor: usize,
    selected_cursor: usize,
    subtask_input: InputField,
    subtask_cursor: usize,
    member_cursor: usize,

    attach_focus: AttachFocus,
    path_input: InputField,
    file_cursor: usize,

    jobs: Jobs<TaskMsg>,
    status_line: Option<(String, bool)>,
    submitting: bool,
}

impl TaskEditScreen {
    /// Fetches the full edit details and hydrates the draft from them.
    pub fn new(client: &ApiClient, identity: &Identity, task_id: &str) -> Result<Self, String> {
        let env = client
            .get::<TaskEditDetails>(
                "tasks/getDetailsForTaskEdit",
                &[
                    ("user_code", identity.user_code.clone()),
                    ("task_id", task_id.to_string()),
                ],
            )
            .map_err(|e| e.user_message().to_string())?;
        if !env.status {
            return Err(env.user_message().to_string());
        }
        let details = env.data.unwrap_or_else(|| TaskEditDetails {
            task: TaskEditTask::default(),
            users: TaskEditPools::default(),
            attachments: Vec::new(),
            subtasks: Vec::new(),
        });
        let server_files = details.attachments.clone();
        let draft = TaskEditDraft::from_response(task_id, details);
        Ok(Self::build(client.clone(), identity.clone(), draft, server_files))
    }

    fn build(
        client: ApiClient,
        identity: Identity,
        draft: TaskEditDraft,
        server_files: Vec<TaskFileRow>,
    ) -> Self {
        let title = InputField::with_value(&draft.title);
        let editor = DescriptionEditor::with_value(&draft.description);
        let date_start = InputField::with_value(&draft.start_date);
        let date_end = InputField::with_value(&draft.end_date);
        TaskEditScreen {
            client,
            identity,
            wizard: Wizard::new(vec!["Main", "Assignment", "Attachments"]),
            draft,
            server_files,
            title,
            editor,
            date_start,
            date_end,
            main_focus: EDIT_TITLE,
            assign_focus: AssignFocus::Search,
            search: InputField::new(),
            match_cursor: 0,
            selected_cursor: 0,
            subtask_input: InputField::new(),
            subtask_cursor: 0,
            member_cursor: 0,
            attach_focus: AttachFocus::PathInput,
            path_input: InputField::new(),
            file_cursor: 0,
            jobs: Jobs::new(),
            status_line: None,
            submitting: false,
        }
    }

    fn commit_main(&mut self) {
        self.draft.title = self.title.value().to_string();
        self.draft.description = self.editor.doc().html();
        self.draft.start_date = self.date_start.value().to_string();
        self.draft.end_date = self.date_end.value().to_string();
    }

    fn vocab_list(&self, kind: ConstantKind) -> &[String] {
        match kind {
            ConstantKind::Status => &self.draft.all_status_definitions,
            ConstantKind::Priority => &self.draft.all_priority_definitions,
            ConstantKind::Type => &self.draft.all_type_definitions,
        }
    }

    fn vocab_value(&self, kind: ConstantKind) -> &str {
        match kind {
            ConstantKind::Status => &self.draft.status_definition,
            ConstantKind::Priority => &self.draft.priority_definition,
            ConstantKind::Type => &self.draft.type_definition,
        }
    }

    fn cycle_vocab(&mut self, kind: ConstantKind, delta: isize) {
        let list = self.vocab_list(kind);
        if list.is_empty() {
            return;
        }
        let len = list.len() as isize;
        let next = match list.iter().position(|v| v == self.vocab_value(kind)) {
            None => {
                if delta >= 0 {
                    0
                } else {
                    len - 1
                }
            }
            Some(i) => (i as isize + delta).rem_euclid(len),
        } as usize;
        let value = list[next].clone();
        match kind {
            ConstantKind::Status => self.draft.status_definition = value,
            ConstantKind::Priority => self.draft.priority_definition = value,
            ConstantKind::Type => self.draft.type_definition = value,
        }
    }

    /// Handle one key; `Some` when the wizard is done.
    pub fn handle_key(&mut self, key: &KeyEvent) -> Option<FormExit> {
        self.status_line = None;
        if self.wizard.active() == STEP_MAIN
            && self.main_focus == EDIT_DESCRIPTION
            && self.editor.handle_key(key)
        {
            if let Some(html) = self.editor.take_change() {
                self.draft.description = html;
            }
            return None;
        }
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
            STEP_ASSIGN => self.handle_assign_key(key),
            STEP_FILES => self.handle_files_key(key),
            _ => {}
        }
        None
    }

    fn handle_main_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Tab => {
                self.main_focus = (self.main_focus + 1) % EDIT_FIELDS;
                return;
            }
            KeyCode::BackTab => {
                self.main_focus = (self.main_focus + EDIT_FIELDS - 1) % EDIT_FIELDS;
                return;
            }
            _ => {}
        }
        match self.main_focus {
            EDIT_TITLE => {
                if matches!(key.code, KeyCode::Char(_))
                    && self.title.value().chars().count() >= MAX_TITLE_CHARS
                {
                    self.status_line = Some((
                        format!("Title is capped at {MAX_TITLE_CHARS} characters."),
                        false,
                    ));
                    return;
                }
                self.title.handle_key(key);
            }
            EDIT_DATE_START => {
                self.date_start.handle_key(key);
            }
            EDIT_DATE_END => {
                self.date_end.handle_key(key);
            }
            EDIT_STATUS => {
                if let Some(delta) = selector_delta(key) {
                    self.cycle_vocab(ConstantKind::Status, delta);
                }
            }
            EDIT_PRIORITY => {
                if let Some(delta) = selector_delta(key) {
                    self.cycle_vocab(ConstantKind::Priority, delta);
                }
            }
            EDIT_TYPE => {
                if let Some(delta) = selector_delta(key) {
                    self.cycle_vocab(ConstantKind::Type, delta);
                }
            }
            _ => {}
        }
    }

    fn handle_assign_key(&mut self, key: &KeyEvent) {
        if let Some(focus) = assign_focus_switch(key, self.assign_focus) {
            self.assign_focus = focus;
            return;
        }
        match self.assign_focus {
            AssignFocus::Search => {
                let matches = self.draft.assignable_matches(self.search.value());
                match key.code {
                    KeyCode::Up => self.match_cursor = self.match_cursor.saturating_sub(1),
                    KeyCode::Down => {
                        if self.match_cursor + 1 < matches.len() {
                            self.match_cursor += 1;
                        }
                    }
                    KeyCode::Enter => {
                        if let Some(member) = matches.get(self.match_cursor) {
                            let code = member.code.clone();
                            self.draft.assign_user(&code);
                            self.search.clear();
                            self.match_cursor = 0;
                        }
                    }
                    _ => {
                        if self.search.handle_key(key) {
                            self.match_cursor = 0;
                        }
                    }
                }
            }
            AssignFocus::Selected => match key.code {
                KeyCode::Up => self.selected_cursor = self.selected_cursor.saturating_sub(1),
                KeyCode::Down => {
                    if self.selected_cursor + 1 < self.draft.assigned_members.len() {
                        self.selected_cursor += 1;
                    }
                }
                KeyCode::Delete | KeyCode::Backspace => {
                    if let Some(member) = self.draft.assigned_members.get(self.selected_cursor) {
                        let code = member.code.clone();
                        self.draft.unassign_user(&code);
                        self.selected_cursor = self
                            .selected_cursor
                            .min(self.draft.assigned_members.len().saturating_sub(1));
                        self.member_cursor = 0;
                    }
                }
                _ => {}
            },
            AssignFocus::NewSubtask => match key.code {
                KeyCode::Enter => {
                    let value = self.subtask_input.value().to_string();
                    if self.draft.add_subtask(&value).is_some() {
                        self.subtask_input.clear();
                        self.subtask_cursor = self.draft.subtasks.len() - 1;
                    }
                }
                _ => {
                    self.subtask_input.handle_key(key);
                }
            },
            AssignFocus::Subtasks => match key.code {
                KeyCode::Up => self.subtask_cursor = self.subtask_cursor.saturating_sub(1),
                KeyCode::Down => {
                    if self.subtask_cursor + 1 < self.draft.subtasks.len() {
                        self.subtask_cursor += 1;
                    }
                }
                KeyCode::Left => self.cycle_member(-1),
                KeyCode::Right => self.cycle_member(1),
                KeyCode::Enter => {
                    let subtask_id = self
                        .draft
                        .subtasks
                        .get(self.subtask_cursor)
                        .map(|s| s.subtask_id);
                    let code = self
                        .draft
                        .assigned_members
                        .get(self.member_cursor)
                        .map(|m| m.code.clone());
                    if let (Some(sid), Some(code)) = (subtask_id, code) {
                        self.draft.toggle_subtask_member(sid, &code);
                    }
                }
                KeyCode::Delete | KeyCode::Backspace => {
                    if let Some(subtask) = self.draft.subtasks.get(self.subtask_cursor) {
                        let id = subtask.subtask_id;
                        self.draft.remove_subtask(id);
                        self.subtask_cursor = self
                            .subtask_cursor
                            .min(self.draft.subtasks.len().saturating_sub(1));
                    }
                }
                _ => {}
            },
        }
    }

    fn cycle_member(&mut self, delta: isize) {
        if self.draft.assigned_members.is_empty() {
            return;
        }
        let len = self.draft.assigned_members.len() as isize;
        self.member_cursor = (self.member_cursor as isize + delta).rem_euclid(len) as usize;
    }

    fn handle_files_key(&mut self, key: &KeyEvent) {
        attach_key(
            key,
            &mut self.attach_focus,
            &mut self.path_input,
            &mut self.file_cursor,
            &mut self.draft.attachments,
            &mut self.status_line,
        );
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
        let payload = self.draft.payload(&self.identity.user_code);
        let client = self.client.clone();
        self.jobs.spawn(move || {
            match client.post::<Value, _>("tasks/completeEdit", &payload) {
                Ok(env) if env.status => TaskMsg::Submitted(Ok(done_message(env.message))),
                Ok(env) => TaskMsg::Submitted(Err(env.user_message().to_string())),
                Err(e) => TaskMsg::Submitted(Err(e.user_message().to_string())),
            }
        });
    }

    /// Apply finished background work; `Some` when the wizard is done.
    pub fn tick(&mut self) -> Option<FormExit> {
        for msg in self.jobs.drain() {
            match msg {
                // The edit flow never refetches.
                TaskMsg::Refs(_) => {}
                TaskMsg::Submitted(Ok(message)) => return Some(FormExit::Done(message)),
                TaskMsg::Submitted(Err(message)) => {
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

        let outer = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Edit Task {} ", self.draft.task_id));
        let inner = outer.inner(chunks[1]);
        f.render_widget(outer, chunks[1]);

        match self.wizard.active() {
            STEP_MAIN => self.render_main(f, inner),
            STEP_ASSIGN => self.render_assign(f, inner),
            STEP_FILES => self.render_files(f, inner),
            _ => {}
        }

        self.render_status_bar(f, chunks[2]);
    }

    fn render_main(&self, f: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area);

        render_input(f, rows[0], "Title", &self.title, self.main_focus == EDIT_TITLE);
        render_editor(f, rows[1], &self.editor, self.main_focus == EDIT_DESCRIPTION);

        let dates = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[2]);
        render_input(
            f,
            dates[0],
            "Start date (YYYY-MM-DD)",
            &self.date_start,
            self.main_focus == EDIT_DATE_START,
        );
        render_input(
            f,
            dates[1],
            "End date (YYYY-MM-DD)",
            &self.date_end,
            self.main_focus == EDIT_DATE_END,
        );

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(33),
                Constraint::Percentage(33),
                Constraint::Percentage(34),
            ])
            .split(rows[3]);
        for (i, (kind, title, field)) in [
            (ConstantKind::Status, " Status ", EDIT_STATUS),
            (ConstantKind::Priority, " Priority ", EDIT_PRIORITY),
            (ConstantKind::Type, " Type ", EDIT_TYPE),
        ]
        .into_iter()
        .enumerate()
        {
            let value = self.vocab_value(kind);
            let label = if value.is_empty() { "(pick)" } else { value };
            render_selector(f, cols[i], title, label, self.main_focus == field);
        }
    }

    fn render_assign(&self, f: &mut Frame, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(cols[0]);

        render_input(
            f,
            left[0],
            "Search members",
            &self.search,
            self.assign_focus == AssignFocus::Search,
        );

        let matches = self.draft.assignable_matches(self.search.value());
        let match_lines = list_lines(
            matches.iter().map(|m| m.name.clone()),
            self.match_cursor,
            self.assign_focus == AssignFocus::Search,
        );
        let match_widget = Paragraph::new(match_lines).block(panel_block(
            format!(" Matches ({}) ", matches.len()),
            self.assign_focus == AssignFocus::Search,
        ));
        f.render_widget(match_widget, left[1]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(40),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(cols[1]);

        let selected_lines = list_lines(
            self.draft.assigned_members.iter().map(|m| m.name.clone()),
            self.selected_cursor,
            self.assign_focus == AssignFocus::Selected,
        );
        let selected_widget = Paragraph::new(selected_lines).block(panel_block(
            format!(" Assigned ({}) ", self.draft.assigned_members.len()),
            self.assign_focus == AssignFocus::Selected,
        ));
        f.render_widget(selected_widget, right[0]);

        render_input(
            f,
            right[1],
            "New subtask",
            &self.subtask_input,
            self.assign_focus == AssignFocus::NewSubtask,
        );

        let subtasks_focused = self.assign_focus == AssignFocus::Subtasks;
        let subtask_lines = list_lines(
            self.draft.subtasks.iter().map(|s| {
                let assigned: Vec<&str> = s.assigned.iter().map(|m| m.name.as_str()).collect();
                if assigned.is_empty() {
                    s.description.clone()
                } else {
                    format!("{}  ({})", s.description, assigned.join(", "))
                }
            }),
            self.subtask_cursor,
            subtasks_focused,
        );
        let toggle_target = self
            .draft
            .assigned_members
            .get(self.member_cursor)
            .map(|m| m.name.as_str());
        let subtask_title =
            subtask_panel_title(self.draft.subtasks.len(), toggle_target, subtasks_focused);
        let subtask_widget =
            Paragraph::new(subtask_lines).block(panel_block(subtask_title, subtasks_focused));
        f.render_widget(subtask_widget, right[2]);
    }

    fn render_files(&self, f: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Percentage(40),
                Constraint::Min(0),
            ])
            .split(area);

        render_input(
            f,
            rows[0],
            "Add file by path",
            &self.path_input,
            self.attach_focus == AttachFocus::PathInput,
        );

        let server_lines: Vec<Line<'static>> = self
            .server_files
            .iter()
            .map(|file| {
                Line::from(Span::styled(
                    format!("  {}", file.name),
                    Style::default().fg(colors::DIM),
                ))
            })
            .collect();
        let server_widget = Paragraph::new(server_lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors::DIM))
                .title(format!(" On server ({}) ", self.server_files.len())),
        );
        f.render_widget(server_widget, rows[1]);

        render_file_panel(
            f,
            rows[2],
            &self.draft.attachments,
            self.file_cursor,
            self.attach_focus == AttachFocus::Files,
        );
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let (text, is_error) = match &self.status_line {
            Some((msg, err)) if !msg.is_empty() => (msg.clone(), *err),
            _ => {
                let editor_focused =
                    self.wizard.active() == STEP_MAIN && self.main_focus == EDIT_DESCRIPTION;
                (step_hint(self.wizard.active(), editor_focused).to_string(), false)
            }
        };
        render_status(f, area, &text, is_error);
    }
}

// ---------------------------------------------------------------------------
// Fetches

/// Projects the caller may create tasks under.
fn fetch_task_projects(client: &ApiClient, user_code: &str) -> Result<Vec<ProjectOption>, String> {
    match client.get::<ProjectsForTaskData>(
        "tasks/getProjectsForTask",
        &[("user_code", user_code.to_string())],
    ) {
        Ok(env) if env.status => Ok(env.data.map(|d| d.projects).unwrap_or_default()),
        Ok(env) => Err(env.user_message().to_string()),
        Err(e) => Err(e.user_message().to_string()),
    }
}

/// One worker fetch for everything that depends on the picked project.
fn fetch_project_refs(client: &ApiClient, project_code: &str) -> TaskMsg {
    let params = [("project_code", project_code.to_string())];
    let meta = match client.get::<ProjectMeta>("project/getProjectConstants", &params) {
        Ok(env) if env.status => env.data.unwrap_or_default(),
        Ok(env) => return TaskMsg::Refs(Err(env.user_message().to_string())),
        Err(e) => return TaskMsg::Refs(Err(e.user_message().to_string())),
    };
    match client.get::<ProjectUsersData>("project/projectUsers", &params) {
        Ok(env) if env.status => {
            TaskMsg::Refs(Ok((meta, env.data.map(|d| d.users).unwrap_or_default())))
        }
        Ok(env) => TaskMsg::Refs(Err(env.user_message().to_string())),
        Err(e) => TaskMsg::Refs(Err(e.user_message().to_string())),
    }
}

// ---------------------------------------------------------------------------
// Shared key handling and rendering

fn selector_delta(key: &KeyEvent) -> Option<isize> {
    match key.code {
        KeyCode::Left => Some(-1),
        KeyCode::Right | KeyCode::Enter => Some(1),
        _ => None,
    }
}

fn assign_focus_switch(key: &KeyEvent, current: AssignFocus) -> Option<AssignFocus> {
    match key.code {
        KeyCode::Tab => Some(match current {
            AssignFocus::Search => AssignFocus::Selected,
            AssignFocus::Selected => AssignFocus::NewSubtask,
            AssignFocus::NewSubtask => AssignFocus::Subtasks,
            AssignFocus::Subtasks => AssignFocus::Search,
        }),
        KeyCode::BackTab => Some(match current {
            AssignFocus::Search => AssignFocus::Subtasks,
            AssignFocus::Selected => AssignFocus::Search,
            AssignFocus::NewSubtask => AssignFocus::Selected,
            AssignFocus::Subtasks => AssignFocus::NewSubtask,
        }),
        _ => None,
    }
}

/// Attachment-step keys, identical in both flows.
fn attach_key(
    key: &KeyEvent,
    focus: &mut AttachFocus,
    path_input: &mut InputField,
    file_cursor: &mut usize,
    attachments: &mut AttachmentCollector,
    status_line: &mut Option<(String, bool)>,
) {
    match key.code {
        KeyCode::Tab | KeyCode::BackTab => {
            *focus = match focus {
                AttachFocus::PathInput => AttachFocus::Files,
                AttachFocus::Files => AttachFocus::PathInput,
            };
            return;
        }
        _ => {}
    }
    match focus {
        AttachFocus::PathInput => match key.code {
            KeyCode::Enter => {
                let raw = path_input.value().trim().to_string();
                if raw.is_empty() {
                    return;
                }
                match attachments.add_path(Path::new(&raw)) {
                    Ok(()) => {
                        path_input.clear();
                        let note = match attachments.files().last() {
                            Some(a) if a.size > SIZE_WARN_BYTES => format!(
                                "Added {} ({}), large upload",
                                a.name,
                                format_file_size(a.size)
                            ),
                            Some(a) => {
                                format!("Added {} ({})", a.name, format_file_size(a.size))
                            }
                            None => "Added.".to_string(),
                        };
                        *status_line = Some((note, false));
                    }
                    Err(e) => {
                        // The bad path stays in the input for correction.
                        *status_line = Some((e.to_string(), true));
                    }
                }
            }
            _ => {
                path_input.handle_key(key);
            }
        },
        AttachFocus::Files => match key.code {
            KeyCode::Up => *file_cursor = file_cursor.saturating_sub(1),
            KeyCode::Down => {
                if *file_cursor + 1 < attachments.len() {
                    *file_cursor += 1;
                }
            }
            KeyCode::Delete | KeyCode::Backspace => {
                if let Some(removed) = attachments.remove(*file_cursor) {
                    *file_cursor = (*file_cursor).min(attachments.len().saturating_sub(1));
                    *status_line = Some((format!("Removed {}", removed.name), false));
                }
            }
            KeyCode::Char('s') => match attachments.save_to(Path::new("."), *file_cursor) {
                Ok(path) => {
                    *status_line = Some((format!("Saved to {}", path.display()), false));
                }
                Err(e) => {
                    *status_line = Some((e.to_string(), true));
                }
            },
            _ => {}
        },
    }
}

fn step_hint(step: usize, editor_focused: bool) -> &'static str {
    match step {
        STEP_MAIN if editor_focused => {
            "Ctrl+B/I marks | Ctrl+K code | Alt+1-3 heading, Alt+0 paragraph"
        }
        STEP_MAIN => "Tab field | ←→ select | PgUp/PgDn step | Esc cancel",
        STEP_ASSIGN => "Tab zone | Enter add/toggle | Del remove | ←→ member to toggle",
        _ => "Enter add path | Del remove | s save to disk | Ctrl+S finish",
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

fn render_selector(f: &mut Frame, area: Rect, title: &str, label: &str, focused: bool) {
    let widget =
        Paragraph::new(format!("◄ {label} ►")).block(panel_block(title.to_string(), focused));
    f.render_widget(widget, area);
}

fn render_editor(f: &mut Frame, area: Rect, editor: &DescriptionEditor, focused: bool) {
    let marks = editor.marks_hint();
    let title = if marks.is_empty() {
        " Description ".to_string()
    } else {
        format!(" Description [{marks}] ")
    };
    let widget = Paragraph::new(editor.lines(focused)).block(panel_block(title, focused));
    f.render_widget(widget, area);
}

fn render_status(f: &mut Frame, area: Rect, text: &str, is_error: bool) {
    let style = if is_error {
        Style::default().bg(colors::ERROR).fg(colors::STATUS_FG)
    } else {
        Style::default().bg(colors::STATUS_BG).fg(colors::STATUS_FG)
    };
    f.render_widget(
        Paragraph::new(text.to_string())
            .style(style)
            .alignment(Alignment::Left),
        area,
    );
}

fn render_file_panel(
    f: &mut Frame,
    area: Rect,
    attachments: &AttachmentCollector,
    cursor: usize,
    focused: bool,
) {
    let lines = list_lines(
        attachments.files().iter().map(|a| {
            format!(
                "{}  [{}]  {}",
                a.name,
                a.kind().label(),
                format_file_size(a.size)
            )
        }),
        cursor,
        focused,
    );
    let widget = Paragraph::new(lines).block(panel_block(
        format!(
            " Files ({}, {}) ",
            attachments.len(),
            format_file_size(attachments.total_size())
        ),
        focused,
    ));
    f.render_widget(widget, area);
}

fn subtask_panel_title(count: usize, member: Option<&str>, focused: bool) -> String {
    match member {
        Some(name) if focused => format!(" Subtasks ({count})  [◄ {name} ►] "),
        _ => format!(" Subtasks ({count}) "),
    }
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
    use crate::models::MemberRef;
    use crate::richtext::BlockKind;
    use crate::session::Role;

    fn identity() -> Identity {
        Identity {
            key: "k".to_string(),
            user_code: "u0".to_string(),
            role: Role::Member,
            full_name: Some("Test User".to_string()),
        }
    }

    fn projects() -> Vec<ProjectOption> {
        vec![
            ProjectOption {
                code: "P1".to_string(),
                definition: "Portal".to_string(),
            },
            ProjectOption {
                code: "P2".to_string(),
                definition: "Mobile".to_string(),
            },
        ]
    }

    fn meta() -> ProjectMeta {
        ProjectMeta {
            statuses: vec!["Open".to_string(), "Blocked".to_string()],
            priorities: vec!["High".to_string()],
            types: vec!["Bug".to_string(), "Feature".to_string()],
        }
    }

    fn members() -> Vec<ProjectUserRef> {
        vec![
            ProjectUserRef {
                id: "7".to_string(),
                name: "Ayşe Kaya".to_string(),
            },
            ProjectUserRef {
                id: "9".to_string(),
                name: "Mehmet Demir".to_string(),
            },
        ]
    }

    fn add_screen() -> TaskAddScreen {
        let client = ApiClient::new("http://127.0.0.1:1").unwrap();
        TaskAddScreen::build(client, identity(), projects())
    }

    fn edit_screen() -> TaskEditScreen {
        let client = ApiClient::new("http://127.0.0.1:1").unwrap();
        let details = TaskEditDetails {
            task: TaskEditTask {
                project_code: "P1".to_string(),
                title: "Fix login".to_string(),
                description: "<p>Old text</p>".to_string(),
                start_date: "2025-01-01".to_string(),
                end_date: "2025-02-01".to_string(),
                status_definition: "Open".to_string(),
                type_definition: "Bug".to_string(),
                priority_definition: "High".to_string(),
                all_status_definitions: vec!["Open".to_string(), "Closed".to_string()],
                all_type_definitions: vec!["Bug".to_string()],
                all_priority_definitions: vec!["High".to_string(), "Low".to_string()],
            },
            users: TaskEditPools {
                assigned_members: vec![MemberRef {
                    code: "m1".to_string(),
                    name: "Zeynep Çelik".to_string(),
                }],
                unassigned_members: vec![MemberRef {
                    code: "m2".to_string(),
                    name: "Ali Yılmaz".to_string(),
                }],
            },
            attachments: vec![TaskFileRow {
                name: "brief.pdf".to_string(),
            }],
            subtasks: Vec::new(),
        };
        let server_files = details.attachments.clone();
        let draft = TaskEditDraft::from_response("42", details);
        TaskEditScreen::build(client, identity(), draft, server_files)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_project_switch_clears_vocab_and_starts_refetch() {
        let mut screen = add_screen();
        screen.cycle_project(1);
        assert_eq!(screen.draft.project_code.as_deref(), Some("P1"));
        assert!(screen.loading_refs);
        // Pretend the fetch landed, then pick some vocabulary.
        screen.vocab = Some(meta());
        screen.users_pool = members();
        screen.loading_refs = false;
        screen.cycle_vocab(ConstantKind::Status, 1);
        assert_eq!(screen.draft.status_definition, "Open");

        screen.cycle_project(1);
        assert_eq!(screen.draft.project_code.as_deref(), Some("P2"));
        assert!(screen.vocab.is_none());
        assert!(screen.users_pool.is_empty());
        assert!(screen.loading_refs);
        assert!(screen.draft.status_definition.is_empty());
    }

    #[test]
    fn test_reselecting_same_project_keeps_loaded_refs() {
        let mut screen = add_screen();
        screen.projects.truncate(1);
        screen.cycle_project(1);
        screen.vocab = Some(meta());
        screen.users_pool = members();
        screen.loading_refs = false;
        // Wraps back onto the only project; nothing is invalidated.
        screen.cycle_project(1);
        assert!(screen.vocab.is_some());
        assert_eq!(screen.users_pool.len(), 2);
        assert!(!screen.loading_refs);
    }

    #[test]
    fn test_vocab_cycling_wraps() {
        let mut screen = add_screen();
        screen.vocab = Some(meta());
        screen.cycle_vocab(ConstantKind::Type, -1);
        assert_eq!(screen.draft.type_definition, "Feature");
        screen.cycle_vocab(ConstantKind::Type, 1);
        assert_eq!(screen.draft.type_definition, "Bug");
    }

    #[test]
    fn test_focus_walk_skips_vocab_selectors_without_project() {
        let mut screen = add_screen();
        for _ in 0..4 {
            screen.handle_key(&key(KeyCode::Tab));
        }
        assert_eq!(screen.main_focus, ADD_DATE_END);
        screen.handle_key(&key(KeyCode::Tab));
        assert_eq!(screen.main_focus, ADD_PROJECT);
        // With vocabulary loaded the selectors join the walk.
        screen.vocab = Some(meta());
        screen.handle_key(&key(KeyCode::BackTab));
        assert_eq!(screen.main_focus, ADD_TYPE);
    }

    #[test]
    fn test_title_input_stops_at_cap() {
        let mut screen = add_screen();
        screen.main_focus = ADD_TITLE;
        for _ in 0..(MAX_TITLE_CHARS + 10) {
            screen.handle_key(&key(KeyCode::Char('x')));
        }
        assert_eq!(screen.title.value().chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_editor_takes_alt_heading_but_releases_pgdn() {
        let mut screen = add_screen();
        screen.main_focus = ADD_DESCRIPTION;
        for c in "Hi".chars() {
            screen.handle_key(&key(KeyCode::Char(c)));
        }
        screen.handle_key(&KeyEvent::new(KeyCode::Char('1'), KeyModifiers::ALT));
        // Alt+1 became a heading, not a step jump.
        assert_eq!(screen.wizard.active(), STEP_MAIN);
        assert_eq!(screen.editor.doc().blocks()[0].kind, BlockKind::Heading(1));
        screen.handle_key(&key(KeyCode::PageDown));
        assert_eq!(screen.wizard.active(), STEP_ASSIGN);
        assert_eq!(screen.draft.description, "<h1>Hi</h1>");
    }

    #[test]
    fn test_search_enter_adds_member_and_clears_term() {
        let mut screen = add_screen();
        screen.users_pool = members();
        screen.wizard.set_active(STEP_ASSIGN);
        for c in "ay".chars() {
            screen.handle_key(&key(KeyCode::Char(c)));
        }
        screen.handle_key(&key(KeyCode::Enter));
        assert_eq!(screen.draft.users.len(), 1);
        assert_eq!(screen.draft.users[0].id, "7");
        assert!(screen.search.is_empty());
    }

    #[test]
    fn test_subtask_member_toggle_via_keys() {
        let mut screen = add_screen();
        screen.users_pool = members();
        screen.draft.add_user(members()[0].clone());
        screen.wizard.set_active(STEP_ASSIGN);
        screen.assign_focus = AssignFocus::NewSubtask;
        for c in "Tests".chars() {
            screen.handle_key(&key(KeyCode::Char(c)));
        }
        screen.handle_key(&key(KeyCode::Enter));
        assert_eq!(screen.draft.subtasks.len(), 1);
        assert!(screen.subtask_input.is_empty());

        screen.assign_focus = AssignFocus::Subtasks;
        screen.handle_key(&key(KeyCode::Enter));
        assert_eq!(screen.draft.subtasks[0].assigned_user_ids, vec!["7"]);
        screen.handle_key(&key(KeyCode::Enter));
        assert!(screen.draft.subtasks[0].assigned_user_ids.is_empty());
    }

    #[test]
    fn test_submit_without_project_jumps_to_main() {
        let mut screen = add_screen();
        screen.wizard.set_active(STEP_FILES);
        screen.submit();
        assert!(!screen.submitting);
        assert_eq!(screen.wizard.active(), STEP_MAIN);
        let (msg, is_error) = screen.status_line.clone().unwrap();
        assert!(is_error);
        assert_eq!(msg, crate::draft::MSG_PROJECT_REQUIRED);
    }

    #[test]
    fn test_attach_missing_file_reports_error() {
        let mut screen = add_screen();
        screen.wizard.set_active(STEP_FILES);
        for c in "/no/such/file.txt".chars() {
            screen.handle_key(&key(KeyCode::Char(c)));
        }
        screen.handle_key(&key(KeyCode::Enter));
        assert!(screen.draft.attachments.is_empty());
        let (_, is_error) = screen.status_line.clone().unwrap();
        assert!(is_error);
        assert_eq!(screen.path_input.value(), "/no/such/file.txt");
    }

    #[test]
    fn test_edit_screen_hydrates_inputs_from_details() {
        let screen = edit_screen();
        assert_eq!(screen.title.value(), "Fix login");
        assert_eq!(screen.date_start.value(), "2025-01-01");
        assert_eq!(screen.draft.status_definition, "Open");
        assert_eq!(screen.vocab_list(ConstantKind::Priority).len(), 2);
        assert_eq!(screen.server_files.len(), 1);
        assert_eq!(screen.server_files[0].name, "brief.pdf");
    }

    #[test]
    fn test_edit_assign_moves_member_between_pools() {
        let mut screen = edit_screen();
        screen.wizard.set_active(STEP_ASSIGN);
        for c in "al".chars() {
            screen.handle_key(&key(KeyCode::Char(c)));
        }
        screen.handle_key(&key(KeyCode::Enter));
        assert_eq!(screen.draft.assigned_members.len(), 2);
        assert!(screen.draft.unassigned_members.is_empty());

        screen.assign_focus = AssignFocus::Selected;
        screen.handle_key(&key(KeyCode::Down));
        screen.handle_key(&key(KeyCode::Delete));
        assert_eq!(screen.draft.assigned_members.len(), 1);
        assert_eq!(screen.draft.unassigned_members[0].code, "m2");
    }

    #[test]
    fn test_edit_vocab_cycles_over_fetched_lists() {
        let mut screen = edit_screen();
        screen.cycle_vocab(ConstantKind::Status, 1);
        assert_eq!(screen.draft.status_definition, "Closed");
        screen.cycle_vocab(ConstantKind::Status, 1);
        assert_eq!(screen.draft.status_definition, "Open");
    }
}
