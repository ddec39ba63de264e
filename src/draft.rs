//! In-memory draft aggregates behind the four wizard flows.
//!
//! A draft is the single mutable value a wizard screen works on. Step modules
//! mutate it only through the methods here, which carry the invariants:
//! member selections are unique by identifier, the project manager never
//! appears in the generic member pool, and removing a user strips it from
//! every subtask assignment in the same call, so no observable state has a
//! subtask still referencing a removed user.
//!
//! Validation messages use the server's locale so finish-time errors read
//! exactly like server-side `message` strings.

use chrono::NaiveDate;

use crate::attach::AttachmentCollector;
use crate::fields::{ConstantKind, MemberRole};
use crate::models::{
    ConstantPayload, EditSubtaskPayload, ExtraUserPayload, MemberRef, ProjectForEditData,
    ProjectPayload, ProjectUpdatePayload, ProjectUserRef, SubtaskPayload, TaskEditDetails,
    TaskEditPayload, TaskPayload,
};

pub const MSG_DEFINITION_REQUIRED: &str = "Proje tanımı boş olamaz.";
pub const MSG_MANAGER_REQUIRED: &str = "Lütfen bir yönetici seçin.";
pub const MSG_PROJECT_REQUIRED: &str = "Lütfen bir proje seçin.";
pub const MSG_TITLE_REQUIRED: &str = "Görev başlığı boş olamaz.";
pub const MSG_BAD_DATE: &str = "Tarih biçimi geçersiz (YYYY-AA-GG).";

/// Character cap applied to project definitions and task titles.
pub const MAX_TITLE_CHARS: usize = 50;

/// Minimum search-term length before the member search filter activates.
pub const MIN_SEARCH_CHARS: usize = 2;

/// A member selected into a project draft, with its project-scoped role.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedUser {
    pub code: String,
    pub full_name: String,
    pub role: MemberRole,
}

/// One entry of a free-form vocabulary list. Ids are draft-local.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantItem {
    pub id: u64,
    pub name: String,
}

fn valid_date(value: &str) -> bool {
    value.is_empty() || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

// ---------------------------------------------------------------------------
// Project draft

/// Draft of a project under creation or edit.
#[derive(Debug, Clone, Default)]
pub struct ProjectDraft {
    pub manager_code: Option<String>,
    pub date_start: String,
    pub date_end: String,
    pub definition: String,
    pub extra_users: Vec<SelectedUser>,
    pub statuses: Vec<ConstantItem>,
    pub priorities: Vec<ConstantItem>,
    pub types: Vec<ConstantItem>,
    next_item_id: u64,
}

impl ProjectDraft {
    pub fn new() -> Self {
        ProjectDraft {
            next_item_id: 1,
            ..ProjectDraft::default()
        }
    }

    /// Hydrate a draft from the edit-fetch response.
    ///
    /// The server sends a manager-inclusive member list keyed by display
    /// name; the manager is split out into `manager_code` and the rest become
    /// the generic member selection. Members whose code cannot be recovered
    /// from the user pool keep their name as a stand-in code.
    pub fn from_edit_response(data: &ProjectForEditData) -> Self {
        let detail = &data.details.project_detail;
        let manager_code = detail.manager_name.as_ref().and_then(|name| {
            data.users
                .iter()
                .find(|u| &u.full_name == name)
                .map(|u| u.code.clone())
        });

        let mut extra_users = Vec::new();
        for member in &data.details.project_members {
            if member.role == "manager" {
                continue;
            }
            let code = match data.users.iter().find(|u| u.full_name == member.name) {
                Some(user) => user.code.clone(),
                None => {
                    log::warn!("no code for member {:?}; using name", member.name);
                    member.name.clone()
                }
            };
            if manager_code.as_deref() == Some(code.as_str()) {
                continue;
            }
            let role = match member.role.as_str() {
                "admin" => MemberRole::Admin,
                "editor" => MemberRole::Editor,
                _ => MemberRole::Viewer,
            };
            if extra_users.iter().any(|u: &SelectedUser| u.code == code) {
                continue;
            }
            extra_users.push(SelectedUser {
                code,
                full_name: member.name.clone(),
                role,
            });
        }

        let meta = &data.details.project_meta;
        let hydrate = |names: &[String]| -> Vec<ConstantItem> {
            names
                .iter()
                .enumerate()
                .map(|(i, name)| ConstantItem {
                    id: i as u64 + 1,
                    name: name.clone(),
                })
                .collect()
        };
        let statuses = hydrate(&meta.statuses);
        let priorities = hydrate(&meta.priorities);
        let types = hydrate(&meta.types);
        let next_item_id = [&statuses, &priorities, &types]
            .iter()
            .flat_map(|list| list.iter().map(|item| item.id))
            .max()
            .unwrap_or(0)
            + 1;

        ProjectDraft {
            manager_code,
            date_start: detail.date_start.clone(),
            date_end: detail.date_end.clone(),
            definition: detail.name.clone(),
            extra_users,
            statuses,
            priorities,
            types,
            next_item_id,
        }
    }

    /// Change the manager. The new manager is dropped from the generic
    /// member selection in the same update.
    pub fn set_manager(&mut self, code: Option<String>) {
        if let Some(code) = &code {
            self.extra_users.retain(|u| &u.code != code);
        }
        self.manager_code = code;
    }

    /// Add a member with the default viewer role. A second add of the same
    /// code is a no-op, as is adding the current manager.
    pub fn add_user(&mut self, code: &str, full_name: &str) -> bool {
        if self.manager_code.as_deref() == Some(code) {
            return false;
        }
        if self.extra_users.iter().any(|u| u.code == code) {
            return false;
        }
        self.extra_users.push(SelectedUser {
            code: code.to_string(),
            full_name: full_name.to_string(),
            role: MemberRole::Viewer,
        });
        true
    }

    pub fn remove_user(&mut self, code: &str) -> bool {
        let before = self.extra_users.len();
        self.extra_users.retain(|u| u.code != code);
        self.extra_users.len() != before
    }

    pub fn set_user_role(&mut self, code: &str, role: MemberRole) -> bool {
        match self.extra_users.iter_mut().find(|u| u.code == code) {
            Some(user) => {
                user.role = role;
                true
            }
            None => false,
        }
    }

    pub fn constants(&self, kind: ConstantKind) -> &[ConstantItem] {
        match kind {
            ConstantKind::Status => &self.statuses,
            ConstantKind::Type => &self.types,
            ConstantKind::Priority => &self.priorities,
        }
    }

    fn constants_mut(&mut self, kind: ConstantKind) -> &mut Vec<ConstantItem> {
        match kind {
            ConstantKind::Status => &mut self.statuses,
            ConstantKind::Type => &mut self.types,
            ConstantKind::Priority => &mut self.priorities,
        }
    }

    /// Add a vocabulary entry. The name is trimmed; an empty name is
    /// rejected, duplicates are not.
    pub fn add_constant(&mut self, kind: ConstantKind, name: &str) -> Option<u64> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let id = self.next_item_id;
        self.next_item_id += 1;
        let name = name.to_string();
        self.constants_mut(kind).push(ConstantItem { id, name });
        Some(id)
    }

    pub fn remove_constant(&mut self, kind: ConstantKind, id: u64) -> bool {
        let list = self.constants_mut(kind);
        let before = list.len();
        list.retain(|item| item.id != id);
        list.len() != before
    }

    /// Whether any vocabulary entry exists at all; the constants step's save
    /// button stays inert until one does.
    pub fn has_any_constants(&self) -> bool {
        !self.statuses.is_empty() || !self.priorities.is_empty() || !self.types.is_empty()
    }

    /// Finish-time validation. Checks run in the order the form presents the
    /// fields, so the first problem wins.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.definition.trim().is_empty() {
            return Err(MSG_DEFINITION_REQUIRED);
        }
        if self.manager_code.as_deref().unwrap_or("").is_empty() {
            return Err(MSG_MANAGER_REQUIRED);
        }
        if !valid_date(&self.date_start) || !valid_date(&self.date_end) {
            return Err(MSG_BAD_DATE);
        }
        Ok(())
    }

    /// Creation payload from the current snapshot.
    pub fn payload(&self) -> ProjectPayload {
        let constants = |items: &[ConstantItem]| -> Vec<ConstantPayload> {
            items
                .iter()
                .map(|item| ConstantPayload {
                    code: Some(item.id),
                    name: item.name.clone(),
                })
                .collect()
        };
        ProjectPayload {
            manager_code: self.manager_code.clone().unwrap_or_default(),
            date_start: self.date_start.clone(),
            date_end: self.date_end.clone(),
            definition: self.definition.clone(),
            extra_users: self
                .extra_users
                .iter()
                .map(|u| ExtraUserPayload {
                    code: u.code.clone(),
                    role: u.role.as_str().to_string(),
                })
                .collect(),
            statuses: constants(&self.statuses),
            priorities: constants(&self.priorities),
            types: constants(&self.types),
        }
    }

    /// Update payload keyed by the project code.
    pub fn update_payload(&self, project_code: &str) -> ProjectUpdatePayload {
        ProjectUpdatePayload {
            project_code: project_code.to_string(),
            project: self.payload(),
        }
    }
}

// ---------------------------------------------------------------------------
// Task draft (creation)

/// A subtask under construction; `assigned_user_ids` is always a subset of
/// the draft's selected users.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtaskDraft {
    pub id: u64,
    pub title: String,
    pub assigned_user_ids: Vec<String>,
}

/// Draft of a task under creation.
#[derive(Debug, Default)]
pub struct TaskDraft {
    pub project_code: Option<String>,
    pub title: String,
    /// Serialized HTML from the rich text field.
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub status_definition: String,
    pub priority_definition: String,
    pub type_definition: String,
    pub users: Vec<ProjectUserRef>,
    pub subtasks: Vec<SubtaskDraft>,
    pub attachments: AttachmentCollector,
    next_subtask_id: u64,
}

impl TaskDraft {
    pub fn new() -> Self {
        TaskDraft {
            next_subtask_id: 1,
            ..TaskDraft::default()
        }
    }

    /// Select (or clear) the project. Changing projects invalidates the
    /// dependent vocabulary selections; already-selected users are kept and
    /// the caller refetches the member pool.
    pub fn select_project(&mut self, code: Option<String>) {
        if self.project_code == code {
            return;
        }
        self.project_code = code;
        self.status_definition.clear();
        self.priority_definition.clear();
        self.type_definition.clear();
    }

    /// Add a user to the task's pool. A second add of the same id is a no-op.
    pub fn add_user(&mut self, user: ProjectUserRef) -> bool {
        if self.users.iter().any(|u| u.id == user.id) {
            return false;
        }
        self.users.push(user);
        true
    }

    /// Remove a user and cascade the removal into every subtask assignment.
    /// One call, one atomic update.
    pub fn remove_user(&mut self, user_id: &str) -> bool {
        let before = self.users.len();
        self.users.retain(|u| u.id != user_id);
        if self.users.len() == before {
            return false;
        }
        for subtask in &mut self.subtasks {
            subtask.assigned_user_ids.retain(|id| id != user_id);
        }
        true
    }

    /// Users from `pool` matching the search term, excluding ones already
    /// selected. Inactive (returns nothing) until the term reaches
    /// [`MIN_SEARCH_CHARS`].
    pub fn assignable_matches(&self, pool: &[ProjectUserRef], term: &str) -> Vec<ProjectUserRef> {
        if term.chars().count() < MIN_SEARCH_CHARS {
            return Vec::new();
        }
        let needle = term.to_lowercase();
        pool.iter()
            .filter(|u| !self.users.iter().any(|sel| sel.id == u.id))
            .filter(|u| u.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn add_subtask(&mut self, title: &str) -> Option<u64> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let id = self.next_subtask_id;
        self.next_subtask_id += 1;
        self.subtasks.push(SubtaskDraft {
            id,
            title: title.to_string(),
            assigned_user_ids: Vec::new(),
        });
        Some(id)
    }

    pub fn remove_subtask(&mut self, id: u64) -> bool {
        let before = self.subtasks.len();
        self.subtasks.retain(|s| s.id != id);
        self.subtasks.len() != before
    }

    /// Toggle a user on a subtask. Adding only works for users currently in
    /// the task's selected pool.
    pub fn toggle_subtask_user(&mut self, subtask_id: u64, user_id: &str) -> bool {
        let selected = self.users.iter().any(|u| u.id == user_id);
        let Some(subtask) = self.subtasks.iter_mut().find(|s| s.id == subtask_id) else {
            return false;
        };
        if let Some(pos) = subtask.assigned_user_ids.iter().position(|id| id == user_id) {
            subtask.assigned_user_ids.remove(pos);
            true
        } else if selected {
            subtask.assigned_user_ids.push(user_id.to_string());
            true
        } else {
            false
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.project_code.as_deref().unwrap_or("").is_empty() {
            return Err(MSG_PROJECT_REQUIRED);
        }
        if self.title.trim().is_empty() {
            return Err(MSG_TITLE_REQUIRED);
        }
        if !valid_date(&self.start_date) || !valid_date(&self.end_date) {
            return Err(MSG_BAD_DATE);
        }
        Ok(())
    }

    /// Creation payload from the current snapshot.
    pub fn payload(&self, created_by: &str) -> TaskPayload {
        TaskPayload {
            project_code: self.project_code.clone().unwrap_or_default(),
            created_by: created_by.to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            status_definition: self.status_definition.clone(),
            priority_definition: self.priority_definition.clone(),
            type_definition: self.type_definition.clone(),
            attachments: self.attachments.wire_attachments(),
            subtasks: self
                .subtasks
                .iter()
                .map(|s| SubtaskPayload {
                    id: s.id,
                    title: s.title.clone(),
                    assigned_user_ids: s.assigned_user_ids.clone(),
                })
                .collect(),
            users: self.users.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Task draft (edit)

/// A subtask in the edit flow, carrying member objects the way the edit
/// endpoints shape them.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSubtaskDraft {
    pub subtask_id: i64,
    pub description: String,
    pub assigned: Vec<MemberRef>,
}

/// Draft of an existing task being edited, hydrated from
/// `tasks/getDetailsForTaskEdit`.
#[derive(Debug, Default)]
pub struct TaskEditDraft {
    pub task_id: String,
    pub project_code: String,
    pub title: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub status_definition: String,
    pub type_definition: String,
    pub priority_definition: String,
    pub all_status_definitions: Vec<String>,
    pub all_type_definitions: Vec<String>,
    pub all_priority_definitions: Vec<String>,
    pub assigned_members: Vec<MemberRef>,
    pub unassigned_members: Vec<MemberRef>,
    pub attachments: AttachmentCollector,
    pub subtasks: Vec<EditSubtaskDraft>,
    next_subtask_id: i64,
}

impl TaskEditDraft {
    /// Map the fetch response into a draft.
    pub fn from_response(task_id: &str, data: TaskEditDetails) -> Self {
        let task = data.task;
        let subtasks: Vec<EditSubtaskDraft> = data
            .subtasks
            .into_iter()
            .map(|s| EditSubtaskDraft {
                subtask_id: s.subtask_id,
                description: s.description,
                assigned: s.assigned_members,
            })
            .collect();
        let next_subtask_id = subtasks.iter().map(|s| s.subtask_id).max().unwrap_or(0) + 1;
        TaskEditDraft {
            task_id: task_id.to_string(),
            project_code: task.project_code,
            title: task.title,
            description: task.description,
            start_date: task.start_date,
            end_date: task.end_date,
            status_definition: task.status_definition,
            type_definition: task.type_definition,
            priority_definition: task.priority_definition,
            all_status_definitions: task.all_status_definitions,
            all_type_definitions: task.all_type_definitions,
            all_priority_definitions: task.all_priority_definitions,
            assigned_members: data.users.assigned_members,
            unassigned_members: data.users.unassigned_members,
            attachments: AttachmentCollector::new(),
            subtasks,
            next_subtask_id,
        }
    }

    /// Move a user from the unassigned pool into the assigned pool.
    pub fn assign_user(&mut self, code: &str) -> bool {
        let Some(pos) = self.unassigned_members.iter().position(|u| u.code == code) else {
            return false;
        };
        let user = self.unassigned_members.remove(pos);
        self.assigned_members.push(user);
        true
    }

    /// Move a user back to the unassigned pool and strip it from every
    /// subtask in the same update.
    pub fn unassign_user(&mut self, code: &str) -> bool {
        let Some(pos) = self.assigned_members.iter().position(|u| u.code == code) else {
            return false;
        };
        let user = self.assigned_members.remove(pos);
        for subtask in &mut self.subtasks {
            subtask.assigned.retain(|m| m.code != code);
        }
        self.unassigned_members.push(user);
        true
    }

    /// Matches from the unassigned pool; same activation rule as the
    /// creation flow.
    pub fn assignable_matches(&self, term: &str) -> Vec<MemberRef> {
        if term.chars().count() < MIN_SEARCH_CHARS {
            return Vec::new();
        }
        let needle = term.to_lowercase();
        self.unassigned_members
            .iter()
            .filter(|u| u.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn add_subtask(&mut self, title: &str) -> Option<i64> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let id = self.next_subtask_id;
        self.next_subtask_id += 1;
        self.subtasks.push(EditSubtaskDraft {
            subtask_id: id,
            description: title.to_string(),
            assigned: Vec::new(),
        });
        Some(id)
    }

    pub fn remove_subtask(&mut self, subtask_id: i64) -> bool {
        let before = self.subtasks.len();
        self.subtasks.retain(|s| s.subtask_id != subtask_id);
        self.subtasks.len() != before
    }

    /// Toggle a member on a subtask; adding requires the member to be in the
    /// task's assigned pool.
    pub fn toggle_subtask_member(&mut self, subtask_id: i64, code: &str) -> bool {
        let member = self.assigned_members.iter().find(|m| m.code == code).cloned();
        let Some(subtask) = self.subtasks.iter_mut().find(|s| s.subtask_id == subtask_id) else {
            return false;
        };
        if let Some(pos) = subtask.assigned.iter().position(|m| m.code == code) {
            subtask.assigned.remove(pos);
            true
        } else if let Some(member) = member {
            subtask.assigned.push(member);
            true
        } else {
            false
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err(MSG_TITLE_REQUIRED);
        }
        if !valid_date(&self.start_date) || !valid_date(&self.end_date) {
            return Err(MSG_BAD_DATE);
        }
        Ok(())
    }

    /// Update payload keyed by the task id.
    pub fn payload(&self, edited_by: &str) -> TaskEditPayload {
        TaskEditPayload {
            task_id: self.task_id.clone(),
            edited_by: edited_by.to_string(),
            project_code: self.project_code.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            status_definition: self.status_definition.clone(),
            type_definition: self.type_definition.clone(),
            priority_definition: self.priority_definition.clone(),
            all_status_definitions: self.all_status_definitions.clone(),
            all_type_definitions: self.all_type_definitions.clone(),
            all_priority_definitions: self.all_priority_definitions.clone(),
            assigned_members: self.assigned_members.clone(),
            unassigned_members: self.unassigned_members.clone(),
            attachments: self.attachments.wire_attachments(),
            subtasks_raw: self
                .subtasks
                .iter()
                .map(|s| EditSubtaskPayload {
                    subtask_id: s.subtask_id,
                    description: s.description.clone(),
                    assigned_members: s.assigned.clone(),
                })
                .collect(),
        }
    }
}
