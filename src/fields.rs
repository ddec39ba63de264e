//! Enumerations and field types shared across the client.
//!
//! This module defines the structured vocabulary used throughout the CLI and
//! TUI: project member roles, project status values, task status categories
//! and the eager-save button state machine. System roles live in `session`.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Role a user holds inside a single project.
///
/// `Admin` is the assistant-manager role scoped to one project; it is not the
/// system-wide administrator role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    #[serde(alias = "Admin")]
    Admin,
    #[serde(alias = "Editor")]
    Editor,
    #[serde(alias = "Viewer")]
    Viewer,
}

impl MemberRole {
    /// All roles in selector order.
    pub const ALL: [MemberRole; 3] = [MemberRole::Admin, MemberRole::Editor, MemberRole::Viewer];

    /// Wire value sent to the server.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Admin => "admin",
            MemberRole::Editor => "editor",
            MemberRole::Viewer => "viewer",
        }
    }
}

/// Human-readable member role label.
pub fn format_member_role(role: MemberRole) -> &'static str {
    match role {
        MemberRole::Admin => "Assistant Manager",
        MemberRole::Editor => "Editor",
        MemberRole::Viewer => "Viewer",
    }
}

/// Lifecycle status of a project.
///
/// The wire spelling `reseraching` is what the server actually sends; the
/// alias accepts the corrected spelling should the server ever fix it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[serde(rename = "reseraching", alias = "researching")]
    #[value(name = "researching")]
    Researching,
    Started,
    #[serde(rename = "continue")]
    #[value(name = "continue")]
    Ongoing,
    Finished,
    Canceled,
}

impl ProjectStatus {
    /// Wire value sent to the server.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Researching => "reseraching",
            ProjectStatus::Started => "started",
            ProjectStatus::Ongoing => "continue",
            ProjectStatus::Finished => "finished",
            ProjectStatus::Canceled => "canceled",
        }
    }
}

/// Project status label from the raw wire string, falling back to the raw
/// value for anything unrecognised.
pub fn format_project_status_str(raw: &str) -> String {
    match raw {
        "reseraching" | "researching" => "Researching".to_string(),
        "started" => "Started".to_string(),
        "continue" => "Ongoing".to_string(),
        "finished" => "Finished".to_string(),
        "canceled" => "Canceled".to_string(),
        other => other.to_string(),
    }
}

/// Coarse completion category for a task or subtask.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatusCategory {
    #[serde(rename = "continue")]
    #[value(name = "continue")]
    Ongoing,
    Finished,
}

impl TaskStatusCategory {
    /// Wire value sent to the server.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatusCategory::Ongoing => "continue",
            TaskStatusCategory::Finished => "finished",
        }
    }
}

/// Which of the three free-form vocabulary lists a constant item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantKind {
    Status,
    Type,
    Priority,
}

impl ConstantKind {
    pub const ALL: [ConstantKind; 3] =
        [ConstantKind::Status, ConstantKind::Type, ConstantKind::Priority];

    /// Section heading for the constants step.
    pub fn heading(&self) -> &'static str {
        match self {
            ConstantKind::Status => "Statuses",
            ConstantKind::Type => "Types",
            ConstantKind::Priority => "Priorities",
        }
    }
}

/// State machine behind the eager "Save" button on the users and constants
/// steps.
///
/// A save runs idle → saving → succeeded | failed. Both terminal states leave
/// the button inert; any local mutation of the step's slice calls
/// [`SaveState::mark_dirty`] and re-arms the button. While saving, the button
/// stays inert and local mutations do not disturb the in-flight transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
    Succeeded,
    Failed,
}

impl SaveState {
    /// Whether pressing the button should start a save right now.
    pub fn is_actionable(&self) -> bool {
        matches!(self, SaveState::Idle)
    }

    /// Whether a save is currently in flight.
    pub fn is_saving(&self) -> bool {
        matches!(self, SaveState::Saving)
    }

    /// Begin a save. Returns false (and does nothing) unless idle, which is
    /// the in-flight guard: terminal and saving states are inert.
    pub fn begin(&mut self) -> bool {
        if self.is_actionable() {
            *self = SaveState::Saving;
            true
        } else {
            false
        }
    }

    /// Record the outcome of the in-flight save. Ignored unless saving, so a
    /// stale completion cannot resurrect a button the user has since re-armed.
    pub fn complete(&mut self, ok: bool) {
        if *self == SaveState::Saving {
            *self = if ok { SaveState::Succeeded } else { SaveState::Failed };
        }
    }

    /// A local mutation happened; terminal states fall back to idle. Saving
    /// is left alone so the in-flight outcome still lands.
    pub fn mark_dirty(&mut self) {
        if !self.is_saving() {
            *self = SaveState::Idle;
        }
    }

    /// Button caption for the current state.
    pub fn label(&self) -> &'static str {
        match self {
            SaveState::Idle => "Save",
            SaveState::Saving => "Saving...",
            SaveState::Succeeded => "Saved",
            SaveState::Failed => "Save failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_state_happy_path() {
        let mut s = SaveState::default();
        assert_eq!(s, SaveState::Idle);
        assert!(s.begin());
        assert_eq!(s, SaveState::Saving);
        s.complete(true);
        assert_eq!(s, SaveState::Succeeded);
    }

    #[test]
    fn test_save_state_failure_path() {
        let mut s = SaveState::Idle;
        assert!(s.begin());
        s.complete(false);
        assert_eq!(s, SaveState::Failed);
    }

    #[test]
    fn test_terminal_states_are_inert_until_dirty() {
        let mut s = SaveState::Succeeded;
        assert!(!s.begin());
        assert_eq!(s, SaveState::Succeeded);

        s.mark_dirty();
        assert_eq!(s, SaveState::Idle);
        assert!(s.begin());

        let mut f = SaveState::Failed;
        assert!(!f.begin());
        f.mark_dirty();
        assert!(f.begin());
    }

    #[test]
    fn test_in_flight_guard_blocks_second_save() {
        let mut s = SaveState::Idle;
        assert!(s.begin());
        assert!(!s.begin());
        assert_eq!(s, SaveState::Saving);
    }

    #[test]
    fn test_dirty_during_save_keeps_in_flight_outcome() {
        let mut s = SaveState::Idle;
        s.begin();
        s.mark_dirty();
        assert_eq!(s, SaveState::Saving);
        s.complete(false);
        assert_eq!(s, SaveState::Failed);
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut s = SaveState::Idle;
        s.complete(true);
        assert_eq!(s, SaveState::Idle);
    }
}
