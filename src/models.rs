//! Wire-level data shapes for the server API.
//!
//! Field names and casing follow the server exactly, including its mixed
//! snake/camel conventions (`start_date` in fetches, `startDate` in submit
//! payloads). Responses lean on `#[serde(default)]` so a sparse server answer
//! never fails the whole decode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fields::{ProjectStatus, TaskStatusCategory};
use crate::session::Role;

// ---------------------------------------------------------------------------
// Authentication

#[derive(Debug, Clone, Serialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub key: String,
}

/// Answer to `auth/check`. `auth` carries the user code when the key is
/// valid, null otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthCheckData {
    pub auth: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUserPayload {
    pub email: String,
    /// Sent as null when empty, matching what the server expects.
    pub phone: Option<String>,
    pub name: String,
    pub surname: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateUserPayload {
    pub code: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: Option<String>,
    /// Null means "leave the password unchanged".
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivationPayload {
    pub code: String,
}

// ---------------------------------------------------------------------------
// Reference users

/// A user as listed for manager/member selection: `{code, full_name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub code: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsersForProjectData {
    #[serde(default)]
    pub users: Vec<UserRef>,
}

/// A project member as the task endpoints shape it: `{id, name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectUserRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectUsersData {
    #[serde(default)]
    pub users: Vec<ProjectUserRef>,
}

/// A member in the task-edit pools: `{code, name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRef {
    pub code: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// User administration

#[derive(Debug, Clone, Deserialize)]
pub struct AdminUser {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub code: String,
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminUsersData {
    #[serde(default)]
    pub users: Vec<AdminUser>,
}

// ---------------------------------------------------------------------------
// Logs and dashboard

#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub message: String,
    #[serde(default)]
    pub owner_name: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogsData {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskCounts {
    #[serde(default)]
    pub all_count: i64,
    #[serde(default)]
    pub finished_count: i64,
    #[serde(default)]
    pub nearly_count: i64,
    #[serde(default)]
    pub ongoing_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub tasks_counts: TaskCounts,
    #[serde(default)]
    pub tasks_by_date: BTreeMap<String, Vec<String>>,
}

// ---------------------------------------------------------------------------
// Projects

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRow {
    pub code: String,
    pub definition: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub date_start: String,
    #[serde(default)]
    pub date_end: String,
    #[serde(default)]
    pub manager_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsData {
    #[serde(default)]
    pub projects: Vec<ProjectRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectDetail {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub date_start: String,
    #[serde(default)]
    pub date_end: String,
    #[serde(default)]
    pub manager_name: Option<String>,
    #[serde(default)]
    pub task_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMemberRow {
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// The three per-project vocabularies. Also the `data` shape of
/// `project/getProjectConstants`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectMeta {
    #[serde(default)]
    pub statuses: Vec<String>,
    #[serde(default)]
    pub priorities: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectDetailData {
    #[serde(default)]
    pub project_detail: ProjectDetail,
    #[serde(default)]
    pub project_members: Vec<ProjectMemberRow>,
    #[serde(default)]
    pub project_meta: ProjectMeta,
}

/// Answer to `project/getProjectForEdit`: the selectable user pool plus the
/// same detail block the read-only page uses.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectForEditData {
    #[serde(default)]
    pub users: Vec<UserRef>,
    #[serde(default)]
    pub details: ProjectDetailData,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatusPayload {
    pub project_code: String,
    pub project_status: ProjectStatus,
}

// ---------------------------------------------------------------------------
// Project submission

#[derive(Debug, Clone, Serialize)]
pub struct ExtraUserPayload {
    pub code: String,
    pub role: String,
}

/// A vocabulary entry on the wire: `code` is the local item id for items the
/// client created, exactly as the browser client sent it.
#[derive(Debug, Clone, Serialize)]
pub struct ConstantPayload {
    pub code: Option<u64>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectPayload {
    pub manager_code: String,
    pub date_start: String,
    pub date_end: String,
    pub definition: String,
    pub extra_users: Vec<ExtraUserPayload>,
    pub statuses: Vec<ConstantPayload>,
    pub priorities: Vec<ConstantPayload>,
    pub types: Vec<ConstantPayload>,
}

/// `project/updateProject` takes the creation payload keyed by project code.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectUpdatePayload {
    pub project_code: String,
    #[serde(flatten)]
    pub project: ProjectPayload,
}

// ---------------------------------------------------------------------------
// Tasks

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectOption {
    pub code: String,
    pub definition: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsForTaskData {
    #[serde(default)]
    pub projects: Vec<ProjectOption>,
}

/// Server-side attachment reference. The wire row also carries the base64
/// payload, which the terminal never renders and does not decode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFileRow {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubtaskRow {
    pub id: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assigned_users: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskRow {
    pub task_id: i64,
    #[serde(default)]
    pub project_code: String,
    pub title: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub status_definition: String,
    #[serde(default)]
    pub status_category: String,
    #[serde(default)]
    pub priority_definition: String,
    #[serde(default)]
    pub assigned_users: Vec<String>,
    #[serde(default)]
    pub sub_tasks: Vec<SubtaskRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TasksData {
    #[serde(default)]
    pub tasks: Vec<TaskRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MainStatusPayload {
    pub task_id: i64,
    pub new_status: TaskStatusCategory,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubStatusPayload {
    pub task_id: i64,
    pub sub_id: i64,
    pub new_status: TaskStatusCategory,
}

// ---------------------------------------------------------------------------
// Task submission

/// Attachment bytes on the wire: serde renders `data` as a JSON array of
/// numbers, one per byte, which is exactly what the server stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireAttachment {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubtaskPayload {
    pub id: u64,
    pub title: String,
    #[serde(rename = "assignedUserIds")]
    pub assigned_user_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskPayload {
    pub project_code: String,
    pub created_by: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    pub status_definition: String,
    pub priority_definition: String,
    pub type_definition: String,
    pub attachments: Vec<WireAttachment>,
    pub subtasks: Vec<SubtaskPayload>,
    pub users: Vec<ProjectUserRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentUploadPayload {
    pub task_id: String,
    pub user_id: String,
    pub attachments: Vec<WireAttachment>,
}

// ---------------------------------------------------------------------------
// Task editing

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskEditTask {
    #[serde(default)]
    pub project_code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub status_definition: String,
    #[serde(default)]
    pub type_definition: String,
    #[serde(default)]
    pub priority_definition: String,
    #[serde(default)]
    pub all_status_definitions: Vec<String>,
    #[serde(default)]
    pub all_type_definitions: Vec<String>,
    #[serde(default)]
    pub all_priority_definitions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskEditPools {
    #[serde(default)]
    pub assigned_members: Vec<MemberRef>,
    #[serde(default)]
    pub unassigned_members: Vec<MemberRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditSubtaskRow {
    pub subtask_id: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assigned_members: Vec<MemberRef>,
    #[serde(default)]
    pub unassigned_members: Vec<MemberRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskEditDetails {
    #[serde(default)]
    pub task: TaskEditTask,
    #[serde(default)]
    pub users: TaskEditPools,
    #[serde(default)]
    pub attachments: Vec<TaskFileRow>,
    #[serde(default)]
    pub subtasks: Vec<EditSubtaskRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditSubtaskPayload {
    pub subtask_id: i64,
    pub description: String,
    pub assigned_members: Vec<MemberRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskEditPayload {
    pub task_id: String,
    pub edited_by: String,
    pub project_code: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    pub status_definition: String,
    pub type_definition: String,
    pub priority_definition: String,
    pub all_status_definitions: Vec<String>,
    pub all_type_definitions: Vec<String>,
    pub all_priority_definitions: Vec<String>,
    pub assigned_members: Vec<MemberRef>,
    pub unassigned_members: Vec<MemberRef>,
    pub attachments: Vec<WireAttachment>,
    pub subtasks_raw: Vec<EditSubtaskPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(data: Vec<u8>) {
        let original = WireAttachment {
            name: "f.bin".to_string(),
            data,
        };
        let json = serde_json::to_string(&original).unwrap();
        let back: WireAttachment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_wire_attachment_round_trip_empty() {
        round_trip(Vec::new());
    }

    #[test]
    fn test_wire_attachment_round_trip_text() {
        round_trip(b"merhaba dosya".to_vec());
    }

    #[test]
    fn test_wire_attachment_round_trip_binary() {
        let blob: Vec<u8> = (0..=255u8).cycle().take(64 * 1024 + 7).collect();
        round_trip(blob);
    }

    #[test]
    fn test_wire_attachment_is_number_array() {
        let att = WireAttachment {
            name: "a".to_string(),
            data: vec![0, 127, 255],
        };
        let v = serde_json::to_value(&att).unwrap();
        assert_eq!(v["data"], serde_json::json!([0, 127, 255]));
    }

    #[test]
    fn test_task_payload_uses_camel_case_dates() {
        let p = TaskPayload {
            project_code: "P1".into(),
            created_by: "u1".into(),
            title: "t".into(),
            description: String::new(),
            start_date: "2026-01-01".into(),
            end_date: "2026-02-01".into(),
            status_definition: String::new(),
            priority_definition: String::new(),
            type_definition: String::new(),
            attachments: Vec::new(),
            subtasks: vec![SubtaskPayload {
                id: 1,
                title: "s".into(),
                assigned_user_ids: vec!["u2".into()],
            }],
            users: Vec::new(),
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["startDate"], "2026-01-01");
        assert_eq!(v["endDate"], "2026-02-01");
        assert_eq!(v["subtasks"][0]["assignedUserIds"][0], "u2");
    }

    #[test]
    fn test_sparse_task_row_decodes() {
        let row: TaskRow =
            serde_json::from_str(r#"{"task_id": 9, "title": "only title"}"#).unwrap();
        assert_eq!(row.task_id, 9);
        assert!(row.sub_tasks.is_empty());
        assert!(row.assigned_users.is_empty());
    }

    #[test]
    fn test_update_payload_flattens_project_fields() {
        let p = ProjectUpdatePayload {
            project_code: "PRJ-7".into(),
            project: ProjectPayload {
                manager_code: "m1".into(),
                date_start: String::new(),
                date_end: String::new(),
                definition: "d".into(),
                extra_users: Vec::new(),
                statuses: Vec::new(),
                priorities: Vec::new(),
                types: Vec::new(),
            },
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["project_code"], "PRJ-7");
        assert_eq!(v["manager_code"], "m1");
    }
}
