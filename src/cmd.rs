//! Command implementations for the CLI interface.
//!
//! Every flat page is a handler here: it guards the session, runs the
//! request and prints the result. The wizard commands only wrap terminal
//! setup around the TUI screens and print whatever the screens hand back.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Duration, Local, NaiveDate};
use clap::Subcommand;
use clap_complete::{generate, Shell};
use serde_json::Value;

use crate::api::{ApiClient, Envelope, MSG_OPERATION_FAILED};
use crate::attach::{format_file_size, AttachmentCollector};
use crate::fields::*;
use crate::models::*;
use crate::nav::{self, NavTarget};
use crate::session::{self, format_role, Identity, SessionStore};
use crate::tui::app::{App, AppExit};
use crate::tui::run;

/// Hard cap on rows the logs page prints.
const LOG_PAGE_ROWS: usize = 100;

/// How many days ahead the `--upcoming` task filter looks.
const UPCOMING_WINDOW_DAYS: i64 = 7;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive menu interface.
    Ui,

    /// Log in and cache the session locally.
    Login {
        /// Account email. Prompted for when omitted.
        #[arg(long)]
        email: Option<String>,
        /// Account password. Prompted for without echo when omitted.
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the cached session.
    Logout,

    /// Show the cached identity.
    Whoami,

    /// Show task counts and recent activity.
    Dashboard,

    /// List projects visible to the current user.
    Projects,

    /// Show one project: details, members and vocabularies.
    Project {
        /// Project code.
        code: String,
    },

    /// Change a project's status.
    ProjectStatus {
        /// Project code.
        code: String,
        /// New status.
        #[arg(value_enum)]
        status: ProjectStatus,
    },

    /// List tasks with optional filters.
    Tasks {
        /// Only finished tasks.
        #[arg(long)]
        completed: bool,
        /// Only unfinished tasks ending within the next 7 days.
        #[arg(long)]
        upcoming: bool,
        /// Filter by project code.
        #[arg(long)]
        project: Option<String>,
    },

    /// Change a task's completion status.
    TaskStatus {
        /// Task id.
        task_id: i64,
        /// New status.
        #[arg(value_enum)]
        status: TaskStatusCategory,
    },

    /// Change a subtask's completion status.
    SubtaskStatus {
        /// Task id the subtask belongs to.
        task_id: i64,
        /// Subtask id.
        sub_id: i64,
        /// New status.
        #[arg(value_enum)]
        status: TaskStatusCategory,
    },

    /// List all accounts, active and inactive.
    Users,

    /// Create an account.
    UserAdd {
        /// Account email.
        email: String,
        /// First name.
        name: String,
        /// Last name.
        surname: String,
        /// Phone number.
        #[arg(long)]
        phone: Option<String>,
        /// Initial password. Prompted for without echo when omitted.
        #[arg(long)]
        password: Option<String>,
    },

    /// Update an account. Omitted fields keep their current value.
    UserEdit {
        /// User code.
        code: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        surname: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Pass an empty string to clear the phone number.
        #[arg(long)]
        phone: Option<String>,
        /// New password. Omit to keep the current one.
        #[arg(long)]
        password: Option<String>,
    },

    /// Flip an account between active and inactive.
    UserToggle {
        /// User code.
        code: String,
    },

    /// Show the activity log, newest first.
    Logs,

    /// Upload local files to an existing task.
    Attach {
        /// Task id.
        task_id: String,
        /// Files to upload.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Launch the project creation wizard.
    AddProject,

    /// Launch the project edit wizard.
    EditProject {
        /// Project code.
        code: String,
    },

    /// Launch the task creation wizard.
    AddTask,

    /// Launch the task edit wizard.
    EditTask {
        /// Task id.
        task_id: String,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Launch the interactive menu interface.
pub fn cmd_ui(client: &ApiClient, store: &SessionStore) -> Result<()> {
    let mut app = App::menu(client.clone(), store.clone());
    let exit = run::with_terminal(|terminal| app.run(terminal))?;
    match exit {
        AppExit::OpenPage(target) => print_page(client, store, target),
        AppExit::Done(message) => {
            println!("{message}");
            Ok(())
        }
        AppExit::Logout => {
            println!("Session cleared.");
            Ok(())
        }
        AppExit::Quit => Ok(()),
    }
}

/// One-shot dispatch for a flat page picked from the interactive menu.
fn print_page(client: &ApiClient, store: &SessionStore, target: NavTarget) -> Result<()> {
    match target {
        NavTarget::Dashboard => cmd_dashboard(client, store),
        NavTarget::Projects => cmd_projects(client, store),
        NavTarget::Tasks => cmd_tasks(client, store, false, false, None),
        NavTarget::Users => cmd_users(client, store),
        NavTarget::Logs => cmd_logs(client, store),
        NavTarget::AddUser => {
            println!("Use `pmt user-add <email> <name> <surname>` to create an account.");
            Ok(())
        }
        // The menu opens the wizards in place; these never reach the exit.
        NavTarget::AddProject | NavTarget::AddTask => Ok(()),
    }
}

/// Launch the project creation wizard.
pub fn cmd_add_project(client: &ApiClient, store: &SessionStore) -> Result<()> {
    run_wizard(App::project_wizard(client.clone(), store.clone(), None))
}

/// Launch the project edit wizard for one project.
pub fn cmd_edit_project(client: &ApiClient, store: &SessionStore, code: String) -> Result<()> {
    run_wizard(App::project_wizard(client.clone(), store.clone(), Some(&code)))
}

/// Launch the task creation wizard.
pub fn cmd_add_task(client: &ApiClient, store: &SessionStore) -> Result<()> {
    run_wizard(App::task_wizard(client.clone(), store.clone(), None))
}

/// Launch the task edit wizard for one task.
pub fn cmd_edit_task(client: &ApiClient, store: &SessionStore, task_id: String) -> Result<()> {
    run_wizard(App::task_wizard(client.clone(), store.clone(), Some(&task_id)))
}

fn run_wizard(app: Result<App, String>) -> Result<()> {
    let mut app = app.map_err(|e| anyhow!("{e}"))?;
    let exit = run::with_terminal(|terminal| app.run(terminal))?;
    if let AppExit::Done(message) = exit {
        println!("{message}");
    }
    Ok(())
}

/// Authenticate and cache the session.
pub fn cmd_login(
    client: &ApiClient,
    store: &SessionStore,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt_line("Email: ")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt_password("Password: ")?,
    };
    let identity = session::login(client, store, email.trim(), &password)
        .map_err(|e| anyhow!("{}", e.user_message()))?;
    let name = identity
        .full_name
        .as_deref()
        .unwrap_or(&identity.user_code);
    println!("Logged in as {} ({}).", name, format_role(identity.role));
    Ok(())
}

/// Drop the cached session.
pub fn cmd_logout(store: &SessionStore) -> Result<()> {
    session::logout(store).context("could not clear the session")?;
    println!("Session cleared.");
    Ok(())
}

/// Print the identity the guard resolves to.
pub fn cmd_whoami(client: &ApiClient, store: &SessionStore) -> Result<()> {
    let identity = guard(client, store)?;
    println!("{:<6} {}", "Code", identity.user_code);
    println!("{:<6} {}", "Role", format_role(identity.role));
    if let Some(name) = &identity.full_name {
        println!("{:<6} {}", "Name", name);
    }
    Ok(())
}

/// Welcome line, task counts, recent activity and tasks grouped by date.
pub fn cmd_dashboard(client: &ApiClient, store: &SessionStore) -> Result<()> {
    let identity = guard(client, store)?;
    let env = client.get::<DashboardData>(
        "general/dashboard",
        &[("user_code", identity.user_code.clone())],
    )?;
    let data = take_data(env)?;

    let name = if data.full_name.is_empty() {
        identity.user_code.as_str()
    } else {
        data.full_name.as_str()
    };
    println!("Welcome, {name}.");
    let counts = &data.tasks_counts;
    println!(
        "Tasks: {} total, {} ongoing, {} due soon, {} finished",
        counts.all_count, counts.ongoing_count, counts.nearly_count, counts.finished_count
    );

    if !data.logs.is_empty() {
        println!();
        println!("Recent activity");
        for line in &data.logs {
            println!("  {line}");
        }
    }
    if !data.tasks_by_date.is_empty() {
        println!();
        println!("Tasks by date");
        for (date, titles) in &data.tasks_by_date {
            println!("  {date}");
            for title in titles {
                println!("    {title}");
            }
        }
    }
    Ok(())
}

/// Table of projects the current user can see.
pub fn cmd_projects(client: &ApiClient, store: &SessionStore) -> Result<()> {
    let identity = guard(client, store)?;
    let env = client.get::<ProjectsData>(
        "project/getProjects",
        &[("user_code", identity.user_code.clone())],
    )?;
    let data = take_data(env)?;
    if data.projects.is_empty() {
        println!("No projects.");
        return Ok(());
    }
    println!(
        "{:<10} {:<28} {:<12} {:<12} {:<12} {}",
        "Code", "Project", "Status", "Start", "End", "Manager"
    );
    for p in &data.projects {
        println!(
            "{:<10} {:<28} {:<12} {:<12} {:<12} {}",
            truncate(&p.code, 10),
            truncate(&p.definition, 28),
            format_project_status_str(&p.status),
            p.date_start,
            p.date_end,
            p.manager_name.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

/// Detail block, member list and vocabularies for one project.
pub fn cmd_project(client: &ApiClient, store: &SessionStore, code: String) -> Result<()> {
    guard(client, store)?;
    let env = client.get::<ProjectDetailData>(
        "project/getProjectDetail",
        &[("project_code", code.clone())],
    )?;
    let data = take_data(env)?;

    let detail = &data.project_detail;
    println!("{} ({})", detail.name, code);
    println!(
        "{:<8} {}",
        "Status",
        format_project_status_str(&detail.status)
    );
    println!("{:<8} {}", "Start", detail.date_start);
    println!("{:<8} {}", "End", detail.date_end);
    println!(
        "{:<8} {}",
        "Manager",
        detail.manager_name.as_deref().unwrap_or("-")
    );
    println!("{:<8} {}", "Tasks", detail.task_count);

    if !data.project_members.is_empty() {
        println!();
        println!("{:<24} {}", "Member", "Role");
        for m in &data.project_members {
            println!("{:<24} {}", truncate(&m.name, 24), m.role);
        }
    }

    let meta = &data.project_meta;
    if !(meta.statuses.is_empty() && meta.priorities.is_empty() && meta.types.is_empty()) {
        println!();
        println!("{:<12} {}", "Statuses", meta.statuses.join(", "));
        println!("{:<12} {}", "Priorities", meta.priorities.join(", "));
        println!("{:<12} {}", "Types", meta.types.join(", "));
    }
    Ok(())
}

/// Persist a new project status.
pub fn cmd_project_status(
    client: &ApiClient,
    store: &SessionStore,
    code: String,
    status: ProjectStatus,
) -> Result<()> {
    guard(client, store)?;
    let payload = ProjectStatusPayload {
        project_code: code,
        project_status: status,
    };
    let env = client.put::<Value, _>("project/changeProjectStatus", &payload)?;
    println!("{}", confirm(env)?);
    Ok(())
}

/// Task table with the completed/upcoming/project filters.
pub fn cmd_tasks(
    client: &ApiClient,
    store: &SessionStore,
    completed: bool,
    upcoming: bool,
    project: Option<String>,
) -> Result<()> {
    let identity = guard(client, store)?;
    let env = client.get::<TasksData>(
        "tasks/getTasks",
        &[("user_code", identity.user_code.clone())],
    )?;
    let data = take_data(env)?;

    let today = Local::now().date_naive();
    let rows: Vec<&TaskRow> = data
        .tasks
        .iter()
        .filter(|t| task_passes(t, completed, upcoming, project.as_deref(), today))
        .collect();
    if rows.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    println!(
        "{:<6} {:<10} {:<28} {:<12} {:<10} {:<12} {}",
        "Id", "Project", "Title", "Status", "Priority", "End", "Assigned"
    );
    for t in rows {
        println!(
            "{:<6} {:<10} {:<28} {:<12} {:<10} {:<12} {}",
            t.task_id,
            truncate(&t.project_code, 10),
            truncate(&t.title, 28),
            truncate(&t.status_definition, 12),
            truncate(&t.priority_definition, 10),
            t.end_date,
            t.assigned_users.join(", "),
        );
        // Subtask ids here are what `pmt subtask-status` takes.
        for sub in &t.sub_tasks {
            let state = match sub.status.as_deref() {
                Some("finished") => "finished",
                _ => "ongoing",
            };
            let who = if sub.assigned_users.is_empty() {
                String::new()
            } else {
                format!("  ({})", sub.assigned_users.join(", "))
            };
            println!(
                "  sub {:<6} {:<10} {}{}",
                sub.id,
                state,
                truncate(&sub.description, 40),
                who,
            );
        }
    }
    Ok(())
}

/// Persist a new completion status for a main task.
pub fn cmd_task_status(
    client: &ApiClient,
    store: &SessionStore,
    task_id: i64,
    status: TaskStatusCategory,
) -> Result<()> {
    guard(client, store)?;
    let payload = MainStatusPayload {
        task_id,
        new_status: status,
    };
    let env = client.put::<Value, _>("tasks/setMainTaskStatus", &payload)?;
    println!("{}", confirm(env)?);
    Ok(())
}

/// Persist a new completion status for one subtask.
pub fn cmd_subtask_status(
    client: &ApiClient,
    store: &SessionStore,
    task_id: i64,
    sub_id: i64,
    status: TaskStatusCategory,
) -> Result<()> {
    guard(client, store)?;
    let payload = SubStatusPayload {
        task_id,
        sub_id,
        new_status: status,
    };
    let env = client.put::<Value, _>("tasks/setSubTaskStatus", &payload)?;
    println!("{}", confirm(env)?);
    Ok(())
}

/// Account table, active accounts first.
pub fn cmd_users(client: &ApiClient, store: &SessionStore) -> Result<()> {
    let identity = guard(client, store)?;
    require_admin(&identity, NavTarget::Users)?;
    let env = client.get::<AdminUsersData>("general/getUsersForAdmin", &[])?;
    let data = take_data(env)?;
    if data.users.is_empty() {
        println!("No accounts.");
        return Ok(());
    }
    let (active, inactive): (Vec<&AdminUser>, Vec<&AdminUser>) =
        data.users.iter().partition(|u| u.active);
    println!(
        "{:<6} {:<8} {:<22} {:<26} {:<14} {}",
        "Id", "Code", "Name", "Email", "Phone", "Active"
    );
    for u in active.iter().chain(&inactive) {
        println!(
            "{:<6} {:<8} {:<22} {:<26} {:<14} {}",
            u.id,
            truncate(&u.code, 8),
            truncate(&format!("{} {}", u.name, u.surname), 22),
            truncate(&u.email, 26),
            u.phone.as_deref().unwrap_or("-"),
            if u.active { "yes" } else { "no" },
        );
    }
    Ok(())
}

/// Create an account. Empty phone goes out as null.
pub fn cmd_user_add(
    client: &ApiClient,
    store: &SessionStore,
    email: String,
    name: String,
    surname: String,
    phone: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let identity = guard(client, store)?;
    require_admin(&identity, NavTarget::AddUser)?;
    let password = match password {
        Some(password) => password,
        None => prompt_password("Initial password: ")?,
    };
    let payload = NewUserPayload {
        email,
        phone: phone.filter(|p| !p.trim().is_empty()),
        name,
        surname,
        password,
    };
    let env = client.post::<Value, _>("auth/createUser", &payload)?;
    println!("{}", confirm(env)?);
    Ok(())
}

/// Update an account, keeping whatever fields were not given.
pub fn cmd_user_edit(
    client: &ApiClient,
    store: &SessionStore,
    code: String,
    name: Option<String>,
    surname: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let identity = guard(client, store)?;
    require_admin(&identity, NavTarget::Users)?;

    // The update payload is complete, so fetch the current values first.
    let env = client.get::<AdminUsersData>("general/getUsersForAdmin", &[])?;
    let data = take_data(env)?;
    let Some(current) = data.users.into_iter().find(|u| u.code == code) else {
        bail!("No user with code {code}.");
    };

    let payload = UpdateUserPayload {
        code,
        name: name.unwrap_or(current.name),
        surname: surname.unwrap_or(current.surname),
        email: email.unwrap_or(current.email),
        phone: phone.or(current.phone).filter(|p| !p.trim().is_empty()),
        password: password.filter(|p| !p.is_empty()),
    };
    let env = client.put::<Value, _>("general/updateUser", &payload)?;
    println!("{}", confirm(env)?);
    Ok(())
}

/// Flip an account between active and inactive.
pub fn cmd_user_toggle(client: &ApiClient, store: &SessionStore, code: String) -> Result<()> {
    let identity = guard(client, store)?;
    require_admin(&identity, NavTarget::Users)?;
    let payload = ActivationPayload { code };
    let env = client.put::<Value, _>("general/setActivationForUser", &payload)?;
    println!("{}", confirm(env)?);
    Ok(())
}

/// Activity log sorted newest first and capped at [`LOG_PAGE_ROWS`].
pub fn cmd_logs(client: &ApiClient, store: &SessionStore) -> Result<()> {
    let identity = guard(client, store)?;
    let env = client.get::<LogsData>(
        "general/getLogs",
        &[("user_code", identity.user_code.clone())],
    )?;
    let data = take_data(env)?;
    if data.logs.is_empty() {
        println!("No activity yet.");
        return Ok(());
    }
    let mut logs = data.logs;
    logs.sort_by(|a, b| b.id.cmp(&a.id));
    for entry in logs.iter().take(LOG_PAGE_ROWS) {
        println!(
            "{:<20} {:<18} {}",
            entry.created_at,
            truncate(&entry.owner_name, 18),
            entry.message
        );
    }
    Ok(())
}

/// Upload local files to an existing task.
pub fn cmd_attach(
    client: &ApiClient,
    store: &SessionStore,
    task_id: String,
    paths: Vec<PathBuf>,
) -> Result<()> {
    let identity = guard(client, store)?;
    let mut collector = AttachmentCollector::new();
    for err in collector.add_paths(&paths) {
        eprintln!("Skipped: {err}");
    }
    if collector.is_empty() {
        bail!("no readable files to upload");
    }
    let count = collector.len();
    let total = collector.total_size();
    let payload = AttachmentUploadPayload {
        task_id,
        user_id: identity.user_code,
        attachments: collector.wire_attachments(),
    };
    let env = client.post::<Value, _>("tasks/setTaskAttachment", &payload)?;
    if !env.status {
        bail!("{}", env.user_message());
    }
    println!("Uploaded {} file(s), {}.", count, format_file_size(total));
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) -> Result<()> {
    use clap::CommandFactory;

    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
    Ok(())
}

/// Resolve the cached identity or explain how to log in.
fn guard(client: &ApiClient, store: &SessionStore) -> Result<Identity> {
    session::resolve(client, store).map_err(|e| anyhow!("{}", e.user_message()))
}

fn require_admin(identity: &Identity, target: NavTarget) -> Result<()> {
    if nav::permitted(identity.role, target) {
        Ok(())
    } else {
        bail!("This command needs an administrator account.")
    }
}

/// Unwrap a successful envelope or surface the server's message.
fn take_data<T>(env: Envelope<T>) -> Result<T> {
    if !env.status {
        bail!("{}", env.user_message());
    }
    match env.data {
        Some(data) => Ok(data),
        None => bail!("{}", MSG_OPERATION_FAILED),
    }
}

/// Check a data-less envelope and return the line to print on success.
fn confirm<T>(env: Envelope<T>) -> Result<String> {
    if !env.status {
        bail!("{}", env.user_message());
    }
    if env.message.is_empty() {
        Ok("Saved.".to_string())
    } else {
        Ok(env.message)
    }
}

/// Whether a task row survives the `tasks` page filters.
fn task_passes(
    task: &TaskRow,
    completed: bool,
    upcoming: bool,
    project: Option<&str>,
    today: NaiveDate,
) -> bool {
    let finished = task.status_category == "finished";
    if completed && !finished {
        return false;
    }
    if upcoming {
        if finished {
            return false;
        }
        let Ok(end) = NaiveDate::parse_from_str(&task.end_date, "%Y-%m-%d") else {
            return false;
        };
        if end < today || end > today + Duration::days(UPCOMING_WINDOW_DAYS) {
            return false;
        }
    }
    if let Some(code) = project {
        if task.project_code != code {
            return false;
        }
    }
    true
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Read a line without echoing it, for passwords.
fn prompt_password(prompt: &str) -> Result<String> {
    use crossterm::event::{self, Event, KeyCode, KeyModifiers};
    use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

    print!("{prompt}");
    io::stdout().flush()?;
    enable_raw_mode()?;
    let mut out = String::new();
    let entered = loop {
        match event::read() {
            Ok(Event::Key(key)) => match key.code {
                KeyCode::Enter => break Ok(out),
                KeyCode::Backspace => {
                    out.pop();
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    break Err(anyhow!("cancelled"));
                }
                KeyCode::Char(c) => out.push(c),
                _ => {}
            },
            Ok(_) => {}
            Err(e) => break Err(e.into()),
        }
    };
    disable_raw_mode()?;
    println!();
    entered
}

/// Shorten a string to `width` characters, marking the cut with an ellipsis.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> TaskRow {
        serde_json::from_value(value).unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_completed_filter_keeps_only_finished() {
        let today = day("2024-03-01");
        let open = row(json!({"task_id": 1, "title": "t", "status_category": "continue"}));
        let done = row(json!({"task_id": 2, "title": "t", "status_category": "finished"}));
        assert!(!task_passes(&open, true, false, None, today));
        assert!(task_passes(&done, true, false, None, today));
        // Without the flag both survive.
        assert!(task_passes(&open, false, false, None, today));
        assert!(task_passes(&done, false, false, None, today));
    }

    #[test]
    fn test_upcoming_window_is_seven_days() {
        let today = day("2024-03-01");
        let inside = row(json!({"task_id": 1, "title": "t", "end_date": "2024-03-08"}));
        let outside = row(json!({"task_id": 2, "title": "t", "end_date": "2024-03-09"}));
        let past = row(json!({"task_id": 3, "title": "t", "end_date": "2024-02-29"}));
        let undated = row(json!({"task_id": 4, "title": "t"}));
        let finished = row(json!({
            "task_id": 5, "title": "t", "end_date": "2024-03-02",
            "status_category": "finished"
        }));
        assert!(task_passes(&inside, false, true, None, today));
        assert!(!task_passes(&outside, false, true, None, today));
        assert!(!task_passes(&past, false, true, None, today));
        assert!(!task_passes(&undated, false, true, None, today));
        assert!(!task_passes(&finished, false, true, None, today));
    }

    #[test]
    fn test_project_filter_matches_code() {
        let today = day("2024-03-01");
        let task = row(json!({"task_id": 1, "title": "t", "project_code": "P1"}));
        assert!(task_passes(&task, false, false, Some("P1"), today));
        assert!(!task_passes(&task, false, false, Some("P2"), today));
    }

    #[test]
    fn test_confirm_prefers_server_message() {
        let env = Envelope::<Value> {
            status: true,
            message: "Kayıt güncellendi.".to_string(),
            data: None,
        };
        assert_eq!(confirm(env).unwrap(), "Kayıt güncellendi.");

        let silent = Envelope::<Value> {
            status: true,
            message: String::new(),
            data: None,
        };
        assert_eq!(confirm(silent).unwrap(), "Saved.");
    }

    #[test]
    fn test_take_data_surfaces_rejection() {
        let env = Envelope::<Value> {
            status: false,
            message: "Yetkisiz işlem.".to_string(),
            data: Some(json!(1)),
        };
        let err = take_data(env).unwrap_err();
        assert_eq!(err.to_string(), "Yetkisiz işlem.");
    }

    #[test]
    fn test_truncate_marks_cut_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long title", 8), "a very …");
    }
}
