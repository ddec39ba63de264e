//! # pmt - Project Management Terminal Client
//!
//! A terminal client for a project/task management REST server: flat CLI
//! pages for scripting and quick lookups, plus step-based TUI wizards for
//! the flows that need real editing.
//!
//! ## Key Features
//!
//! - **Flat Pages**: dashboard, projects, tasks, users and logs as plain
//!   subcommands that print tables and exit
//! - **Step-Based Wizards**: project and task creation/editing as full-screen
//!   TUI flows with step tabs, member assignment and per-entity sub-saves
//! - **Rich Descriptions**: a block-based rich-text editor that reads and
//!   writes the server's HTML
//! - **Attachments**: collect local files into task submissions or upload
//!   them to existing tasks
//! - **Session Cache**: log in once; every command reuses the cached key
//!   until the server rejects it
//!
//! ## Quick Start
//!
//! ```bash
//! # Point the client at your server once
//! export PMTERM_API_URL=http://pm.example.com:8000
//!
//! # Log in and look around
//! pmt login --email admin@example.com
//! pmt dashboard
//! pmt projects
//!
//! # Launch the interactive menu
//! pmt ui
//!
//! # Or jump straight into a wizard
//! pmt add-task
//! pmt edit-project PRJ1
//! ```
//!
//! ## Installation
//!
//! ```bash
//! git clone <repository-url>
//! cd pmterm
//! cargo install --path .
//! ```
//!
//! ## Usage Patterns
//!
//! **Scripting**: the flat pages print plain aligned text and exit non-zero
//! on failure, so they compose with shell pipelines and cron jobs.
//!
//! **Interactive Work**: `pmt ui` opens a role-filtered menu over the same
//! screens the direct wizard commands use; nothing is TUI-only.
//!
//! ## Key Commands
//!
//! - `pmt login` - authenticate and cache the session
//! - `pmt ui` - interactive menu and wizards
//! - `pmt tasks --upcoming` - tasks ending within the next week
//! - `pmt attach 42 report.pdf` - upload files to an existing task
//! - `pmt completions bash` - shell completion scripts
//!
//! Configuration and the session cache live in `~/.pmterm/`; `--config-dir`
//! moves them and `PMTERM_API_URL` or `--api-url` override the server address.

use clap::Parser;

pub mod api;
pub mod attach;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod draft;
pub mod fields;
pub mod models;
pub mod nav;
pub mod richtext;
pub mod session;
pub mod tui {
    pub mod colors;
    pub mod app;
    pub mod editor;
    pub mod input;
    pub mod jobs;
    pub mod login;
    pub mod menu;
    pub mod project_form;
    pub mod run;
    pub mod task_form;
    pub mod wizard;
}

use api::ApiClient;
use cli::Cli;
use cmd::*;
use session::SessionStore;

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let dir = config::config_dir(cli.config_dir);
    let api_url = config::resolve_api_url(cli.api_url, &dir);
    let client = match ApiClient::new(&api_url) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let store = SessionStore::new(&dir);

    let result = match cli.command {
        Commands::Ui => cmd_ui(&client, &store),

        Commands::Login { email, password } => cmd_login(&client, &store, email, password),

        Commands::Logout => cmd_logout(&store),

        Commands::Whoami => cmd_whoami(&client, &store),

        Commands::Dashboard => cmd_dashboard(&client, &store),

        Commands::Projects => cmd_projects(&client, &store),

        Commands::Project { code } => cmd_project(&client, &store, code),

        Commands::ProjectStatus { code, status } => {
            cmd_project_status(&client, &store, code, status)
        }

        Commands::Tasks { completed, upcoming, project } => {
            cmd_tasks(&client, &store, completed, upcoming, project)
        }

        Commands::TaskStatus { task_id, status } => {
            cmd_task_status(&client, &store, task_id, status)
        }

        Commands::SubtaskStatus { task_id, sub_id, status } => {
            cmd_subtask_status(&client, &store, task_id, sub_id, status)
        }

        Commands::Users => cmd_users(&client, &store),

        Commands::UserAdd { email, name, surname, phone, password } => {
            cmd_user_add(&client, &store, email, name, surname, phone, password)
        }

        Commands::UserEdit { code, name, surname, email, phone, password } => {
            cmd_user_edit(&client, &store, code, name, surname, email, phone, password)
        }

        Commands::UserToggle { code } => cmd_user_toggle(&client, &store, code),

        Commands::Logs => cmd_logs(&client, &store),

        Commands::Attach { task_id, paths } => cmd_attach(&client, &store, task_id, paths),

        Commands::AddProject => cmd_add_project(&client, &store),

        Commands::EditProject { code } => cmd_edit_project(&client, &store, code),

        Commands::AddTask => cmd_add_task(&client, &store),

        Commands::EditTask { task_id } => cmd_edit_task(&client, &store, task_id),

        Commands::Completions { shell } => cmd_completions(shell),
    };

    if let Err(e) = result {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
