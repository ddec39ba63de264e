//! Navigation catalog and the role filter applied to it.
//!
//! Both the menu screen and the permission checks in front of admin commands
//! go through [`permitted`], so a role can never reach a screen its menu
//! would not show. The match is exhaustive over both enums; adding a target
//! or a role without deciding its visibility does not compile.

use crate::session::Role;

/// Every reachable page, menu entry or guarded command target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    Dashboard,
    AddProject,
    Projects,
    AddTask,
    Tasks,
    AddUser,
    Users,
    Logs,
}

impl NavTarget {
    pub fn label(&self) -> &'static str {
        match self {
            NavTarget::Dashboard => "Dashboard",
            NavTarget::AddProject => "Add Project",
            NavTarget::Projects => "Projects",
            NavTarget::AddTask => "Add Task",
            NavTarget::Tasks => "Tasks",
            NavTarget::AddUser => "Add User",
            NavTarget::Users => "Users",
            NavTarget::Logs => "Logs",
        }
    }
}

/// A titled group of menu entries.
#[derive(Debug, Clone, PartialEq)]
pub struct NavSection {
    pub title: &'static str,
    pub items: Vec<NavTarget>,
}

const CATALOG: &[(&str, &[NavTarget])] = &[
    ("General", &[NavTarget::Dashboard]),
    ("Projects", &[NavTarget::AddProject, NavTarget::Projects]),
    ("Tasks", &[NavTarget::AddTask, NavTarget::Tasks]),
    ("Admin", &[NavTarget::AddUser, NavTarget::Users]),
    ("Other", &[NavTarget::Logs]),
];

/// Whether a role may reach a target at all.
pub fn permitted(role: Role, target: NavTarget) -> bool {
    match (role, target) {
        (Role::Admin, _) => true,
        (_, NavTarget::AddProject) => false,
        (_, NavTarget::AddUser) => false,
        (_, NavTarget::Users) => false,
        (
            _,
            NavTarget::Dashboard
            | NavTarget::Projects
            | NavTarget::AddTask
            | NavTarget::Tasks
            | NavTarget::Logs,
        ) => true,
    }
}

/// The catalog filtered for a role. Sections whose every entry is filtered
/// out disappear entirely.
pub fn sections_for(role: Role) -> Vec<NavSection> {
    CATALOG
        .iter()
        .filter_map(|(title, items)| {
            let items: Vec<NavTarget> = items
                .iter()
                .copied()
                .filter(|target| permitted(role, *target))
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(NavSection { title, items })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_sees_everything() {
        let sections = sections_for(Role::Admin);
        assert_eq!(sections.len(), 5);
        let total: usize = sections.iter().map(|s| s.items.len()).sum();
        assert_eq!(total, 8);
    }

    #[test]
    fn test_member_loses_admin_section_entirely() {
        let sections = sections_for(Role::Member);
        assert!(sections.iter().all(|s| s.title != "Admin"));
        let projects = sections.iter().find(|s| s.title == "Projects").unwrap();
        assert_eq!(projects.items, vec![NavTarget::Projects]);
    }

    #[test]
    fn test_project_manager_matches_member_visibility() {
        assert_eq!(
            sections_for(Role::ProjectManager),
            sections_for(Role::Member)
        );
    }

    #[test]
    fn test_permitted_gates_admin_targets() {
        assert!(permitted(Role::Admin, NavTarget::AddProject));
        assert!(!permitted(Role::Member, NavTarget::AddProject));
        assert!(!permitted(Role::ProjectManager, NavTarget::Users));
        assert!(permitted(Role::Member, NavTarget::AddTask));
        assert!(permitted(Role::Member, NavTarget::Logs));
    }
}
