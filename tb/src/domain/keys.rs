//! Store keys for every persisted collection

pub const TASKS: &str = "taskburst-tasks";
pub const DELETED_TASKS: &str = "taskburst-deleted-tasks";
pub const ARCHIVED_TASKS: &str = "taskburst-archived-tasks";
pub const EVENTS: &str = "taskburst-events";
pub const TIMETABLES: &str = "taskburst-timetables";
pub const LISTS: &str = "taskburst-lists";
pub const DELETED_LIST_ITEMS: &str = "taskburst-deleted-list-items";
pub const PROJECTS: &str = "taskburst-projects";
pub const CATEGORIES: &str = "taskburst-categories";
pub const ASSESSMENT_TYPES: &str = "taskburst-assessment-types";
pub const ASSESSMENTS: &str = "taskburst-assessments";
pub const TEXT_BACKUPS: &str = "taskburst-text-backups";
pub const SETTINGS: &str = "taskburst-settings";

/// Every application key, in display order
pub const ALL: &[&str] = &[
    TASKS,
    DELETED_TASKS,
    ARCHIVED_TASKS,
    EVENTS,
    TIMETABLES,
    LISTS,
    DELETED_LIST_ITEMS,
    PROJECTS,
    CATEGORIES,
    ASSESSMENT_TYPES,
    ASSESSMENTS,
    TEXT_BACKUPS,
    SETTINGS,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_valid_store_keys() {
        for key in ALL {
            assert!(burststore::validate_key(key).is_ok(), "{key}");
        }
    }

    #[test]
    fn test_keys_unique() {
        let mut keys = ALL.to_vec();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), ALL.len());
    }
}
