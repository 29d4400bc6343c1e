//! Task lifecycle: live, deleted and archived collections

use burststore::{Store, now_ms};
use eyre::{Result, eyre};
use tracing::{debug, info};

use super::collection::Collection;
use crate::domain::{Task, TextBackup, keys, next_order, renumber};

/// Where a task currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskBin {
    Live,
    Deleted,
    Archived,
}

/// Task operations across the live, deleted and archived keys
pub struct TaskBoard {
    live: Collection<Task>,
    deleted: Collection<Task>,
    archived: Collection<Task>,
    backups: Collection<TextBackup>,
}

impl TaskBoard {
    pub fn new(store: Store) -> Self {
        Self {
            live: Collection::new(store.clone()),
            deleted: Collection::at(store.clone(), keys::DELETED_TASKS),
            archived: Collection::at(store.clone(), keys::ARCHIVED_TASKS),
            backups: Collection::new(store),
        }
    }

    pub fn collection(&self, bin: TaskBin) -> &Collection<Task> {
        match bin {
            TaskBin::Live => &self.live,
            TaskBin::Deleted => &self.deleted,
            TaskBin::Archived => &self.archived,
        }
    }

    /// Tasks in a bin sorted by their order field
    pub fn list(&self, bin: TaskBin) -> Result<Vec<Task>> {
        let mut tasks = self.collection(bin).all()?;
        tasks.sort_by_key(|task| task.order);
        Ok(tasks)
    }

    /// Add a task at the end of the live list
    pub fn add(&self, mut task: Task) -> Result<Task> {
        debug!(title = %task.title, "TaskBoard::add: called");
        let mut tasks = self.live.all()?;
        task.order = next_order(&tasks);
        tasks.push(task.clone());
        self.live.save_all(&tasks)?;
        Ok(task)
    }

    pub fn complete(&self, id: &str) -> Result<Task> {
        let now = now_ms();
        self.live
            .update(id, |task| {
                task.completed = true;
                task.completed_at = Some(now);
            })?
            .ok_or_else(|| eyre!("Task not found: {}", id))
    }

    pub fn reopen(&self, id: &str) -> Result<Task> {
        self.live
            .update(id, |task| {
                task.completed = false;
                task.completed_at = None;
            })?
            .ok_or_else(|| eyre!("Task not found: {}", id))
    }

    /// Change a live task's title or description
    ///
    /// A description being replaced is first saved as a [`TextBackup`].
    pub fn edit(&self, id: &str, title: Option<String>, description: Option<String>) -> Result<Task> {
        debug!(%id, "TaskBoard::edit: called");
        let current = self.live.get(id)?.ok_or_else(|| eyre!("Task not found: {}", id))?;
        if let (Some(old), Some(new)) = (&current.description, &description)
            && old != new
        {
            self.backups.insert(TextBackup::new(&current.id, "description", old.as_str()))?;
        }

        self.live
            .update(id, |task| {
                if let Some(title) = title {
                    task.title = title;
                }
                if let Some(description) = description {
                    task.description = Some(description);
                }
            })?
            .ok_or_else(|| eyre!("Task not found: {}", id))
    }

    /// Saved text snapshots for a task, oldest first
    pub fn history(&self, id: &str) -> Result<Vec<TextBackup>> {
        let mut backups: Vec<TextBackup> = self
            .backups
            .all()?
            .into_iter()
            .filter(|backup| backup.entity_id == id)
            .collect();
        backups.sort_by_key(|backup| backup.created_at);
        Ok(backups)
    }

    /// Soft-delete: stamp deletedAt and move to the deleted key
    pub fn delete(&self, id: &str) -> Result<Task> {
        debug!(%id, "TaskBoard::delete: called");
        let now = now_ms();
        move_task(&self.live, &self.deleted, id, |task, _| task.deleted_at = Some(now))?
            .ok_or_else(|| eyre!("Task not found: {}", id))
    }

    /// Soft-archive: stamp archivedAt and move to the archived key
    pub fn archive(&self, id: &str) -> Result<Task> {
        debug!(%id, "TaskBoard::archive: called");
        let now = now_ms();
        move_task(&self.live, &self.archived, id, |task, _| task.archived_at = Some(now))?
            .ok_or_else(|| eyre!("Task not found: {}", id))
    }

    /// Move a task back from the deleted or archived key to the end of the live list
    pub fn restore(&self, id: &str) -> Result<Task> {
        debug!(%id, "TaskBoard::restore: called");
        let unstamp = |task: &mut Task, live: &[Task]| {
            task.deleted_at = None;
            task.archived_at = None;
            task.order = next_order(live);
        };
        let restored = match move_task(&self.deleted, &self.live, id, unstamp)? {
            Some(task) => task,
            None => move_task(&self.archived, &self.live, id, unstamp)?
                .ok_or_else(|| eyre!("No deleted or archived task: {}", id))?,
        };
        info!(id = %restored.id, "Restored task");
        Ok(restored)
    }

    /// Permanently drop every deleted task, returning how many were removed
    pub fn purge_deleted(&self) -> Result<usize> {
        let count = self.deleted.all()?.len();
        self.deleted.save_all(&[])?;
        info!(count, "Purged deleted tasks");
        Ok(count)
    }

    /// Move a live task to `position` (clamped) and renumber 0..n
    pub fn reorder(&self, id: &str, position: usize) -> Result<Vec<Task>> {
        debug!(%id, position, "TaskBoard::reorder: called");
        let mut tasks = self.list(TaskBin::Live)?;
        let from = tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| eyre!("Task not found: {}", id))?;
        let task = tasks.remove(from);
        tasks.insert(position.min(tasks.len()), task);
        renumber(&mut tasks);
        self.live.save_all(&tasks)?;
        Ok(tasks)
    }
}

/// Move the task with `id` from one key to another
///
/// Both arrays are read before anything is written, and the destination is
/// written first: a failed write can leave a copy in both keys but never
/// drops the task.
fn move_task(
    from: &Collection<Task>,
    to: &Collection<Task>,
    id: &str,
    stamp: impl FnOnce(&mut Task, &[Task]),
) -> Result<Option<Task>> {
    let mut source = from.all()?;
    let mut target = to.all()?;
    let Some(pos) = source.iter().position(|task| task.id == id) else {
        return Ok(None);
    };
    let mut task = source.remove(pos);
    stamp(&mut task, &target);
    target.push(task.clone());
    to.save_all(&target)?;
    from.save_all(&source)?;
    debug!(%id, from = %from.key(), to = %to.key(), "move_task: moved");
    Ok(Some(task))
}
