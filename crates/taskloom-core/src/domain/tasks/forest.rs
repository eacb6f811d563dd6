//! Arena view over a project's task tree
//!
//! Tasks are stored flat and indexed by id; `parent_task_id` is a
//! non-owning back-reference. Traversals are iterative and guard against
//! cycles, so a corrupt tree cannot hang a reader.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{Error, Result};

use super::task::Task;

#[derive(Debug, Clone, Default)]
pub struct TaskForest {
    tasks: BTreeMap<i64, Task>,
    children: HashMap<i64, Vec<i64>>,
}

impl TaskForest {
    pub fn new(tasks: impl IntoIterator<Item = Task>) -> Self {
        let tasks: BTreeMap<i64, Task> = tasks.into_iter().map(|t| (t.id, t)).collect();
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for task in tasks.values() {
            if let Some(parent) = task.parent_task_id {
                children.entry(parent).or_default().push(task.id);
            }
        }
        Self { tasks, children }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn roots(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values().filter(|t| t.parent_task_id.is_none())
    }

    /// Direct children in id order
    pub fn children(&self, id: i64) -> Vec<&Task> {
        self.children
            .get(&id)
            .map(|ids| ids.iter().filter_map(|c| self.tasks.get(c)).collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: i64) -> Option<&Task> {
        self.tasks
            .get(&id)
            .and_then(|t| t.parent_task_id)
            .and_then(|p| self.tasks.get(&p))
    }

    /// Number of ancestors, or `None` if the chain is broken or cyclic
    pub fn depth(&self, id: i64) -> Option<u32> {
        let mut seen = HashSet::new();
        let mut depth = 0;
        let mut current = self.tasks.get(&id)?;
        while let Some(parent_id) = current.parent_task_id {
            if !seen.insert(current.id) {
                return None;
            }
            current = self.tasks.get(&parent_id)?;
            depth += 1;
        }
        Some(depth)
    }

    /// All tasks below `id`, breadth first
    pub fn descendants(&self, id: i64) -> Vec<&Task> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue = std::collections::VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            for child in self.children(next) {
                if seen.insert(child.id) {
                    out.push(child);
                    queue.push_back(child.id);
                }
            }
        }
        out
    }

    /// Check the tree invariants: parents exist in the same project,
    /// levels increase by one per edge, roots sit at level 0, no cycles.
    pub fn validate(&self) -> Result<()> {
        for task in self.tasks.values() {
            match task.parent_task_id {
                None if task.expansion_level != 0 => {
                    return Err(Error::Validation(format!(
                        "root task {} has expansion level {}",
                        task.id, task.expansion_level
                    )));
                }
                None => {}
                Some(parent_id) => {
                    let parent = self.tasks.get(&parent_id).ok_or_else(|| {
                        Error::Validation(format!(
                            "task {} references missing parent {}",
                            task.id, parent_id
                        ))
                    })?;
                    if parent.project_id != task.project_id {
                        return Err(Error::Validation(format!(
                            "task {} and its parent {} belong to different projects",
                            task.id, parent_id
                        )));
                    }
                    if task.expansion_level != parent.expansion_level + 1 {
                        return Err(Error::Validation(format!(
                            "task {} has level {} under a level {} parent",
                            task.id, task.expansion_level, parent.expansion_level
                        )));
                    }
                }
            }
            if self.depth(task.id).is_none() {
                return Err(Error::Validation(format!(
                    "task {} is part of a parent cycle",
                    task.id
                )));
            }
        }
        Ok(())
    }
}
