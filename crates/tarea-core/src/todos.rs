//! Task CRUD against the remote API with a local mirror of the list.
//!
//! The server owns the records; `TodoStore` keeps an ordered cache of the
//! last successful round trip and reconciles it after each operation: a
//! fetch replaces the list wholesale, a create appends, an update swaps the
//! matching entry, a delete drops it. Failures never escape an operation.
//! They land in the status message with the diagnostic going to the log,
//! and leave the cache exactly as it was.

use crate::core_types::{StatusMessage, Task};
use crate::errors::ClientError;
use crate::http::ApiClient;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct TaskPayload<'a> {
    title: &'a str,
    // Serialized as JSON null when absent; the API stores null, not "".
    description: Option<&'a str>,
    completed: bool,
}

pub struct TodoStore {
    api: ApiClient,
    tasks: Vec<Task>,
    status: Option<StatusMessage>,
}

impl TodoStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            tasks: Vec::new(),
            status: None,
        }
    }

    /// Cached tasks in the order the server last returned them.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Outcome of the most recent operation.
    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// Fetch all tasks for the authenticated user and replace the cache
    /// wholesale, preserving server order.
    pub async fn refresh(&mut self) {
        self.status = None;
        match self.api.get_json::<Vec<Task>>("/todos/").await {
            Ok(tasks) => {
                let count = tasks.len();
                self.tasks = tasks;
                self.status = Some(StatusMessage::success(format!("Loaded {} task(s).", count)));
            }
            Err(err) => self.fail("Failed to load tasks", err),
        }
    }

    /// Create a task with `completed=false`. An empty or whitespace-only
    /// title is rejected locally without touching the network. An empty
    /// description is sent as null. The server-assigned record is appended
    /// at the end of the cache.
    pub async fn create(&mut self, title: &str, description: Option<&str>) {
        self.status = None;
        if title.trim().is_empty() {
            let err = ClientError::ValidationError("The task title cannot be empty.".to_string());
            return self.fail("Failed to add task", err);
        }

        let description = description.map(str::trim).filter(|d| !d.is_empty());
        let payload = TaskPayload {
            title,
            description,
            completed: false,
        };
        match self.api.post_json::<_, Task>("/todos/", &payload).await {
            Ok(task) => {
                self.tasks.push(task);
                self.status = Some(StatusMessage::success("Task added."));
            }
            Err(err) => self.fail("Failed to add task", err),
        }
    }

    /// Flip the completed flag of one task, leaving title and description
    /// as the server currently has them.
    ///
    /// The API only accepts full records on update, so this re-fetches the
    /// task and writes it back inverted. The two steps are not atomic: an
    /// edit landing between the read and the write is silently overwritten,
    /// last writer wins.
    pub async fn toggle_complete(&mut self, id: i64) {
        self.status = None;
        match self.toggle_inner(id).await {
            Ok(updated) => {
                let text = if updated.completed {
                    "Task marked as done."
                } else {
                    "Task marked as pending."
                };
                if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == id) {
                    *slot = updated;
                }
                self.status = Some(StatusMessage::success(text));
            }
            Err(err) => self.fail("Failed to update task", err),
        }
    }

    async fn toggle_inner(&self, id: i64) -> Result<Task, ClientError> {
        let current = self.api.get_json::<Task>(&format!("/todos/{}", id)).await?;
        let payload = TaskPayload {
            title: &current.title,
            description: current.description.as_deref(),
            completed: !current.completed,
        };
        self.api.put_json(&format!("/todos/{}", id), &payload).await
    }

    /// Delete a task and drop it from the cache. Deleting an id the server
    /// does not know reports failure and leaves the cache unchanged.
    pub async fn remove(&mut self, id: i64) {
        self.status = None;
        match self.api.delete(&format!("/todos/{}", id)).await {
            Ok(()) => {
                self.tasks.retain(|t| t.id != id);
                self.status = Some(StatusMessage::success("Task deleted."));
            }
            Err(err) => self.fail("Failed to delete task", err),
        }
    }

    fn fail(&mut self, context: &str, err: ClientError) {
        log::error!("{}: {}", context, err);
        self.status = Some(StatusMessage::failure(context, &err));
    }
}
