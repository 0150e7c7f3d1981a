pub mod asana;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::SprintConfig;
use crate::model::task::{NewTask, Task, TaskUpdate};

/// The remote task service a sprint close runs against.
#[async_trait]
pub trait TaskProvider: Send + Sync {
    fn name(&self) -> &str;
    /// All tasks currently placed in a section, with name, assignee,
    /// memberships and custom fields populated.
    async fn list_section_tasks(&self, section_gid: &str) -> Result<Vec<Task>>;
    /// Create a task in a workspace and return it as the service stored it.
    async fn create_task(&self, workspace_gid: &str, task: &NewTask) -> Result<Task>;
    async fn delete_task(&self, task_gid: &str) -> Result<()>;
    async fn update_task(&self, task_gid: &str, update: &TaskUpdate) -> Result<()>;
}


pub fn create_provider(config: &SprintConfig) -> Box<dyn TaskProvider> {
    Box::new(asana::AsanaProvider::new(
        config.token.clone(),
        config.base_url.clone(),
    ))
}
