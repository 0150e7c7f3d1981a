use anyhow::{Context, Result};

use super::fields::{reconcile_custom_fields, CostFields};
use super::memberships::rebuild_memberships;
use super::name::next_duplicate_name;
use crate::config::SprintConfig;
use crate::journal::{new_entry, Journal, JournalEntry, JournalEvent};
use crate::model::task::{NewTask, Task, TaskUpdate};
use crate::providers::TaskProvider;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CloseReport {
    pub duplicated: usize,
    pub completed: usize,
}

/// Carries unfinished tasks into the backlog and completes finished ones.
///
/// Tasks are processed one at a time in listing order. The first error
/// aborts the rest of the batch; work already done stays done.
pub struct SprintCloser<'a> {
    provider: &'a dyn TaskProvider,
    config: &'a SprintConfig,
    journal: Option<&'a Journal>,
    dry_run: bool,
}

impl<'a> SprintCloser<'a> {
    pub fn new(provider: &'a dyn TaskProvider, config: &'a SprintConfig) -> Self {
        Self {
            provider,
            config,
            journal: None,
            dry_run: false,
        }
    }

    pub fn with_journal(mut self, journal: &'a Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// List and transform as usual but issue no create, delete or update.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Duplicate every in-flight section in configured order, then complete the done section.
    pub async fn run(&self) -> Result<CloseReport> {
        let mut report = CloseReport::default();
        for section in &self.config.in_flight_section_gids {
            report.duplicated += self.duplicate_open_tasks(section).await?;
        }
        report.completed = self
            .complete_done_tasks(&self.config.done_section_gid)
            .await?;
        Ok(report)
    }

    /// Payload for the duplicate of `task`.
    pub fn duplication_of(&self, task: &Task) -> Result<NewTask> {
        let custom_fields = reconcile_custom_fields(
            &task.custom_fields,
            CostFields {
                expected: &self.config.expected_cost_field_gid,
                actual: &self.config.actual_cost_field_gid,
                sprint_number: &self.config.sprint_number_field_gid,
            },
        )
        .with_context(|| format!("Cannot duplicate task {} \"{}\"", task.gid, task.name))?;

        Ok(NewTask {
            name: next_duplicate_name(&task.name),
            assignee: task.assignee.as_ref().map(|a| a.gid.clone()),
            memberships: rebuild_memberships(
                &task.memberships,
                &self.config.sprints_project_gid,
                &self.config.backlog_section_gid,
            ),
            custom_fields,
        })
    }

    pub async fn duplicate_open_tasks(&self, section_gid: &str) -> Result<usize> {
        let tasks = self
            .provider
            .list_section_tasks(section_gid)
            .await
            .with_context(|| format!("Failed to list tasks in section {section_gid}"))?;
        tracing::info!(section = %section_gid, count = tasks.len(), "duplicating open tasks");

        for task in &tasks {
            let duplicate = self.duplication_of(task)?;

            if self.dry_run {
                tracing::info!(
                    dry_run = true,
                    task = %task.gid,
                    name = %duplicate.name,
                    "would duplicate and delete task"
                );
                continue;
            }

            let created = self
                .provider
                .create_task(&self.config.workspace_gid, &duplicate)
                .await
                .with_context(|| format!("Failed to create duplicate of task {}", task.gid))?;
            tracing::info!(
                task = %task.gid,
                duplicate = %created.gid,
                name = %duplicate.name,
                "created duplicate"
            );
            self.record(new_entry(
                JournalEvent::Duplicated,
                &task.gid,
                Some(duplicate.name.as_str()),
                Some(created.gid.as_str()),
            ));

            self.provider
                .delete_task(&task.gid)
                .await
                .with_context(|| {
                    format!(
                        "Failed to delete task {} after creating duplicate {}",
                        task.gid, created.gid
                    )
                })?;
            tracing::info!(task = %task.gid, "deleted original");
            self.record(new_entry(JournalEvent::Deleted, &task.gid, None, Some(created.gid.as_str())));
        }

        Ok(tasks.len())
    }

    pub async fn complete_done_tasks(&self, section_gid: &str) -> Result<usize> {
        let tasks = self
            .provider
            .list_section_tasks(section_gid)
            .await
            .with_context(|| format!("Failed to list tasks in section {section_gid}"))?;
        tracing::info!(
            section = %section_gid,
            count = tasks.len(),
            already_completed = tasks.iter().filter(|t| t.completed).count(),
            "completing done tasks"
        );

        let update = TaskUpdate::complete();
        for task in &tasks {
            if self.dry_run {
                tracing::info!(dry_run = true, task = %task.gid, "would complete task");
                continue;
            }
            self.provider
                .update_task(&task.gid, &update)
                .await
                .with_context(|| format!("Failed to complete task {}", task.gid))?;
            tracing::info!(task = %task.gid, "completed");
            self.record(new_entry(
                JournalEvent::Completed,
                &task.gid,
                Some(task.name.as_str()),
                None,
            ));
        }

        Ok(tasks.len())
    }

    fn record(&self, entry: JournalEntry) {
        if let Some(journal) = self.journal {
            if let Err(e) = journal.append(&entry) {
                tracing::warn!(path = %journal.path().display(), "journal write failed: {e}");
            }
        }
    }
}
