//! Task descriptor: everything a task run consumes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CoreError, DatasetId, ModelId, ProjectId, TaskId};

/// Reference to a trained model artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    /// Human-readable model title.
    pub title: String,

    /// Platform model id.
    pub id: ModelId,

    /// Expected content hash of the artifact.
    pub hash: String,
}

impl ModelRef {
    /// Create a new ModelRef.
    pub fn new(title: impl Into<String>, id: u64, hash: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: ModelId::new(id),
            hash: hash.into(),
        }
    }
}

/// Reference to a dataset inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRef {
    pub id: DatasetId,
    pub title: String,
}

impl DatasetRef {
    /// Create a new DatasetRef.
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id: DatasetId::new(id),
            title: title.into(),
        }
    }
}

/// Reference to a project and the datasets of it the task needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub datasets: Vec<DatasetRef>,
}

impl ProjectRef {
    /// Create a new ProjectRef with no datasets.
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(id),
            title: title.into(),
            datasets: Vec::new(),
        }
    }

    /// Builder method to add a dataset.
    pub fn with_dataset(mut self, dataset: DatasetRef) -> Self {
        self.datasets.push(dataset);
        self
    }
}

/// Task info document as delivered by the platform.
///
/// The task root is a worker concern and is not part of the document; use
/// [`TaskInfo::into_descriptor`] to bind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    #[serde(default)]
    pub task_id: Option<TaskId>,
    #[serde(default)]
    pub models: Vec<ModelRef>,
    #[serde(default)]
    pub projects: Vec<ProjectRef>,
    #[serde(default = "empty_config")]
    pub config: Value,
}

fn empty_config() -> Value {
    Value::Object(Default::default())
}

impl TaskInfo {
    /// Parse a task info document from JSON text.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Bind the document to a task root, generating a task id if the
    /// document carries none.
    pub fn into_descriptor(self, root: impl Into<PathBuf>) -> TaskDescriptor {
        TaskDescriptor {
            task_id: self.task_id.unwrap_or_else(TaskId::generate),
            root: root.into(),
            models: self.models,
            projects: self.projects,
            config: self.config,
        }
    }
}

/// Immutable input to a single task run.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDescriptor {
    task_id: TaskId,
    root: PathBuf,
    models: Vec<ModelRef>,
    projects: Vec<ProjectRef>,
    config: Value,
}

impl TaskDescriptor {
    /// Create a descriptor with no inputs and an empty configuration.
    pub fn new(task_id: TaskId, root: impl Into<PathBuf>) -> Self {
        Self {
            task_id,
            root: root.into(),
            models: Vec::new(),
            projects: Vec::new(),
            config: empty_config(),
        }
    }

    /// Builder method to add a model reference.
    pub fn with_model(mut self, model: ModelRef) -> Self {
        self.models.push(model);
        self
    }

    /// Builder method to add a project reference.
    pub fn with_project(mut self, project: ProjectRef) -> Self {
        self.projects.push(project);
        self
    }

    /// Builder method to set the configuration document.
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn models(&self) -> &[ModelRef] {
        &self.models
    }

    pub fn projects(&self) -> &[ProjectRef] {
        &self.projects
    }

    pub fn config(&self) -> &Value {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_task_info() {
        let info = TaskInfo::from_json(
            r#"{
                "task_id": "t-1",
                "models": [{"title": "m1", "id": 42, "hash": "abc"}],
                "projects": [{"id": 7, "title": "p1", "datasets": [{"id": 1, "title": "d1"}]}],
                "config": {"epochs": 10}
            }"#,
        )
        .unwrap();

        let descriptor = info.into_descriptor("/tmp/tasks/t-1");
        assert_eq!(descriptor.task_id().as_str(), "t-1");
        assert_eq!(descriptor.models(), &[ModelRef::new("m1", 42, "abc")]);
        assert_eq!(
            descriptor.projects(),
            &[ProjectRef::new(7, "p1").with_dataset(DatasetRef::new(1, "d1"))]
        );
        assert_eq!(descriptor.config(), &json!({"epochs": 10}));
        assert_eq!(descriptor.root(), Path::new("/tmp/tasks/t-1"));
    }

    #[test]
    fn test_missing_fields_default() {
        let descriptor = TaskInfo::from_json("{}").unwrap().into_descriptor("/tmp/x");
        assert!(descriptor.models().is_empty());
        assert!(descriptor.projects().is_empty());
        assert_eq!(descriptor.config(), &json!({}));
        assert!(!descriptor.task_id().as_str().is_empty());
    }

    #[test]
    fn test_malformed_info_is_rejected() {
        let result = TaskInfo::from_json(r#"{"models": [{"title": "m1"}]}"#);
        assert!(matches!(result, Err(CoreError::Serialization(_))));
    }
}
