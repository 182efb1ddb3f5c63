//! Study tasks.
//!
//! A [`TaskSpec`] is immutable once an attempt starts; attempts borrow it
//! through an `Arc` so the aggregator and the caller see the same instance.

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::error::{ConfigError, CoreError, Result};
use crate::selection::SelectionEvaluator;

/// Pangram used by the built-in catalogue; every default target occurs in it.
pub const PANGRAM: &str = "The quick brown fox jumps over the lazy dog.";

/// Selection method a task must be completed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Standard,
    Precision,
}

impl MethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodKind::Standard => "standard",
            MethodKind::Precision => "precision",
        }
    }
}

impl std::fmt::Display for MethodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scripted selection task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title: String,
    pub prompt: String,
    pub initial_text: String,
    /// Text to be selected.
    pub target: String,
    pub method: MethodKind,
    #[serde(default)]
    pub case_sensitive: bool,
    /// Training tasks never gate on precision mode.
    #[serde(default)]
    pub training: bool,
}

impl TaskSpec {
    pub fn new(
        title: impl Into<String>,
        prompt: impl Into<String>,
        initial_text: impl Into<String>,
        target: impl Into<String>,
        method: MethodKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            prompt: prompt.into(),
            initial_text: initial_text.into(),
            target: target.into(),
            method,
            case_sensitive: false,
            training: false,
        }
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_training(mut self, training: bool) -> Self {
        self.training = training;
        self
    }

    /// Whether completing this task requires a prior precision-mode activation.
    pub fn requires_precision_gate(&self) -> bool {
        self.method == MethodKind::Precision && !self.training
    }

    /// Evaluator over this task's initial text and target.
    pub fn evaluator(&self) -> SelectionEvaluator {
        SelectionEvaluator::new(&self.initial_text, &self.target, self.case_sensitive)
    }

    /// Check that the target occurs in the text.
    ///
    /// A missing target is not fatal: the task still runs and simply never
    /// matches. Loaders report this as a warning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.evaluator().expected_range().is_none() {
            return Err(ConfigError::TargetNotFound {
                task: self.title.clone(),
                target: self.target.clone(),
            });
        }
        Ok(())
    }
}

/// Built-in task list, alternating standard and precision methods.
pub fn default_tasks() -> Vec<TaskSpec> {
    vec![
        TaskSpec::new(
            "Task 1",
            "Using the normal method, select the word 'quick'.",
            PANGRAM,
            "quick",
            MethodKind::Standard,
        ),
        TaskSpec::new(
            "Task 2",
            "Now, using the new method, select the word 'brown'.",
            PANGRAM,
            "brown",
            MethodKind::Precision,
        ),
        TaskSpec::new(
            "Task 3",
            "Using the normal method, select the phrase 'lazy dog'.",
            PANGRAM,
            "lazy dog",
            MethodKind::Standard,
        ),
        TaskSpec::new(
            "Task 4",
            "Using the new method, select the phrase 'jumps over'.",
            PANGRAM,
            "jumps over",
            MethodKind::Precision,
        ),
    ]
}

/// Order tasks for a counterbalance arm.
///
/// Arm 0 keeps the given order. Arm 1 swaps each consecutive pair so the
/// second method of every pair is presented first.
pub fn ordered_for_arm(mut tasks: Vec<TaskSpec>, arm: u8) -> Vec<TaskSpec> {
    if arm % 2 == 1 {
        for pair in tasks.chunks_mut(2) {
            pair.reverse();
        }
    }
    tasks
}

#[derive(Debug, Deserialize)]
struct TaskFile {
    #[serde(default)]
    tasks: Vec<TaskSpec>,
}

/// Load a task list from a TOML file of `[[tasks]]` tables.
///
/// Tasks whose target is absent from their text are kept and logged.
pub fn load_tasks(path: &Path) -> Result<Vec<TaskSpec>> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let file: TaskFile =
        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
    if file.tasks.is_empty() {
        return Err(CoreError::Custom(format!(
            "no tasks defined in {}",
            path.display()
        )));
    }
    for task in &file.tasks {
        if let Err(e) = task.validate() {
            tracing::warn!("{e}; the task will never complete");
        }
    }
    Ok(file.tasks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_targets_exist_in_pangram() {
        for task in default_tasks() {
            assert!(task.validate().is_ok(), "{} should validate", task.title);
        }
    }

    #[test]
    fn gate_applies_only_to_non_training_precision_tasks() {
        let standard = TaskSpec::new("s", "p", PANGRAM, "quick", MethodKind::Standard);
        let precision = TaskSpec::new("p", "p", PANGRAM, "brown", MethodKind::Precision);
        let training = precision.clone().with_training(true);

        assert!(!standard.requires_precision_gate());
        assert!(precision.requires_precision_gate());
        assert!(!training.requires_precision_gate());
    }

    #[test]
    fn arm_one_swaps_pairs() {
        let tasks = ordered_for_arm(default_tasks(), 1);
        let methods: Vec<_> = tasks.iter().map(|t| t.method).collect();
        assert_eq!(
            methods,
            vec![
                MethodKind::Precision,
                MethodKind::Standard,
                MethodKind::Precision,
                MethodKind::Standard
            ]
        );
        assert_eq!(tasks[0].target, "brown");

        let unchanged = ordered_for_arm(default_tasks(), 0);
        assert_eq!(unchanged[0].target, "quick");
    }

    #[test]
    fn missing_target_is_a_configuration_error() {
        let task = TaskSpec::new("bad", "p", PANGRAM, "zebra", MethodKind::Standard);
        assert!(matches!(
            task.validate(),
            Err(ConfigError::TargetNotFound { .. })
        ));
    }

    #[test]
    fn load_tasks_from_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tasks.toml");
        std::fs::write(
            &path,
            r#"
[[tasks]]
title = "Warm-up"
prompt = "Select 'fox'."
initialText = "The quick brown fox"
target = "fox"
method = "precision"
training = true

[[tasks]]
title = "Missing"
prompt = "Select 'cat'."
initialText = "The quick brown fox"
target = "cat"
method = "standard"
caseSensitive = true
"#,
        )
        .unwrap();

        let tasks = load_tasks(&path).unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks[0].training);
        assert!(!tasks[0].requires_precision_gate());
        assert!(tasks[1].case_sensitive);
        assert!(tasks[1].validate().is_err());
    }

    #[test]
    fn load_tasks_rejects_empty_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tasks.toml");
        std::fs::write(&path, "").unwrap();
        assert!(load_tasks(&path).is_err());
    }
}
