//! Benchmark tasks and the places they come from.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::sandbox::is_safe_task_id;
use crate::error::BenchError;

/// Category used when a task does not name one.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// One unit of benchmark work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier, unique within a run.
    pub id: String,
    /// Instruction handed verbatim to the agent.
    pub instruction: String,
    /// Grouping label for per-category breakdowns.
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    UNKNOWN_CATEGORY.to_string()
}

impl Task {
    /// Creates a task with the default category.
    pub fn new(id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            instruction: instruction.into(),
            category: default_category(),
        }
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Returns at most `max_chars` characters of the instruction, for progress lines.
    pub fn instruction_preview(&self, max_chars: usize) -> String {
        let mut chars = self.instruction.chars();
        let preview: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", preview)
        } else {
            preview
        }
    }
}

/// The built-in sample set used when no task list is supplied.
pub fn sample_tasks() -> Vec<Task> {
    vec![
        Task::new(
            "sample-1",
            "Create a Python script that reads a CSV file and outputs the top 5 rows sorted by the second column in descending order. The script should handle missing values gracefully.",
        )
        .with_category("coding"),
        Task::new(
            "sample-2",
            "Write a bash script that monitors disk usage and sends a warning to stdout if any partition exceeds 80% usage. Include the partition name, used space, and percentage.",
        )
        .with_category("sysadmin"),
        Task::new(
            "sample-3",
            "Create a Node.js HTTP server that responds to GET /health with a JSON object containing uptime, memory usage, and current timestamp. Use only built-in modules.",
        )
        .with_category("coding"),
        Task::new(
            "sample-4",
            "Write a Python script that takes a directory path as argument and generates a markdown file listing all files recursively with their sizes, organized by file extension.",
        )
        .with_category("coding"),
        Task::new(
            "sample-5",
            "Create a shell script that sets up a basic git repository with a .gitignore for Node.js projects, an initial commit, and creates develop and staging branches.",
        )
        .with_category("sysadmin"),
    ]
}

/// Loads a task list from a YAML or JSON file.
///
/// The file holds a sequence of tasks. JSON is detected by the `.json`
/// extension; everything else is parsed as YAML.
pub fn load_tasks(path: &Path) -> Result<Vec<Task>, BenchError> {
    let content = fs::read_to_string(path).map_err(|e| BenchError::TaskLoad {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let tasks: Vec<Task> = if is_json {
        serde_json::from_str(&content).map_err(|e| BenchError::TaskLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?
    } else {
        serde_yaml::from_str(&content).map_err(|e| BenchError::TaskLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?
    };

    validate_tasks(&tasks)?;
    Ok(tasks)
}

/// Checks that ids are non-empty, unique and usable as a single path component.
///
/// Ids name the working directory and the log file; duplicates would share them.
pub fn validate_tasks(tasks: &[Task]) -> Result<(), BenchError> {
    let mut seen = HashSet::new();
    for task in tasks {
        if task.id.trim().is_empty() {
            return Err(BenchError::InvalidTask("task id cannot be empty".to_string()));
        }
        if !is_safe_task_id(&task.id) {
            return Err(BenchError::InvalidTask(format!(
                "task id '{}' is not a valid directory name",
                task.id
            )));
        }
        if !seen.insert(task.id.as_str()) {
            return Err(BenchError::InvalidTask(format!(
                "duplicate task id '{}'",
                task.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sample_tasks() {
        let tasks = sample_tasks();
        assert_eq!(tasks.len(), 5);
        assert!(validate_tasks(&tasks).is_ok());
        assert_eq!(tasks.iter().filter(|t| t.category == "coding").count(), 3);
        assert_eq!(tasks.iter().filter(|t| t.category == "sysadmin").count(), 2);
    }

    #[test]
    fn test_category_defaults_to_unknown() {
        let task: Task = serde_json::from_str(r#"{"id": "t1", "instruction": "do it"}"#).unwrap();
        assert_eq!(task.category, "unknown");
        assert_eq!(Task::new("t2", "x").category, UNKNOWN_CATEGORY);
    }

    #[test]
    fn test_instruction_preview() {
        let task = Task::new("t", "abcdef");
        assert_eq!(task.instruction_preview(3), "abc...");
        assert_eq!(task.instruction_preview(10), "abcdef");
    }

    #[test]
    fn test_load_yaml_tasks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.yaml");
        fs::write(
            &path,
            "- id: a\n  instruction: write a script\n  category: coding\n- id: b\n  instruction: check disks\n",
        )
        .unwrap();

        let tasks = load_tasks(&path).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].category, "coding");
        assert_eq!(tasks[1].category, "unknown");
    }

    #[test]
    fn test_load_json_tasks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.json");
        fs::write(&path, r#"[{"id": "x", "instruction": "go", "category": "sysadmin"}]"#).unwrap();

        let tasks = load_tasks(&path).unwrap();
        assert_eq!(tasks, vec![Task::new("x", "go").with_category("sysadmin")]);
    }

    #[test]
    fn test_validate_rejects_path_ids() {
        for id in ["../escaped", "a/b", "..", "/abs"] {
            let err = validate_tasks(&[Task::new(id, "x")]).unwrap_err();
            assert!(matches!(err, BenchError::InvalidTask(_)), "id {:?}", id);
        }
        assert!(validate_tasks(&[Task::new("hello-world_1", "x")]).is_ok());
    }

    #[test]
    fn test_load_rejects_duplicates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.yaml");
        fs::write(&path, "- id: a\n  instruction: one\n- id: a\n  instruction: two\n").unwrap();

        let err = load_tasks(&path).unwrap_err();
        assert!(matches!(err, BenchError::InvalidTask(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_tasks(Path::new("/nonexistent/tasks.yaml")).unwrap_err();
        assert!(matches!(err, BenchError::TaskLoad { .. }));
    }
}
