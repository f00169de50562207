//! Per-task isolation: a private working directory and a sanitized environment.
//!
//! The [`Sandbox`] is an arena keyed by task id. Every task gets
//! `<root>/<task_id>`; asking for the same id twice yields the same directory
//! and leaves it untouched.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// Arena of per-task working directories under a fixed root.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
    strip_env: Vec<String>,
    bookkeeping_dir: String,
}

impl Sandbox {
    /// Creates an arena rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            strip_env: Vec::new(),
            bookkeeping_dir: crate::runner::config::DEFAULT_BOOKKEEPING_DIR.to_string(),
        }
    }

    /// Sets the variables removed from every context's environment.
    pub fn with_strip_env(mut self, vars: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.strip_env = vars.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the agent-owned directory excluded from file counts.
    pub fn with_bookkeeping_dir(mut self, dir: impl Into<String>) -> Self {
        self.bookkeeping_dir = dir.into();
        self
    }

    /// Returns the arena root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic working directory for `task_id`, without touching the filesystem.
    pub fn workdir_for(&self, task_id: &str) -> io::Result<PathBuf> {
        if !is_safe_task_id(task_id) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("task id '{}' is not a valid directory name", task_id),
            ));
        }
        Ok(self.root.join(task_id))
    }

    /// Creates (if needed) and returns the execution context for `task_id`.
    pub fn context(&self, task_id: &str) -> io::Result<ExecutionContext> {
        let working_dir = self.workdir_for(task_id)?;
        std::fs::create_dir_all(&working_dir)?;
        debug!(task_id = %task_id, dir = %working_dir.display(), "Prepared working directory");

        Ok(ExecutionContext {
            working_dir,
            env: sanitized_env(std::env::vars(), &self.strip_env),
            bookkeeping_dir: self.bookkeeping_dir.clone(),
        })
    }
}

/// The working directory and environment one task runs with.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Private working directory.
    pub working_dir: PathBuf,
    /// Full environment handed to the agent (the process env is cleared first).
    pub env: HashMap<String, String>,
    /// Agent-owned directory excluded from file counts.
    pub bookkeeping_dir: String,
}

impl ExecutionContext {
    /// Counts regular files in the working directory, skipping the bookkeeping directory.
    pub fn count_user_files(&self) -> usize {
        count_user_files(&self.working_dir, &self.bookkeeping_dir)
    }
}

/// Copies `vars`, dropping every name in `strip`.
pub fn sanitized_env(
    vars: impl IntoIterator<Item = (String, String)>,
    strip: &[String],
) -> HashMap<String, String> {
    vars.into_iter()
        .filter(|(key, _)| !strip.iter().any(|s| s == key))
        .collect()
}

/// Counts regular files under `dir` whose relative path does not pass through `bookkeeping_dir`.
pub fn count_user_files(dir: &Path, bookkeeping_dir: &str) -> usize {
    WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || entry.file_name() != bookkeeping_dir)
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .count()
}

/// True if `name` is a single plain path component, usable as a file or directory name.
pub fn is_safe_task_id(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('/')
        && !name.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_workdir_is_deterministic() {
        let sandbox = Sandbox::new("/tmp/bench");
        assert_eq!(
            sandbox.workdir_for("sample-1").unwrap(),
            PathBuf::from("/tmp/bench/sample-1")
        );
        assert_eq!(
            sandbox.workdir_for("sample-1").unwrap(),
            sandbox.workdir_for("sample-1").unwrap()
        );
    }

    #[test]
    fn test_rejects_escaping_ids() {
        let sandbox = Sandbox::new("/tmp/bench");
        for id in ["", ".", "..", "a/b", "../x", "/abs"] {
            let err = sandbox.workdir_for(id).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "id {:?}", id);
        }
    }

    #[test]
    fn test_safe_task_ids() {
        for id in ["sample-1", "task_2", "a.b"] {
            assert!(is_safe_task_id(id), "id {:?}", id);
        }
        for id in ["", ".", "..", "../escaped", "a\\b", "/abs"] {
            assert!(!is_safe_task_id(id), "id {:?}", id);
        }
    }

    #[test]
    fn test_context_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let sandbox = Sandbox::new(temp.path().join("nested/root"));

        let ctx = sandbox.context("task-1").unwrap();
        assert!(ctx.working_dir.is_dir());
        fs::write(ctx.working_dir.join("keep.txt"), "data").unwrap();

        let again = sandbox.context("task-1").unwrap();
        assert_eq!(ctx.working_dir, again.working_dir);
        assert!(again.working_dir.join("keep.txt").exists());
    }

    #[test]
    fn test_sanitized_env_strips_markers() {
        let vars = vec![
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("CLAUDECODE".to_string(), "1".to_string()),
            ("CLAUDE_CODE_ENTRYPOINT".to_string(), "cli".to_string()),
        ];
        let strip = vec!["CLAUDECODE".to_string(), "CLAUDE_CODE_ENTRYPOINT".to_string()];

        let env = sanitized_env(vars, &strip);
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("PATH").map(String::as_str), Some("/usr/bin"));
    }

    #[test]
    fn test_count_user_files_skips_bookkeeping() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::write(dir.join("main.py"), "print(1)").unwrap();
        fs::create_dir_all(dir.join("src/lib")).unwrap();
        fs::write(dir.join("src/lib/util.py"), "").unwrap();
        fs::create_dir_all(dir.join(".krenk/runs")).unwrap();
        fs::write(dir.join(".krenk/state.json"), "{}").unwrap();
        fs::write(dir.join(".krenk/runs/1.log"), "").unwrap();

        assert_eq!(count_user_files(dir, ".krenk"), 2);
    }

    #[test]
    fn test_count_user_files_nested_bookkeeping_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::create_dir_all(dir.join("app/.krenk")).unwrap();
        fs::write(dir.join("app/.krenk/plan.md"), "").unwrap();
        fs::write(dir.join("app/index.js"), "").unwrap();

        assert_eq!(count_user_files(dir, ".krenk"), 1);
    }

    #[test]
    fn test_count_user_files_empty_and_missing() {
        let temp = TempDir::new().unwrap();
        assert_eq!(count_user_files(temp.path(), ".krenk"), 0);
        assert_eq!(count_user_files(&temp.path().join("missing"), ".krenk"), 0);
    }
}
