// ABOUTME: Read-only project file-system tools equipped on the supervisor loop.
// ABOUTME: Directory walks run under spawn_blocking; expected failures come back as plain text.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use docsmith_core::tool::{Tool, ToolOutput};

/// Directories never descended into by the tree and search walks.
pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
    "venv",
    ".idea",
];

/// Directory levels rendered below the project root before the walk stops.
const MAX_TREE_DEPTH: usize = 8;

fn is_ignored(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

/// Resolve a user-supplied relative path against the project root without
/// touching the file system. Absolute paths and traversal that would land
/// outside the root are rejected.
pub fn resolve_in_root(root: &Path, raw: &str) -> Result<PathBuf, String> {
    let candidate = Path::new(raw);
    if candidate.is_absolute() {
        return Err(format!("Path must be relative to the project root: {}", raw));
    }

    let mut kept: Vec<&std::ffi::OsStr> = Vec::new();
    for component in candidate.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if kept.pop().is_none() {
                    return Err(format!("Path escapes the project root: {}", raw));
                }
            }
            Component::Normal(part) => kept.push(part),
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("Path must be relative to the project root: {}", raw));
            }
        }
    }

    let mut resolved = root.to_path_buf();
    for part in kept {
        resolved.push(part);
    }
    Ok(resolved)
}

fn sorted_entries(dir: &Path) -> Result<Vec<(PathBuf, String, bool)>, std::io::Error> {
    let mut entries: Vec<(PathBuf, String, bool)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = path.is_dir();
            (path, name, is_dir)
        })
        .filter(|(_, name, is_dir)| !(*is_dir && is_ignored(name)))
        .collect();

    // Directories first, then files, each tier sorted case-insensitively.
    entries.sort_by_key(|(_, name, is_dir)| (!is_dir, name.to_lowercase()));
    Ok(entries)
}

fn walk_tree(dir: &Path, prefix: &str, depth: usize, out: &mut String) {
    let entries = match sorted_entries(dir) {
        Ok(entries) => entries,
        Err(_) => {
            out.push_str(prefix);
            out.push_str("└── [Permission denied]\n");
            return;
        }
    };

    for (i, (path, name, is_dir)) in entries.iter().enumerate() {
        let last = i + 1 == entries.len();
        let connector = if last { "└── " } else { "├── " };

        if *is_dir {
            out.push_str(&format!("{}{}{}/\n", prefix, connector, name));
            if depth < MAX_TREE_DEPTH {
                let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
                walk_tree(path, &child_prefix, depth + 1, out);
            }
        } else {
            out.push_str(&format!("{}{}{}\n", prefix, connector, name));
        }
    }
}

/// Render the project root as an ASCII tree with box-drawing connectors.
pub fn render_tree(root: &Path) -> String {
    let root_name = root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());

    let mut out = format!("{}/\n", root_name);
    walk_tree(root, "", 0, &mut out);
    out
}

fn search_files(dir: &Path, target: &str, found: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(|entry| entry.ok()) {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            if !is_ignored(&name) {
                search_files(&path, target, found);
            }
        } else if name == target {
            found.push(path);
        }
    }
}

/// Renders the project's directory structure as a tree.
pub struct ProjectStructureTool {
    root: Arc<PathBuf>,
}

impl ProjectStructureTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }
}

#[async_trait]
impl Tool for ProjectStructureTool {
    fn name(&self) -> &str {
        "project_structure"
    }

    fn description(&self) -> &str {
        "Show the file structure of the local project as a directory tree."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _params: Value) -> Result<ToolOutput, anyhow::Error> {
        let root = Arc::clone(&self.root);
        let tree = tokio::task::spawn_blocking(move || render_tree(&root)).await?;
        Ok(ToolOutput::text(tree))
    }
}

/// Reads one project file as text.
pub struct ReadFileTool {
    root: Arc<PathBuf>,
}

impl ReadFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the content of a text file in the project (.env, .py, .toml, .txt, etc.). \
         The path is relative to the project root."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file, relative to the project root."
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, anyhow::Error> {
        let Some(raw) = params.get("path").and_then(Value::as_str) else {
            anyhow::bail!("path parameter is required");
        };

        let path = match resolve_in_root(&self.root, raw) {
            Ok(path) => path,
            Err(message) => return Ok(ToolOutput::text(message)),
        };

        let shown = raw.to_string();
        let content = tokio::task::spawn_blocking(move || {
            if !path.is_file() {
                return format!("File not found: {}", shown);
            }
            match std::fs::read(&path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(error) => format!("Cannot read file {}: {}", shown, error),
            }
        })
        .await?;

        Ok(ToolOutput::text(content))
    }
}

/// Finds every file with a given name anywhere under the project root.
pub struct FindFileTool {
    root: Arc<PathBuf>,
}

impl FindFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }
}

#[async_trait]
impl Tool for FindFileTool {
    fn name(&self) -> &str {
        "find_file"
    }

    fn description(&self) -> &str {
        "Find all locations of a file with the given name in the project. Returns one \
         absolute path per line."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Exact file name to search for, e.g. requirements.txt."
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, anyhow::Error> {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            anyhow::bail!("name parameter is required");
        };

        let root = Arc::clone(&self.root);
        let target = name.to_string();
        let mut found = tokio::task::spawn_blocking(move || {
            let mut found = Vec::new();
            search_files(&root, &target, &mut found);
            found
        })
        .await?;
        found.sort();

        if found.is_empty() {
            return Ok(ToolOutput::text(format!(
                "No files named {} found in the project.",
                name
            )));
        }
        let lines: Vec<String> = found
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        Ok(ToolOutput::text(lines.join("\n")))
    }
}
