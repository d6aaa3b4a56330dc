// ABOUTME: Discovers which packages the user's project depends on locally.
// ABOUTME: Reads requirements.txt and pyproject.toml, normalizing names to catalog form.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::warn;

/// Normalize a distribution name to the form the catalog uses:
/// lowercase with `-` replaced by `_`.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace('-', "_")
}

/// Strip a requirements.txt line down to its bare package name.
/// Comments, include directives, and pip options yield nothing.
fn requirement_name(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
        return None;
    }
    let end = line
        .find(['=', '<', '>', '!', '~', '[', ';', ' ', '\t'])
        .unwrap_or(line.len());
    let name = &line[..end];
    if name.is_empty() { None } else { Some(name) }
}

fn collect_requirements(content: &str, names: &mut BTreeSet<String>) {
    for line in content.lines() {
        if let Some(name) = requirement_name(line) {
            names.insert(normalize_name(name));
        }
    }
}

fn collect_pyproject(content: &str, names: &mut BTreeSet<String>) {
    let doc: toml::Value = match content.parse() {
        Ok(doc) => doc,
        Err(error) => {
            warn!(%error, "failed to parse pyproject.toml, skipping");
            return;
        }
    };

    // PEP 621: [project] dependencies is an array of requirement strings.
    if let Some(deps) = doc
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_array())
    {
        for dep in deps {
            if let Some(name) = dep.as_str().and_then(requirement_name) {
                names.insert(normalize_name(name));
            }
        }
    }

    // Poetry keeps dependencies as a table keyed by package name.
    if let Some(deps) = doc
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_table())
    {
        for name in deps.keys() {
            names.insert(normalize_name(name));
        }
    }
}

/// Package names the project under `root` depends on, sorted and deduplicated.
///
/// Combines `requirements.txt` and `pyproject.toml`; files that are missing
/// or unreadable simply contribute nothing. The `python` pseudo-dependency
/// is dropped.
pub fn local_packages(root: &Path) -> Vec<String> {
    let mut names = BTreeSet::new();

    if let Ok(content) = std::fs::read_to_string(root.join("requirements.txt")) {
        collect_requirements(&content, &mut names);
    }
    if let Ok(content) = std::fs::read_to_string(root.join("pyproject.toml")) {
        collect_pyproject(&content, &mut names);
    }

    names.remove("python");
    names.into_iter().collect()
}
