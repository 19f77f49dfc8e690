// Component spec ingestion - one markdown document per component.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::info;

use crate::coordinator::state::{Component, ComponentSet};

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("no components directory found at {}", .0.display())]
    MissingComponentsDir(PathBuf),
    #[error("no components found in spec at {}", .0.display())]
    EmptySpec(PathBuf),
    #[error("failed to read spec document {}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Scan `<spec_dir>/components/` and build the component set. Each
/// `*.md` document becomes one component named after its file stem;
/// files are visited in sorted order so ingestion order is stable.
pub fn ingest(spec_dir: &Path) -> Result<ComponentSet, SpecError> {
    info!(spec_dir = %spec_dir.display(), "parsing component spec");

    let components_dir = spec_dir.join("components");
    if !components_dir.is_dir() {
        return Err(SpecError::MissingComponentsDir(components_dir));
    }

    let mut documents: Vec<PathBuf> = std::fs::read_dir(&components_dir)
        .map_err(|source| SpecError::Unreadable {
            path: components_dir.clone(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    documents.sort();

    let mut components = ComponentSet::new();
    for path in documents {
        let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let content = std::fs::read_to_string(&path).map_err(|source| SpecError::Unreadable {
            path: path.clone(),
            source,
        })?;
        let dependencies = parse_dependencies(&content);
        info!(
            component = name,
            deps = %dependencies.join(", "),
            "ingested component"
        );
        components.insert(Component::new(name, path.clone(), dependencies));
    }

    if components.is_empty() {
        return Err(SpecError::EmptySpec(spec_dir.to_path_buf()));
    }

    Ok(components)
}

/// Extract dependency names from a component document. Dependencies are
/// declared as bullet lists under a "depends on" line, either in free
/// text or nested inside an "## interfaces" section; both forms feed the
/// same deduplicated list. A bullet may carry trailing prose
/// (`- api (the backend)`), only the leading identifier counts.
pub fn parse_dependencies(content: &str) -> Vec<String> {
    // Matches the header line itself ("Depends on:", "depends on"), with
    // the bullet list expected on the following lines until a blank line
    // or a heading.
    static HEADER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)depends\s+on:?\s*$").expect("static regex"));
    static BULLET: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\s*-\s*(\w+)").expect("static regex"));
    let header = &*HEADER;
    let bullet = &*BULLET;

    let mut deps: Vec<String> = Vec::new();
    let mut in_list = false;

    for line in content.lines() {
        if header.is_match(line) {
            in_list = true;
            continue;
        }
        if !in_list {
            continue;
        }
        if let Some(captures) = bullet.captures(line) {
            let name = captures[1].to_string();
            if !deps.contains(&name) {
                deps.push(name);
            }
        } else if line.trim().is_empty() || line.trim_start().starts_with('#') {
            in_list = false;
        }
    }

    deps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_free_text_depends_section() {
        let doc = "\
# api

Depends on:
- db
- cache (shared invalidation)

## behavior
";
        assert_eq!(parse_dependencies(doc), vec!["db", "cache"]);
    }

    #[test]
    fn parses_interfaces_section_and_dedups() {
        let doc = "\
# web

depends on:
- api

## interfaces

exports a router.

depends on:
- api
- auth
";
        assert_eq!(parse_dependencies(doc), vec!["api", "auth"]);
    }

    #[test]
    fn list_ends_at_blank_line() {
        let doc = "\
depends on:
- api

- stray
";
        assert_eq!(parse_dependencies(doc), vec!["api"]);
    }

    #[test]
    fn no_declaration_means_no_dependencies() {
        let doc = "# standalone\n\nJust a leaf component.\n";
        assert!(parse_dependencies(doc).is_empty());
    }

    #[test]
    fn header_may_sit_at_the_end_of_a_sentence() {
        let doc = "This component depends on:\n- core\n";
        assert_eq!(parse_dependencies(doc), vec!["core"]);
    }
}
