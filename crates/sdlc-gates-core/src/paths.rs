use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SDLC_DIR: &str = ".sdlc";
pub const GATES_CONFIG_FILE: &str = ".sdlc/config/sdlc-gates.yaml";
pub const GATE_STATUS_FILE: &str = ".sdlc/gate-status.json";
pub const LEVEL_FILE: &str = ".sdlc/level.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn gates_config_path(root: &Path) -> PathBuf {
    root.join(GATES_CONFIG_FILE)
}

pub fn gate_status_path(root: &Path) -> PathBuf {
    root.join(GATE_STATUS_FILE)
}

pub fn level_path(root: &Path) -> PathBuf {
    root.join(LEVEL_FILE)
}

/// Sidecar lock guarding writes to `file`.
pub fn lock_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

// ---------------------------------------------------------------------------
// Document patterns
// ---------------------------------------------------------------------------

static PATTERN_RE: OnceLock<Regex> = OnceLock::new();

fn pattern_re() -> &'static Regex {
    // `XX` is the numbering placeholder used in proposal names (`XX-feature.md`).
    PATTERN_RE.get_or_init(|| Regex::new(r"XX|[*?\[]").unwrap())
}

/// True if a required-document entry names a family of files rather than one path.
pub fn is_doc_pattern(entry: &str) -> bool {
    pattern_re().is_match(entry)
}

/// The directory a pattern entry refers to, relative to `root`.
pub fn pattern_dir(root: &Path, entry: &str) -> PathBuf {
    match Path::new(entry).parent() {
        Some(parent) => root.join(parent),
        None => root.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            gates_config_path(root),
            PathBuf::from("/tmp/proj/.sdlc/config/sdlc-gates.yaml")
        );
        assert_eq!(
            gate_status_path(root),
            PathBuf::from("/tmp/proj/.sdlc/gate-status.json")
        );
        assert_eq!(
            lock_path(&gate_status_path(root)),
            PathBuf::from("/tmp/proj/.sdlc/gate-status.json.lock")
        );
    }

    #[test]
    fn doc_patterns() {
        assert!(is_doc_pattern("docs/feature-proposals/XX-feature.md"));
        assert!(is_doc_pattern("docs/adr/*.md"));
        assert!(!is_doc_pattern("docs/architecture/what-if-analysis.md"));
    }

    #[test]
    fn pattern_dir_is_parent() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            pattern_dir(root, "docs/feature-proposals/XX-feature.md"),
            PathBuf::from("/tmp/proj/docs/feature-proposals")
        );
    }
}
