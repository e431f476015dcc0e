use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Walk up from the given path to find the workspace root.
/// Looks for common project markers: .git, Cargo.toml, package.json, etc.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    const MARKERS: &[&str] = &[
        "Cargo.toml",
        "package.json",
        "pyproject.toml",
        "setup.py",
        "go.mod",
        ".git",
    ];

    let mut current = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        if MARKERS.iter().any(|m| current.join(m).exists()) {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    /// A file, with its extension or `"unknown"` when it has none.
    File { extension: String },
}

/// One row of the workspace file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    /// Path relative to the workspace root, `/`-separated.
    pub path: String,
    pub kind: EntryKind,
}

impl FileEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// `"directory"` or the file extension.
    pub fn type_label(&self) -> &str {
        match &self.kind {
            EntryKind::Directory => "directory",
            EntryKind::File { extension } => extension,
        }
    }
}

/// List files and directories under `root`, honouring `.gitignore`.
/// Entries are sorted by relative path.
pub fn list_workspace_files(root: &Path) -> Vec<FileEntry> {
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .require_git(false)
        .filter_entry(|e| e.file_name() != ".git")
        .build();

    let mut entries = Vec::new();
    for entry in walker.flatten() {
        let entry_path = entry.path();
        let Ok(relative) = entry_path.strip_prefix(root) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let name = entry.file_name().to_string_lossy().to_string();
        let kind = if entry.file_type().is_some_and(|ft| ft.is_dir()) {
            EntryKind::Directory
        } else {
            let extension = Path::new(&name)
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            EntryKind::File { extension }
        };
        entries.push(FileEntry { name, path, kind });
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!(root = %root.display(), count = entries.len(), "listed workspace files");
    entries
}

/// Set of workspace paths the user picked as context.
#[derive(Debug, Clone, Default)]
pub struct FileSelection {
    selected: BTreeSet<String>,
}

impl FileSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the selection state of `path`; returns whether it is now selected.
    pub fn toggle(&mut self, path: &str) -> bool {
        if self.selected.remove(path) {
            false
        } else {
            self.selected.insert(path.to_string());
            true
        }
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.selected.contains(path)
    }

    /// Selected paths in path order.
    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    /// Selected entries of `entries`, then the rest, each in the given order.
    pub fn partition<'a>(&self, entries: &'a [FileEntry]) -> (Vec<&'a FileEntry>, Vec<&'a FileEntry>) {
        entries.iter().partition(|e| self.is_selected(&e.path))
    }

    /// Names of the selected files joined for display, e.g. `a.rs, b.rs`.
    pub fn labels(&self) -> String {
        self.selected
            .iter()
            .map(|p| p.rsplit('/').next().unwrap_or(p))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_rust_workspace() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Cargo.toml"), "[package]").unwrap();
        let sub = tmp.path().join("src");
        std::fs::create_dir_all(&sub).unwrap();

        let root = find_workspace_root(&sub).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn test_list_sorted_with_kinds() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("src/nested")).unwrap();
        std::fs::write(tmp.path().join("src/main.rs"), "").unwrap();
        std::fs::write(tmp.path().join("src/nested/lib.rs"), "").unwrap();
        std::fs::write(tmp.path().join("Makefile"), "").unwrap();

        let entries = list_workspace_files(tmp.path());
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["Makefile", "src", "src/main.rs", "src/nested", "src/nested/lib.rs"]
        );
        assert_eq!(entries[0].type_label(), "unknown");
        assert!(entries[1].is_dir());
        assert_eq!(entries[2].name, "main.rs");
        assert_eq!(entries[2].type_label(), "rs");
    }

    #[test]
    fn test_list_honours_gitignore() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".gitignore"), "target/\n").unwrap();
        std::fs::create_dir_all(tmp.path().join("target")).unwrap();
        std::fs::write(tmp.path().join("target/out.bin"), "").unwrap();
        std::fs::write(tmp.path().join("lib.rs"), "").unwrap();

        let entries = list_workspace_files(tmp.path());
        assert!(entries.iter().all(|e| !e.path.starts_with("target")));
        assert!(entries.iter().any(|e| e.path == "lib.rs"));
    }

    #[test]
    fn test_selection_toggle_and_labels() {
        let mut selection = FileSelection::new();
        assert!(selection.toggle("src/b.rs"));
        assert!(selection.toggle("a.rs"));
        assert_eq!(selection.labels(), "a.rs, b.rs");
        assert!(!selection.toggle("a.rs"));
        assert_eq!(selection.selected().collect::<Vec<_>>(), vec!["src/b.rs"]);
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_selection_partition() {
        let entries = vec![
            FileEntry {
                name: "a.rs".into(),
                path: "a.rs".into(),
                kind: EntryKind::File {
                    extension: "rs".into(),
                },
            },
            FileEntry {
                name: "b.rs".into(),
                path: "b.rs".into(),
                kind: EntryKind::File {
                    extension: "rs".into(),
                },
            },
        ];
        let mut selection = FileSelection::new();
        selection.toggle("b.rs");
        let (picked, rest) = selection.partition(&entries);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].path, "b.rs");
        assert_eq!(rest[0].path, "a.rs");
    }
}
