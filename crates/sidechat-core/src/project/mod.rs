pub mod workspace;

pub use workspace::{find_workspace_root, list_workspace_files, EntryKind, FileEntry, FileSelection};
