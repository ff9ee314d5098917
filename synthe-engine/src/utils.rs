//! Shared engine utilities.

use std::path::{Path, PathBuf};

/// Resolve a program or library path.
///
/// Anything containing a path separator is taken as-is and must exist;
/// a bare name is searched on `PATH`.
pub(crate) fn find_on_path(bin: &Path) -> Option<PathBuf> {
    if bin.components().count() > 1 || bin.is_absolute() {
        return if bin.exists() {
            Some(bin.to_path_buf())
        } else {
            None
        };
    }

    if let Some(paths_os) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths_os) {
            let candidate = dir.join(bin);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}
