//! Recursive discovery of inspectable files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::inspect::FileKind;

/// Collect every file under `dir` whose extension the inspector accepts,
/// sorted by path.
pub fn discover(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk_dir(dir, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk_dir(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_dir(&path, out)?;
        } else if FileKind::from_path(&path).is_ok() {
            out.push(path);
        }
    }
    Ok(())
}
