/*! Locating library files.

A [`SearchPaths`] is an ordered list of library roots (user directory first, system directory
after); [`lib_file_search`](SearchPaths::lib_file_search) looks for `<root>/<dir>/<name>` in
each root in turn, trying the name as given and with the default extension appended.

**Example:**
```rust
use textclass::paths::SearchPaths;
let dir = std::env::temp_dir();
let paths = SearchPaths::new([dir.clone()]);
assert_eq!(paths.roots(),&[dir]);
assert!(paths.lib_file_search("layouts","surely-not-there","layout").is_none());
```
*/

use std::path::{Path, PathBuf};
use log::debug;

/// The ordered library roots searched for layouts, modules, cite engines and catalogs.
#[derive(Clone,Debug,Default,PartialEq,Eq)]
pub struct SearchPaths {
    roots:Vec<PathBuf>
}

impl SearchPaths {
    /// Uses the given roots in the given order, dropping duplicates.
    pub fn new<I:IntoIterator<Item=P>,P:Into<PathBuf>>(roots:I) -> Self {
        let mut ret = SearchPaths::default();
        for r in roots { ret.push_root(r) }
        ret
    }

    /** Reads the roots from the environment:
- `LYX_USERDIR` (the per-user library, searched first),
- `LYX_LAYOUT_PATH` (additional roots, separated by `:` or `;`),
- `LYX_DIR` (the system library, searched last).

A leading `~` is replaced by the home directory; roots that do not exist are skipped.
    */
    pub fn from_env() -> Self {
        let home = home_dir();
        let mut dirs : Vec<String> = Vec::new();
        if let Ok(d) = std::env::var("LYX_USERDIR") { dirs.push(d) }
        if let Ok(s) = std::env::var("LYX_LAYOUT_PATH") {
            dirs.extend(s.split([':',';']).map(ToString::to_string))
        }
        if let Ok(d) = std::env::var("LYX_DIR") { dirs.push(d) }
        let mut ret = SearchPaths::default();
        for mut d in dirs {
            if d.trim().is_empty() { continue }
            if let (Some(rest),Some(home)) = (d.strip_prefix('~'),home.as_ref()) {
                d = format!("{}{}",home,rest)
            }
            let pb = PathBuf::from(d.trim());
            if pb.is_dir() { ret.push_root(pb) }
            else { debug!(target:"tclass","skipping non-existent library root {}",pb.display()) }
        }
        ret
    }

    /// Appends a root (lowest priority) unless it is already present.
    pub fn push_root<P:Into<PathBuf>>(&mut self,root:P) {
        let root = root.into();
        if !self.roots.contains(&root) { self.roots.push(root) }
    }
    /// Inserts a root with the highest priority.
    pub fn prepend_root<P:Into<PathBuf>>(&mut self,root:P) {
        let root = root.into();
        self.roots.retain(|r| *r != root);
        self.roots.insert(0,root)
    }
    pub fn roots(&self) -> &[PathBuf] { &self.roots }
    /// The root catalogs are (re)written to: the first one.
    pub fn user_dir(&self) -> Option<&Path> { self.roots.first().map(PathBuf::as_path) }

    /// Looks for `name` in the `dir` subdirectory of every root; see [`file_search`].
    pub fn lib_file_search(&self,dir:&str,name:&str,ext:&str) -> Option<PathBuf> {
        let pb = Path::new(name);
        if pb.is_absolute() { return file_search(pb.parent()?,pb.file_name()?.to_str()?,ext) }
        self.roots.iter().find_map(|r| file_search(&r.join(dir),name,ext))
    }
}

/// Tries `<base>/<name>` and, unless `name` already ends in `.ext`, `<base>/<name>.ext`.
pub fn file_search(base:&Path,name:&str,ext:&str) -> Option<PathBuf> {
    if name.is_empty() { return None }
    let p = base.join(name);
    if p.is_file() { return Some(p) }
    if ext.is_empty() || name.ends_with(&format!(".{}",ext)) { return None }
    let p = base.join(format!("{}.{}",name,ext));
    if p.is_file() { Some(p) } else { None }
}

fn home_dir() -> Option<String> {
    if cfg!(target_os = "windows") {
        Some(std::env::var("HOMEDRIVE").ok()? + &std::env::var("HOMEPATH").ok()?)
    } else {
        std::env::var("HOME").ok()
    }
}
