//! Hierarchical grouping of entries for browsing and bulk operations.

use std::path::{Path, PathBuf};

use cairn_core::alloc::sparse_set::{IndexSlot, SparseSet};
use cairn_core::profiling::profile_function;

use crate::source::Origin;

/// Generation-checked key of a directory node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirId(IndexSlot);

/// A directory node.
#[derive(Debug)]
pub struct AssetDir {
    name: String,
    path: String,
    parent: Option<DirId>,
    children: Vec<DirId>,
    entries: Vec<String>,
    origin: Origin,
    source: Option<PathBuf>,
}

impl AssetDir {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `/`-separated path from the root, with a trailing `/` (empty for the root).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parent(&self) -> Option<DirId> {
        self.parent
    }

    pub fn children(&self) -> &[DirId] {
        &self.children
    }

    /// Names of the entries directly inside this directory.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Filesystem directory this node was discovered from, relative to the base path, if any.
    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Arena-backed directory tree with a single root.
pub struct DirectoryTree {
    dirs: SparseSet<AssetDir>,
    root: DirId,
}

impl Default for DirectoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryTree {
    pub fn new() -> Self {
        let mut dirs = SparseSet::new();
        let root = DirId(dirs.push(AssetDir {
            name: "Root".to_string(),
            path: String::new(),
            parent: None,
            children: Vec::new(),
            entries: Vec::new(),
            origin: Origin::Project,
            source: None,
        }));
        Self { dirs, root }
    }

    pub fn root(&self) -> DirId {
        self.root
    }

    pub fn get(&self, id: DirId) -> Option<&AssetDir> {
        self.dirs.try_get(id.0)
    }

    pub fn contains(&self, id: DirId) -> bool {
        self.dirs.contains(id.0)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn find_child(&self, parent: DirId, name: &str) -> Option<DirId> {
        self.get(parent)?
            .children
            .iter()
            .copied()
            .find(|child| self.get(*child).is_some_and(|dir| dir.name == name))
    }

    /// Create `name` under `parent`, or return the existing child of that name.
    pub fn create_subdirectory(&mut self, parent: DirId, name: &str, origin: Origin) -> Option<DirId> {
        if let Some(existing) = self.find_child(parent, name) {
            return Some(existing);
        }
        let path = format!("{}{}/", self.get(parent)?.path, name);
        let id = DirId(self.dirs.push(AssetDir {
            name: name.to_string(),
            path,
            parent: Some(parent),
            children: Vec::new(),
            entries: Vec::new(),
            origin,
            source: None,
        }));
        self.dirs.try_get_mut(parent.0)?.children.push(id);
        Some(id)
    }

    /// Resolve a `/`-separated path from the root, e.g. `"Engine/Textures"`.
    pub fn find(&self, path: &str) -> Option<DirId> {
        path.split('/')
            .filter(|part| !part.is_empty())
            .try_fold(self.root, |dir, part| self.find_child(dir, part))
    }

    pub(crate) fn set_source_path(&mut self, dir: DirId, path: PathBuf) {
        if let Some(node) = self.dirs.try_get_mut(dir.0) {
            node.source = Some(path);
        }
    }

    pub(crate) fn add_entry(&mut self, dir: DirId, name: &str) -> bool {
        match self.dirs.try_get_mut(dir.0) {
            Some(node) => {
                node.entries.push(name.to_string());
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_entry(&mut self, dir: DirId, name: &str) {
        if let Some(node) = self.dirs.try_get_mut(dir.0) {
            node.entries.retain(|entry| entry != name);
        }
    }

    /// Every entry name in `dir` and below, depth first.
    pub fn entries_recursive(&self, dir: DirId) -> Vec<String> {
        let mut names = Vec::new();
        let mut stack = vec![dir];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                names.extend(node.entries.iter().cloned());
                stack.extend(node.children.iter().rev().copied());
            }
        }
        names
    }

    /// Remove `dir` and everything below it, returning the entry names it held.
    ///
    /// The root cannot be removed; its children can.
    pub fn remove_subtree(&mut self, dir: DirId) -> Option<Vec<String>> {
        profile_function!();
        if dir == self.root || !self.contains(dir) {
            return None;
        }
        let names = self.entries_recursive(dir);

        if let Some(parent) = self.get(dir).and_then(|node| node.parent)
            && let Some(parent) = self.dirs.try_get_mut(parent.0)
        {
            parent.children.retain(|child| *child != dir);
        }

        let mut stack = vec![dir];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.dirs.try_remove(id.0) {
                stack.extend(node.children);
            }
        }
        Some(names)
    }
}
