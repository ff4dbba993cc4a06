//! The shell's view of the world: a directory tree plus in-memory files.
//!
//! A handful of virtual files are seeded at fixed paths and show up in
//! listings alongside real directories; shell redirection writes land here
//! too, so `echo hi > /tmp/out` followed by `cat /tmp/out` round-trips.
//! Each terminal session owns its own namespace, which is what keeps two
//! sessions' working directories independent.

use alloc::collections::btree_map::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use super::dirtree::{DirError, DirTree, MAX_NODES};
use super::path;

const SEED_DIRS: &[&str] = &["/etc", "/home", "/tmp"];
const SEED_FILES: &[(&str, &str)] = &[
    ("/hello.txt", "hello from shell fs\n"),
    ("/etc/motd", "otteros shell filesystem\n"),
    ("/home/readme.txt", "use ls, cat, pwd, cd, mkdir\n"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
}

#[derive(Clone, Debug)]
pub struct DirEntryInfo {
    pub name: String,
    pub kind: EntryKind,
}

pub struct Namespace {
    tree: DirTree,
    files: BTreeMap<String, Vec<u8>>,
}

impl Namespace {
    pub fn new() -> Self {
        let mut tree = DirTree::new();
        for dir in SEED_DIRS {
            tree.mkdir(dir).expect("seed directories fit in a fresh tree");
        }
        let mut files = BTreeMap::new();
        for (seed_path, contents) in SEED_FILES {
            files.insert(String::from(*seed_path), Vec::from(contents.as_bytes()));
        }
        Namespace { tree, files }
    }

    fn resolve(&self, path: &str) -> Result<String, DirError> {
        let input = if path.is_empty() { "." } else { path };
        path::resolve(&self.tree.pwd(), input).map_err(|_| DirError::InvalidPath)
    }

    pub fn pwd(&self) -> String {
        self.tree.pwd()
    }

    pub fn cd(&mut self, path: &str) -> Result<(), DirError> {
        self.tree.cd(path)
    }

    pub fn mkdir(&mut self, path: &str) -> Result<(), DirError> {
        let absolute = self.resolve(path)?;
        if absolute == "/" {
            return Err(DirError::InvalidPath);
        }
        if self.files.contains_key(&absolute) {
            return Err(DirError::Exists);
        }
        self.tree.mkdir(&absolute)
    }

    /// Directory listing merged from tree children and file children, in
    /// lexicographic order. Listing a file path yields that single entry.
    pub fn ls(&self, path: &str, max_entries: usize) -> Result<Vec<DirEntryInfo>, DirError> {
        let absolute = self.resolve(path)?;

        if self.files.contains_key(&absolute) {
            return Ok(alloc::vec![DirEntryInfo {
                name: String::from(basename(&absolute)),
                kind: EntryKind::File,
            }]);
        }

        let mut entries: Vec<DirEntryInfo> = self
            .tree
            .readdir(&absolute, MAX_NODES)?
            .into_iter()
            .map(|name| DirEntryInfo {
                name,
                kind: EntryKind::Dir,
            })
            .collect();

        for file_path in self.files.keys() {
            if parent_of(file_path) == absolute {
                entries.push(DirEntryInfo {
                    name: String::from(basename(file_path)),
                    kind: EntryKind::File,
                });
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        if entries.len() > max_entries {
            return Err(DirError::TooManyEntries {
                total: entries.len(),
            });
        }
        Ok(entries)
    }

    pub fn cat(&self, path: &str) -> Result<&[u8], DirError> {
        let absolute = self.resolve(path)?;
        self.files
            .get(&absolute)
            .map(|v| v.as_slice())
            .ok_or(DirError::NotFound)
    }

    /// The redirection sink: stores `bytes` at `path`, truncating or
    /// appending. The parent must already exist as a directory.
    pub fn write_file(&mut self, path: &str, bytes: &[u8], append: bool) -> Result<(), DirError> {
        let absolute = self.resolve(path)?;
        if absolute == "/" || self.tree.walk(&absolute).is_ok() {
            // Refuses to shadow a directory.
            return Err(DirError::InvalidPath);
        }
        self.tree.walk(&parent_of(&absolute))?;

        let entry = self.files.entry(absolute).or_default();
        if !append {
            entry.clear();
        }
        entry.extend_from_slice(bytes);
        Ok(())
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

fn basename(absolute: &str) -> &str {
    absolute.rsplit('/').next().unwrap_or(absolute)
}

fn parent_of(absolute: &str) -> String {
    match absolute.rfind('/') {
        Some(0) | None => String::from("/"),
        Some(index) => String::from(&absolute[..index]),
    }
}
