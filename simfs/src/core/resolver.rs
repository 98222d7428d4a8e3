// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use crate::core::{attr::*, dir::*, errors::*, meta::*};
use crate::ensure;

/// Abstraction for reading directory blocks while resolving paths.
///
/// Implemented by the staging area, so lookups see the pending writes of the
/// operation in progress. Test harnesses can implement it over a plain map.
pub trait DirSource {
    fn read_dir(&mut self, block: u32) -> FsResult<DirBlock>;
}

/// One meaningful component of a `/`-separated path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component<'a> {
    Parent,
    Name(&'a str),
}

/// Splits a path into components.
///
/// Empty components (`a//b`, trailing `/`) and `.` are dropped, `..` is kept
/// as [`Component::Parent`].
pub fn split(path: &str) -> Vec<Component<'_>> {
    path.split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .map(|c| match c {
            ".." => Component::Parent,
            name => Component::Name(name),
        })
        .collect()
}

/// What a path designates once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A directory reached without an entry of its own (root, `..`, `.`).
    Directory(u32),
    /// An existing entry in directory block `dir`.
    Entry {
        dir: u32,
        slot: usize,
        entry: DirEntry,
    },
    /// The parent exists but holds no entry with this name.
    Vacant { dir: u32, name: String },
}

impl Target {
    /// Directory block designated by the target, if any.
    pub fn as_dir(&self) -> Option<u32> {
        match self {
            Target::Directory(block) => Some(*block),
            Target::Entry { entry, .. } if entry.is_dir() => Some(entry.first_block),
            _ => None,
        }
    }
}

#[inline]
pub fn start_block(path: &str, cwd: u32) -> u32 {
    if path.starts_with('/') {
        ROOT_BLOCK
    } else {
        cwd
    }
}

#[inline]
pub fn parent_of<S: DirSource + ?Sized>(src: &mut S, block: u32) -> FsResult<u32> {
    src.read_dir(block)?.parent()
}

/// Follows `components` from `start`, every one of them must be a directory.
pub fn walk<S: DirSource + ?Sized>(
    src: &mut S,
    start: u32,
    components: &[Component<'_>],
) -> FsResult<u32> {
    let mut current = start;
    for component in components {
        current = match component {
            Component::Parent => parent_of(src, current)?,
            Component::Name(name) => {
                let dir = src.read_dir(current)?;
                let slot = dir.find_by_name(name).ok_or(FsError::PathNotFound)?;
                let entry = dir.get(slot).ok_or(FsError::PathNotFound)?;
                ensure!(entry.is_dir(), FsError::NotADirectory);
                entry.first_block
            }
        };
    }
    Ok(current)
}

/// Resolves every component but the last one.
///
/// Returns the containing directory and the final name. Paths whose last
/// component is `..` or that have no component at all are rejected.
pub fn resolve_to_parent<'p, S: DirSource + ?Sized>(
    src: &mut S,
    cwd: u32,
    path: &'p str,
) -> FsResult<(u32, &'p str)> {
    let components = split(path);
    match components.split_last() {
        Some((Component::Name(name), init)) => {
            let dir = walk(src, start_block(path, cwd), init)?;
            Ok((dir, *name))
        }
        _ => Err(FsError::InvalidPath),
    }
}

pub fn resolve_target<S: DirSource + ?Sized>(
    src: &mut S,
    cwd: u32,
    path: &str,
) -> FsResult<Target> {
    ensure!(!path.trim().is_empty(), FsError::InvalidPath);
    let start = start_block(path, cwd);
    let components = split(path);

    let Some((last, init)) = components.split_last() else {
        return Ok(Target::Directory(start));
    };
    let dir = walk(src, start, init)?;
    match last {
        Component::Parent => Ok(Target::Directory(parent_of(src, dir)?)),
        Component::Name(name) => {
            let block = src.read_dir(dir)?;
            Ok(match block.find_by_name(name) {
                Some(slot) => Target::Entry {
                    dir,
                    slot,
                    entry: block.get(slot).cloned().ok_or(FsError::PathNotFound)?,
                },
                None => Target::Vacant {
                    dir,
                    name: name.to_string(),
                },
            })
        }
    }
}

/// Resolves a path that must name a directory.
pub fn resolve_dir<S: DirSource + ?Sized>(src: &mut S, cwd: u32, path: &str) -> FsResult<u32> {
    let target = resolve_target(src, cwd, path)?;
    match target {
        Target::Vacant { .. } => Err(FsError::PathNotFound),
        other => other.as_dir().ok_or(FsError::NotADirectory),
    }
}

/// Where `cp`/`mv` put their result: an existing directory receives
/// `src_name`, a vacant name is used as is.
pub fn destination<S: DirSource + ?Sized>(
    src: &mut S,
    cwd: u32,
    dst: &str,
    src_name: &str,
) -> FsResult<(u32, String)> {
    match resolve_target(src, cwd, dst)? {
        Target::Vacant { dir, name } => Ok((dir, name)),
        target => {
            let dir = target.as_dir().ok_or(FsError::AlreadyExists)?;
            Ok((dir, src_name.to_string()))
        }
    }
}

/// Rights of a directory, read from its entry in the parent.
///
/// The root has no entry and is always `rwx`.
pub fn dir_rights<S: DirSource + ?Sized>(src: &mut S, dir: u32) -> FsResult<AccessRights> {
    if dir == ROOT_BLOCK {
        return Ok(AccessRights::DIR_DEFAULT);
    }
    let parent = parent_of(src, dir)?;
    let block = src.read_dir(parent)?;
    block
        .find_by_block(dir)
        .and_then(|slot| block.get(slot))
        .map(|e| e.rights)
        .ok_or(FsError::Corrupted("directory is not linked from its parent"))
}

/// Absolute path of `dir`, built by climbing the `..` links.
pub fn absolute_path<S: DirSource + ?Sized>(src: &mut S, dir: u32) -> FsResult<String> {
    let mut names: Vec<String> = Vec::new();
    let mut current = dir;
    for _ in 0..MAX_BLOCK_COUNT {
        if current == ROOT_BLOCK {
            let mut out = String::new();
            for name in names.iter().rev() {
                out.push('/');
                out.push_str(name);
            }
            if out.is_empty() {
                out.push('/');
            }
            return Ok(out);
        }
        let parent = parent_of(src, current)?;
        let block = src.read_dir(parent)?;
        let entry = block
            .find_by_block(current)
            .and_then(|slot| block.get(slot))
            .ok_or(FsError::Corrupted("directory is not linked from its parent"))?;
        names.push(entry.name.clone());
        current = parent;
    }
    Err(FsError::Corrupted("parent links form a cycle"))
}

/// Whether `ancestor` is `block` itself or one of its parents.
pub fn is_ancestor<S: DirSource + ?Sized>(
    src: &mut S,
    ancestor: u32,
    block: u32,
) -> FsResult<bool> {
    let mut current = block;
    for _ in 0..MAX_BLOCK_COUNT {
        if current == ancestor {
            return Ok(true);
        }
        if current == ROOT_BLOCK {
            return Ok(false);
        }
        current = parent_of(src, current)?;
    }
    Err(FsError::Corrupted("parent links form a cycle"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Tree(BTreeMap<u32, DirBlock>);

    impl DirSource for Tree {
        fn read_dir(&mut self, block: u32) -> FsResult<DirBlock> {
            self.0
                .get(&block)
                .cloned()
                .ok_or(FsError::Corrupted("no such block"))
        }
    }

    /// `/d1/d2`, `/d1/f1`, `/f0`
    fn tree() -> Tree {
        let g = Geometry::new(512, 64).unwrap();
        let mut root = DirBlock::new_directory(ROOT_BLOCK, &g);
        root.insert(DirEntry::directory("d1", 2)).unwrap();
        root.insert(DirEntry::file("f0", 5, 3)).unwrap();
        let mut d1 = DirBlock::new_directory(ROOT_BLOCK, &g);
        d1.insert(DirEntry::directory("d2", 3)).unwrap();
        d1.insert(DirEntry::file("f1", 4, 3)).unwrap();
        let d2 = DirBlock::new_directory(2, &g);
        Tree(BTreeMap::from([(0, root), (2, d1), (3, d2)]))
    }

    #[test]
    fn test_split() {
        assert_eq!(
            split("/a//./b/../c/"),
            vec![
                Component::Name("a"),
                Component::Name("b"),
                Component::Parent,
                Component::Name("c"),
            ]
        );
        assert!(split("/").is_empty());
        assert!(split(".").is_empty());
    }

    #[test]
    fn test_resolve_dirs() {
        let mut t = tree();
        assert_eq!(resolve_dir(&mut t, 0, "/").unwrap(), 0);
        assert_eq!(resolve_dir(&mut t, 0, "d1/d2").unwrap(), 3);
        assert_eq!(resolve_dir(&mut t, 3, "..").unwrap(), 2);
        assert_eq!(resolve_dir(&mut t, 3, "../..").unwrap(), 0);
        assert_eq!(resolve_dir(&mut t, 0, "..").unwrap(), 0);
        assert_eq!(resolve_dir(&mut t, 3, "/d1/./d2/../d2").unwrap(), 3);
        assert_eq!(resolve_dir(&mut t, 3, ".").unwrap(), 3);
        assert_eq!(resolve_dir(&mut t, 0, "f0"), Err(FsError::NotADirectory));
        assert_eq!(resolve_dir(&mut t, 0, "nope"), Err(FsError::PathNotFound));
        assert_eq!(resolve_dir(&mut t, 0, "f0/x"), Err(FsError::NotADirectory));
        assert_eq!(resolve_dir(&mut t, 0, ""), Err(FsError::InvalidPath));
    }

    #[test]
    fn test_resolve_target() {
        let mut t = tree();
        match resolve_target(&mut t, 3, "../f1").unwrap() {
            Target::Entry { dir, entry, .. } => {
                assert_eq!(dir, 2);
                assert_eq!(entry.first_block, 4);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            resolve_target(&mut t, 0, "d1/new").unwrap(),
            Target::Vacant {
                dir: 2,
                name: "new".into()
            }
        );
        assert_eq!(
            resolve_target(&mut t, 0, "missing/new"),
            Err(FsError::PathNotFound)
        );
    }

    #[test]
    fn test_resolve_to_parent() {
        let mut t = tree();
        assert_eq!(resolve_to_parent(&mut t, 0, "/d1/x").unwrap(), (2, "x"));
        assert_eq!(resolve_to_parent(&mut t, 0, "/"), Err(FsError::InvalidPath));
        assert_eq!(resolve_to_parent(&mut t, 0, "d1/.."), Err(FsError::InvalidPath));
    }

    #[test]
    fn test_destination() {
        let mut t = tree();
        assert_eq!(
            destination(&mut t, 0, "d1", "f0").unwrap(),
            (2, "f0".into())
        );
        assert_eq!(
            destination(&mut t, 0, "d1/g", "f0").unwrap(),
            (2, "g".into())
        );
        assert_eq!(
            destination(&mut t, 0, "f0", "f0"),
            Err(FsError::AlreadyExists)
        );
    }

    #[test]
    fn test_absolute_path_and_ancestry() {
        let mut t = tree();
        assert_eq!(absolute_path(&mut t, 0).unwrap(), "/");
        assert_eq!(absolute_path(&mut t, 3).unwrap(), "/d1/d2");
        assert!(is_ancestor(&mut t, 2, 3).unwrap());
        assert!(is_ancestor(&mut t, 3, 3).unwrap());
        assert!(!is_ancestor(&mut t, 3, 2).unwrap());
        assert_eq!(dir_rights(&mut t, 3).unwrap(), AccessRights::DIR_DEFAULT);
    }
}
