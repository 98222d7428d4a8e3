// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{string::String, vec::Vec};

use simio::BlockIO;

mod types;

pub use types::*;

use crate::core::{
    dir::DirEntry,
    errors::*,
    fat::{Fat, FatEntry},
    meta::*,
    resolver::DirSource,
    staging::Staging,
};

/// Trait for verifying the integrity of a volume.
///
/// Each phase appends findings to the report. A phase only fails with an
/// error when the device itself cannot be read.
pub trait FsChecker {
    fn check_with(&mut self, opt: &CheckOptions) -> FsResult<VerifyReport> {
        let mut rep = VerifyReport::default();
        self.run_phase(opt, &mut rep, VerifyPhases::FAT, Self::check_fat)?;
        self.run_phase(opt, &mut rep, VerifyPhases::TREE, Self::check_tree)?;
        self.run_phase(opt, &mut rep, VerifyPhases::CHAIN, Self::check_chain)?;
        self.run_phase(
            opt,
            &mut rep,
            VerifyPhases::CROSSREF,
            Self::check_cross_reference,
        )?;
        self.run_phase(opt, &mut rep, VerifyPhases::LEAKS, Self::check_leaks)?;
        Ok(rep)
    }

    fn check_all(&mut self) -> FsResult<VerifyReport> {
        self.check_with(&CheckOptions::default())
    }

    fn check_fat(&mut self, _rep: &mut VerifyReport) -> FsResult {
        Ok(())
    }
    fn check_tree(&mut self, _rep: &mut VerifyReport) -> FsResult {
        Ok(())
    }
    fn check_chain(&mut self, _rep: &mut VerifyReport) -> FsResult {
        Ok(())
    }
    fn check_cross_reference(&mut self, _rep: &mut VerifyReport) -> FsResult {
        Ok(())
    }
    fn check_leaks(&mut self, _rep: &mut VerifyReport) -> FsResult {
        Ok(())
    }

    fn run_phase<F>(
        &mut self,
        opt: &CheckOptions,
        rep: &mut VerifyReport,
        phase: VerifyPhases,
        f: F,
    ) -> FsResult
    where
        F: Fn(&mut Self, &mut VerifyReport) -> FsResult,
    {
        if opt.fail_fast && rep.has_error() {
            return Ok(());
        }
        if opt.phases.contains(phase) {
            f(self, rep)?;
        }
        Ok(())
    }
}

/// An entry reached from the root.
#[derive(Debug, Clone)]
struct Node {
    path: String,
    entry: DirEntry,
}

/// Outcome of the tree walk, shared by every phase that needs it.
#[derive(Debug, Clone, Default)]
struct Walk {
    nodes: Vec<Node>,
    findings: Vec<Finding>,
}

pub struct SimFsChecker<'a, IO: BlockIO + ?Sized> {
    st: Staging<'a, IO>,
    walk: Option<Walk>,
    pub stats: WalkerStats,
}

impl<'a, IO: BlockIO + ?Sized> SimFsChecker<'a, IO> {
    pub fn new(io: &'a mut IO, fat: &'a Fat) -> Self {
        Self {
            st: Staging::new(io, fat),
            walk: None,
            stats: WalkerStats::default(),
        }
    }

    fn fat(&self) -> &Fat {
        self.st.fat()
    }

    fn join(parent: &str, name: &str) -> String {
        let mut path = String::from(parent.trim_end_matches('/'));
        path.push('/');
        path.push_str(name);
        path
    }

    /// Walks the tree from the root, recording tree-level findings aside.
    fn walk_tree(&mut self) -> FsResult<Walk> {
        let mut out = Walk::default();
        let geometry = self.st.geometry();
        let mut seen = vec![false; geometry.block_count as usize];
        let mut nodes = Vec::new();
        let mut stack = vec![(ROOT_BLOCK, ROOT_BLOCK, String::from("/"), 0usize)];
        seen[ROOT_BLOCK as usize] = true;

        while let Some((block, parent, path, depth)) = stack.pop() {
            let dir = match self.st.read_dir(block) {
                Ok(dir) => dir,
                Err(FsError::Io(e)) => return Err(FsError::Io(e)),
                Err(e) => {
                    out.findings.push(Finding::err(
                        "TREE.DECODE",
                        format!("{path}: {}", e.msg()),
                    ));
                    continue;
                }
            };
            self.stats.dirs_visited += 1;
            self.stats.max_depth = self.stats.max_depth.max(depth);

            match dir.parent() {
                Ok(p) if p == parent => {}
                Ok(p) => out.findings.push(Finding::err(
                    "TREE.PARENT",
                    format!("{path}: '..' points to block {p}, expected {parent}"),
                )),
                Err(e) => out.findings.push(Finding::err(
                    "TREE.PARENT",
                    format!("{path}: {}", e.msg()),
                )),
            }

            for (_, entry) in dir.entries() {
                self.stats.entries_scanned += 1;
                let child = Self::join(&path, &entry.name);
                if !geometry.is_valid_unit(entry.first_block) {
                    out.findings.push(Finding::err(
                        "TREE.BLOCK",
                        format!(
                            "{child}: first block {} is outside the data area",
                            entry.first_block
                        ),
                    ));
                    continue;
                }
                if entry.is_dir() {
                    if seen[entry.first_block as usize] {
                        out.findings.push(Finding::err(
                            "TREE.LOOP",
                            format!(
                                "{child}: directory block {} is reached twice",
                                entry.first_block
                            ),
                        ));
                        continue;
                    }
                    seen[entry.first_block as usize] = true;
                    stack.push((entry.first_block, block, child.clone(), depth + 1));
                } else {
                    self.stats.files_found += 1;
                }
                nodes.push(Node {
                    path: child,
                    entry: entry.clone(),
                });
            }
        }
        out.nodes = nodes;
        Ok(out)
    }

    fn walked(&mut self) -> FsResult<&Walk> {
        if self.walk.is_none() {
            self.walk = Some(self.walk_tree()?);
        }
        Ok(self.walk.get_or_insert_default())
    }

    fn nodes(&mut self) -> FsResult<Vec<Node>> {
        Ok(self.walked()?.nodes.clone())
    }
}

impl<IO: BlockIO + ?Sized> FsChecker for SimFsChecker<'_, IO> {
    fn check_fat(&mut self, rep: &mut VerifyReport) -> FsResult {
        let fat = self.fat();
        if !fat.is_formatted() {
            rep.push(Finding::err(
                "FAT.RESERVED",
                "root and FAT entries are not marked end-of-chain",
            ));
        }
        for block in FIRST_DATA_BLOCK..fat.geometry().block_count {
            if let FatEntry::Invalid(raw) = fat.get(block) {
                rep.push(Finding::err(
                    "FAT.ENTRY",
                    format!("block {block} holds invalid link {raw}"),
                ));
            }
        }
        Ok(())
    }

    fn check_tree(&mut self, rep: &mut VerifyReport) -> FsResult {
        let findings = self.walked()?.findings.clone();
        rep.findings.extend(findings);
        rep.push(Finding::info(
            "TREE.STATS",
            format!(
                "{} directories, {} files, depth {}",
                self.stats.dirs_visited, self.stats.files_found, self.stats.max_depth
            ),
        ));
        Ok(())
    }

    fn check_chain(&mut self, rep: &mut VerifyReport) -> FsResult {
        let geometry = self.st.geometry();
        for node in self.nodes()? {
            let chain = match self.fat().chain(node.entry.first_block) {
                Ok(chain) => chain,
                Err(e) => {
                    rep.push(Finding::err(
                        "CHAIN.BROKEN",
                        format!("{}: {}", node.path, e.msg()),
                    ));
                    continue;
                }
            };
            let expected = if node.entry.is_dir() {
                1
            } else {
                geometry.blocks_for(node.entry.size as usize)
            };
            if chain.len() != expected {
                rep.push(Finding::err(
                    "CHAIN.SIZE",
                    format!(
                        "{}: chain has {} blocks, expected {expected}",
                        node.path,
                        chain.len()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_cross_reference(&mut self, rep: &mut VerifyReport) -> FsResult {
        let block_count = self.st.geometry().block_count as usize;
        let mut owner: Vec<Option<String>> = vec![None; block_count];
        for node in self.nodes()? {
            let Ok(chain) = self.fat().chain(node.entry.first_block) else {
                continue;
            };
            for block in chain {
                match &owner[block as usize] {
                    Some(first) => rep.push(Finding::err(
                        "XREF.SHARED",
                        format!("block {block} is used by {first} and {}", node.path),
                    )),
                    None => owner[block as usize] = Some(node.path.clone()),
                }
            }
        }
        Ok(())
    }

    fn check_leaks(&mut self, rep: &mut VerifyReport) -> FsResult {
        let block_count = self.st.geometry().block_count;
        let mut reached = vec![false; block_count as usize];
        for node in self.nodes()? {
            if let Ok(chain) = self.fat().chain(node.entry.first_block) {
                for block in chain {
                    reached[block as usize] = true;
                }
            }
        }
        let leaked: Vec<u32> = (FIRST_DATA_BLOCK..block_count)
            .filter(|&b| self.fat().get(b) != FatEntry::Free && !reached[b as usize])
            .collect();
        for block in leaked {
            rep.push(Finding::warn(
                "LEAK.BLOCK",
                format!("block {block} is allocated but unreachable"),
            ));
        }
        Ok(())
    }
}
