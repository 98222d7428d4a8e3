// SPDX-License-Identifier: MIT

use simfs::prelude::*;

const BLOCK_SIZE: usize = 512;
const BLOCK_COUNT: u32 = 64;

fn populated() -> MemBlockIO {
    let mut fs = SimFs::format_new(MemBlockIO::new(BLOCK_SIZE, BLOCK_COUNT)).unwrap();
    fs.mkdir("d").unwrap();
    fs.mkdir("d/e").unwrap();
    fs.create("d/f", &[1u8; 700]).unwrap();
    fs.create("g", b"hello\n").unwrap();
    fs.into_inner()
}

fn check(io: MemBlockIO) -> VerifyReport {
    SimFs::mount(io).unwrap().check().unwrap()
}

fn read_dir(io: &mut MemBlockIO, block: u32) -> DirBlock {
    DirBlock::decode(&io.read_block_vec(block).unwrap()).unwrap()
}

fn read_fat(io: &mut MemBlockIO) -> Fat {
    let geometry = Geometry::of(io).unwrap();
    Fat::decode(&io.read_block_vec(FAT_BLOCK).unwrap(), geometry).unwrap()
}

fn child_block(io: &mut MemBlockIO, dir: u32, name: &str) -> u32 {
    let block = read_dir(io, dir);
    let slot = block.find_by_name(name).unwrap();
    block.get(slot).unwrap().first_block
}

#[test]
fn test_clean_volume() {
    let rep = check(populated());
    assert!(rep.ok(), "{rep}");
    assert_eq!(rep.count(Severity::Warn), 0);
    assert_eq!(rep.codes(Severity::Info), vec!["TREE.STATS"]);
}

#[test]
fn test_walker_stats() {
    let mut io = populated();
    let geometry = Geometry::of(&io).unwrap();
    let fat = Fat::decode(&io.read_block_vec(FAT_BLOCK).unwrap(), geometry).unwrap();
    let mut checker = SimFsChecker::new(&mut io, &fat);
    let rep = checker.check_all().unwrap();
    assert!(rep.ok());
    assert_eq!(checker.stats.dirs_visited, 3);
    assert_eq!(checker.stats.files_found, 2);
    assert_eq!(checker.stats.max_depth, 2);
}

#[test]
fn test_detects_leaked_block() {
    let mut io = populated();
    let mut fat = read_fat(&mut io);
    let free = fat.scan_free(0).unwrap();
    let mut raw = fat.encode();
    raw[free as usize * 2..free as usize * 2 + 2].copy_from_slice(&(-1i16).to_le_bytes());
    fat = Fat::decode(&raw, *fat.geometry()).unwrap();
    io.write_block(FAT_BLOCK, &fat.encode()).unwrap();

    let rep = check(io);
    assert!(rep.ok());
    assert_eq!(rep.codes(Severity::Warn), vec!["LEAK.BLOCK"]);
}

#[test]
fn test_detects_cross_link_and_size_mismatch() {
    let mut io = populated();
    let d = child_block(&mut io, ROOT_BLOCK, "d");
    let f = child_block(&mut io, d, "f");

    let mut root = read_dir(&mut io, ROOT_BLOCK);
    let slot = root.find_by_name("g").unwrap();
    let mut entry = root.get(slot).unwrap().clone();
    entry.first_block = f;
    root.set(slot, entry);
    io.write_block(ROOT_BLOCK, &root.encode()).unwrap();

    let rep = check(io);
    let errors = rep.codes(Severity::Error);
    assert!(errors.contains(&"XREF.SHARED"), "{rep}");
    assert!(errors.contains(&"CHAIN.SIZE"), "{rep}");
    assert_eq!(rep.codes(Severity::Warn), vec!["LEAK.BLOCK"]);
}

#[test]
fn test_detects_bad_parent_link() {
    let mut io = populated();
    let d = child_block(&mut io, ROOT_BLOCK, "d");
    let e = child_block(&mut io, d, "e");

    let mut block = read_dir(&mut io, e);
    block.set_parent(ROOT_BLOCK);
    io.write_block(e, &block.encode()).unwrap();

    let rep = check(io);
    assert_eq!(rep.codes(Severity::Error), vec!["TREE.PARENT"]);
}

#[test]
fn test_phase_selection() {
    let mut io = populated();
    let d = child_block(&mut io, ROOT_BLOCK, "d");
    let e = child_block(&mut io, d, "e");
    let mut block = read_dir(&mut io, e);
    block.set_parent(ROOT_BLOCK);
    io.write_block(e, &block.encode()).unwrap();

    let mut fs = SimFs::mount(io).unwrap();
    let opts = CheckOptions {
        phases: VerifyPhases::FAT | VerifyPhases::LEAKS,
        fail_fast: false,
    };
    let rep = fs.check_with(&opts).unwrap();
    assert!(rep.ok());
    assert!(rep.findings.is_empty());
}
