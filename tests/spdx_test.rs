// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

const SPDX_LINE: &str = "// SPDX-License-Identifier: Apache-2.0";

/// Source roots of every workspace member.
const SOURCE_DIRS: &[&str] = &[
    "src",
    "tests",
    "benches",
    "nandsynth-evolve/src",
    "nandsynth-evolve/tests",
];

fn has_spdx_line(file_path: &Path) -> bool {
    let file = fs::File::open(file_path).unwrap();
    let reader = io::BufReader::new(file);
    match reader.lines().next() {
        Some(Ok(first_line)) => first_line.starts_with(SPDX_LINE),
        _ => false,
    }
}

fn rust_files_under(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut dir_worklist = vec![root.to_path_buf()];
    while let Some(dir) = dir_worklist.pop() {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                dir_worklist.push(path);
            } else if path.extension().is_some_and(|extension| extension == "rs") {
                files.push(path);
            }
        }
    }
    files
}

#[test]
fn test_all_rust_files_carry_spdx_line() {
    let workspace_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut checked = 0;
    let mut missing = Vec::new();
    for source_dir in SOURCE_DIRS {
        let root = workspace_dir.join(source_dir);
        if !root.is_dir() {
            continue;
        }
        for path in rust_files_under(&root) {
            checked += 1;
            if !has_spdx_line(&path) {
                missing.push(path);
            }
        }
    }
    assert!(checked > 0, "no Rust sources found under {:?}", workspace_dir);
    assert!(
        missing.is_empty(),
        "The following files are missing SPDX identifiers: {:?}",
        missing
    );
}
