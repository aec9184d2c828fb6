#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Bytes the stub writes to its `--print-to-pdf` target.
pub const STUB_PDF: &[u8] = b"%PDF-1.4 stub";

/// Path to the executable Chrome stand-in.
pub fn stub() -> PathBuf {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/chrome-stub.sh");
    // Checkouts don't always preserve the executable bit.
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// One entry per stub invocation, each split into its arguments.
pub fn invocations(log: &Path) -> Vec<Vec<String>> {
    let Ok(content) = std::fs::read_to_string(log) else {
        return Vec::new();
    };
    content.lines().map(|line| line.split_whitespace().map(str::to_string).collect()).collect()
}

pub fn probes(log: &Path) -> usize {
    invocations(log).iter().filter(|args| args.iter().any(|arg| arg == "--version")).count()
}

pub fn write_html(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, "<html><body>hi</body></html>").unwrap();
    path
}

pub fn entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(dir).unwrap().map(|entry| entry.unwrap().path()).collect();
    entries.sort();
    entries
}
