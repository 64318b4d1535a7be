// Injects BIORISK_VERSION from `git describe`, falling back to CARGO_PKG_VERSION
// when git or tags are unavailable (e.g. building from a crates.io tarball).

use std::process::Command;

fn main() {
    let version = git_version().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=BIORISK_VERSION={}", version);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");
}

/// "v0.3.0" -> "0.3.0"; "v0.3.0-4-gabc123" -> "0.3.0"; untagged "abc123" -> "0.3.0-abc123"
fn git_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    if described.is_empty() {
        return None;
    }

    match described.strip_prefix('v') {
        Some(tagged) => {
            let release = tagged.split('-').next().unwrap_or(tagged);
            Some(release.to_string())
        }
        None => Some(format!("{}-{}", env!("CARGO_PKG_VERSION"), described)),
    }
}
