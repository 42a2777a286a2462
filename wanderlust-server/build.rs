use std::path::PathBuf;
use std::process::Command;

/// Short git sha of the workspace, or "unknown" outside a checkout.
fn git_sha(repo_root: &PathBuf) -> String {
    Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let repo_root = PathBuf::from(manifest_dir).join("..");

    // Reported by /api/health.
    println!("cargo:rustc-env=WANDERLUST_BUILD_SHA={}", git_sha(&repo_root));
    println!("cargo:rerun-if-changed={}", repo_root.join(".git/HEAD").display());
    println!("cargo:rerun-if-changed=build.rs");
}
