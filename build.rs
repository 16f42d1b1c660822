use std::process::Command;

/// Short commit hash of the checkout, if it is a git work tree.
fn commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|h| !h.is_empty())
}

fn main() {
    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let app_version = match commit_hash() {
        Some(hash) => format!("{}-{}", version, hash),
        None => version,
    };
    println!("cargo:rustc-env=APP_VERSION={}", app_version);

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");
}
