use std::env;
use std::process::Command;

const DESCRIBE_VAR: &str = "FTDI_DESCRIPTORS_GIT_DESCRIBE";

fn git_describe() -> Option<String> {
    let output = Command::new("git").args(["describe", "--dirty", "--long", "--always"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let describe = String::from_utf8(output.stdout).ok()?;
    let describe = describe.trim();
    if describe.is_empty() { None } else { Some(describe.to_owned()) }
}

fn main() {
    // The serial number string carries the firmware revision. An explicit value in the
    // environment wins (for reproducible builds); outside of a git checkout there is
    // nothing to describe, so fall back to a fixed marker.
    let describe = env::var(DESCRIBE_VAR)
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(git_describe)
        .unwrap_or_else(|| "unknown".to_owned());

    println!("cargo:rustc-env={}={}", DESCRIBE_VAR, describe);
    // Deliberately not re-run on every commit; touch build.rs to refresh the revision.
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed={}", DESCRIBE_VAR);
}
