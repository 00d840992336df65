use std::process::Command;

const HASH_OVERRIDE_VAR: &str = "MOOD_SERVER_BUILD_HASH";

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn build_hash() -> String {
    // Container builds have no .git, the hash is passed in instead.
    if let Ok(hash) = std::env::var(HASH_OVERRIDE_VAR) {
        if !hash.trim().is_empty() {
            return hash.trim().to_string();
        }
    }

    match git(&["rev-parse", "--short", "HEAD"]) {
        Some(hash) => {
            let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
                .is_some_and(|status| !status.is_empty());
            if dirty {
                format!("{}-dirty", hash)
            } else {
                hash
            }
        }
        None => "unknown".to_string(),
    }
}

fn main() {
    println!("cargo:rustc-env=GIT_HASH={}", build_hash());

    println!("cargo:rerun-if-env-changed={}", HASH_OVERRIDE_VAR);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");
}
