//! Emits GIT_HASH, BUILD_TIMESTAMP and BUILD_PROFILE for the startup log
//! and `/api/buildinfo`.

use std::process::Command;

fn short_commit() -> Option<String> {
    let out = Command::new("git").args(["rev-parse", "--short=8", "HEAD"]).output().ok()?;
    if !out.status.success() {
        return None;
    }
    String::from_utf8(out.stdout).ok().map(|s| s.trim().to_string())
}

fn main() {
    let stamp = chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false);
    let vars = [
        ("GIT_HASH", short_commit().unwrap_or_else(|| "unknown".into())),
        ("BUILD_TIMESTAMP", stamp),
        ("BUILD_PROFILE", std::env::var("PROFILE").unwrap_or_else(|_| "unknown".into())),
    ];
    for (key, value) in vars {
        println!("cargo:rustc-env={}={}", key, value);
    }
    println!("cargo:rerun-if-changed=../.git/HEAD");
}
