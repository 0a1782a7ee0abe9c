use std::process::Command;

fn git_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    let commit = git_commit().unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=LINEAGE_GIT_COMMIT={commit}");

    let build_date = chrono::Utc::now().format("%Y-%m-%d");
    println!("cargo:rustc-env=LINEAGE_BUILD_DATE={build_date}");
}
