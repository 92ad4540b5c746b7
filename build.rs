use std::process::Command;

fn main() {
    // Release builds outside a checkout pass the revision through BUILD_SHA.
    let sha = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .or_else(|| std::env::var("BUILD_SHA").ok())
        .unwrap_or_else(|| "dev".to_string());

    println!("cargo:rustc-env=BUILD_SHA={sha}");
    println!("cargo:rerun-if-env-changed=BUILD_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
