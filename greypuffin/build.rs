use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|out| out.trim().to_string())
}

fn main() {
    let git_ref = git(&["rev-parse", "--short=6", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let git_msg = git(&["log", "-1", "--pretty=%s"]).unwrap_or_else(|| "unknown".into());

    println!("cargo:rustc-env=GIT_REF={}", git_ref);
    println!("cargo:rustc-env=GIT_MSG={}", git_msg);
    println!("cargo:rerun-if-changed=../.git/HEAD");
}
