use std::process::Command;

/// `git describe` of the checkout, e.g. `v0.1.0-3-g1a2b3c4-dirty`.
fn describe_checkout() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--tags"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    (!described.is_empty()).then(|| described.to_string())
}

fn main() {
    let version = match describe_checkout() {
        Some(checkout) => format!("{} ({checkout})", env!("CARGO_PKG_VERSION")),
        None => env!("CARGO_PKG_VERSION").to_string(),
    };
    println!("cargo:rustc-env=TWITCH_JOIN_VERSION={version}");
    println!("cargo:rerun-if-changed=build.rs");
}
