#![allow(missing_docs)]

fn main() {
    process_version_string();
}

fn process_version_string() {
    // docs.rs builds don't get a git short hash
    let hash = git_short_hash().unwrap_or("unknown".into());
    println!("cargo:rustc-env=SELFSIGNED_CA_BUILD_GIT_HASH={hash}");
    let cargo_version = env!("CARGO_PKG_VERSION");

    let version_string = match release_tag() {
        Some(tag) => {
            // Releases are tagged "v1.2.3"
            let short_tag = tag.strip_prefix('v').unwrap_or(&tag);
            assert_eq!(
                cargo_version, short_tag,
                "mismatched cargo and release tag versions"
            );
            tag
        }
        None => format!("{cargo_version}+g{hash}"),
    };
    println!("cargo:rustc-env=SELFSIGNED_CA_VERSION_STRING={version_string}");
}

fn release_tag() -> Option<String> {
    if std::env::var("GITHUB_REF_TYPE").is_ok_and(|v| v == "tag") {
        std::env::var("GITHUB_REF_NAME").ok()
    } else {
        None
    }
}

fn git_short_hash() -> Option<String> {
    let output = std::process::Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    let rev = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!rev.is_empty()).then_some(rev)
}
