//! Stamps the binary with a local build counter, the build time and the
//! cargo profile.

use std::error::Error;
use std::fs;
use std::path::Path;

const COUNTER_FILE: &str = "build_number.txt";

fn next_build_number(path: &Path) -> u64 {
    fs::read_to_string(path)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map_or(1, |n| n.saturating_add(1))
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=src");

    let counter = Path::new(COUNTER_FILE);
    let build_number = next_build_number(counter);
    fs::write(counter, build_number.to_string())?;

    let built_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    for (key, value) in [
        ("INSIGHTS_BUILD_NUMBER", build_number.to_string()),
        ("INSIGHTS_BUILD_TIMESTAMP", built_at),
        ("INSIGHTS_BUILD_PROFILE", profile),
    ] {
        println!("cargo:rustc-env={}={}", key, value);
    }

    Ok(())
}
