//! User-Agent header generation.
//!
//! Format: `docstore-rust/0.1.0 (rust/1.92; linux/x86_64)`, optionally
//! followed by an application identifier.

use std::sync::OnceLock;

/// Client name used in the User-Agent string.
const CLIENT_NAME: &str = "docstore-rust";

/// Client version from Cargo.toml.
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

static USER_AGENT: OnceLock<String> = OnceLock::new();

/// Returns the User-Agent string for client requests.
///
/// Computed once and cached.
pub fn user_agent() -> &'static str {
    USER_AGENT.get_or_init(|| {
        format!(
            "{}/{} ({}; {}/{})",
            CLIENT_NAME,
            CLIENT_VERSION,
            rust_version(),
            os_name(),
            std::env::consts::ARCH,
        )
    })
}

/// Returns the User-Agent with an application identifier appended, e.g.
/// `docstore-rust/0.1.0 (rust/1.92; linux/x86_64) inventory-sync/2.3`.
pub fn user_agent_with(application: Option<&str>) -> String {
    match application.map(str::trim).filter(|a| !a.is_empty()) {
        Some(app) => format!("{} {}", user_agent(), app),
        None => user_agent().to_owned(),
    }
}

fn rust_version() -> &'static str {
    concat!("rust/", env!("CARGO_PKG_RUST_VERSION"))
}

fn os_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        os => os,
    }
}
