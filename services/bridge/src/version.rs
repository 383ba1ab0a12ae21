//! Build/version reporting: crate version plus the git short SHA baked in
//! by `build.rs`, a narrower analogue of the source's Go build-info dump.

pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_SHA: &str = env!("GIT_SHA");
pub const VERSION_STRING: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_SHA"), ")");
