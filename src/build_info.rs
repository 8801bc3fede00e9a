//! Build information captured at compile time.

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short git commit hash (7 chars), or `unknown` outside a checkout.
pub const BUILD_HASH: &str = env!("BUILD_HASH");

/// `*` when built from a dirty working tree.
pub const BUILD_DIRTY_MARK: &str = env!("BUILD_DIRTY_MARK");

/// Version shown by `--version`, e.g. `0.1.0 (abc1234)` or `0.1.0 (abc1234*)`.
pub const VERSION_STRING: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_HASH"),
    env!("BUILD_DIRTY_MARK"),
    ")"
);

/// Whether the build came from a dirty working tree.
#[must_use]
pub fn is_dirty() -> bool {
    BUILD_DIRTY_MARK == "*"
}
