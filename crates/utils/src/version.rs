use std::sync::LazyLock;

use crate::build_info::BUILD_INFO;

/// Defines the application version.
pub static VERSION: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{}-{}{}",
        env!("CARGO_PKG_VERSION"),
        BUILD_INFO.commit_sha1.unwrap_or("unknown"),
        if is_dirty(BUILD_INFO.git_dirty) {
            "-dirty"
        } else {
            ""
        }
    )
});

fn is_dirty(flag: Option<&str>) -> bool {
    flag == Some("true")
}

/// Branch the binary was built from, when known.
pub fn branch() -> Option<&'static str> {
    BUILD_INFO.branch
}
