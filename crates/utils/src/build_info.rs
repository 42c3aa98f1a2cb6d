/// Git information captured by the build script.
///
/// Every value is optional because the crate may be built outside of a git
/// checkout, in which case the build script only prints a warning.
pub(crate) struct BuildInfo {
    pub commit_sha1: Option<&'static str>,
    pub branch: Option<&'static str>,
    /// Raw `VERGEN_GIT_DIRTY` value, `"true"` for a dirty tree
    pub git_dirty: Option<&'static str>,
}

pub(crate) const BUILD_INFO: BuildInfo = BuildInfo {
    commit_sha1: option_env!("VERGEN_GIT_SHA"),
    branch: option_env!("VERGEN_GIT_BRANCH"),
    git_dirty: option_env!("VERGEN_GIT_DIRTY"),
};
