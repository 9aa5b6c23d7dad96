pub mod logging;
pub mod state_paths;

pub use crate::shared::errors::RuntimeError;
pub(crate) use crate::shared::time::now_secs;
pub use logging::{append_runtime_log, LogLevel, RuntimeLog};
pub use state_paths::{
    bootstrap_state_root, default_state_root_path, StatePaths, DEFAULT_STATE_ROOT_DIR,
};

/// Resolves `~/.finacrew` and makes sure its directory layout exists.
pub fn ensure_state_root() -> Result<StatePaths, RuntimeError> {
    let paths = StatePaths::new(default_state_root_path()?);
    bootstrap_state_root(&paths)?;
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bootstrap_creates_every_required_directory() {
        let temp = tempdir().expect("tempdir");
        let paths = StatePaths::new(temp.path().join(DEFAULT_STATE_ROOT_DIR));

        bootstrap_state_root(&paths).expect("bootstrap");

        for dir in paths.required_directories() {
            assert!(dir.is_dir(), "missing {}", dir.display());
        }
        assert!(paths.preferences_path().starts_with(paths.root.join("runtime")));
    }

    #[test]
    fn disabled_log_is_a_no_op() {
        RuntimeLog::disabled().info("wizard.test", "nothing is written");
    }
}
