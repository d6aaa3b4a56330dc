// ABOUTME: Configuration loading and validation for the docsmith CLI.
// ABOUTME: Reads app-level environment variables; provider adapters read their own credentials.

use std::path::PathBuf;

use thiserror::Error;

use docsmith_agent::DEFAULT_STEP_BUDGET;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DOCSMITH_MAX_STEPS is not a positive integer: {0}")]
    InvalidMaxSteps(String),

    #[error("DOCSMITH_PROJECT_ROOT is not a directory: {0}")]
    InvalidProjectRoot(String),
}

/// App-level configuration loaded from environment variables. Credentials
/// for OpenRouter, OpenAI, and Supabase are read by their adapters'
/// `from_env` constructors instead.
#[derive(Debug, Clone)]
pub struct DocsmithConfig {
    /// Step budget for the supervisor loop and each expert loop.
    pub step_budget: usize,
    /// Project directory the file-system tools operate on.
    pub project_root: PathBuf,
    /// Stream answer tokens as they are generated.
    pub streaming: bool,
}

impl DocsmithConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - DOCSMITH_MAX_STEPS: think steps per loop (default: 8)
    /// - DOCSMITH_PROJECT_ROOT: project directory (default: current directory)
    /// - DOCSMITH_STREAM: stream tokens, set to "false"/"0"/"no" to disable (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let step_budget = match std::env::var("DOCSMITH_MAX_STEPS") {
            Ok(raw) => match raw.parse::<usize>() {
                Ok(steps) if steps >= 1 => steps,
                _ => return Err(ConfigError::InvalidMaxSteps(raw)),
            },
            Err(_) => DEFAULT_STEP_BUDGET,
        };

        let project_root = std::env::var("DOCSMITH_PROJECT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        if !project_root.is_dir() {
            return Err(ConfigError::InvalidProjectRoot(
                project_root.display().to_string(),
            ));
        }
        // Canonical so the project tools report absolute paths.
        let project_root = project_root
            .canonicalize()
            .map_err(|_| ConfigError::InvalidProjectRoot(project_root.display().to_string()))?;

        let streaming = std::env::var("DOCSMITH_STREAM")
            .map(|v| !matches!(v.as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        Ok(Self {
            step_budget,
            project_root,
            streaming,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serializes env mutation across the tests in this module.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_vars() {
        // SAFETY: env mutation is serialized by ENV_LOCK.
        unsafe {
            std::env::remove_var("DOCSMITH_MAX_STEPS");
            std::env::remove_var("DOCSMITH_PROJECT_ROOT");
            std::env::remove_var("DOCSMITH_STREAM");
        }
    }

    #[test]
    fn config_loads_defaults() {
        let _guard = ENV_LOCK.lock().expect("lock");
        clear_vars();

        let config = DocsmithConfig::from_env().expect("config");

        assert_eq!(config.step_budget, DEFAULT_STEP_BUDGET);
        let cwd = std::env::current_dir().expect("cwd");
        assert_eq!(config.project_root, cwd.canonicalize().expect("canonical cwd"));
        assert!(config.streaming);
    }

    #[test]
    fn config_reads_overrides() {
        let _guard = ENV_LOCK.lock().expect("lock");
        clear_vars();
        let dir = tempfile::tempdir().expect("tempdir");
        // SAFETY: env mutation is serialized by ENV_LOCK.
        unsafe {
            std::env::set_var("DOCSMITH_MAX_STEPS", "3");
            std::env::set_var("DOCSMITH_STREAM", "false");
            std::env::set_var("DOCSMITH_PROJECT_ROOT", dir.path().to_str().expect("utf8 path"));
        }

        let config = DocsmithConfig::from_env().expect("config");
        clear_vars();

        assert_eq!(config.step_budget, 3);
        assert!(!config.streaming);
        assert_eq!(config.project_root, dir.path().canonicalize().expect("canonical"));
    }

    #[test]
    fn config_rejects_zero_and_junk_max_steps() {
        let _guard = ENV_LOCK.lock().expect("lock");

        for bad in ["0", "-2", "many"] {
            clear_vars();
            // SAFETY: env mutation is serialized by ENV_LOCK.
            unsafe {
                std::env::set_var("DOCSMITH_MAX_STEPS", bad);
            }

            let result = DocsmithConfig::from_env();
            assert!(
                matches!(result, Err(ConfigError::InvalidMaxSteps(_))),
                "expected rejection for {:?}",
                bad
            );
        }
        clear_vars();
    }

    #[test]
    fn config_rejects_missing_project_root() {
        let _guard = ENV_LOCK.lock().expect("lock");
        clear_vars();
        // SAFETY: env mutation is serialized by ENV_LOCK.
        unsafe {
            std::env::set_var("DOCSMITH_PROJECT_ROOT", "/definitely/not/a/real/dir");
        }

        let result = DocsmithConfig::from_env();
        clear_vars();

        assert!(matches!(result, Err(ConfigError::InvalidProjectRoot(_))));
    }
}
