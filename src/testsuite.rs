//! Test-root environments
//!
//! Points store clients at an isolated store below a test root directory by
//! overriding the environment variables they read their locations from.

use std::convert::Infallible;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Variables removed from the child environment
pub const REMOVED_VARS: &[&str] = &["NIX_USER_CONF_FILES"];

/// Test-root errors
#[derive(Debug, Error)]
pub enum TestRootError {
    #[error("no command given to run")]
    EmptyCommand,

    #[error("unable to execute '{program}': {source}")]
    Exec {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// An isolated store instance rooted at a directory
#[derive(Debug, Clone)]
pub struct TestRoot {
    root: PathBuf,
}

impl TestRoot {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn store_dir(&self) -> PathBuf {
        self.root.join("store")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join("var/nix")
    }

    /// Variables to set in the child environment
    pub fn env(&self) -> Vec<(&'static str, OsString)> {
        vec![
            ("NIX_STORE_DIR", self.store_dir().into_os_string()),
            ("NIX_IGNORE_SYMLINK_STORE", OsString::from("1")),
            ("NIX_LOCALSTATE_DIR", self.root.join("var").into_os_string()),
            ("NIX_LOG_DIR", self.root.join("var/log/nix").into_os_string()),
            ("NIX_STATE_DIR", self.state_dir().into_os_string()),
            ("NIX_CONF_DIR", self.root.join("etc").into_os_string()),
            (
                "NIX_DAEMON_SOCKET_PATH",
                self.root.join("daemon-socket").into_os_string(),
            ),
        ]
    }

    /// Apply the test-root environment to `command`
    pub fn apply<'a>(&self, command: &'a mut Command) -> &'a mut Command {
        for var in REMOVED_VARS {
            command.env_remove(var);
        }
        command.envs(self.env())
    }

    /// Build a command for `argv` running inside this test root
    pub fn command(&self, argv: &[String]) -> Result<Command, TestRootError> {
        let (program, args) = argv.split_first().ok_or(TestRootError::EmptyCommand)?;
        let mut command = Command::new(program);
        command.args(args);
        self.apply(&mut command);
        Ok(command)
    }

    /// Replace the current process with `argv` running inside this test root.
    ///
    /// Only returns on failure.
    #[cfg(unix)]
    pub fn exec(&self, argv: &[String]) -> Result<Infallible, TestRootError> {
        use std::os::unix::process::CommandExt;

        let mut command = self.command(argv)?;
        log::debug!("Executing {:?} in test root {}", argv, self.root.display());
        let source = command.exec();
        Err(TestRootError::Exec {
            program: argv[0].clone(),
            source,
        })
    }

    /// Run `argv` inside this test root and exit with its status
    #[cfg(not(unix))]
    pub fn exec(&self, argv: &[String]) -> Result<Infallible, TestRootError> {
        let mut command = self.command(argv)?;
        let status = command.status().map_err(|source| TestRootError::Exec {
            program: argv[0].clone(),
            source,
        })?;
        std::process::exit(status.code().unwrap_or(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_layout() {
        let root = TestRoot::new("/tmp/t");
        let env = root.env();
        let get = |key: &str| {
            env.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| PathBuf::from(v))
                .unwrap()
        };

        assert_eq!(get("NIX_STORE_DIR"), PathBuf::from("/tmp/t/store"));
        assert_eq!(get("NIX_IGNORE_SYMLINK_STORE"), PathBuf::from("1"));
        assert_eq!(get("NIX_LOCALSTATE_DIR"), PathBuf::from("/tmp/t/var"));
        assert_eq!(get("NIX_LOG_DIR"), PathBuf::from("/tmp/t/var/log/nix"));
        assert_eq!(get("NIX_STATE_DIR"), PathBuf::from("/tmp/t/var/nix"));
        assert_eq!(get("NIX_CONF_DIR"), PathBuf::from("/tmp/t/etc"));
        assert_eq!(
            get("NIX_DAEMON_SOCKET_PATH"),
            PathBuf::from("/tmp/t/daemon-socket")
        );
    }

    #[test]
    fn test_command_applies_env() {
        let root = TestRoot::new("/tmp/t");
        let command = root
            .command(&["env".to_string(), "-0".to_string()])
            .unwrap();

        assert_eq!(command.get_program(), "env");
        let envs: Vec<_> = command.get_envs().collect();
        assert!(envs
            .iter()
            .any(|(k, v)| *k == "NIX_STORE_DIR" && v.map(|v| v == "/tmp/t/store").unwrap_or(false)));
        assert!(envs
            .iter()
            .any(|(k, v)| *k == "NIX_USER_CONF_FILES" && v.is_none()));
    }

    #[test]
    fn test_empty_command() {
        let root = TestRoot::new("/tmp/t");
        assert!(matches!(root.command(&[]), Err(TestRootError::EmptyCommand)));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_missing_program() {
        let root = TestRoot::new("/tmp/t");
        let err = root
            .exec(&["/nonexistent/program".to_string()])
            .unwrap_err();
        assert!(matches!(err, TestRootError::Exec { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_child_sees_test_root() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = TestRoot::new(temp_dir.path());
        let mut command = root
            .command(&[
                "sh".to_string(),
                "-c".to_string(),
                "printf %s \"$NIX_STORE_DIR\"".to_string(),
            ])
            .unwrap();

        let output = command.output().unwrap();
        assert!(output.status.success());
        assert_eq!(
            PathBuf::from(String::from_utf8(output.stdout).unwrap()),
            temp_dir.path().join("store")
        );
    }
}
