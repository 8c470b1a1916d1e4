// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Default search paths for command-line modules

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ModulePathConfig;

/// Environment variable naming an extra module directory
pub const MODULE_LOAD_PATH_ENV: &str = "CTK_MODULE_LOAD_PATH";

/// Subdirectory probed under each base directory
pub const MODULE_SUBDIR: &str = "cli-modules";

/// Assembles the list of directories a host scans for command-line modules.
///
/// Every source is off by default. Sources are emitted in a fixed order:
/// load-path variable, home, current directory, application directory.
#[derive(Debug, Clone, Default)]
pub struct ModulePathBuilder {
    load_from_module_load_path: bool,
    load_from_home_dir: bool,
    load_from_current_dir: bool,
    load_from_application_dir: bool,
}

impl ModulePathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ModulePathConfig) -> Self {
        Self {
            load_from_module_load_path: config.load_path_env,
            load_from_home_dir: config.home_dir,
            load_from_current_dir: config.current_dir,
            load_from_application_dir: config.application_dir,
        }
    }

    pub fn set_load_from_module_load_path(&mut self, load: bool) -> &mut Self {
        self.load_from_module_load_path = load;
        self
    }

    pub fn set_load_from_home_dir(&mut self, load: bool) -> &mut Self {
        self.load_from_home_dir = load;
        self
    }

    pub fn set_load_from_current_dir(&mut self, load: bool) -> &mut Self {
        self.load_from_current_dir = load;
        self
    }

    pub fn set_load_from_application_dir(&mut self, load: bool) -> &mut Self {
        self.load_from_application_dir = load;
        self
    }

    /// Build against the process environment
    pub fn build(&self) -> Vec<PathBuf> {
        self.build_with(&|name: &str| std::env::var_os(name).map(PathBuf::from), &SystemDirs)
    }

    /// Build with an injected environment lookup and directory source
    pub fn build_with(
        &self,
        env: &dyn Fn(&str) -> Option<PathBuf>,
        dirs: &dyn BaseDirs,
    ) -> Vec<PathBuf> {
        let mut result = Vec::new();

        if self.load_from_module_load_path {
            match env(MODULE_LOAD_PATH_ENV) {
                Some(dir) if dir.is_dir() => match std::fs::canonicalize(&dir) {
                    Ok(canonical) => result.push(canonical),
                    Err(e) => debug!("Cannot canonicalize {:?}: {}", dir, e),
                },
                Some(dir) => debug!("{} points at missing directory {:?}", MODULE_LOAD_PATH_ENV, dir),
                None => {}
            }
        }

        if self.load_from_home_dir {
            if let Some(home) = dirs.home_dir().filter(|h| h.is_dir()) {
                push_with_subdir(&mut result, &home);
            }
        }

        if self.load_from_current_dir {
            if let Some(cwd) = dirs.current_dir().filter(|c| c.is_dir()) {
                push_with_subdir(&mut result, &cwd);
            }
        }

        // Not checked for existence: the executable's own directory
        if self.load_from_application_dir {
            if let Some(app) = dirs.application_dir() {
                push_with_subdir(&mut result, &app);
            }
        }

        result
    }
}

fn push_with_subdir(result: &mut Vec<PathBuf>, base: &Path) {
    result.push(base.to_path_buf());
    result.push(base.join(MODULE_SUBDIR));
}

/// Source of the base directories
pub trait BaseDirs {
    fn home_dir(&self) -> Option<PathBuf>;
    fn current_dir(&self) -> Option<PathBuf>;
    fn application_dir(&self) -> Option<PathBuf>;
}

/// Directories of the running process
pub struct SystemDirs;

impl BaseDirs for SystemDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn current_dir(&self) -> Option<PathBuf> {
        std::env::current_dir().ok()
    }

    fn application_dir(&self) -> Option<PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FixedDirs {
        home: Option<PathBuf>,
        cwd: Option<PathBuf>,
        app: Option<PathBuf>,
    }

    impl BaseDirs for FixedDirs {
        fn home_dir(&self) -> Option<PathBuf> {
            self.home.clone()
        }
        fn current_dir(&self) -> Option<PathBuf> {
            self.cwd.clone()
        }
        fn application_dir(&self) -> Option<PathBuf> {
            self.app.clone()
        }
    }

    fn no_env(_: &str) -> Option<PathBuf> {
        None
    }

    #[test]
    fn test_nothing_enabled_builds_empty() {
        let dir = TempDir::new().unwrap();
        let dirs = FixedDirs {
            home: Some(dir.path().to_path_buf()),
            cwd: Some(dir.path().to_path_buf()),
            app: Some(dir.path().to_path_buf()),
        };
        assert!(ModulePathBuilder::new().build_with(&no_env, &dirs).is_empty());
    }

    #[test]
    fn test_order_and_suffix() {
        let home = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        let modules = TempDir::new().unwrap();
        let dirs = FixedDirs {
            home: Some(home.path().to_path_buf()),
            cwd: Some(cwd.path().to_path_buf()),
            app: Some(PathBuf::from("/opt/app/bin")),
        };
        let module_dir = modules.path().to_path_buf();
        let env = move |name: &str| {
            (name == MODULE_LOAD_PATH_ENV).then(|| module_dir.clone())
        };

        let paths = ModulePathBuilder::new()
            .set_load_from_module_load_path(true)
            .set_load_from_home_dir(true)
            .set_load_from_current_dir(true)
            .set_load_from_application_dir(true)
            .build_with(&env, &dirs);

        assert_eq!(
            paths,
            vec![
                std::fs::canonicalize(modules.path()).unwrap(),
                home.path().to_path_buf(),
                home.path().join("cli-modules"),
                cwd.path().to_path_buf(),
                cwd.path().join("cli-modules"),
                PathBuf::from("/opt/app/bin"),
                PathBuf::from("/opt/app/bin/cli-modules"),
            ]
        );
    }

    #[test]
    fn test_missing_directories_are_skipped() {
        let dirs = FixedDirs {
            home: Some(PathBuf::from("/definitely/not/here")),
            cwd: None,
            app: None,
        };
        let env = |_: &str| Some(PathBuf::from("/also/not/here"));

        let paths = ModulePathBuilder::new()
            .set_load_from_module_load_path(true)
            .set_load_from_home_dir(true)
            .set_load_from_current_dir(true)
            .build_with(&env, &dirs);
        assert!(paths.is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = ModulePathConfig {
            current_dir: true,
            ..Default::default()
        };
        let cwd = TempDir::new().unwrap();
        let dirs = FixedDirs {
            home: None,
            cwd: Some(cwd.path().to_path_buf()),
            app: None,
        };
        let paths = ModulePathBuilder::from_config(&config).build_with(&no_env, &dirs);
        assert_eq!(paths.len(), 2);
    }
}
