use crate::config::CatalogConfig;
use crate::error::{DsnPullError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::process::{Command, Stdio};

/// Answer of a catalog existence query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CatalogStatus {
    Exists,
    NotFound,
    InvalidSyntax,
}

/// Read-only existence lookup for qualified dataset names.
///
/// An `Err` means the catalog itself could not answer; callers treat the
/// name as unusable for that one path and carry on.
pub trait DatasetCatalog: Send + Sync {
    fn probe(&self, name: &str) -> Result<CatalogStatus>;
}

/// Catalog answered from a fixed list of known names.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    known: HashSet<String>,
    max_name_length: usize,
}

impl StaticCatalog {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            known: config.known_datasets.iter().cloned().collect(),
            max_name_length: config.max_name_length,
        }
    }

    pub fn with_known<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known.extend(names.into_iter().map(Into::into));
        self
    }

    fn exceeds_length(&self, name: &str) -> bool {
        name.len() > self.max_name_length
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new(&CatalogConfig::default())
    }
}

impl DatasetCatalog for StaticCatalog {
    fn probe(&self, name: &str) -> Result<CatalogStatus> {
        if self.exceeds_length(name) {
            return Ok(CatalogStatus::InvalidSyntax);
        }
        if self.known.contains(name) {
            Ok(CatalogStatus::Exists)
        } else {
            Ok(CatalogStatus::NotFound)
        }
    }
}

/// Catalog that asks an external program, one invocation per name.
///
/// The program is run directly, never through a shell. Every `{name}` in
/// its arguments is replaced by the candidate name.
#[derive(Debug, Clone)]
pub struct CommandCatalog {
    argv: Vec<String>,
    not_found_exit_codes: Vec<i32>,
    limits: StaticCatalog,
}

impl CommandCatalog {
    pub fn new(argv: Vec<String>, config: &CatalogConfig) -> Result<Self> {
        if argv.is_empty() {
            return Err(DsnPullError::Config {
                message: "Catalog probe command must name a program".to_string(),
            });
        }

        Ok(Self {
            argv,
            not_found_exit_codes: config.not_found_exit_codes.clone(),
            limits: StaticCatalog::new(config),
        })
    }

    fn command_for(&self, name: &str) -> Command {
        let mut command = Command::new(&self.argv[0]);
        command
            .args(self.argv[1..].iter().map(|arg| arg.replace("{name}", name)))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }
}

impl DatasetCatalog for CommandCatalog {
    fn probe(&self, name: &str) -> Result<CatalogStatus> {
        if self.limits.exceeds_length(name) {
            return Ok(CatalogStatus::InvalidSyntax);
        }

        let output = self
            .command_for(name)
            .output()
            .map_err(|e| DsnPullError::AmbiguousName {
                name: name.to_string(),
                message: format!("failed to run {}: {}", self.argv[0], e),
            })?;

        match output.status.code() {
            Some(0) => Ok(CatalogStatus::Exists),
            Some(code) if self.not_found_exit_codes.contains(&code) => Ok(CatalogStatus::NotFound),
            Some(code) => {
                tracing::debug!(
                    name,
                    code,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "catalog rejected name"
                );
                Ok(CatalogStatus::InvalidSyntax)
            }
            None => Err(DsnPullError::AmbiguousName {
                name: name.to_string(),
                message: format!("{} was terminated by a signal", self.argv[0]),
            }),
        }
    }
}

/// Build the catalog selected by configuration: the external probe command
/// when one is set, otherwise the static known-name list.
pub fn catalog_from_config(config: &CatalogConfig) -> Result<Box<dyn DatasetCatalog>> {
    match config.probe_command {
        Some(ref argv) => Ok(Box::new(CommandCatalog::new(argv.clone(), config)?)),
        None => Ok(Box::new(StaticCatalog::new(config))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_catalog() {
        let catalog = StaticCatalog::default().with_known(["PROJ.SRC.COBOL"]);

        assert_eq!(catalog.probe("PROJ.SRC.COBOL").unwrap(), CatalogStatus::Exists);
        assert_eq!(catalog.probe("PROJ.SRC.PLI").unwrap(), CatalogStatus::NotFound);
    }

    #[test]
    fn test_static_catalog_length_limit() {
        let catalog = StaticCatalog::default();
        // 9 segments of 4 chars plus dots = 44 characters
        let at_limit = vec!["ABCD"; 9].join(".");
        assert_eq!(at_limit.len(), 44);
        assert_eq!(catalog.probe(&at_limit).unwrap(), CatalogStatus::NotFound);

        let over_limit = format!("{}.X", at_limit);
        assert_eq!(catalog.probe(&over_limit).unwrap(), CatalogStatus::InvalidSyntax);
    }

    #[test]
    fn test_catalog_from_config() {
        let mut config = CatalogConfig::default();
        config.known_datasets = vec!["A.B".to_string()];
        let catalog = catalog_from_config(&config).unwrap();
        assert_eq!(catalog.probe("A.B").unwrap(), CatalogStatus::Exists);

        config.probe_command = Some(Vec::new());
        assert!(catalog_from_config(&config).is_err());
    }

    #[cfg(unix)]
    fn shell_catalog(script: &str) -> CommandCatalog {
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
            "probe".to_string(),
            "{name}".to_string(),
        ];
        CommandCatalog::new(argv, &CatalogConfig::default()).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_command_catalog_exit_codes() {
        let catalog = shell_catalog(
            r#"case "$1" in HAVE.IT) exit 0 ;; BAD.ONE) exit 8 ;; *) exit 1 ;; esac"#,
        );

        assert_eq!(catalog.probe("HAVE.IT").unwrap(), CatalogStatus::Exists);
        assert_eq!(catalog.probe("NEW.ONE").unwrap(), CatalogStatus::NotFound);
        assert_eq!(catalog.probe("BAD.ONE").unwrap(), CatalogStatus::InvalidSyntax);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_catalog_checks_length_before_running() {
        let catalog = shell_catalog("exit 0");
        let long_name = vec!["ABCDEFGH"; 6].join(".");
        assert_eq!(catalog.probe(&long_name).unwrap(), CatalogStatus::InvalidSyntax);
    }

    #[test]
    fn test_command_catalog_spawn_failure_is_ambiguous() {
        let argv = vec!["/definitely/not/a/program".to_string(), "{name}".to_string()];
        let catalog = CommandCatalog::new(argv, &CatalogConfig::default()).unwrap();

        match catalog.probe("A.B") {
            Err(DsnPullError::AmbiguousName { name, .. }) => assert_eq!(name, "A.B"),
            other => panic!("expected AmbiguousName, got {:?}", other),
        }
    }
}
