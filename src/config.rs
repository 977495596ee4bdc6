use crate::error::{DsnPullError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    pub repository: PathBuf,
    pub revision: String,
    pub all_refs: bool,
    pub context_lines: u32,
    pub detect_renames: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub known_datasets: Vec<String>,
    pub probe_command: Option<Vec<String>>,
    pub not_found_exit_codes: Vec<i32>,
    pub max_name_length: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub manifest_directory: Option<PathBuf>,
    pub write_manifests: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            repository: PathBuf::from("."),
            revision: "HEAD".to_string(),
            all_refs: false,
            context_lines: 3,
            detect_renames: true,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            known_datasets: Vec::new(),
            probe_command: None,
            not_found_exit_codes: vec![1],
            max_name_length: 44, // catalog limit for a fully qualified name
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            manifest_directory: None,
            write_manifests: true,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DsnPullError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| DsnPullError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| DsnPullError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["dsnpull.toml", ".dsnpull.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref repository) = cli_args.repository {
            self.git.repository = repository.clone();
        }

        if let Some(ref revision) = cli_args.revision {
            self.git.revision = revision.clone();
        }

        if cli_args.all_refs {
            self.git.all_refs = true;
        }

        if let Some(ref known) = cli_args.known_datasets {
            for name in known {
                let name = name.trim().to_string();
                if !name.is_empty() && !self.catalog.known_datasets.contains(&name) {
                    self.catalog.known_datasets.push(name);
                }
            }
        }

        // No quoting rules on the command line; the TOML argv form keeps spaces
        if let Some(ref command) = cli_args.probe_command {
            let argv: Vec<String> = command.split_whitespace().map(str::to_string).collect();
            if !argv.is_empty() {
                self.catalog.probe_command = Some(argv);
            }
        }

        if let Some(ref output_dir) = cli_args.manifest_directory {
            self.output.manifest_directory = Some(output_dir.clone());
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| DsnPullError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| DsnPullError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.git.revision.trim().is_empty() {
            return Err(DsnPullError::Config {
                message: "Git revision must not be empty".to_string(),
            });
        }

        if self.catalog.max_name_length == 0 {
            return Err(DsnPullError::Config {
                message: "Maximum dataset name length must be greater than 0".to_string(),
            });
        }

        if let Some(ref argv) = self.catalog.probe_command {
            if argv.is_empty() {
                return Err(DsnPullError::Config {
                    message: "Catalog probe command must name a program".to_string(),
                });
            }
            if !argv.iter().any(|arg| arg.contains("{name}")) {
                return Err(DsnPullError::Config {
                    message: "Catalog probe command must contain a {name} placeholder".to_string(),
                });
            }
        }

        if let Some(ref dir) = self.output.manifest_directory {
            if let Some(parent) = dir.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(DsnPullError::Config {
                        message: format!("Parent directory does not exist: {}", parent.display()),
                    });
                }
            }
        }

        Ok(())
    }

    /// Defaults plus one known dataset and a manifest directory.
    pub fn create_sample_config() -> Self {
        let mut sample_config = Self::default();
        sample_config.catalog.known_datasets = vec!["PROJ.SRC.COBOL".to_string()];
        sample_config.output.manifest_directory = Some(PathBuf::from("dsnpull-out"));
        sample_config
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub repository: Option<PathBuf>,
    pub revision: Option<String>,
    pub all_refs: bool,
    pub known_datasets: Option<Vec<String>>,
    pub probe_command: Option<String>,
    pub manifest_directory: Option<PathBuf>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(mut self, repository: Option<PathBuf>) -> Self {
        self.repository = repository;
        self
    }

    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    pub fn with_all_refs(mut self, all_refs: bool) -> Self {
        self.all_refs = all_refs;
        self
    }

    pub fn with_known_datasets(mut self, known: Option<Vec<String>>) -> Self {
        self.known_datasets = known;
        self
    }

    pub fn with_probe_command(mut self, command: Option<String>) -> Self {
        self.probe_command = command;
        self
    }

    pub fn with_manifest_directory(mut self, dir: Option<PathBuf>) -> Self {
        self.manifest_directory = dir;
        self
    }
}
