use thiserror::Error;

#[derive(Error, Debug)]
pub enum DsnPullError {
    #[error("Git operation failed: {message}")]
    Git {
        message: String,
        #[source]
        source: git2::Error,
    },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Repository not found: {path}")]
    RepositoryNotFound { path: String },

    #[error("Invalid commit reference: {reference}")]
    InvalidReference { reference: String },

    #[error("None of the requested commits or tags were found in the history")]
    NoTargetsMatched { targets: Vec<String> },

    #[error("Catalog probe failed for {name}: {message}")]
    AmbiguousName { name: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Permission denied: {path}")]
    Permission { path: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("Manifest file already exists: {path}")]
    ManifestExists { path: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for DsnPullError {
    fn user_message(&self) -> String {
        match self {
            DsnPullError::Git { message, .. } => {
                format!("Git operation failed: {}", message)
            }
            DsnPullError::RepositoryNotFound { path } => {
                format!("No git repository found at: {}", path)
            }
            DsnPullError::InvalidReference { reference } => {
                format!("Cannot resolve commit or tag: {}", reference)
            }
            DsnPullError::NoTargetsMatched { targets } => {
                if targets.is_empty() {
                    "Nothing to do: no commits or tags were requested".to_string()
                } else {
                    format!(
                        "Nothing to do: none of {} appear in the history",
                        targets.join(", ")
                    )
                }
            }
            DsnPullError::AmbiguousName { name, message } => {
                format!("Could not check dataset name {}: {}", name, message)
            }
            DsnPullError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            DsnPullError::Permission { path } => {
                format!("Permission denied accessing: {}", path)
            }
            DsnPullError::Cancelled => "Operation was cancelled by user".to_string(),
            DsnPullError::ManifestExists { path } => {
                format!("Manifest file already exists: {}", path)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            DsnPullError::RepositoryNotFound { .. } => Some(
                "Run from inside a git working tree or point --repository at one.".to_string(),
            ),
            DsnPullError::InvalidReference { .. } => Some(
                "Check the spelling of the hash or tag; `git tag --list` shows the available tags."
                    .to_string(),
            ),
            DsnPullError::NoTargetsMatched { .. } => Some(
                "The targets must be reachable from --revision. Try --all-refs to search every branch and tag."
                    .to_string(),
            ),
            DsnPullError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present."
                    .to_string(),
            ),
            DsnPullError::Permission { .. } => Some(
                "Ensure you have the necessary read/write permissions for the target directory."
                    .to_string(),
            ),
            DsnPullError::ManifestExists { .. } => Some(
                "Remove the existing manifests, choose another directory with --output, or use --force to overwrite."
                    .to_string(),
            ),
            _ => None,
        }
    }
}

impl From<git2::Error> for DsnPullError {
    fn from(error: git2::Error) -> Self {
        use git2::{ErrorClass, ErrorCode};

        match (error.class(), error.code()) {
            (ErrorClass::Repository, ErrorCode::NotFound) => DsnPullError::RepositoryNotFound {
                path: error.message().to_string(),
            },
            (ErrorClass::Reference, ErrorCode::NotFound)
            | (ErrorClass::Odb, ErrorCode::NotFound)
            | (_, ErrorCode::Ambiguous) => DsnPullError::InvalidReference {
                reference: error.message().to_string(),
            },
            (ErrorClass::Os, _) if error.message().contains("ermission") => {
                DsnPullError::Permission {
                    path: error.message().to_string(),
                }
            }
            _ => DsnPullError::Git {
                message: error.message().to_string(),
                source: error,
            },
        }
    }
}

impl From<toml::de::Error> for DsnPullError {
    fn from(error: toml::de::Error) -> Self {
        DsnPullError::Config {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for DsnPullError {
    fn from(error: serde_json::Error) -> Self {
        DsnPullError::Config {
            message: format!("Failed to serialize report: {}", error),
        }
    }
}

pub type Result<T> = std::result::Result<T, DsnPullError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let error = DsnPullError::InvalidReference {
            reference: "v9.9".to_string(),
        };
        assert!(error.user_message().contains("v9.9"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_no_targets_message() {
        let error = DsnPullError::NoTargetsMatched {
            targets: vec!["abc123".to_string(), "v1.0".to_string()],
        };
        assert!(error.user_message().starts_with("Nothing to do"));
        assert!(error.user_message().contains("abc123, v1.0"));

        let empty = DsnPullError::NoTargetsMatched { targets: vec![] };
        assert!(empty.user_message().contains("no commits or tags"));
    }

    #[test]
    fn test_git_error_conversion() {
        let git_error = git2::Error::from_str("test error");
        let converted = DsnPullError::from(git_error);
        assert!(matches!(converted, DsnPullError::Git { .. }));
    }

    #[test]
    fn test_reference_not_found_conversion() {
        let git_error = git2::Error::new(
            git2::ErrorCode::NotFound,
            git2::ErrorClass::Reference,
            "revspec 'nope' not found",
        );
        let converted = DsnPullError::from(git_error);
        assert!(matches!(converted, DsnPullError::InvalidReference { .. }));
    }
}
