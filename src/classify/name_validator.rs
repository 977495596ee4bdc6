use crate::classify::catalog::{CatalogStatus, DatasetCatalog};
use crate::error::DsnPullError;
use std::fmt;

/// Longest allowed qualifier between two dots.
pub const MAX_SEGMENT_LENGTH: usize = 8;

/// Characters accepted wherever a letter is.
pub const NATIONAL_CHARS: [char; 3] = ['$', '#', '@'];

/// Why a candidate name was turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Hidden,
    Blank,
    EmbeddedSpace,
    SegmentTooLong { segment: String },
    BadLeadingChar { segment: String },
    BadCharacters { segment: String },
    NotUpperCase,
    CatalogSyntax,
    ProbeFailed { message: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Hidden => write!(f, "starts with '.'"),
            Rejection::Blank => write!(f, "is empty"),
            Rejection::EmbeddedSpace => write!(f, "contains a space"),
            Rejection::SegmentTooLong { segment } => {
                write!(f, "qualifier '{}' is longer than {}", segment, MAX_SEGMENT_LENGTH)
            }
            Rejection::BadLeadingChar { segment } => {
                write!(
                    f,
                    "qualifier '{}' does not start with a letter or national character",
                    segment
                )
            }
            Rejection::BadCharacters { segment } => {
                write!(f, "qualifier '{}' contains unsupported characters", segment)
            }
            Rejection::NotUpperCase => write!(f, "is not upper case"),
            Rejection::CatalogSyntax => write!(f, "was rejected by the catalog"),
            Rejection::ProbeFailed { message } => write!(f, "catalog probe failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid(CatalogStatus),
    Invalid(Rejection),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid(_))
    }
}

fn strip_quotes(name: &str) -> &str {
    for quote in ['\'', '"'] {
        if name.len() >= 2 && name.starts_with(quote) && name.ends_with(quote) {
            return &name[1..name.len() - 1];
        }
    }
    name
}

fn check_segment(segment: &str) -> Result<(), Rejection> {
    if segment.chars().count() > MAX_SEGMENT_LENGTH {
        return Err(Rejection::SegmentTooLong {
            segment: segment.to_string(),
        });
    }

    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || NATIONAL_CHARS.contains(&c) => {}
        _ => {
            return Err(Rejection::BadLeadingChar {
                segment: segment.to_string(),
            })
        }
    }

    if chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || NATIONAL_CHARS.contains(&c)) {
        Ok(())
    } else {
        Err(Rejection::BadCharacters {
            segment: segment.to_string(),
        })
    }
}

/// Local syntax rules for a qualified name. Returns the name with one layer
/// of enclosing quotes removed, ready for a catalog probe.
pub fn check_syntax(path: &str) -> Result<&str, Rejection> {
    if path.starts_with('.') {
        return Err(Rejection::Hidden);
    }
    if path.trim().is_empty() {
        return Err(Rejection::Blank);
    }
    if path.contains(' ') {
        return Err(Rejection::EmbeddedSpace);
    }

    let name = strip_quotes(path);
    for segment in name.split('.') {
        check_segment(segment)?;
    }

    if name.to_uppercase() != name {
        return Err(Rejection::NotUpperCase);
    }

    Ok(name)
}

/// Decides whether a path prefix names a partitioned dataset.
pub struct NameValidator<'a> {
    catalog: &'a dyn DatasetCatalog,
}

impl<'a> NameValidator<'a> {
    pub fn new(catalog: &'a dyn DatasetCatalog) -> Self {
        Self { catalog }
    }

    /// Syntax first, then one catalog probe. A catalog that cannot answer
    /// makes the name invalid; the caller learns why from the rejection.
    pub fn validate(&self, path: &str) -> Verdict {
        let name = match check_syntax(path) {
            Ok(name) => name,
            Err(rejection) => return Verdict::Invalid(rejection),
        };

        match self.catalog.probe(name) {
            Ok(CatalogStatus::InvalidSyntax) => Verdict::Invalid(Rejection::CatalogSyntax),
            Ok(status) => Verdict::Valid(status),
            Err(DsnPullError::AmbiguousName { message, .. }) => {
                tracing::warn!(name, %message, "catalog could not classify name");
                Verdict::Invalid(Rejection::ProbeFailed { message })
            }
            Err(e) => {
                tracing::warn!(name, error = %e, "catalog could not classify name");
                Verdict::Invalid(Rejection::ProbeFailed {
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::catalog::StaticCatalog;
    use crate::error::Result;

    struct FailingCatalog;

    impl DatasetCatalog for FailingCatalog {
        fn probe(&self, name: &str) -> Result<CatalogStatus> {
            Err(DsnPullError::AmbiguousName {
                name: name.to_string(),
                message: "catalog offline".to_string(),
            })
        }
    }

    fn verdict(path: &str) -> Verdict {
        let catalog = StaticCatalog::default().with_known(["PROJ.SRC.COBOL"]);
        NameValidator::new(&catalog).validate(path)
    }

    #[test]
    fn test_valid_names() {
        assert_eq!(verdict("PROJ.SRC.COBOL"), Verdict::Valid(CatalogStatus::Exists));
        assert_eq!(verdict("PROJ.NEW.LOAD"), Verdict::Valid(CatalogStatus::NotFound));
        assert!(verdict("$SYS.#TEMP.@WORK-1").is_valid());
        assert!(verdict("SINGLE").is_valid());
        assert!(verdict("ABCDEFGH.X1234567").is_valid());
    }

    #[test]
    fn test_leading_dot_and_space_always_invalid() {
        assert_eq!(verdict(".PROJ.SRC"), Verdict::Invalid(Rejection::Hidden));
        assert_eq!(verdict(".git"), Verdict::Invalid(Rejection::Hidden));
        assert_eq!(verdict("PROJ SRC"), Verdict::Invalid(Rejection::EmbeddedSpace));
        assert_eq!(verdict("PROJ.SRC.COBOL "), Verdict::Invalid(Rejection::EmbeddedSpace));
    }

    #[test]
    fn test_blank_is_invalid() {
        assert_eq!(verdict(""), Verdict::Invalid(Rejection::Blank));
        assert_eq!(verdict("\t"), Verdict::Invalid(Rejection::Blank));
    }

    #[test]
    fn test_segment_longer_than_eight_is_invalid() {
        assert!(matches!(
            verdict("PROJ.TOOLONGQL.SRC"),
            Verdict::Invalid(Rejection::SegmentTooLong { ref segment }) if segment == "TOOLONGQL"
        ));
    }

    #[test]
    fn test_segment_character_rules() {
        assert!(matches!(verdict("1PROJ.SRC"), Verdict::Invalid(Rejection::BadLeadingChar { .. })));
        assert!(matches!(verdict("PROJ..SRC"), Verdict::Invalid(Rejection::BadLeadingChar { .. })));
        assert!(matches!(verdict("PROJ.-SRC"), Verdict::Invalid(Rejection::BadLeadingChar { .. })));
        assert!(matches!(verdict("PROJ.SR_C"), Verdict::Invalid(Rejection::BadCharacters { .. })));
    }

    #[test]
    fn test_case_matters() {
        assert_eq!(verdict("proj.src.cobol"), Verdict::Invalid(Rejection::NotUpperCase));
        assert_eq!(verdict("Proj.Src"), Verdict::Invalid(Rejection::NotUpperCase));
        assert_eq!(verdict("src"), Verdict::Invalid(Rejection::NotUpperCase));
    }

    #[test]
    fn test_enclosing_quotes_are_stripped_once() {
        assert_eq!(verdict("'PROJ.SRC.COBOL'"), Verdict::Valid(CatalogStatus::Exists));
        assert_eq!(verdict("\"PROJ.SRC.COBOL\""), Verdict::Valid(CatalogStatus::Exists));
        assert!(!verdict("''PROJ.SRC''").is_valid());
        assert!(!verdict("'PROJ.SRC").is_valid());
    }

    #[test]
    fn test_catalog_syntax_rejection() {
        // Every qualifier is fine but the whole name is over 44 characters
        let name = vec!["ABCDEFGH"; 6].join(".");
        assert_eq!(verdict(&name), Verdict::Invalid(Rejection::CatalogSyntax));
    }

    #[test]
    fn test_probe_failure_is_invalid() {
        let catalog = FailingCatalog;
        let verdict = NameValidator::new(&catalog).validate("PROJ.SRC");
        assert_eq!(
            verdict,
            Verdict::Invalid(Rejection::ProbeFailed {
                message: "catalog offline".to_string()
            })
        );
    }

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection::SegmentTooLong {
            segment: "TOOLONGQL".to_string(),
        };
        assert_eq!(rejection.to_string(), "qualifier 'TOOLONGQL' is longer than 8");
    }
}
