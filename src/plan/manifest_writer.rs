use crate::diff::quote_path;
use crate::error::{DsnPullError, Result};
use crate::plan::ExtractionReport;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const PLAN_FILE: &str = "plan.json";
pub const DATASETS_FILE: &str = "datasets.txt";
pub const FILES_FILE: &str = "files.txt";

/// Writes the hand-off files read by the dataset and file materializers.
pub struct ManifestWriter {
    output_directory: PathBuf,
    force_overwrite: bool,
}

impl ManifestWriter {
    pub fn new<P: Into<PathBuf>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.into(),
            force_overwrite: false,
        }
    }

    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn manifest_paths(&self) -> [PathBuf; 3] {
        [PLAN_FILE, DATASETS_FILE, FILES_FILE].map(|name| self.output_directory.join(name))
    }

    /// Refuse to clobber earlier manifests unless forced. Checked for all
    /// three files before any is written.
    fn check_existing(&self) -> Result<()> {
        if self.force_overwrite {
            return Ok(());
        }

        for path in self.manifest_paths() {
            if path.exists() {
                return Err(DsnPullError::ManifestExists {
                    path: path.display().to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn write(&self, report: &ExtractionReport) -> Result<Vec<PathBuf>> {
        self.check_existing()?;
        fs::create_dir_all(&self.output_directory).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => DsnPullError::Permission {
                path: self.output_directory.display().to_string(),
            },
            _ => DsnPullError::Io(e),
        })?;

        let [plan_path, datasets_path, files_path] = self.manifest_paths();
        self.save_plan_json(&plan_path, report)?;
        self.save_datasets(&datasets_path, report)?;
        self.save_files(&files_path, report)?;

        tracing::info!(
            directory = %self.output_directory.display(),
            groups = report.plan.groups.len(),
            files = report.plan.files.len(),
            "wrote manifests"
        );

        Ok(vec![plan_path, datasets_path, files_path])
    }

    fn save_plan_json(&self, path: &Path, report: &ExtractionReport) -> Result<()> {
        let json_content = serde_json::to_string_pretty(report).map_err(|e| DsnPullError::Config {
            message: format!("Failed to serialize plan to JSON: {}", e),
        })?;
        fs::write(path, json_content)?;
        Ok(())
    }

    fn save_datasets(&self, path: &Path, report: &ExtractionReport) -> Result<()> {
        let mut file = fs::File::create(path)?;
        for group in &report.plan.groups {
            writeln!(file, "{}", group.manifest_line())?;
        }
        Ok(())
    }

    fn save_files(&self, path: &Path, report: &ExtractionReport) -> Result<()> {
        let mut file = fs::File::create(path)?;
        for entry in &report.plan.files {
            writeln!(file, "{}", quote_path(entry))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{CommitEntry, HistoryResolver};
    use crate::plan::{ExtractionPlan, Group};
    use tempfile::TempDir;

    fn sample_report() -> ExtractionReport {
        let log = vec![CommitEntry::new("abc1234def", "2024-01-01 00:00:00 +0000")];
        let range = HistoryResolver::new()
            .resolve(&log, &["abc1234def".to_string()])
            .unwrap();

        let mut group = Group::new("PROJ.SRC.COBOL");
        group.add_member("MEMBER1");
        group.add_member("MEMBER2");
        let plan = ExtractionPlan {
            groups: vec![group, Group::new("PROJ.JCL")],
            files: vec!["bin/tool".to_string(), "tab\there.txt".to_string()],
        };
        ExtractionReport::new(&range, 4, plan)
    }

    #[test]
    fn test_writes_all_manifests() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("manifests");
        let written = ManifestWriter::new(&out).write(&sample_report()).unwrap();

        assert_eq!(written.len(), 3);
        assert_eq!(
            fs::read_to_string(out.join(DATASETS_FILE)).unwrap(),
            "PROJ.SRC.COBOL MEMBER1 MEMBER2\nPROJ.JCL\n"
        );
        assert_eq!(
            fs::read_to_string(out.join(FILES_FILE)).unwrap(),
            "bin/tool\n\"tab\\there.txt\"\n"
        );

        let plan: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(PLAN_FILE)).unwrap()).unwrap();
        assert_eq!(plan["plan"]["groups"][0]["name"], "PROJ.SRC.COBOL");
        assert_eq!(plan["changed_paths"], 4);
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let report = sample_report();

        ManifestWriter::new(temp_dir.path()).write(&report).unwrap();
        let second = ManifestWriter::new(temp_dir.path()).write(&report);
        assert!(matches!(second, Err(DsnPullError::ManifestExists { .. })));

        ManifestWriter::new(temp_dir.path())
            .with_force_overwrite(true)
            .write(&report)
            .unwrap();
    }

    #[test]
    fn test_single_existing_file_blocks_write() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(FILES_FILE), "old\n").unwrap();

        let result = ManifestWriter::new(temp_dir.path()).write(&sample_report());
        assert!(matches!(result, Err(DsnPullError::ManifestExists { .. })));
        // Nothing else was written
        assert!(!temp_dir.path().join(PLAN_FILE).exists());
    }
}
