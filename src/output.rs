use anyhow::anyhow;
use formatx::formatx;
use std::fmt::Debug;
use std::fs::{self, File};
use std::io;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::info;

/// File name template for saved reports, filled with the report identifier.
pub const REPORT_FILE_TEMPLATE: &str = "AAR{}.md";

pub trait Output: Debug {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write>;

    /// Writes a complete document under the key.
    fn save(&self, location_key: &str, contents: &[u8]) -> anyhow::Result<()> {
        let mut writer = self.writer_for_location_key(location_key)?;
        writer.write_all(contents)?;
        writer.flush()?;

        Ok(())
    }

    /// Whether this output can be considered a no-op and therefore that any code that only
    /// writes to the output can be skipped.
    fn is_noop(&self) -> bool {
        false
    }
}

#[derive(Debug)]
pub struct FileOutput {
    directory_path: PathBuf,
    file_template: String,
}

impl FileOutput {
    pub fn new(directory_path: PathBuf, file_template: String) -> Self {
        Self {
            directory_path,
            file_template,
        }
    }

    pub fn path_for_location_key(&self, location_key: &str) -> anyhow::Result<PathBuf> {
        let file_name = formatx!(&self.file_template, location_key)
            .map_err(|e| anyhow!("invalid output file template {}: {e:?}", self.file_template))?;

        Ok(self.directory_path.join(file_name))
    }
}

impl Output for FileOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        let path = self.path_for_location_key(location_key)?;
        fs::create_dir_all(&self.directory_path)?;
        info!("writing report to {}", path.display());

        Ok(BufWriter::new(File::create(path)?))
    }

    /// Stages the document in a temporary file beside the target and renames it into place, so
    /// a failed write never leaves a truncated report under the report's name.
    fn save(&self, location_key: &str, contents: &[u8]) -> anyhow::Result<()> {
        let path = self.path_for_location_key(location_key)?;
        fs::create_dir_all(&self.directory_path)?;

        let mut staged = NamedTempFile::new_in(&self.directory_path)?;
        staged.write_all(contents)?;
        staged.as_file().sync_all()?;
        staged.persist(&path).map_err(|e| e.error)?;
        info!("saved report to {}", path.display());

        Ok(())
    }
}

impl Output for &FileOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        <FileOutput as Output>::writer_for_location_key(self, location_key)
    }

    fn save(&self, location_key: &str, contents: &[u8]) -> anyhow::Result<()> {
        <FileOutput as Output>::save(self, location_key, contents)
    }
}

/// An output that goes to nowhere/ a "sink"/ /dev/null.
#[derive(Debug, Default)]
pub struct SinkOutput;

impl Output for SinkOutput {
    fn writer_for_location_key(&self, _location_key: &str) -> anyhow::Result<impl Write> {
        Ok(io::sink())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_name_report_after_identifier() {
        let output = FileOutput::new(PathBuf::from("reports"), REPORT_FILE_TEMPLATE.to_string());

        assert_eq!(
            output.path_for_location_key("2026-07").unwrap(),
            PathBuf::from("reports").join("AAR2026-07.md")
        );
    }

    #[rstest]
    fn should_create_missing_directory_and_write() {
        let root = tempfile::tempdir().unwrap();
        let directory = root.path().join("ARs");
        let output = FileOutput::new(directory.clone(), REPORT_FILE_TEMPLATE.to_string());

        {
            let mut writer = (&output).writer_for_location_key("7").unwrap();
            writer.write_all(b"report").unwrap();
        }

        assert_eq!(fs::read_to_string(directory.join("AAR7.md")).unwrap(), "report");
    }

    #[rstest]
    fn should_save_whole_report_without_leaving_staging_files() {
        let root = tempfile::tempdir().unwrap();
        let directory = root.path().join("ARs");
        let output = FileOutput::new(directory.clone(), REPORT_FILE_TEMPLATE.to_string());
        fs::create_dir_all(&directory).unwrap();
        fs::write(directory.join("AAR7.md"), "stale report").unwrap();

        output.save("7", b"fresh report").unwrap();

        assert_eq!(fs::read_to_string(directory.join("AAR7.md")).unwrap(), "fresh report");
        assert_eq!(fs::read_dir(&directory).unwrap().count(), 1);
    }

    #[rstest]
    fn should_leave_nothing_behind_when_report_cannot_be_placed() {
        let root = tempfile::tempdir().unwrap();
        let directory = root.path().join("ARs");
        let output = FileOutput::new(directory.clone(), REPORT_FILE_TEMPLATE.to_string());
        // a non-empty directory in the way makes the final rename fail
        fs::create_dir_all(directory.join("AAR7.md").join("occupied")).unwrap();

        assert!(output.save("7", b"report").is_err());

        let entries: Vec<_> = fs::read_dir(&directory)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("AAR7.md")]);
        assert!(directory.join("AAR7.md").is_dir());
    }

    #[rstest]
    fn should_treat_sink_as_noop() {
        let output = SinkOutput;

        assert!(output.is_noop());
        assert!(output.writer_for_location_key("7").is_ok());
    }
}
