//! Temporary staging for the generated script and archive.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use pgscribe_core::Result;

/// Name of the working directory when none is configured.
pub const DEFAULT_TEMP_DIR: &str = "pgscribe-temp";

/// Builds the generated dump file name from the current time and database:
/// `<day>_<month>_<year>_<hour>_<minute>_<second>_<database>_database_dump.sql`.
pub fn dump_file_name(database: &str, now: DateTime<Local>) -> String {
    format!(
        "{}_{}_database_dump.sql",
        now.format("%-d_%-m_%Y_%-H_%M_%S"),
        database
    )
}

/// Filesystem layout for one export run: a root working directory, a `sql/`
/// subdirectory holding the script, and the archive next to it at the root.
#[derive(Debug, Clone)]
pub struct ArtifactStage {
    root: PathBuf,
    sql_dir: PathBuf,
    script_path: PathBuf,
    archive_path: PathBuf,
}

impl ArtifactStage {
    /// Creates the working directories. Failures here are fatal to the run.
    pub fn create(temp_dir: Option<&Path>, file_name: &str) -> Result<Self> {
        let root = temp_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMP_DIR));
        fs::create_dir_all(&root)?;
        let sql_dir = root.join("sql");
        fs::create_dir_all(&sql_dir)?;

        let base = file_name.strip_suffix(".sql").unwrap_or(file_name);
        let script_path = sql_dir.join(file_name);
        let archive_path = root.join(format!("{base}.zip"));

        Ok(Self {
            root,
            sql_dir,
            script_path,
            archive_path,
        })
    }

    pub fn sql_dir(&self) -> &Path {
        &self.sql_dir
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Writes the assembled document as the run's single script file.
    pub fn write_script(&self, contents: &str) -> Result<()> {
        fs::write(&self.script_path, contents)?;
        Ok(())
    }

    /// Best-effort removal of everything the run created. The script and its
    /// directory always go; the archive and the root stay when
    /// `preserve_archive` is set. Failures are logged, never returned.
    pub fn cleanup(&self, preserve_archive: bool) {
        remove_file_logged(&self.script_path);
        remove_dir_logged(&self.sql_dir);
        if !preserve_archive {
            remove_file_logged(&self.archive_path);
            remove_dir_logged(&self.root);
        }
        debug!(root = %self.root.display(), "temp files cleared");
    }
}

fn remove_file_logged(path: &Path) {
    if !path.exists() {
        debug!(path = %path.display(), "missing while clearing temp files");
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed"),
        Err(err) => warn!(path = %path.display(), error = %err, "failed to remove file"),
    }
}

fn remove_dir_logged(path: &Path) {
    if !path.exists() {
        debug!(path = %path.display(), "missing while clearing temp files");
        return;
    }
    match fs::remove_dir(path) {
        Ok(()) => debug!(path = %path.display(), "removed"),
        Err(err) => warn!(path = %path.display(), error = %err, "failed to remove directory"),
    }
}
