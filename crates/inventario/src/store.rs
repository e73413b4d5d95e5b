//! The workbook file holding the catalog and both movement logs.

use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use inventario_core::Workbook;
use inventario_xlsx::{XlsxError, XlsxReader, XlsxWriter};

use crate::error::{Error, Result};
use crate::schema::DEFAULT_FILE_NAME;

/// Handle to the store file.
///
/// Every load reads the whole file and every save rewrites it; nothing is
/// cached between calls, so edits made by hand between two operations are
/// always seen.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// `Inventario.xlsx` next to the running executable, or in the working
    /// directory when the executable's location is unknown
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_default()
            .join(DEFAULT_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Startup check: fails with [`Error::MissingSource`] when the file is absent
    pub fn ensure_exists(&self) -> Result<()> {
        if self.exists() {
            Ok(())
        } else {
            tracing::error!(path = %self.path.display(), "store file not found");
            Err(Error::MissingSource(self.path.clone()))
        }
    }

    /// Read the whole workbook from disk
    pub fn load(&self) -> Result<Workbook> {
        if !self.exists() {
            return Err(Error::MissingSource(self.path.clone()));
        }
        let workbook = XlsxReader::read_file(&self.path).map_err(|source| Error::Read {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(
            path = %self.path.display(),
            sheets = workbook.sheet_count(),
            "store loaded"
        );
        Ok(workbook)
    }

    /// Rewrite the whole file from `workbook`.
    ///
    /// The package is encoded in memory, written to [`Store::temp_path`] and
    /// renamed over the store, so a failed save leaves the file on disk as it was.
    pub fn save(&self, workbook: &Workbook) -> Result<()> {
        let to_write_error = |source: XlsxError| Error::Write {
            path: self.path.clone(),
            source,
        };

        let bytes = XlsxWriter::write(workbook, Cursor::new(Vec::new()))
            .map_err(to_write_error)?
            .into_inner();

        let temp = self.temp_path();
        let mut file = File::create(&temp).map_err(|e| to_write_error(XlsxError::Io(e)))?;
        let written = file
            .write_all(&bytes)
            .and_then(|()| file.sync_all())
            .and_then(|()| fs::rename(&temp, &self.path));
        if let Err(e) = written {
            drop(file);
            let _ = fs::remove_file(&temp);
            tracing::error!(path = %self.path.display(), error = %e, "store save failed");
            return Err(to_write_error(XlsxError::Io(e)));
        }

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "store saved");
        Ok(())
    }

    /// Sibling file a save is staged in before it replaces the store
    pub fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        self.path
            .with_file_name(format!(".{file_name}.tmp.{}", std::process::id()))
    }
}
