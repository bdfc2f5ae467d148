use image::ImageFormat;
use std::fs::{self, OpenOptions};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::qr::Bitmap;
use crate::qr::controller::RenderController;
use crate::qr::encoder::Encoder;

pub const DEFAULT_FILENAME: &str = "qrcode.png";

// Gives up looking for a free "name (n).png" after this many attempts.
const MAX_SUFFIX: u32 = 9999;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not encode png: {0}")]
    Encode(#[from] image::ImageError),

    #[error("could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no free file name for {filename} in {}", .directory.display())]
    NoFreeName {
        directory: PathBuf,
        filename: String,
    },
}

/// Saves rendered codes as PNG files.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportService {
    directory: PathBuf,
    filename: String,
}

impl Default for ExportService {
    fn default() -> Self {
        ExportService::new(".")
    }
}

impl ExportService {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        ExportService {
            directory: directory.into(),
            filename: DEFAULT_FILENAME.to_string(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn encode_png(bitmap: &Bitmap) -> Result<Vec<u8>, ExportError> {
        let mut bytes = Vec::new();
        bitmap.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Writes the bitmap to `path`, replacing whatever is there.
    pub fn write_to(path: &Path, bitmap: &Bitmap) -> Result<(), ExportError> {
        let bytes = Self::encode_png(bitmap)?;
        fs::write(path, bytes).map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = %path.display(), "saved qr code");
        Ok(())
    }

    /// Saves into the export directory without overwriting anything. Taken
    /// names get a numbered suffix, "qrcode (1).png" and so on.
    pub fn save(&self, bitmap: &Bitmap) -> Result<PathBuf, ExportError> {
        let bytes = Self::encode_png(bitmap)?;

        for n in 0..=MAX_SUFFIX {
            let path = self.candidate(n);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(ExportError::Write { path, source }),
            };

            file.write_all(&bytes)
                .map_err(|source| ExportError::Write {
                    path: path.clone(),
                    source,
                })?;

            tracing::info!(path = %path.display(), "saved qr code");
            return Ok(path);
        }

        Err(ExportError::NoFreeName {
            directory: self.directory.clone(),
            filename: self.filename.clone(),
        })
    }

    /// Saves the controller's current bitmap. Does nothing and returns
    /// `None` while export is disabled.
    pub fn download<E: Encoder>(
        &self,
        controller: &RenderController<E>,
    ) -> Result<Option<PathBuf>, ExportError> {
        if !controller.can_export() {
            tracing::debug!("download ignored, nothing to export");
            return Ok(None);
        }

        self.save(controller.bitmap()).map(Some)
    }

    fn candidate(&self, n: u32) -> PathBuf {
        if n == 0 {
            return self.directory.join(&self.filename);
        }

        let name = Path::new(&self.filename);
        let stem = name
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();

        let filename = match name.extension() {
            Some(ext) => format!("{stem} ({n}).{}", ext.to_string_lossy()),
            None => format!("{stem} ({n})"),
        };

        self.directory.join(filename)
    }
}
