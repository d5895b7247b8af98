//! Archive packaging.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use pgscribe_core::{Error, Result};

/// Packs a staged directory into a single archive.
pub trait Packager: Send + Sync {
    /// Produces `archive` from the files directly inside `directory`.
    /// All-or-nothing: after an error the archive must not be treated as
    /// usable.
    fn pack(&self, directory: &Path, archive: &Path) -> Result<()>;
}

/// Deflate-compressed zip packaging.
#[derive(Debug, Clone, Default)]
pub struct ZipPackager;

impl Packager for ZipPackager {
    fn pack(&self, directory: &Path, archive: &Path) -> Result<()> {
        let file = File::create(archive)?;
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut entries = fs::read_dir(directory)?.collect::<io::Result<Vec<_>>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            writer
                .start_file(name, options)
                .map_err(|err| Error::Pack(err.to_string()))?;
            let mut source = File::open(&path)?;
            io::copy(&mut source, &mut writer)?;
        }

        writer.finish().map_err(|err| Error::Pack(err.to_string()))?;
        Ok(())
    }
}
