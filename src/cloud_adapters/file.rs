use std::io;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::info;

use crate::core::format::{Header, Row};

/// Destination for flat CSV exports.
pub trait CsvSink {
    /// Writes one complete file and returns where it landed.
    fn write_file(&mut self, name: &str, header: &Header, rows: &[Row]) -> io::Result<PathBuf>;
}

/// Encode a header and its rows as UTF-8 CSV.
///
/// Records end with `\n`; cells holding a comma, quote, CR or LF are quoted
/// with inner quotes doubled.
pub fn encode_csv(header: &Header, rows: &[Row]) -> io::Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(header.columns())?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.into_inner().map_err(|e| io::Error::other(e.to_string()))
}

/// Sink that writes each file into a directory, replacing existing files.
#[derive(Debug, Clone)]
pub struct CsvDirectorySink {
    dir: PathBuf,
}

impl CsvDirectorySink {
    /// Create a sink rooted at `dir`; the directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CsvSink for CsvDirectorySink {
    fn write_file(&mut self, name: &str, header: &Header, rows: &[Row]) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let bytes = encode_csv(header, rows)?;
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), rows = rows.len(), "Wrote CSV file");
        Ok(path)
    }
}
