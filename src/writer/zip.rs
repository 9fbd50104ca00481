use crate::datetime::DateTime;
use crate::errors::MergeError;
use crate::writer::WriterResult;
use std::io::{self, Write};
use zip::result::ZipError;
use zip::write::{SimpleFileOptions, StreamWriter};
use zip::{CompressionMethod, DateTime as ZipDateTime};

/// Options of the single archive entry holding a book.
///
/// A `level` of `0` stores the entry uncompressed.
pub(crate) fn entry_options(level: u8, modified: DateTime) -> SimpleFileOptions {
    let options = match level {
        0 => SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
        level => SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(level))),
    };
    let (date, time) = (modified.date(), modified.time());
    let modified = ZipDateTime::from_date_and_time(
        date.year().clamp(1980, 2107) as u16,
        date.month(),
        date.day(),
        time.hour(),
        time.minute(),
        time.second(),
    );

    options.last_modified_time(modified.unwrap_or_default())
}

/// Streams a book into a single-entry archive (`.fb2.zip`).
pub(crate) struct EntryWriter<W: Write> {
    zip: zip::ZipWriter<StreamWriter<W>>,
}

impl<W: Write> EntryWriter<W> {
    /// Starts an archive on `writer` holding one entry named `entry`.
    pub(crate) fn start(writer: W, entry: &str, options: SimpleFileOptions) -> WriterResult<Self> {
        let mut zip = zip::ZipWriter::new_stream(writer);
        zip.start_file(entry, options).map_err(zip_error)?;
        Ok(Self { zip })
    }

    /// Writes the central directory, returning the underlying writer.
    pub(crate) fn finish(self) -> WriterResult<W> {
        self.zip
            .finish()
            .map(|stream| stream.into_inner())
            .map_err(zip_error)
    }
}

impl<W: Write> Write for EntryWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.zip.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.zip.flush()
    }
}

fn zip_error(error: ZipError) -> MergeError {
    match error {
        ZipError::Io(error) => MergeError::Io(error),
        error => MergeError::Io(io::Error::other(error)),
    }
}
