// Trace Output Sinks
//
// Defines the durability contract for trace output. The emitter owns
// exactly one sink for its whole lifetime.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Destination for rendered trace lines.
///
/// Properties required from implementations:
/// - Append-only
/// - Ordered
/// - `flush` makes every previously written line durable
///
/// Implementations MUST NOT:
/// - Reorder lines
/// - Rewrite lines already written
pub trait TraceSink {
    /// Append one line. The sink adds the terminating newline.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Push buffered lines to durable storage.
    ///
    /// For files this writes out the buffer and syncs the file data.
    fn flush(&mut self) -> io::Result<()>;

    /// Flush and release the underlying resource.
    fn close(&mut self) -> io::Result<()>;
}

/// Buffered file sink. Opening truncates any previous trace.
#[derive(Debug)]
pub struct FileSink {
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Create (or truncate) `path`, creating missing parent directories.
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
        })
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "trace file already closed"))
    }
}

impl TraceSink for FileSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let writer = self.writer()?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        let writer = self.writer()?;
        writer.flush()?;
        writer.get_ref().sync_data()
    }

    fn close(&mut self) -> io::Result<()> {
        // Taking the writer releases the handle even if the flush fails.
        match self.writer.take() {
            Some(mut writer) => {
                writer.flush()?;
                writer.get_ref().sync_all()
            }
            None => Ok(()),
        }
    }
}

/// In-memory sink that tracks which bytes have been flushed.
#[derive(Debug, Default)]
pub struct MemorySink {
    buffer: Vec<u8>,
    durable: usize,
    flushes: usize,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, flushed or not.
    pub fn contents(&self) -> &str {
        std::str::from_utf8(&self.buffer).unwrap_or_default()
    }

    /// Only the bytes covered by the last flush.
    pub fn durable(&self) -> &str {
        std::str::from_utf8(&self.buffer[..self.durable]).unwrap_or_default()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl TraceSink for MemorySink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::Other, "sink closed"));
        }
        self.buffer.extend_from_slice(line.as_bytes());
        self.buffer.push(b'\n');
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.durable = self.buffer.len();
        self.flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if !self.closed {
            self.flush()?;
            self.closed = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_truncates_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/trace.txt");

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale contents\n").unwrap();

        let mut sink = FileSink::create(&path).unwrap();
        sink.write_line("GET user1").unwrap();
        sink.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "GET user1\n");
    }

    #[test]
    fn file_sink_flush_reaches_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.txt");

        let mut sink = FileSink::create(&path).unwrap();
        sink.write_line("GET a").unwrap();
        sink.flush().unwrap();
        sink.write_line("GET b").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "GET a\n");

        sink.close().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "GET a\nGET b\n");
    }

    #[test]
    fn file_sink_rejects_writes_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::create(&dir.path().join("t.txt")).unwrap();
        sink.close().unwrap();

        assert!(sink.write_line("GET k").is_err());
        // Closing twice is harmless.
        sink.close().unwrap();
    }

    #[test]
    fn memory_sink_tracks_durable_prefix() {
        let mut sink = MemorySink::new();
        sink.write_line("GET a").unwrap();
        assert_eq!(sink.durable(), "");

        sink.flush().unwrap();
        sink.write_line("GET b").unwrap();
        assert_eq!(sink.durable(), "GET a\n");
        assert_eq!(sink.contents(), "GET a\nGET b\n");

        sink.close().unwrap();
        assert_eq!(sink.durable(), sink.contents());
        assert!(sink.is_closed());
    }
}
