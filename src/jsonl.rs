//! Line streaming over plain, zstd- or gzip-compressed JSONL files.

use crate::error::Result;
use crate::paths::FileKind;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use zstd::stream::read::Decoder;

/// Lazily yields `(line_number, raw_line)` for every non-blank line, 1-based.
/// Lines are raw bytes; text decoding is left to the row decoder so a bad line
/// does not end the file. The first read error is yielded once and ends the stream.
pub struct JsonlLines {
    reader: Box<dyn BufRead + Send>,
    buf: Vec<u8>,
    line_no: usize,
    done: bool,
}

impl JsonlLines {
    /// We request `window_log_max(31)` up front so long-window frames decode.
    pub fn open(path: &Path, kind: FileKind, read_buf_bytes: usize) -> Result<Self> {
        let file = File::open(path)?;
        let inner: Box<dyn Read + Send> = match kind {
            FileKind::Plain => Box::new(file),
            FileKind::Zstd => {
                let mut decoder = Decoder::new(file)?;
                decoder.window_log_max(31)?;
                Box::new(decoder)
            }
            // concatenated gzip members are common in appended dumps
            FileKind::Gzip => Box::new(MultiGzDecoder::new(file)),
        };
        Ok(Self {
            reader: Box::new(BufReader::with_capacity(read_buf_bytes, inner)),
            buf: Vec::with_capacity(16 * 1024),
            line_no: 0,
            done: false,
        })
    }
}

impl Iterator for JsonlLines {
    type Item = Result<(usize, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line_no += 1;
                    let mut end = self.buf.len();
                    while end > 0 && matches!(self.buf[end - 1], b'\n' | b'\r') {
                        end -= 1;
                    }
                    let line = &self.buf[..end];
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Some(Ok((self.line_no, line.to_vec())));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
        None
    }
}
