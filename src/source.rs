//! Reader for the MAC list member file (`alpha.v3.txt`)
//!
//! Layout:
//! ```text
//! <free-text comment line>
//! *<TAB>CODE<TAB>SUBTYPE
//! *<TAB>AB<TAB>01:02
//! ...
//! ```
//! Blank lines are skipped and trailing whitespace is ignored. Rows are
//! yielded lazily, so the sync engine consumes the file in one pass.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime, Timelike};

use crate::record::{CodeRecord, FileRecord};
use crate::{Error, Result};

/// Expected header fields, in order
pub const HEADER_FIELDS: [&str; 3] = ["*", "CODE", "SUBTYPE"];

/// Parsed member file: the comment line plus a lazy record stream.
pub struct SourceReader<R> {
    comment: String,
    reader: R,
    line_no: usize,
}

impl SourceReader<BufReader<File>> {
    /// Open a member file that has already been extracted to disk
    pub fn open(path: &Path) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: BufRead> SourceReader<R> {
    /// Read and validate the comment and header lines.
    pub fn new(mut reader: R) -> Result<Self> {
        let comment = next_line(&mut reader, 1)?
            .ok_or_else(|| parse_error(1, "missing comment line"))?;
        let header = next_line(&mut reader, 2)?
            .ok_or_else(|| parse_error(2, "missing header line"))?;
        check_header(&header)?;

        Ok(Self {
            comment,
            reader,
            line_no: 2,
        })
    }

    /// First line of the file, without trailing whitespace
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// File metadata for this member, given its modification time
    pub fn file_record(&self, modified: NaiveDateTime) -> FileRecord {
        FileRecord::new(modified, self.comment.clone())
    }
}

impl<R: BufRead> Iterator for SourceReader<R> {
    type Item = Result<(String, CodeRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_no += 1;
            let line = match next_line(&mut self.reader, self.line_no) {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };
            if line.is_empty() {
                continue;
            }
            return Some(parse_row(&line, self.line_no));
        }
    }
}

/// Modification time of `path` as a naive local timestamp, whole seconds.
pub fn modified_time(path: &Path) -> Result<NaiveDateTime> {
    let modified: DateTime<Local> = std::fs::metadata(path)?.modified()?.into();
    let naive = modified.naive_local();
    Ok(naive.with_nanosecond(0).unwrap_or(naive))
}

/// One line as ASCII text, trailing whitespace (and `\r`) removed.
fn next_line<R: BufRead>(reader: &mut R, line_no: usize) -> Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    if !buf.is_ascii() {
        return Err(parse_error(line_no, "non-ASCII text"));
    }
    let line = String::from_utf8(buf).map_err(|_| parse_error(line_no, "non-ASCII text"))?;
    Ok(Some(line.trim_end().to_string()))
}

fn check_header(header: &str) -> Result<()> {
    let fields: Vec<&str> = header.split('\t').collect();
    if fields.len() != HEADER_FIELDS.len() {
        return Err(parse_error(
            2,
            &format!("header did not split into {} fields", HEADER_FIELDS.len()),
        ));
    }
    for (expected, actual) in HEADER_FIELDS.iter().zip(&fields) {
        if expected != actual {
            return Err(parse_error(
                2,
                &format!("header field should be '{}' but is '{}'", expected, actual),
            ));
        }
    }
    Ok(())
}

fn parse_row(line: &str, line_no: usize) -> Result<(String, CodeRecord)> {
    let mut fields = line.split('\t');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(marker), Some(code), Some(subtype))
            if marker == HEADER_FIELDS[0] && !code.is_empty() =>
        {
            Ok((code.to_string(), CodeRecord::new(subtype)))
        }
        _ => Err(parse_error(line_no, "expected '*<TAB>CODE<TAB>SUBTYPE'")),
    }
}

fn parse_error(line: usize, message: &str) -> Error {
    Error::Parse {
        line,
        message: message.to_string(),
    }
}
