//! The `.iblow5` intermediate spill format (spec.md §4.4).
//!
//! A per-channel, per-read transient file: a 7-byte magic, a 4-byte
//! `read_number`, then a sequence of length-prefixed `i16` chunks.
//! Deliberately uncompressed and not self-describing beyond the magic —
//! CONS always reads the whole file once and deletes it. Grounded on the
//! same `byteorder` reader/writer idiom `archebase-robocodec` uses for its
//! hand-rolled MCAP records (`io/formats/mcap/writer.rs`), scaled down to
//! this format's much simpler fixed layout.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::constants::ISLOW5_MAGIC;
use crate::error::{Result, SlowionError};

/// An open intermediate file being filled chunk-by-chunk by ACQ.
pub struct IntermediateWriter {
    path: PathBuf,
    file: BufWriter<File>,
}

impl IntermediateWriter {
    /// Create a new intermediate file and write its fixed header.
    pub fn create(path: impl Into<PathBuf>, read_number: i32) -> Result<Self> {
        let path = path.into();
        let file =
            File::create(&path).map_err(|e| SlowionError::io(path.clone(), e))?;
        let mut file = BufWriter::new(file);
        file.write_all(ISLOW5_MAGIC)
            .and_then(|()| file.write_i32::<LittleEndian>(read_number))
            .map_err(|e| SlowionError::io(path.clone(), e))?;
        Ok(IntermediateWriter { path, file })
    }

    /// Append one chunk of samples.
    pub fn append_chunk(&mut self, samples: &[i16]) -> Result<()> {
        let write = || -> io::Result<()> {
            self.file.write_i64::<LittleEndian>(samples.len() as i64)?;
            for &s in samples {
                self.file.write_i16::<LittleEndian>(s)?;
            }
            Ok(())
        };
        write().map_err(|e| SlowionError::io(self.path.clone(), e))
    }

    /// Flush and close, returning the file's path for later consolidation.
    pub fn close(mut self) -> Result<PathBuf> {
        self.file
            .flush()
            .map_err(|e| SlowionError::io(self.path.clone(), e))?;
        Ok(self.path)
    }
}

/// Decode an intermediate file in full into one contiguous sample buffer,
/// as CONS does before emitting a consolidated record.
///
/// Returns `(read_number, samples)`.
pub fn decode(path: &Path) -> Result<(i32, Vec<i16>)> {
    let file = File::open(path).map_err(|e| SlowionError::io(path.to_path_buf(), e))?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 7];
    reader
        .read_exact(&mut magic)
        .map_err(|e| SlowionError::io(path.to_path_buf(), e))?;
    if &magic != ISLOW5_MAGIC {
        return Err(SlowionError::Intermediate {
            path: path.to_path_buf(),
            reason: "bad magic".to_string(),
        });
    }

    let read_number = reader
        .read_i32::<LittleEndian>()
        .map_err(|e| SlowionError::io(path.to_path_buf(), e))?;

    let mut samples = Vec::new();
    loop {
        let len = match reader.read_i64::<LittleEndian>() {
            Ok(len) => len,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(SlowionError::io(path.to_path_buf(), e)),
        };
        if len < 0 {
            return Err(SlowionError::Intermediate {
                path: path.to_path_buf(),
                reason: format!("negative chunk length {len}"),
            });
        }
        for _ in 0..len {
            let s = reader
                .read_i16::<LittleEndian>()
                .map_err(|e| SlowionError::io(path.to_path_buf(), e))?;
            samples.push(s);
        }
    }

    Ok((read_number, samples))
}

/// Delete an intermediate file after it has been consolidated. Not a
/// best-effort operation: failure to remove an already-consumed
/// intermediate is a non-fatal clean-up issue per spec.md §7, so callers
/// should log and continue rather than propagate this as fatal.
pub fn remove(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_a_single_chunk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chan0_0.iblow5");
        let writer = IntermediateWriter::create(&path, 7).unwrap();
        let mut writer = writer;
        writer.append_chunk(&[1, 2, 3, -4]).unwrap();
        writer.close().unwrap();

        let (read_number, samples) = decode(&path).unwrap();
        assert_eq!(read_number, 7);
        assert_eq!(samples, vec![1, 2, 3, -4]);
    }

    #[test]
    fn round_trips_multiple_chunks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chan1_0.iblow5");
        let mut writer = IntermediateWriter::create(&path, 3).unwrap();
        writer.append_chunk(&[10, 20]).unwrap();
        writer.append_chunk(&[30]).unwrap();
        writer.append_chunk(&[]).unwrap();
        writer.close().unwrap();

        let (read_number, samples) = decode(&path).unwrap();
        assert_eq!(read_number, 3);
        assert_eq!(samples, vec![10, 20, 30]);
    }

    #[test]
    fn rejects_bad_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.iblow5");
        fs::write(&path, b"not-a-valid-header-at-all").unwrap();
        assert!(decode(&path).is_err());
    }
}
