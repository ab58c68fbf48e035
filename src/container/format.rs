//! The "blow5" final signal container (spec.md §6).
//!
//! Out of scope as a *library* per spec.md §1 ("the underlying compressed
//! signal file library ... is treated as an external collaborator"), but
//! the process still has to produce real files matching that contract, so
//! this module implements it directly rather than depending on a
//! fabricated crate. The shape — a header section of string attributes
//! plus typed auxiliary field declarations, followed by a stream of
//! length-prefixed compressed records — is grounded on
//! `archebase-robocodec`'s hand-written MCAP writer
//! (`io/formats/mcap/writer.rs`), which takes the same approach of driving
//! `byteorder` and `zstd` directly instead of reaching for an all-in-one
//! format crate. The differential half of the two-tier compression spec.md
//! describes is a zig-zag delta pre-pass over the `i16` signal, in the
//! spirit of the "SVB-ZD" codecs real nanopore signal formats use, with
//! `zstd` as the general-purpose payload compressor.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::constants::{RECORD_DIGITISATION, RECORD_MEDIAN_BEFORE, RECORD_OFFSET, RECORD_RANGE};
use crate::error::{Result, SlowionError};

const MAGIC: &[u8; 8] = b"SLOWBLW5";
const VERSION: u8 = 1;
const ZSTD_LEVEL: i32 = 3;

/// A typed auxiliary field declaration, as spec.md §6 enumerates
/// (`string, double, int32, uint8, uint64`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuxKind {
    Str,
    F64,
    I32,
    U8,
    U64,
}

impl AuxKind {
    fn tag(self) -> u8 {
        match self {
            AuxKind::Str => 0,
            AuxKind::F64 => 1,
            AuxKind::I32 => 2,
            AuxKind::U8 => 3,
            AuxKind::U64 => 4,
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => AuxKind::Str,
            1 => AuxKind::F64,
            2 => AuxKind::I32,
            3 => AuxKind::U8,
            4 => AuxKind::U64,
            other => {
                return Err(SlowionError::Container(format!(
                    "unknown aux field type tag {other}"
                )))
            }
        })
    }
}

/// One record: a complete read, either written directly (short reads) or
/// consolidated from an intermediate file (long reads).
#[derive(Debug, Clone)]
pub struct SignalRecord {
    pub read_id: String,
    pub read_group: u32,
    pub digitisation: f64,
    pub offset: f64,
    pub range: f64,
    pub sampling_rate: f64,
    pub raw_signal: Vec<i16>,
    pub channel_number: String,
    pub median_before: f64,
    pub read_number: i32,
    pub start_mux: u8,
    pub start_time: u64,
}

impl SignalRecord {
    /// Build a record with the fixed field values spec.md §6 mandates,
    /// given only what varies per read.
    pub fn new(
        pos: i64,
        chan: usize,
        read_number: i32,
        sampling_rate: f64,
        raw_signal: Vec<i16>,
    ) -> Self {
        SignalRecord {
            read_id: format!("read_{pos}_{chan}_{read_number}"),
            read_group: 0,
            digitisation: RECORD_DIGITISATION,
            offset: RECORD_OFFSET,
            range: RECORD_RANGE,
            sampling_rate,
            raw_signal,
            channel_number: chan.to_string(),
            median_before: RECORD_MEDIAN_BEFORE,
            read_number,
            // spec.md §9 Open Question (c): intentional 8-bit wraparound.
            start_mux: read_number as u8,
            start_time: crate::constants::RECORD_START_TIME,
        }
    }

    pub fn len_raw_signal(&self) -> u64 {
        self.raw_signal.len() as u64
    }
}

fn write_string(w: &mut impl Write, s: &str) -> io::Result<()> {
    let bytes = s.as_bytes();
    w.write_u32::<LittleEndian>(bytes.len() as u32)?;
    w.write_all(bytes)
}

fn read_string(r: &mut impl Read) -> io::Result<String> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Zig-zag delta pre-pass: turns the signal into small deltas from the
/// running value, mapped to unsigned so `zstd` sees mostly-small bytes.
fn zigzag_delta_encode(samples: &[i16]) -> Vec<u16> {
    let mut out = Vec::with_capacity(samples.len());
    let mut prev: i32 = 0;
    for &s in samples {
        let delta = s as i32 - prev;
        prev = s as i32;
        let zz = ((delta << 1) ^ (delta >> 31)) as u16;
        out.push(zz);
    }
    out
}

fn zigzag_delta_decode(codes: &[u16]) -> Vec<i16> {
    let mut out = Vec::with_capacity(codes.len());
    let mut prev: i32 = 0;
    for &zz in codes {
        let zz = zz as i32;
        let delta = (zz >> 1) ^ -(zz & 1);
        let value = prev + delta;
        prev = value;
        out.push(value as i16);
    }
    out
}

/// Header content shared by both final containers for a position
/// (spec.md §6 "Header content"): `run_id`/`asic_id` attributes plus the
/// declared auxiliary field set.
pub struct Header {
    attrs: Vec<(String, String)>,
    aux_fields: Vec<(String, AuxKind)>,
}

impl Header {
    pub fn new() -> Self {
        Header {
            attrs: Vec::new(),
            aux_fields: Vec::new(),
        }
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        if let Some(existing) = self.attrs.iter_mut().find(|(k, _)| k == key) {
            existing.1 = value.to_string();
        } else {
            self.attrs.push((key.to_string(), value.to_string()));
        }
    }

    pub fn declare_aux(&mut self, name: &str, kind: AuxKind) {
        self.aux_fields.push((name.to_string(), kind));
    }

    fn declare_standard_aux(&mut self) {
        self.declare_aux("channel_number", AuxKind::Str);
        self.declare_aux("median_before", AuxKind::F64);
        self.declare_aux("read_number", AuxKind::I32);
        self.declare_aux("start_mux", AuxKind::U8);
        self.declare_aux("start_time", AuxKind::U64);
    }

    fn write(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_u16::<LittleEndian>(self.attrs.len() as u16)?;
        for (k, v) in &self.attrs {
            write_string(w, k)?;
            write_string(w, v)?;
        }
        w.write_u16::<LittleEndian>(self.aux_fields.len() as u16)?;
        for (name, kind) in &self.aux_fields {
            write_string(w, name)?;
            w.write_u8(kind.tag())?;
        }
        Ok(())
    }

    fn read(r: &mut impl Read) -> Result<Self> {
        let num_attrs = r
            .read_u16::<LittleEndian>()
            .map_err(|e| SlowionError::Container(e.to_string()))?;
        let mut attrs = Vec::with_capacity(num_attrs as usize);
        for _ in 0..num_attrs {
            let k = read_string(r).map_err(|e| SlowionError::Container(e.to_string()))?;
            let v = read_string(r).map_err(|e| SlowionError::Container(e.to_string()))?;
            attrs.push((k, v));
        }
        let num_aux = r
            .read_u16::<LittleEndian>()
            .map_err(|e| SlowionError::Container(e.to_string()))?;
        let mut aux_fields = Vec::with_capacity(num_aux as usize);
        for _ in 0..num_aux {
            let name = read_string(r).map_err(|e| SlowionError::Container(e.to_string()))?;
            let tag = r
                .read_u8()
                .map_err(|e| SlowionError::Container(e.to_string()))?;
            aux_fields.push((name, AuxKind::from_tag(tag)?));
        }
        Ok(Header { attrs, aux_fields })
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

/// A write handle on a final container. One record is appended per
/// completed read; header fields are fixed before the first `append`.
pub struct SignalWriter {
    path: PathBuf,
    file: BufWriter<File>,
}

impl SignalWriter {
    /// Create the file, declare the standard header attrs/aux fields and
    /// write the header section. `run_id`/`asic_id` come from
    /// spec.md §6 ("identical for both containers per position").
    pub fn create(path: impl Into<PathBuf>, run_id: &str, asic_id: &str) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(|e| SlowionError::io(path.clone(), e))?;
        let mut file = BufWriter::new(file);

        file.write_all(MAGIC)
            .and_then(|()| file.write_u8(VERSION))
            .map_err(|e| SlowionError::io(path.clone(), e))?;

        let mut header = Header::new();
        header.set_attr("run_id", run_id);
        header.set_attr("asic_id", asic_id);
        header.declare_standard_aux();
        header
            .write(&mut file)
            .map_err(|e| SlowionError::io(path.clone(), e))?;

        Ok(SignalWriter { path, file })
    }

    /// Append one record: zig-zag delta the signal, zstd-compress it,
    /// write a length-prefixed frame.
    pub fn append(&mut self, record: &SignalRecord) -> Result<()> {
        let write = || -> io::Result<()> {
            write_string(&mut self.file, &record.read_id)?;
            self.file.write_u32::<LittleEndian>(record.read_group)?;
            self.file.write_f64::<LittleEndian>(record.digitisation)?;
            self.file.write_f64::<LittleEndian>(record.offset)?;
            self.file.write_f64::<LittleEndian>(record.range)?;
            self.file
                .write_f64::<LittleEndian>(record.sampling_rate)?;
            self.file
                .write_u64::<LittleEndian>(record.len_raw_signal())?;

            write_string(&mut self.file, &record.channel_number)?;
            self.file.write_f64::<LittleEndian>(record.median_before)?;
            self.file.write_i32::<LittleEndian>(record.read_number)?;
            self.file.write_u8(record.start_mux)?;
            self.file.write_u64::<LittleEndian>(record.start_time)?;

            let codes = zigzag_delta_encode(&record.raw_signal);
            let mut raw = Vec::with_capacity(codes.len() * 2);
            for c in &codes {
                raw.write_u16::<LittleEndian>(*c)?;
            }
            let compressed = zstd::stream::encode_all(&raw[..], ZSTD_LEVEL)?;
            self.file
                .write_u32::<LittleEndian>(compressed.len() as u32)?;
            self.file.write_all(&compressed)?;
            Ok(())
        };
        write().map_err(|e| SlowionError::io(self.path.clone(), e))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file
            .flush()
            .map_err(|e| SlowionError::io(self.path.clone(), e))
    }

    pub fn close(mut self) -> Result<()> {
        self.flush()
    }
}

/// A sequential read handle on a final container.
pub struct SignalReader {
    path: PathBuf,
    file: BufReader<File>,
    #[allow(dead_code)]
    header: Header,
}

impl SignalReader {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|e| SlowionError::io(path.clone(), e))?;
        let mut file = BufReader::new(file);

        let mut magic = [0u8; 8];
        file.read_exact(&mut magic)
            .map_err(|e| SlowionError::io(path.clone(), e))?;
        if &magic != MAGIC {
            return Err(SlowionError::Container(format!(
                "{}: bad magic",
                path.display()
            )));
        }
        let _version = file
            .read_u8()
            .map_err(|e| SlowionError::io(path.clone(), e))?;

        let header = Header::read(&mut file)?;

        Ok(SignalReader { path, file, header })
    }

    /// Read the next record, returning `None` on clean end-of-file and
    /// `Some(Err(..))` on any other failure — spec.md §6 "detect proper
    /// end-of-file distinctly from error".
    pub fn next_record(&mut self) -> Option<Result<SignalRecord>> {
        match self.try_next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }

    fn try_next_record(&mut self) -> Result<Option<SignalRecord>> {
        let read_id = match read_string(&mut self.file) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(SlowionError::io(self.path.clone(), e)),
        };

        let go = || -> io::Result<SignalRecord> {
            let read_group = self.file.read_u32::<LittleEndian>()?;
            let digitisation = self.file.read_f64::<LittleEndian>()?;
            let offset = self.file.read_f64::<LittleEndian>()?;
            let range = self.file.read_f64::<LittleEndian>()?;
            let sampling_rate = self.file.read_f64::<LittleEndian>()?;
            let _len_raw_signal = self.file.read_u64::<LittleEndian>()?;

            let channel_number = read_string(&mut self.file)?;
            let median_before = self.file.read_f64::<LittleEndian>()?;
            let read_number = self.file.read_i32::<LittleEndian>()?;
            let start_mux = self.file.read_u8()?;
            let start_time = self.file.read_u64::<LittleEndian>()?;

            let compressed_len = self.file.read_u32::<LittleEndian>()? as usize;
            let mut compressed = vec![0u8; compressed_len];
            self.file.read_exact(&mut compressed)?;
            let raw = zstd::stream::decode_all(&compressed[..])?;
            let mut codes = Vec::with_capacity(raw.len() / 2);
            let mut cursor = &raw[..];
            while !cursor.is_empty() {
                codes.push(cursor.read_u16::<LittleEndian>()?);
            }
            let raw_signal = zigzag_delta_decode(&codes);

            Ok(SignalRecord {
                read_id,
                read_group,
                digitisation,
                offset,
                range,
                sampling_rate,
                raw_signal,
                channel_number,
                median_before,
                read_number,
                start_mux,
                start_time,
            })
        };

        go().map(Some).map_err(|e| SlowionError::io(self.path.clone(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_a_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pos0_0.blow5");

        let mut writer = SignalWriter::create(&path, "run_0", "asic_id_0").unwrap();
        let record = SignalRecord::new(0, 3, 42, 4000.0, vec![100, -200, 300, 0, -1]);
        writer.append(&record).unwrap();
        writer.close().unwrap();

        let mut reader = SignalReader::open(&path).unwrap();
        let got = reader.next_record().unwrap().unwrap();
        assert_eq!(got.read_id, "read_0_3_42");
        assert_eq!(got.raw_signal, vec![100, -200, 300, 0, -1]);
        assert_eq!(got.start_mux, 42u8);
        assert_eq!(got.digitisation, RECORD_DIGITISATION);

        assert!(reader.next_record().is_none());
    }

    #[test]
    fn preserves_start_mux_wraparound() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pos0_1.blow5");
        let mut writer = SignalWriter::create(&path, "run_0", "asic_id_0").unwrap();
        let record = SignalRecord::new(0, 1, 300, 4000.0, vec![1, 2, 3]);
        assert_eq!(record.start_mux, 300i32 as u8);
        writer.append(&record).unwrap();
        writer.close().unwrap();

        let mut reader = SignalReader::open(&path).unwrap();
        let got = reader.next_record().unwrap().unwrap();
        assert_eq!(got.start_mux, 44u8);
    }

    #[test]
    fn zigzag_delta_round_trips() {
        let samples: Vec<i16> = vec![0, 500, -500, 32767, -32768, 1, 1, 1];
        let codes = zigzag_delta_encode(&samples);
        let back = zigzag_delta_decode(&codes);
        assert_eq!(samples, back);
    }

    #[test]
    fn multiple_records_round_trip_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pos1_0.blow5");
        let mut writer = SignalWriter::create(&path, "run_0", "asic_id_0").unwrap();
        for i in 0..5 {
            let record = SignalRecord::new(1, 0, i, 4000.0, vec![i as i16; 10]);
            writer.append(&record).unwrap();
        }
        writer.close().unwrap();

        let mut reader = SignalReader::open(&path).unwrap();
        for i in 0..5 {
            let got = reader.next_record().unwrap().unwrap();
            assert_eq!(got.read_number, i);
        }
        assert!(reader.next_record().is_none());
    }
}
