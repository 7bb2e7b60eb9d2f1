//! Checksummed little-endian binary files.
//!
//! Every persisted structure is written as `magic, version, body, crc32`
//! where the CRC covers everything before it. Readers verify the checksum
//! before handing the body to the owning engine.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::Path;

use crate::error::{LexError, Result};

pub struct StructWriter<W: Write> {
    writer: W,
    hasher: Hasher,
}

impl<W: Write> StructWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, hasher: Hasher::new() }
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.hasher.update(bytes);
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> { self.write_raw(&[v]) }

    pub fn write_u16(&mut self, v: u16) -> Result<()> { self.write_raw(&v.to_le_bytes()) }

    pub fn write_u32(&mut self, v: u32) -> Result<()> { self.write_raw(&v.to_le_bytes()) }

    pub fn write_u64(&mut self, v: u64) -> Result<()> { self.write_raw(&v.to_le_bytes()) }

    pub fn write_f64(&mut self, v: f64) -> Result<()> { self.write_raw(&v.to_le_bytes()) }

    /// u32 length prefix followed by the UTF-8 bytes.
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        let len = u32::try_from(s.len()).map_err(|_| LexError::format("string longer than u32::MAX"))?;
        self.write_u32(len)?;
        self.write_raw(s.as_bytes())
    }

    /// u64 length prefix followed by the bytes.
    pub fn write_blob(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_u64(bytes.len() as u64)?;
        self.write_raw(bytes)
    }

    /// Append the checksum and flush.
    pub fn finish(mut self) -> Result<W> {
        let crc = self.hasher.finalize();
        self.writer.write_u32::<LittleEndian>(crc)?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

pub struct StructReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> StructReader<'a> {
    /// Verify the trailing checksum of `data` and position a reader at its start.
    pub fn open(data: &'a [u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(LexError::format("file too short for checksum"));
        }
        let (body, tail) = data.split_at(data.len() - 4);
        let expected = Cursor::new(tail).read_u32::<LittleEndian>()?;
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(LexError::format(format!(
                "checksum mismatch: stored {expected:08x}, computed {actual:08x}"
            )));
        }
        Ok(Self { cursor: Cursor::new(body) })
    }

    /// Unread bytes of the body.
    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len() - self.cursor.position() as usize
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(LexError::format(format!(
                "truncated data: need {len} bytes, {} left",
                self.remaining()
            )));
        }
        let start = self.cursor.position() as usize;
        self.cursor.set_position((start + len) as u64);
        let data: &'a [u8] = *self.cursor.get_ref();
        Ok(&data[start..start + len])
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(truncated)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.cursor.read_u16::<LittleEndian>().map_err(truncated)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.cursor.read_u32::<LittleEndian>().map_err(truncated)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.cursor.read_u64::<LittleEndian>().map_err(truncated)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.cursor.read_f64::<LittleEndian>().map_err(truncated)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        Ok(std::str::from_utf8(bytes)?.to_string())
    }

    pub fn read_blob(&mut self) -> Result<&'a [u8]> {
        let len = usize::try_from(self.read_u64()?)
            .map_err(|_| LexError::format("blob length overflows usize"))?;
        self.take(len)
    }

    /// Check the 4-byte magic and return the stored format version.
    pub fn expect_magic(&mut self, magic: &[u8; 4]) -> Result<u16> {
        let found = self.take(4)?;
        if found != magic {
            return Err(LexError::format(format!(
                "bad magic {:?}, expected {:?}",
                String::from_utf8_lossy(found),
                String::from_utf8_lossy(magic)
            )));
        }
        self.read_u16()
    }

    /// Fail if anything is left after the body was parsed.
    pub fn finish(self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(LexError::format(format!("{n} trailing bytes after body"))),
        }
    }
}

fn truncated(e: std::io::Error) -> LexError {
    LexError::format(format!("truncated data: {e}"))
}

/// Create `path` (and its parent directory) and write it through a [`StructWriter`].
pub fn write_file<P, F>(path: P, body: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut StructWriter<BufWriter<File>>) -> Result<()>,
{
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let mut w = StructWriter::new(BufWriter::new(File::create(path)?));
    body(&mut w)?;
    w.finish()?.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    Ok(())
}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let mut f = File::open(path.as_ref())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut w = StructWriter::new(Vec::new());
        w.write_raw(b"TEST").unwrap();
        w.write_u16(3).unwrap();
        w.write_string("中文").unwrap();
        w.write_f64(0.25).unwrap();
        w.write_blob(&[1, 2, 3]).unwrap();
        w.finish().unwrap()
    }

    #[test]
    fn reads_back_what_was_written() {
        let data = sample();
        let mut r = StructReader::open(&data).unwrap();
        assert_eq!(r.expect_magic(b"TEST").unwrap(), 3);
        assert_eq!(r.read_string().unwrap(), "中文");
        assert_eq!(r.read_f64().unwrap(), 0.25);
        assert_eq!(r.read_blob().unwrap(), &[1, 2, 3]);
        r.finish().unwrap();
    }

    #[test]
    fn detects_corruption_and_wrong_magic() {
        let mut data = sample();
        data[7] ^= 0xff;
        assert!(matches!(StructReader::open(&data), Err(LexError::Format(_))));

        let data = sample();
        let mut r = StructReader::open(&data).unwrap();
        assert!(r.expect_magic(b"NOPE").is_err());
    }

    #[test]
    fn truncated_reads_fail_cleanly() {
        let mut w = StructWriter::new(Vec::new());
        w.write_u32(1000).unwrap();
        let data = w.finish().unwrap();
        let mut r = StructReader::open(&data).unwrap();
        assert!(r.read_blob().is_err());
    }
}
