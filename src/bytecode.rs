//! Bytecode codec (component C2): an append/overwrite writer and a cursored
//! reader over a binary stream of opcodes and big-endian scalar operands.
//!
//! Scalars are fixed width: `i32` is 4 bytes, `usize` is 8 bytes, `f64` is
//! the raw IEEE-754 bit pattern written as a `u64` (8 bytes). Strings are
//! length-prefixed with a `usize` length followed by the raw bytes.

use crate::error::VmError;
use crate::opcode::Opcode;

/// A growable byte buffer that either appends, or — while an overwrite
/// cursor is active — patches bytes already written. The latter is how the
/// assembler back-patches label placeholders once their address is known.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
    overwrite: Option<usize>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Redirects subsequent writes to patch in place starting at `pos`
    /// instead of appending. `pos` must already be within the written
    /// buffer (it is always the offset of a previously emitted
    /// placeholder).
    pub fn begin_overwrite(&mut self, pos: usize) {
        debug_assert!(pos <= self.buf.len());
        self.overwrite = Some(pos);
    }

    /// Returns to append-only mode.
    pub fn end_overwrite(&mut self) {
        self.overwrite = None;
    }

    fn put(&mut self, bytes: &[u8]) {
        match self.overwrite {
            Some(pos) => {
                self.buf[pos..pos + bytes.len()].copy_from_slice(bytes);
                self.overwrite = Some(pos + bytes.len());
            }
            None => self.buf.extend_from_slice(bytes),
        }
    }

    pub fn write_instruction(&mut self, op: Opcode) {
        self.put(&[op as u8]);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.put(&v.to_be_bytes());
    }

    pub fn write_usize(&mut self, v: usize) {
        self.put(&(v as u64).to_be_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.put(&v.to_bits().to_be_bytes());
    }

    pub fn write_string(&mut self, bytes: &[u8]) {
        self.write_usize(bytes.len());
        self.put(bytes);
    }

    /// Consumes the writer, handing ownership of the accumulated buffer to
    /// a fresh [`Reader`] positioned at the start of the stream.
    pub fn into_reader(self) -> Reader<'static> {
        Reader::from_owned(self.buf)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// Backing storage for a [`Reader`] — either borrowed from the caller or
/// owned after being produced by [`Writer::into_reader`].
#[derive(Debug)]
enum Storage<'a> {
    Borrowed(&'a [u8]),
    Owned(Vec<u8>),
}

impl Storage<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Borrowed(s) => s,
            Storage::Owned(v) => v,
        }
    }
}

/// A cursored view over a bytecode stream.
#[derive(Debug)]
pub struct Reader<'a> {
    storage: Storage<'a>,
    cursor: usize,
}

impl<'a> Reader<'a> {
    pub fn from_borrowed(bytes: &'a [u8]) -> Self {
        Self { storage: Storage::Borrowed(bytes), cursor: 0 }
    }

    pub fn from_owned(bytes: Vec<u8>) -> Reader<'static> {
        Reader { storage: Storage::Owned(bytes), cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.storage.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Sets the read cursor to an absolute offset. Used by `jump`, `jz`,
    /// `call`, and `return` to redirect the fetch-decode-execute loop.
    pub fn set_cursor(&mut self, pos: usize) {
        self.cursor = pos;
    }

    pub fn end_of_file(&self) -> bool {
        self.cursor >= self.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.storage.as_slice()
    }

    fn take(&mut self, n: usize) -> Result<&[u8], VmError> {
        let bytes = self.storage.as_slice();
        if self.cursor + n > bytes.len() {
            return Err(VmError::OutOfBounds(format!(
                "attempted to read {n} bytes at offset {} of a {}-byte stream",
                self.cursor,
                bytes.len()
            )));
        }
        let slice = &bytes[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(slice)
    }

    pub fn read_instruction(&mut self) -> Result<Opcode, VmError> {
        let byte = self.take(1)?[0];
        Opcode::try_from(byte)
    }

    pub fn read_i32(&mut self) -> Result<i32, VmError> {
        let bytes = self.take(4)?;
        Ok(i32::from_be_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_usize(&mut self) -> Result<usize, VmError> {
        let bytes = self.take(8)?;
        Ok(u64::from_be_bytes(bytes.try_into().unwrap()) as usize)
    }

    pub fn read_f64(&mut self) -> Result<f64, VmError> {
        let bytes = self.take(8)?;
        Ok(f64::from_bits(u64::from_be_bytes(bytes.try_into().unwrap())))
    }

    pub fn read_string(&mut self) -> Result<Vec<u8>, VmError> {
        let len = self.read_usize()?;
        Ok(self.take(len)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_scalars() {
        let mut w = Writer::new();
        w.write_i32(-12345);
        w.write_usize(0xdead_beef);
        w.write_f64(3.5);
        w.write_string(b"hello");
        let mut r = w.into_reader();
        assert_eq!(r.read_i32().unwrap(), -12345);
        assert_eq!(r.read_usize().unwrap(), 0xdead_beef);
        assert_eq!(r.read_f64().unwrap(), 3.5);
        assert_eq!(r.read_string().unwrap(), b"hello");
        assert!(r.end_of_file());
    }

    #[test]
    fn overwrite_patches_in_place_without_growing() {
        let mut w = Writer::new();
        w.write_usize(0); // placeholder
        let placeholder_pos = 0;
        w.write_instruction(Opcode::Stop);
        assert_eq!(w.len(), 9);
        w.begin_overwrite(placeholder_pos);
        w.write_usize(42);
        w.end_overwrite();
        assert_eq!(w.len(), 9);
        let mut r = w.into_reader();
        assert_eq!(r.read_usize().unwrap(), 42);
    }

    #[test]
    fn read_past_end_is_out_of_bounds() {
        let mut r = Reader::from_borrowed(&[0x01]);
        assert!(r.read_usize().is_err());
    }
}
