//! Fixed-width integer and length-prefixed byte-string primitives.
//!
//! All multi-byte integers are little-endian. Readers take a byte slice and
//! return the decoded value together with the unread remainder; running off
//! the end is a [`RefError::CorruptReference`], never a panic.

use h5r_types::Address;

use crate::error::{RefError, RefResult};

/// Exclusive upper bound on the length of a length-prefixed name.
pub const MAX_NAME_LEN: usize = 64 * 1024;

pub fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn put_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn put_address(buf: &mut Vec<u8>, addr: Address) {
    buf.extend_from_slice(&addr.to_le_bytes());
}

/// Append `[2-byte length][bytes]`.
pub fn put_name(buf: &mut Vec<u8>, what: &'static str, name: &[u8]) -> RefResult<()> {
    let len = check_name_len(what, name.len())?;
    put_u16(buf, len);
    buf.extend_from_slice(name);
    Ok(())
}

/// Validate that a name fits the 2-byte length field.
pub fn check_name_len(what: &'static str, len: usize) -> RefResult<u16> {
    if len >= MAX_NAME_LEN {
        return Err(RefError::NameTooLong {
            what,
            len,
            max: MAX_NAME_LEN - 1,
        });
    }
    Ok(len as u16)
}

fn take<'a>(bytes: &'a [u8], n: usize, what: &str) -> RefResult<(&'a [u8], &'a [u8])> {
    if bytes.len() < n {
        return Err(RefError::CorruptReference(format!(
            "truncated {what}: need {n} bytes, have {}",
            bytes.len()
        )));
    }
    Ok(bytes.split_at(n))
}

pub fn get_u16(bytes: &[u8]) -> RefResult<(u16, &[u8])> {
    let (head, rest) = take(bytes, 2, "u16")?;
    Ok((u16::from_le_bytes([head[0], head[1]]), rest))
}

pub fn get_u64(bytes: &[u8]) -> RefResult<(u64, &[u8])> {
    let (head, rest) = take(bytes, 8, "u64")?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(head);
    Ok((u64::from_le_bytes(raw), rest))
}

pub fn get_address(bytes: &[u8]) -> RefResult<(Address, &[u8])> {
    let (raw, rest) = get_u64(bytes)?;
    Ok((Address::new(raw), rest))
}

/// Read `[2-byte length][bytes]`, returning the name bytes.
pub fn get_name(bytes: &[u8]) -> RefResult<(&[u8], &[u8])> {
    let (len, rest) = get_u16(bytes)?;
    take(rest, len as usize, "name")
}

/// Allocate an empty buffer able to hold `capacity` bytes without growing.
pub fn alloc_buffer(capacity: usize) -> RefResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(capacity)?;
    Ok(buf)
}

/// Deep-copy `bytes` into a fresh boxed slice.
pub fn copy_bytes(bytes: &[u8]) -> RefResult<Box<[u8]>> {
    let mut buf = alloc_buffer(bytes.len())?;
    buf.extend_from_slice(bytes);
    Ok(buf.into_boxed_slice())
}

/// Copy `src` into an optional caller buffer, NUL-terminated.
///
/// Writes `min(src.len(), dst.len() - 1)` bytes followed by a terminator
/// when a non-empty buffer is supplied, and always returns `src.len()` so a
/// caller can size a buffer with a first call and fill it with a second.
pub fn copy_out(src: &[u8], dst: Option<&mut [u8]>) -> usize {
    if let Some(dst) = dst {
        if !dst.is_empty() {
            let n = src.len().min(dst.len() - 1);
            dst[..n].copy_from_slice(&src[..n]);
            dst[n] = 0;
        }
    }
    src.len()
}
