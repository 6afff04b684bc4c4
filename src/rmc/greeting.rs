//! The greeting opening every multicast-related connection.

use std::io::{Read, Write};

/// Sends a greeting identifying the caller, the multicast instance, and the
/// message type to follow: `pid:u16 LE ∥ id:u64 LE ∥ msg_type:u8`.
pub fn greet<W: Write>(w: &mut W, pid: u16, id: u64, msg_type: u8) -> std::io::Result<()> {
    let mut data = [0u8; 11];
    data[..2].copy_from_slice(&pid.to_le_bytes());
    data[2..10].copy_from_slice(&id.to_le_bytes());
    data[10] = msg_type;
    w.write_all(&data)?;
    w.flush()
}

/// Accepts a greeting and returns the `(pid, id, msg_type)` it carries.
pub fn accept_greeting<R: Read>(r: &mut R) -> std::io::Result<(u16, u64, u8)> {
    let mut data = [0u8; 11];
    r.read_exact(&mut data)?;
    let pid = u16::from_le_bytes(data[..2].try_into().expect("slice of length 2"));
    let id = u64::from_le_bytes(data[2..10].try_into().expect("slice of length 8"));
    Ok((pid, id, data[10]))
}
