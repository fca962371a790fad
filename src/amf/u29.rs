//! U29 variable-length integer codec
//!
//! Every AMF3 length, reference index, and complex-value header is a U29:
//! an unsigned integer packed into 1-4 bytes. The first three bytes carry
//! 7 data bits each below a continuation flag; a fourth byte, present only
//! when all three continuation flags were set, carries a full 8 data bits.
//! Total data width is 7 + 7 + 7 + 8 = 29 bits.
//!
//! ```text
//! 0xxxxxxx                            (7 bits)
//! 1xxxxxxx 0xxxxxxx                   (14 bits)
//! 1xxxxxxx 1xxxxxxx 0xxxxxxx          (21 bits)
//! 1xxxxxxx 1xxxxxxx 1xxxxxxx xxxxxxxx (29 bits)
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{AmfError, Result};

/// Largest value a U29 can carry: 2^29 - 1
pub const U29_MAX: u32 = 0x1FFF_FFFF;

/// Largest AMF3 Integer: 2^28 - 1
pub const INT_MAX: i32 = 0x0FFF_FFFF;

/// Smallest AMF3 Integer: -2^28
pub const INT_MIN: i32 = -0x1000_0000;

/// Read a U29 from the buffer
///
/// Reads byte by byte, short-circuiting on the first byte whose high bit is
/// clear. The fourth byte, when reached, contributes all 8 bits.
pub fn read_u29(buf: &mut Bytes) -> Result<u32> {
    let mut value: u32 = 0;

    for i in 0..4 {
        if buf.is_empty() {
            return Err(AmfError::Truncated);
        }

        let byte = buf.get_u8();

        if i < 3 {
            value = (value << 7) | ((byte & 0x7F) as u32);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        } else {
            // Fourth byte uses all 8 bits
            value = (value << 8) | (byte as u32);
        }
    }

    Ok(value)
}

/// Write a U29 to the buffer
///
/// Fails with `OutOfRange` for values that need more than 29 bits.
pub fn write_u29(buf: &mut BytesMut, value: u32) -> Result<()> {
    if value > U29_MAX {
        return Err(AmfError::OutOfRange);
    }

    if value < 0x80 {
        buf.put_u8(value as u8);
    } else if value < 0x4000 {
        buf.put_u8(((value >> 7) | 0x80) as u8);
        buf.put_u8((value & 0x7F) as u8);
    } else if value < 0x20_0000 {
        buf.put_u8(((value >> 14) | 0x80) as u8);
        buf.put_u8(((value >> 7) | 0x80) as u8);
        buf.put_u8((value & 0x7F) as u8);
    } else {
        buf.put_u8(((value >> 22) | 0x80) as u8);
        buf.put_u8(((value >> 15) | 0x80) as u8);
        buf.put_u8(((value >> 8) | 0x80) as u8);
        buf.put_u8((value & 0xFF) as u8);
    }

    Ok(())
}

/// Interpret a U29 as a 29-bit two's complement integer
///
/// Bit 28 is the sign bit: wire values with it set decode to a negative
/// number in `[-2^28, -1]`. Only the Integer marker sign-extends; length
/// and reference headers stay unsigned.
pub fn sign_extend(value: u32) -> i32 {
    if value & 0x1000_0000 != 0 {
        (value as i32) | !(U29_MAX as i32)
    } else {
        value as i32
    }
}

/// Low 29 bits of a signed integer, for the wire
///
/// Callers must have range-checked against [`INT_MIN`]/[`INT_MAX`];
/// out-of-range integers are encoded as Double instead.
pub fn to_wire(value: i32) -> u32 {
    (value as u32) & U29_MAX
}
