//! Binary codec for the Bitmessage wire format
//!
//! All integers are big-endian. Variable-length integers use the
//! `0xFD`/`0xFE`/`0xFF` marker scheme, and byte strings are prefixed with
//! their varint length.

pub mod decode;
pub mod encode;

pub use decode::Reader;

/// Types with a single, infallible wire representation
pub trait Streamable {
    fn write_to(&self, out: &mut Vec<u8>);

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }
}

impl Streamable for Vec<u8> {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }
}

/// Types that can be read back from their wire representation
pub trait Readable: Sized {
    fn read_from(reader: &mut Reader<'_>) -> crate::error::Result<Self>;
}

/// Largest payload a network frame may carry
pub const MAX_PAYLOAD_LENGTH: usize = 1_600_003;
/// Upper bound for DER signatures embedded in payloads
pub const MAX_SIGNATURE_LENGTH: usize = 1_000;
