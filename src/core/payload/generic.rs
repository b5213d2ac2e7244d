use crate::codec::Streamable;

/// Payload of an unknown object type or version, kept byte for byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericPayload {
    object_type: u32,
    version: u64,
    stream: u64,
    data: Vec<u8>,
}

impl GenericPayload {
    pub fn new(object_type: u32, version: u64, stream: u64, data: Vec<u8>) -> GenericPayload {
        GenericPayload {
            object_type,
            version,
            stream,
            data,
        }
    }

    pub fn object_type(&self) -> u32 {
        self.object_type
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn stream(&self) -> u64 {
        self.stream
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Streamable for GenericPayload {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.data);
    }
}
