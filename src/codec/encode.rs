//! Writers for the primitive wire types

/// Append a variable-length integer.
///
/// ```text
/// value <= 0xFC         -> 1 byte
/// value <= 0xFFFF       -> 0xFD + u16
/// value <= 0xFFFF_FFFF  -> 0xFE + u32
/// otherwise             -> 0xFF + u64
/// ```
pub fn var_int(value: u64, out: &mut Vec<u8>) {
    if value < 0xFD {
        out.push(value as u8);
    } else if value <= 0xFFFF {
        out.push(0xFD);
        uint16(value as u16, out);
    } else if value <= 0xFFFF_FFFF {
        out.push(0xFE);
        uint32(value as u32, out);
    } else {
        out.push(0xFF);
        uint64(value, out);
    }
}

pub fn var_int_bytes(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    var_int(value, &mut out);
    out
}

/// Number of bytes `var_int` writes for `value`
pub fn var_int_len(value: u64) -> usize {
    match value {
        0..=0xFC => 1,
        0xFD..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

pub fn uint8(value: u8, out: &mut Vec<u8>) {
    out.push(value);
}

pub fn uint16(value: u16, out: &mut Vec<u8>) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn uint32(value: u32, out: &mut Vec<u8>) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn uint64(value: u64, out: &mut Vec<u8>) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn int32(value: i32, out: &mut Vec<u8>) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn int64(value: i64, out: &mut Vec<u8>) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Length-prefixed byte string
pub fn var_bytes(data: &[u8], out: &mut Vec<u8>) {
    var_int(data.len() as u64, out);
    out.extend_from_slice(data);
}

/// Length-prefixed UTF-8 string
pub fn var_string(value: &str, out: &mut Vec<u8>) {
    var_bytes(value.as_bytes(), out);
}

/// Count-prefixed list of varints (stream numbers in `version`)
pub fn var_int_list(values: &[u64], out: &mut Vec<u8>) {
    var_int(values.len() as u64, out);
    for value in values {
        var_int(*value, out);
    }
}
