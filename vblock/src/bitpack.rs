// zero still needs one bit; an all-zero delta column is still a real column
pub fn bit_width(value: u32) -> u8 {
    if value == 0 {
        1
    } else {
        (u32::BITS - value.leading_zeros()) as u8
    }
}

fn mask(bit_width: u8) -> u64 {
    if bit_width >= 32 {
        u32::MAX as u64
    } else {
        (1u64 << bit_width) - 1
    }
}

pub fn packed_len(n: usize, bit_width: u8) -> usize {
    (n * bit_width as usize + 7) / 8
}

// allocate this past packed_len so decode_at's 4-byte load never runs dry
pub const READ_PAD: usize = 3;

// out must be packed_len(values.len(), bit_width) bytes, zeroed; only ORs bits in
pub fn pack(values: &[u32], bit_width: u8, out: &mut [u8]) {
    if bit_width == 0 {
        return;
    }
    let m = mask(bit_width);
    for (i, &v) in values.iter().enumerate() {
        let bit_offset = i * bit_width as usize;
        let byte_index = bit_offset / 8;
        let shift = bit_offset % 8;
        let bits = ((v as u64) & m) << shift;
        let bytes = bits.to_le_bytes();
        for (k, b) in bytes.iter().enumerate() {
            if *b != 0 {
                out[byte_index + k] |= *b;
            }
        }
    }
}

fn load_u32_le(buf: &[u8], byte_index: usize) -> u32 {
    let mut bytes = [0u8; 4];
    let avail = buf.len().saturating_sub(byte_index).min(4);
    if avail > 0 {
        bytes[..avail].copy_from_slice(&buf[byte_index..byte_index + avail]);
    }
    u32::from_le_bytes(bytes)
}

pub fn decode_at(data: &[u8], index: u32, bit_width: u8) -> u32 {
    if bit_width == 0 {
        return 0;
    }
    let bit_offset = index as usize * bit_width as usize;
    let byte_index = bit_offset / 8;
    let shift = bit_offset % 8;
    let m = mask(bit_width) as u32;
    (load_u32_le(data, byte_index) >> shift) & m
}

pub fn unpack_group_of_8(data: &[u8], group_index: u32, bit_width: u8) -> [u32; 8] {
    let base = group_index * 8;
    let mut out = [0u32; 8];
    for (j, slot) in out.iter_mut().enumerate() {
        *slot = decode_at(data, base + j as u32, bit_width);
    }
    out
}

pub fn eq_search(data: &[u8], n: u32, bit_width: u8, target: u32) -> Option<u32> {
    if n == 0 {
        return None;
    }
    let mut begin = 0u32;
    let mut end = n - 1;
    while begin <= end {
        let mid = begin + (end - begin) / 2;
        let v = decode_at(data, mid, bit_width);
        if v == target {
            return Some(mid);
        } else if v < target {
            begin = mid + 1;
        } else {
            if mid == 0 {
                return None;
            }
            end = mid - 1;
        }
    }
    None
}

// index of the last element <= target, or 0 if target is smaller than all of them
pub fn geq_search(data: &[u8], n: u32, bit_width: u8, target: u32) -> u32 {
    debug_assert!(n >= 1);
    let mut begin = 0u32;
    let mut end = n - 1;
    while begin < end {
        let mid = begin + (end - begin + 1) / 2;
        let v = decode_at(data, mid, bit_width);
        if v <= target {
            begin = mid;
        } else {
            end = mid - 1;
        }
    }
    begin
}
