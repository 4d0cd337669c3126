//! The logical record shape and the 12-byte composite internal key the
//! iterator exposes: `user_key:u32 LE || ((sequence << 8) | type):u64 LE`.

pub const COMPOSITE_KEY_LEN: usize = 12;

/// A record as the builder receives it: everything but the value, which
/// callers pass alongside (it goes to its own column and isn't part of the
/// composite key).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalRecord {
    pub user_key: u32,
    pub sequence: u64,
    pub rtype: u8,
}

/// Writes the 12-byte composite key for `record` into `out`.
pub fn compose_key(out: &mut [u8; COMPOSITE_KEY_LEN], record: InternalRecord) {
    out[0..4].copy_from_slice(&record.user_key.to_le_bytes());
    let packed = (record.sequence << 8) | record.rtype as u64;
    out[4..12].copy_from_slice(&packed.to_le_bytes());
}

/// Parses a 12-byte composite key back into its fields. Panics if `key` is
/// not exactly `COMPOSITE_KEY_LEN` bytes — this is a framing precondition
/// enforced by every caller (`BlockBuilder::add`, `BlockIterator::seek`),
/// not an input-validation boundary.
pub fn parse_key(key: &[u8]) -> InternalRecord {
    let user_key = u32::from_le_bytes(key[0..4].try_into().unwrap());
    let packed = u64::from_le_bytes(key[4..12].try_into().unwrap());
    InternalRecord { user_key, sequence: packed >> 8, rtype: (packed & 0xff) as u8 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn compose_parse_round_trip() {
        let record = InternalRecord { user_key: 0xdead_beef, sequence: 0x01_0203_0405, rtype: 7 };
        let mut key = [0u8; COMPOSITE_KEY_LEN];
        compose_key(&mut key, record);
        assert_eq!(parse_key(&key), record);
    }

    #[test]
    fn sequence_and_type_share_the_back_8_bytes_without_colliding() {
        let a = InternalRecord { user_key: 5, sequence: 2, rtype: 1 };
        let b = InternalRecord { user_key: 5, sequence: 1, rtype: 1 };
        let mut ka = [0u8; COMPOSITE_KEY_LEN];
        let mut kb = [0u8; COMPOSITE_KEY_LEN];
        compose_key(&mut ka, a);
        compose_key(&mut kb, b);
        assert_ne!(ka, kb);
        assert_eq!(&ka[0..4], &kb[0..4]);
    }
}
