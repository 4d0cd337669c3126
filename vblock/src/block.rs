use crate::error::{corrupt, BlockError, IteratorStatus, Result};
use crate::meta::MetaIndexReader;
use crate::record::{compose_key, parse_key, InternalRecord, COMPOSITE_KEY_LEN};
use crate::section::SectionReader;
use crate::util::get_u32;
use crate::MAGIC;

const TRAILER_LEN: usize = 8;

pub struct BlockReader<'a> {
    sections: &'a [u8],
    meta: MetaIndexReader<'a>,
}

impl<'a> BlockReader<'a> {
    pub fn new(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < TRAILER_LEN {
            return Err(corrupt("block shorter than its trailer"));
        }
        let magic = get_u32(buf, buf.len() - 4);
        if magic != MAGIC {
            return Err(corrupt(format!("trailer magic {magic:#x} != expected {MAGIC:#x}")));
        }
        let meta_size = get_u32(buf, buf.len() - 8) as usize;
        if meta_size > buf.len() - TRAILER_LEN {
            return Err(corrupt("trailer meta_size larger than the buffer"));
        }
        let meta_start = buf.len() - TRAILER_LEN - meta_size;
        let sections = &buf[..meta_start];
        let meta = MetaIndexReader::read(&buf[meta_start..buf.len() - TRAILER_LEN])?;
        if meta.expected_size() as usize != meta_size {
            return Err(corrupt(format!(
                "meta region parses to {} bytes, trailer claims {meta_size}",
                meta.expected_size()
            )));
        }
        tracing::debug!(target: "vblock", sections = meta.num_section(), "parsed block meta");
        Ok(BlockReader { sections, meta })
    }

    pub fn iter(&self) -> Result<BlockIterator<'a>> {
        BlockIterator::new(self.sections, self.meta)
    }

    pub fn num_sections(&self) -> u32 {
        self.meta.num_section()
    }
}

pub struct OwnedBlock {
    bytes: Box<[u8]>,
}

impl OwnedBlock {
    pub fn new(bytes: Vec<u8>) -> Self {
        OwnedBlock { bytes: bytes.into_boxed_slice() }
    }

    pub fn reader(&self) -> Result<BlockReader<'_>> {
        BlockReader::new(&self.bytes)
    }
}

pub struct BlockIterator<'a> {
    sections: &'a [u8],
    meta: MetaIndexReader<'a>,
    section_index: u32,
    // None only for a zero-section block; every seek then reports not-found
    section: Option<SectionReader<'a>>,
    entry_index: Option<u32>,
    key_buffer: [u8; COMPOSITE_KEY_LEN],
    value: &'a [u8],
    status: IteratorStatus,
}

impl<'a> BlockIterator<'a> {
    fn new(sections: &'a [u8], meta: MetaIndexReader<'a>) -> Result<Self> {
        let section = if meta.num_section() == 0 {
            None
        } else {
            Some(Self::load_section(sections, meta, 0)?)
        };
        Ok(BlockIterator {
            sections,
            meta,
            section_index: 0,
            section,
            entry_index: None,
            key_buffer: [0u8; COMPOSITE_KEY_LEN],
            value: &[],
            status: IteratorStatus::Ok,
        })
    }

    fn load_section(
        sections: &'a [u8],
        meta: MetaIndexReader<'a>,
        section_index: u32,
    ) -> Result<SectionReader<'a>> {
        let offset = meta.offset(section_index) as usize;
        if offset > sections.len() {
            return Err(corrupt("section offset out of range"));
        }
        SectionReader::read(&sections[offset..])
    }

    fn compose_current(&mut self, user_key: u32, sequence: u64, rtype: u8, value: &'a [u8]) {
        compose_key(&mut self.key_buffer, InternalRecord { user_key, sequence, rtype });
        self.value = value;
    }

    pub fn seek(&mut self, target_key: &[u8]) -> Result<()> {
        let target_user_key = i32::from_le_bytes(target_key[0..4].try_into().unwrap());
        if self.meta.num_section() == 0 {
            self.entry_index = None;
            self.status = IteratorStatus::NotFound { target_user_key };
            return Ok(());
        }
        let new_section_index = self.meta.search(target_user_key);
        if new_section_index != self.section_index || self.entry_index.is_none() {
            self.section = Some(Self::load_section(self.sections, self.meta, new_section_index)?);
            self.section_index = new_section_index;
        }
        let section = self.section.as_mut().expect("section present once num_section > 0");
        match section.find(target_user_key) {
            Some(idx) => {
                section.skip_to(idx);
                let (user_key, sequence, rtype, value) = section.decode_entry();
                self.compose_current(user_key, sequence, rtype, value);
                self.entry_index = Some(idx);
                self.status = IteratorStatus::Ok;
            }
            None => {
                self.entry_index = None;
                self.status = IteratorStatus::NotFound { target_user_key };
            }
        }
        Ok(())
    }

    pub fn next(&mut self) -> Result<()> {
        let Some(current) = self.entry_index else { return Ok(()) };
        let section = self.section.as_mut().expect("entry_index implies a loaded section");
        let next_index = current + 1;
        if next_index >= section.num_entry() {
            if self.section_index + 1 < self.meta.num_section() {
                self.section_index += 1;
                self.section = Some(Self::load_section(self.sections, self.meta, self.section_index)?);
                self.entry_index = Some(0);
            } else {
                self.entry_index = Some(next_index);
                return Ok(());
            }
        } else {
            self.entry_index = Some(next_index);
        }
        let section = self.section.as_mut().expect("just (re)loaded above");
        let (user_key, sequence, rtype, value) = section.decode_entry();
        self.compose_current(user_key, sequence, rtype, value);
        Ok(())
    }

    pub fn seek_to_first(&mut self) {
        self.status = IteratorStatus::NotSupported { op: "seek_to_first" };
    }

    pub fn seek_to_last(&mut self) {
        self.status = IteratorStatus::NotSupported { op: "seek_to_last" };
    }

    pub fn prev(&mut self) {
        self.status = IteratorStatus::NotSupported { op: "prev" };
    }

    pub fn valid(&self) -> bool {
        match (self.entry_index, &self.section) {
            (Some(i), Some(section)) => {
                i < section.num_entry() || self.section_index + 1 < self.meta.num_section()
            }
            _ => false,
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key_buffer
    }

    pub fn value(&self) -> &'a [u8] {
        self.value
    }

    pub fn status(&self) -> IteratorStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BlockBuilder, BlockBuilderOptions};
    use crate::codec::ValueEncoding;
    use crate::record::{compose_key, InternalRecord};
    use test_log::test;

    fn key_bytes(user_key: u32, sequence: u64, rtype: u8) -> [u8; COMPOSITE_KEY_LEN] {
        let mut buf = [0u8; COMPOSITE_KEY_LEN];
        compose_key(&mut buf, InternalRecord { user_key, sequence, rtype });
        buf
    }

    #[test]
    fn s1_tiny_scenario() {
        let mut builder = BlockBuilder::new(BlockBuilderOptions {
            section_limit: 16,
            value_encoding: ValueEncoding::Plain,
        });
        for &(uk, seq, ty, v) in &[(1u32, 1u64, 1u8, "a"), (2, 1, 1, "b"), (3, 1, 1, "c")] {
            builder.add(&key_bytes(uk, seq, ty), v.as_bytes()).unwrap();
        }
        let bytes = builder.finish().unwrap();

        let reader = BlockReader::new(&bytes).unwrap();
        assert_eq!(reader.meta.num_section(), 1);

        let mut it = reader.iter().unwrap();
        it.seek(&key_bytes(1, 0, 0)).unwrap();
        assert!(it.valid());
        assert_eq!(it.value(), b"a");

        it.seek(&key_bytes(2, 0, 0)).unwrap();
        assert!(it.valid());
        assert_eq!(it.value(), b"b");

        it.seek(&key_bytes(4, 0, 0)).unwrap();
        assert!(!it.valid());
        assert_eq!(it.status(), IteratorStatus::NotFound { target_user_key: 4 });

        it.seek(&key_bytes(1, 0, 0)).unwrap();
        let mut seen = Vec::new();
        while it.valid() {
            seen.push(it.value().to_vec());
            it.next().unwrap();
        }
        assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn s2_two_sections_scenario() {
        let mut builder = BlockBuilder::new(BlockBuilderOptions {
            section_limit: 4,
            value_encoding: ValueEncoding::Plain,
        });
        for i in 0..10u32 {
            let uk = i * 10;
            builder.add(&key_bytes(uk, 1, 1), format!("v{uk}").as_bytes()).unwrap();
        }
        let bytes = builder.finish().unwrap();
        let reader = BlockReader::new(&bytes).unwrap();
        assert_eq!(reader.meta.num_section(), 3);
        assert_eq!(reader.meta.search(50), 1);

        let mut it = reader.iter().unwrap();
        it.seek(&key_bytes(50, 0, 0)).unwrap();
        assert!(it.valid());
        assert_eq!(it.value(), b"v50");
    }

    #[test]
    fn s3_duplicate_user_keys_distinguished_by_sequence() {
        let mut builder = BlockBuilder::new(BlockBuilderOptions {
            section_limit: 16,
            value_encoding: ValueEncoding::Plain,
        });
        builder.add(&key_bytes(5, 2, 1), b"x").unwrap();
        builder.add(&key_bytes(5, 1, 1), b"y").unwrap();
        let bytes = builder.finish().unwrap();

        let reader = BlockReader::new(&bytes).unwrap();
        let mut it = reader.iter().unwrap();
        it.seek(&key_bytes(5, 0, 0)).unwrap();
        assert!(it.valid());
        let first_key = it.key().to_vec();
        let first_value = it.value().to_vec();
        it.next().unwrap();
        assert!(it.valid());
        let second_key = it.key().to_vec();
        let second_value = it.value().to_vec();

        assert_ne!(first_key, second_key);
        assert_eq!(first_value, b"x");
        assert_eq!(second_value, b"y");
    }

    #[test]
    fn not_supported_operations_leave_status_but_no_panic() {
        let mut builder = BlockBuilder::new(BlockBuilderOptions {
            section_limit: 16,
            value_encoding: ValueEncoding::Plain,
        });
        builder.add(&key_bytes(1, 1, 1), b"a").unwrap();
        let bytes = builder.finish().unwrap();
        let owned = OwnedBlock::new(bytes);
        let reader = owned.reader().unwrap();
        let mut it = reader.iter().unwrap();
        it.seek_to_first();
        assert_eq!(it.status(), IteratorStatus::NotSupported { op: "seek_to_first" });
        it.seek_to_last();
        assert_eq!(it.status(), IteratorStatus::NotSupported { op: "seek_to_last" });
        it.prev();
        assert_eq!(it.status(), IteratorStatus::NotSupported { op: "prev" });
    }

    #[test]
    fn rejects_bad_magic() {
        let mut builder = BlockBuilder::new(BlockBuilderOptions {
            section_limit: 16,
            value_encoding: ValueEncoding::Plain,
        });
        builder.add(&key_bytes(1, 1, 1), b"a").unwrap();
        let mut bytes = builder.finish().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(BlockReader::new(&bytes).is_err());
    }

    #[test]
    fn parse_key_matches_what_compose_key_wrote() {
        let buf = key_bytes(42, 7, 3);
        let parsed = parse_key(&buf);
        assert_eq!(parsed, InternalRecord { user_key: 42, sequence: 7, rtype: 3 });
    }

    #[test]
    fn empty_block_has_no_sections_and_every_seek_misses() {
        let mut builder = BlockBuilder::new(BlockBuilderOptions {
            section_limit: 16,
            value_encoding: ValueEncoding::Plain,
        });
        let bytes = builder.finish().unwrap();

        let reader = BlockReader::new(&bytes).unwrap();
        assert_eq!(reader.num_sections(), 0);

        let mut it = reader.iter().unwrap();
        assert!(!it.valid());
        it.seek(&key_bytes(1, 0, 0)).unwrap();
        assert!(!it.valid());
        assert_eq!(it.status(), IteratorStatus::NotFound { target_user_key: 1 });
        it.next().unwrap();
        assert!(!it.valid());
    }
}
