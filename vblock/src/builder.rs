use crate::codec::ValueEncoding;
use crate::error::Result;
use crate::meta::MetaIndexBuilder;
use crate::record::{parse_key, InternalRecord};
use crate::section::SectionBuilder;
use crate::util::put_u32;
use crate::MAGIC;

#[derive(Debug, Clone, Copy)]
pub struct BlockBuilderOptions {
    pub section_limit: u32,
    pub value_encoding: ValueEncoding,
}

// upper-bounded by one u64 offset plus one bit-packed start-delta
const PENDING_META_ALLOWANCE: u32 = 16;

// meta_size:u32 || MAGIC:u32
const TRAILER_LEN: u32 = 8;

pub struct BlockBuilder {
    options: BlockBuilderOptions,
    buffer: Vec<u8>,
    meta: MetaIndexBuilder,
    current: Option<SectionBuilder>,
}

impl BlockBuilder {
    pub fn new(options: BlockBuilderOptions) -> Self {
        BlockBuilder { options, buffer: Vec::new(), meta: MetaIndexBuilder::default(), current: None }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.current.is_none()
    }

    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let record: InternalRecord = parse_key(key);
        let value_encoding = self.options.value_encoding;
        let current = self
            .current
            .get_or_insert_with(|| SectionBuilder::open(record.user_key as i32, value_encoding));
        current.add(record, value);
        if current.num_entry() >= self.options.section_limit {
            self.dump_section();
        }
        Ok(())
    }

    fn dump_section(&mut self) {
        let mut section = self.current.take().expect("dump_section called with no open section");
        section.close();
        let offset = self.buffer.len() as u64;
        self.meta.add_section(offset, section.start_value());
        let size = section.estimate_size() as usize;
        let start = self.buffer.len();
        self.buffer.resize(start + size, 0);
        section.dump(&mut self.buffer[start..]);
    }

    pub fn current_size_estimate(&self) -> u32 {
        let mut meta_size = self.meta.estimate_size();
        let mut section_bytes = self.buffer.len() as u32;
        if let Some(current) = &self.current {
            meta_size += PENDING_META_ALLOWANCE;
            section_bytes += current.estimate_size();
        }
        meta_size + section_bytes + TRAILER_LEN
    }

    pub fn finish(&mut self) -> Result<Vec<u8>> {
        if self.current.is_some() {
            self.dump_section();
        }
        self.meta.finish();
        let meta_size = self.meta.estimate_size();

        let start = self.buffer.len();
        self.buffer.resize(start + meta_size as usize + TRAILER_LEN as usize, 0);
        self.meta.dump(&mut self.buffer[start..start + meta_size as usize]);
        put_u32(&mut self.buffer, start + meta_size as usize, meta_size);
        put_u32(&mut self.buffer, start + meta_size as usize + 4, MAGIC);

        Ok(self.buffer.clone())
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.meta = MetaIndexBuilder::default();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{compose_key, COMPOSITE_KEY_LEN};
    use test_log::test;

    fn key_bytes(user_key: u32, sequence: u64, rtype: u8) -> [u8; COMPOSITE_KEY_LEN] {
        let mut buf = [0u8; COMPOSITE_KEY_LEN];
        compose_key(&mut buf, InternalRecord { user_key, sequence, rtype });
        buf
    }

    #[test]
    fn section_boundary_property() {
        // section_limit = 4, 10 records => ceil(10/4) = 3 sections (4, 4, 2).
        let mut builder =
            BlockBuilder::new(BlockBuilderOptions { section_limit: 4, value_encoding: ValueEncoding::Plain });
        for i in 0..10u32 {
            builder.add(&key_bytes(i * 10, 1, 1), b"v").unwrap();
        }
        let estimate_before_finish = builder.current_size_estimate();
        let bytes = builder.finish().unwrap();
        assert!(
            estimate_before_finish as usize + 16 >= bytes.len(),
            "estimate {estimate_before_finish} must not undershoot final length {} by more than the 16-byte allowance",
            bytes.len()
        );

        let reader = crate::block::BlockReader::new(&bytes).unwrap();
        assert_eq!(reader.num_sections(), 3);
    }

    #[test]
    fn current_size_estimate_tracks_growth() {
        let mut builder =
            BlockBuilder::new(BlockBuilderOptions { section_limit: 16, value_encoding: ValueEncoding::Plain });
        let empty_estimate = builder.current_size_estimate();
        builder.add(&key_bytes(1, 1, 1), b"hello").unwrap();
        assert!(builder.current_size_estimate() > empty_estimate);
    }

    #[test]
    fn reset_clears_state_for_reuse() {
        let mut builder =
            BlockBuilder::new(BlockBuilderOptions { section_limit: 2, value_encoding: ValueEncoding::Plain });
        builder.add(&key_bytes(1, 1, 1), b"a").unwrap();
        builder.add(&key_bytes(2, 1, 1), b"b").unwrap();
        builder.add(&key_bytes(3, 1, 1), b"c").unwrap();
        builder.reset();
        assert!(builder.is_empty());

        builder.add(&key_bytes(9, 1, 1), b"z").unwrap();
        let bytes = builder.finish().unwrap();
        let reader = crate::block::BlockReader::new(&bytes).unwrap();
        let mut it = reader.iter().unwrap();
        it.seek(&key_bytes(9, 0, 0)).unwrap();
        assert!(it.valid());
        assert_eq!(it.value(), b"z");
    }

    #[test]
    fn finish_is_infallible_for_an_empty_builder() {
        let mut builder =
            BlockBuilder::new(BlockBuilderOptions { section_limit: 16, value_encoding: ValueEncoding::Plain });
        let bytes = builder.finish().unwrap();
        let reader = crate::block::BlockReader::new(&bytes).unwrap();
        assert_eq!(reader.iter().unwrap().valid(), false);
    }
}
