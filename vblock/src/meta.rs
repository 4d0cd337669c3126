use crate::bitpack;
use crate::error::{corrupt, BlockError};
use crate::util::{get_i32, get_u32, get_u64, put_i32, put_u32, put_u64};

#[derive(Default)]
pub struct MetaIndexBuilder {
    start_min: i32,
    offsets: Vec<u64>,
    deltas: Vec<u32>,
    bit_width: u8,
}

impl MetaIndexBuilder {
    pub fn add_section(&mut self, offset: u64, start_value: i32) {
        if self.offsets.is_empty() {
            self.start_min = start_value;
        }
        let delta = (start_value as u32).wrapping_sub(self.start_min as u32);
        self.bit_width = self.bit_width.max(bitpack::bit_width(delta));
        self.deltas.push(delta);
        self.offsets.push(offset);
    }

    pub fn finish(&mut self) {}

    pub fn num_section(&self) -> u32 {
        self.offsets.len() as u32
    }

    pub fn estimate_size(&self) -> u32 {
        let n = self.offsets.len();
        (9 + n * 8 + bitpack::packed_len(n, self.bit_width) + bitpack::READ_PAD) as u32
    }

    pub fn dump(&self, out: &mut [u8]) {
        put_u32(out, 0, self.offsets.len() as u32);
        let mut pos = 4;
        for &o in &self.offsets {
            put_u64(out, pos, o);
            pos += 8;
        }
        put_i32(out, pos, self.start_min);
        pos += 4;
        out[pos] = self.bit_width;
        pos += 1;
        let core = bitpack::packed_len(self.deltas.len(), self.bit_width);
        bitpack::pack(&self.deltas, self.bit_width, &mut out[pos..pos + core]);
    }
}

#[derive(Clone, Copy)]
pub struct MetaIndexReader<'a> {
    num_section: u32,
    offsets: &'a [u8],
    start_min: i32,
    start_bitwidth: u8,
    deltas: &'a [u8],
}

impl<'a> MetaIndexReader<'a> {
    pub fn read(src: &'a [u8]) -> Result<Self, BlockError> {
        if src.len() < 4 {
            return Err(corrupt("meta region shorter than the section-count field"));
        }
        let num_section = get_u32(src, 0);
        let offsets_end = 4usize
            .checked_add(num_section as usize * 8)
            .filter(|&end| end + 5 <= src.len())
            .ok_or_else(|| corrupt("meta region too short for its claimed section count"))?;
        let offsets = &src[4..offsets_end];
        let start_min = get_i32(src, offsets_end);
        let start_bitwidth = src[offsets_end + 4];
        let deltas = &src[offsets_end + 5..];
        Ok(MetaIndexReader { num_section, offsets, start_min, start_bitwidth, deltas })
    }

    pub fn expected_size(&self) -> u32 {
        let n = self.num_section as usize;
        (9 + n * 8 + bitpack::packed_len(n, self.start_bitwidth) + bitpack::READ_PAD) as u32
    }

    pub fn num_section(&self) -> u32 {
        self.num_section
    }

    pub fn start_min(&self) -> i32 {
        self.start_min
    }

    pub fn offset(&self, index: u32) -> u64 {
        get_u64(self.offsets, index as usize * 8)
    }

    // last section whose start-key is <= value, or 0 if value is before all of them
    pub fn search(&self, value: i32) -> u32 {
        if (value as i64) < self.start_min as i64 {
            return 0;
        }
        let target = (value as u32).wrapping_sub(self.start_min as u32);
        bitpack::geq_search(self.deltas, self.num_section, self.start_bitwidth, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn s2_two_sections_scenario() {
        let mut b = MetaIndexBuilder::default();
        b.add_section(0, 0);
        b.add_section(100, 40);
        b.add_section(250, 80);
        b.finish();

        let mut out = vec![0u8; b.estimate_size() as usize];
        b.dump(&mut out);
        let reader = MetaIndexReader::read(&out).unwrap();

        assert_eq!(reader.num_section(), 3);
        assert_eq!(reader.offset(0), 0);
        assert_eq!(reader.offset(1), 100);
        assert_eq!(reader.offset(2), 250);
        assert_eq!(reader.search(50), 1);
        assert_eq!(reader.search(-10), 0);
        assert_eq!(reader.search(1000), 2);
    }

    #[test]
    fn monotone_meta_property() {
        let mut b = MetaIndexBuilder::default();
        let starts = [0i32, 5, 5, 19, 100];
        for (i, &s) in starts.iter().enumerate() {
            b.add_section(i as u64 * 17, s);
        }
        b.finish();
        let mut out = vec![0u8; b.estimate_size() as usize];
        b.dump(&mut out);
        let reader = MetaIndexReader::read(&out).unwrap();

        let mut last_delta = None;
        let mut last_offset = None;
        for i in 0..reader.num_section() {
            let delta = bitpack::decode_at(reader.deltas, i, reader.start_bitwidth);
            if let Some(prev) = last_delta {
                assert!(delta >= prev);
            }
            last_delta = Some(delta);

            let offset = reader.offset(i);
            if let Some(prev) = last_offset {
                assert!(offset > prev);
            }
            last_offset = Some(offset);
        }
    }
}
