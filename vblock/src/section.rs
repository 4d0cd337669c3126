use crate::bitpack;
use crate::codec::{
    BitpackU32Decoder, BitpackU32Encoder, BytesDecoder, BytesEncoder, PlainU64Decoder,
    PlainU64Encoder, RunLengthU8Decoder, RunLengthU8Encoder, ValueEncoding, U32_TAG_BITPACK,
    U64_TAG_PLAIN, U8_TAG_RUNLENGTH,
};
use crate::error::{corrupt, BlockError};
use crate::record::InternalRecord;
use crate::util::{get_i32, get_u32, put_i32, put_u32};

/// `num_entry:u32 + start_value:i32 + 4 * (size:u32 + enc_tag:u8)`.
pub const HEADER_LEN: usize = 4 + 4 + 4 * (4 + 1);

const KEY_SIZE_OFFSET: usize = 8;
const KEY_TAG_OFFSET: usize = 12;
const SEQ_SIZE_OFFSET: usize = 13;
const SEQ_TAG_OFFSET: usize = 17;
const TYPE_SIZE_OFFSET: usize = 18;
const TYPE_TAG_OFFSET: usize = 22;
const VALUE_SIZE_OFFSET: usize = 23;
const VALUE_TAG_OFFSET: usize = 27;

pub struct SectionBuilder {
    start_value: i32,
    num_entry: u32,
    key_enc: BitpackU32Encoder,
    seq_enc: PlainU64Encoder,
    type_enc: RunLengthU8Encoder,
    value_enc: BytesEncoder,
}

impl SectionBuilder {
    pub fn open(start_value: i32, value_encoding: ValueEncoding) -> Self {
        SectionBuilder {
            start_value,
            num_entry: 0,
            key_enc: BitpackU32Encoder::default(),
            seq_enc: PlainU64Encoder::default(),
            type_enc: RunLengthU8Encoder::default(),
            value_enc: BytesEncoder::open(value_encoding),
        }
    }

    pub fn num_entry(&self) -> u32 {
        self.num_entry
    }

    pub fn start_value(&self) -> i32 {
        self.start_value
    }

    pub fn add(&mut self, record: InternalRecord, value: &[u8]) {
        let delta = record.user_key.wrapping_sub(self.start_value as u32);
        self.key_enc.encode(delta);
        self.seq_enc.encode(record.sequence);
        self.type_enc.encode(record.rtype);
        self.value_enc.encode(value);
        self.num_entry += 1;
    }

    pub fn close(&mut self) {
        self.key_enc.close();
        self.seq_enc.close();
        self.type_enc.close();
        self.value_enc.close();
    }

    pub fn estimate_size(&self) -> u32 {
        HEADER_LEN as u32
            + self.key_enc.estimate_size()
            + self.seq_enc.estimate_size()
            + self.type_enc.estimate_size()
            + self.value_enc.estimate_size()
    }

    pub fn dump(&self, out: &mut [u8]) {
        let key_size = self.key_enc.estimate_size();
        let seq_size = self.seq_enc.estimate_size();
        let type_size = self.type_enc.estimate_size();
        let value_size = self.value_enc.estimate_size();

        put_u32(out, 0, self.num_entry);
        put_i32(out, 4, self.start_value);
        put_u32(out, KEY_SIZE_OFFSET, key_size);
        out[KEY_TAG_OFFSET] = U32_TAG_BITPACK;
        put_u32(out, SEQ_SIZE_OFFSET, seq_size);
        out[SEQ_TAG_OFFSET] = U64_TAG_PLAIN;
        put_u32(out, TYPE_SIZE_OFFSET, type_size);
        out[TYPE_TAG_OFFSET] = U8_TAG_RUNLENGTH;
        put_u32(out, VALUE_SIZE_OFFSET, value_size);
        out[VALUE_TAG_OFFSET] = self.value_enc.tag();

        let mut pos = HEADER_LEN;
        self.key_enc.dump(&mut out[pos..pos + key_size as usize]);
        pos += key_size as usize;
        self.seq_enc.dump(&mut out[pos..pos + seq_size as usize]);
        pos += seq_size as usize;
        self.type_enc.dump(&mut out[pos..pos + type_size as usize]);
        pos += type_size as usize;
        self.value_enc.dump(&mut out[pos..pos + value_size as usize]);
    }
}

pub struct SectionReader<'a> {
    start_value: i32,
    num_entry: u32,
    // kept alongside the decoders so skip_to can re-attach from byte zero;
    // every codec's skip is relative to wherever the decoder currently sits
    key_raw: &'a [u8],
    seq_raw: &'a [u8],
    type_raw: &'a [u8],
    value_raw: &'a [u8],
    value_tag: u8,
    key_dec: BitpackU32Decoder<'a>,
    seq_dec: PlainU64Decoder<'a>,
    type_dec: RunLengthU8Decoder<'a>,
    value_dec: BytesDecoder<'a>,
}

impl<'a> SectionReader<'a> {
    pub fn read(src: &'a [u8]) -> Result<Self, BlockError> {
        let num_entry = get_u32(src, 0);
        let start_value = get_i32(src, 4);

        let key_size = get_u32(src, KEY_SIZE_OFFSET);
        let key_tag = src[KEY_TAG_OFFSET];
        if key_tag != U32_TAG_BITPACK {
            return Err(corrupt(format!("section key column tagged {key_tag}, expected BITPACK")));
        }
        let seq_size = get_u32(src, SEQ_SIZE_OFFSET);
        let seq_tag = src[SEQ_TAG_OFFSET];
        if seq_tag != U64_TAG_PLAIN {
            return Err(corrupt(format!("section sequence column tagged {seq_tag}, expected PLAIN")));
        }
        let type_size = get_u32(src, TYPE_SIZE_OFFSET);
        let type_tag = src[TYPE_TAG_OFFSET];
        if type_tag != U8_TAG_RUNLENGTH {
            return Err(corrupt(format!("section type column tagged {type_tag}, expected RUNLENGTH")));
        }
        let value_size = get_u32(src, VALUE_SIZE_OFFSET);
        let value_tag = src[VALUE_TAG_OFFSET];

        let mut pos = HEADER_LEN;
        let key_raw = &src[pos..pos + key_size as usize];
        pos += key_size as usize;
        let seq_raw = &src[pos..pos + seq_size as usize];
        pos += seq_size as usize;
        let type_raw = &src[pos..pos + type_size as usize];
        pos += type_size as usize;
        let value_raw = &src[pos..pos + value_size as usize];

        let key_dec = BitpackU32Decoder::attach(key_raw);
        let seq_dec = PlainU64Decoder::attach(seq_raw);
        let type_dec = RunLengthU8Decoder::attach(type_raw);
        let value_dec = BytesDecoder::attach(value_tag, value_raw)?;

        Ok(SectionReader {
            start_value,
            num_entry,
            key_raw,
            seq_raw,
            type_raw,
            value_raw,
            value_tag,
            key_dec,
            seq_dec,
            type_dec,
            value_dec,
        })
    }

    pub fn num_entry(&self) -> u32 {
        self.num_entry
    }

    pub fn start_value(&self) -> i32 {
        self.start_value
    }

    pub fn find(&self, target_user_key: i32) -> Option<u32> {
        let target_delta = (target_user_key as u32).wrapping_sub(self.start_value as u32);
        let (data, bit_width) = self.key_dec.packed();
        bitpack::eq_search(data, self.num_entry, bit_width, target_delta)
    }

    pub fn find_start(&self, target_user_key: i32) -> u32 {
        let target_delta = (target_user_key as u32).wrapping_sub(self.start_value as u32);
        let (data, bit_width) = self.key_dec.packed();
        bitpack::geq_search(data, self.num_entry, bit_width, target_delta)
    }

    // safe to call repeatedly on the same loaded section; rewinds before each skip
    pub fn skip_to(&mut self, entry_index: u32) {
        self.key_dec = BitpackU32Decoder::attach(self.key_raw);
        self.key_dec.skip(entry_index);
        self.seq_dec = PlainU64Decoder::attach(self.seq_raw);
        self.seq_dec.skip(entry_index);
        self.type_dec = RunLengthU8Decoder::attach(self.type_raw);
        self.type_dec.skip(entry_index);
        self.value_dec =
            BytesDecoder::attach(self.value_tag, self.value_raw).expect("tag already validated in read()");
        self.value_dec.skip(entry_index);
    }

    pub fn decode_entry(&mut self) -> (u32, u64, u8, &'a [u8]) {
        let delta = self.key_dec.decode();
        let user_key = (self.start_value as u32).wrapping_add(delta);
        let sequence = self.seq_dec.decode();
        let rtype = self.type_dec.decode();
        let value = self.value_dec.decode();
        (user_key, sequence, rtype, value)
    }
}
