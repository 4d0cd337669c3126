use crate::bitpack;
use crate::error::{corrupt, BlockError};
use crate::util::{get_u32, get_u64, put_u32};
use crate::varint;

pub const BYTES_TAG_PLAIN: u8 = 0;
pub const BYTES_TAG_LENGTH: u8 = 1;
pub const U64_TAG_PLAIN: u8 = 0;
pub const U32_TAG_PLAIN: u8 = 0;
pub const U32_TAG_BITPACK: u8 = 2;
pub const U8_TAG_PLAIN: u8 = 0;
pub const U8_TAG_RUNLENGTH_VARINT: u8 = 2;
pub const U8_TAG_RUNLENGTH: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoding {
    Plain,
    Length,
}

impl ValueEncoding {
    pub(crate) fn tag(self) -> u8 {
        match self {
            ValueEncoding::Plain => BYTES_TAG_PLAIN,
            ValueEncoding::Length => BYTES_TAG_LENGTH,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Result<Self, BlockError> {
        match tag {
            BYTES_TAG_PLAIN => Ok(ValueEncoding::Plain),
            BYTES_TAG_LENGTH => Ok(ValueEncoding::Length),
            other => Err(corrupt(format!("unrecognized value column enc tag {other}"))),
        }
    }
}

// ---- bytes / PLAIN ----

#[derive(Default)]
pub struct PlainBytesEncoder {
    buf: Vec<u8>,
}

impl PlainBytesEncoder {
    pub fn encode(&mut self, value: &[u8]) {
        self.buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(value);
    }
    pub fn estimate_size(&self) -> u32 {
        self.buf.len() as u32
    }
    pub fn close(&mut self) {}
    pub fn dump(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.buf);
    }
}

pub struct PlainBytesDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PlainBytesDecoder<'a> {
    pub fn attach(src: &'a [u8]) -> Self {
        PlainBytesDecoder { data: src, pos: 0 }
    }
    pub fn skip(&mut self, n: u32) {
        for _ in 0..n {
            let len = get_u32(self.data, self.pos) as usize;
            self.pos += 4 + len;
        }
    }
    pub fn decode(&mut self) -> &'a [u8] {
        let len = get_u32(self.data, self.pos) as usize;
        self.pos += 4;
        let s = &self.data[self.pos..self.pos + len];
        self.pos += len;
        s
    }
}

// ---- bytes / LENGTH ----

#[derive(Default)]
pub struct LengthBytesEncoder {
    offsets: Vec<u32>,
    payload: Vec<u8>,
}

impl LengthBytesEncoder {
    pub fn encode(&mut self, value: &[u8]) {
        self.offsets.push(self.payload.len() as u32);
        self.payload.extend_from_slice(value);
    }
    pub fn close(&mut self) {
        self.offsets.push(self.payload.len() as u32);
    }
    pub fn estimate_size(&self) -> u32 {
        (4 + self.offsets.len() * 4 + self.payload.len()) as u32
    }
    pub fn dump(&self, out: &mut [u8]) {
        let table_bytes = (self.offsets.len() * 4) as u32;
        put_u32(out, 0, table_bytes);
        let mut pos = 4;
        for &o in &self.offsets {
            put_u32(out, pos, o);
            pos += 4;
        }
        out[pos..].copy_from_slice(&self.payload);
    }
}

pub struct LengthBytesDecoder<'a> {
    offsets: &'a [u8],
    payload: &'a [u8],
    idx: usize,
}

impl<'a> LengthBytesDecoder<'a> {
    pub fn attach(src: &'a [u8]) -> Self {
        let table_bytes = get_u32(src, 0) as usize;
        let offsets = &src[4..4 + table_bytes];
        let payload = &src[4 + table_bytes..];
        LengthBytesDecoder { offsets, payload, idx: 0 }
    }
    pub fn skip(&mut self, n: u32) {
        self.idx += n as usize;
    }
    pub fn decode(&mut self) -> &'a [u8] {
        let lo = get_u32(self.offsets, self.idx * 4) as usize;
        let hi = get_u32(self.offsets, (self.idx + 1) * 4) as usize;
        self.idx += 1;
        &self.payload[lo..hi]
    }
}

// ---- dispatching bytes enums, for the value column ----

pub enum BytesEncoder {
    Plain(PlainBytesEncoder),
    Length(LengthBytesEncoder),
}

impl BytesEncoder {
    pub fn open(encoding: ValueEncoding) -> Self {
        match encoding {
            ValueEncoding::Plain => BytesEncoder::Plain(PlainBytesEncoder::default()),
            ValueEncoding::Length => BytesEncoder::Length(LengthBytesEncoder::default()),
        }
    }
    pub fn encode(&mut self, value: &[u8]) {
        match self {
            BytesEncoder::Plain(e) => e.encode(value),
            BytesEncoder::Length(e) => e.encode(value),
        }
    }
    pub fn close(&mut self) {
        match self {
            BytesEncoder::Plain(e) => e.close(),
            BytesEncoder::Length(e) => e.close(),
        }
    }
    pub fn estimate_size(&self) -> u32 {
        match self {
            BytesEncoder::Plain(e) => e.estimate_size(),
            BytesEncoder::Length(e) => e.estimate_size(),
        }
    }
    pub fn dump(&self, out: &mut [u8]) {
        match self {
            BytesEncoder::Plain(e) => e.dump(out),
            BytesEncoder::Length(e) => e.dump(out),
        }
    }
    pub fn tag(&self) -> u8 {
        match self {
            BytesEncoder::Plain(_) => BYTES_TAG_PLAIN,
            BytesEncoder::Length(_) => BYTES_TAG_LENGTH,
        }
    }
}

pub enum BytesDecoder<'a> {
    Plain(PlainBytesDecoder<'a>),
    Length(LengthBytesDecoder<'a>),
}

impl<'a> BytesDecoder<'a> {
    pub fn attach(tag: u8, src: &'a [u8]) -> Result<Self, BlockError> {
        match tag {
            BYTES_TAG_PLAIN => Ok(BytesDecoder::Plain(PlainBytesDecoder::attach(src))),
            BYTES_TAG_LENGTH => Ok(BytesDecoder::Length(LengthBytesDecoder::attach(src))),
            other => Err(corrupt(format!("unrecognized value column enc tag {other}"))),
        }
    }
    pub fn skip(&mut self, n: u32) {
        match self {
            BytesDecoder::Plain(d) => d.skip(n),
            BytesDecoder::Length(d) => d.skip(n),
        }
    }
    pub fn decode(&mut self) -> &'a [u8] {
        match self {
            BytesDecoder::Plain(d) => d.decode(),
            BytesDecoder::Length(d) => d.decode(),
        }
    }
}

// ---- u64 / PLAIN ----

#[derive(Default)]
pub struct PlainU64Encoder {
    buf: Vec<u8>,
}

impl PlainU64Encoder {
    pub fn encode(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }
    pub fn estimate_size(&self) -> u32 {
        self.buf.len() as u32
    }
    pub fn close(&mut self) {}
    pub fn dump(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.buf);
    }
}

pub struct PlainU64Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PlainU64Decoder<'a> {
    pub fn attach(src: &'a [u8]) -> Self {
        PlainU64Decoder { data: src, pos: 0 }
    }
    pub fn skip(&mut self, n: u32) {
        self.pos += 8 * n as usize;
    }
    pub fn decode(&mut self) -> u64 {
        let v = get_u64(self.data, self.pos);
        self.pos += 8;
        v
    }
}

// ---- u32 / PLAIN (catalog completeness; no column uses this directly) ----

#[derive(Default)]
pub struct PlainU32Encoder {
    buf: Vec<u8>,
}

impl PlainU32Encoder {
    pub fn encode(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }
    pub fn estimate_size(&self) -> u32 {
        self.buf.len() as u32
    }
    pub fn close(&mut self) {}
    pub fn dump(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.buf);
    }
}

pub struct PlainU32Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PlainU32Decoder<'a> {
    pub fn attach(src: &'a [u8]) -> Self {
        PlainU32Decoder { data: src, pos: 0 }
    }
    pub fn skip(&mut self, n: u32) {
        self.pos += 4 * n as usize;
    }
    pub fn decode(&mut self) -> u32 {
        let v = get_u32(self.data, self.pos);
        self.pos += 4;
        v
    }
}

// ---- u32 / BITPACK (the key-delta column) ----

#[derive(Default)]
pub struct BitpackU32Encoder {
    values: Vec<u32>,
}

impl BitpackU32Encoder {
    pub fn encode(&mut self, value: u32) {
        self.values.push(value);
    }
    pub fn close(&mut self) {}

    // values are non-decreasing, so the last one is always the max
    fn bit_width(&self) -> u8 {
        bitpack::bit_width(*self.values.last().unwrap_or(&0))
    }

    pub fn estimate_size(&self) -> u32 {
        (1 + bitpack::packed_len(self.values.len(), self.bit_width()) + bitpack::READ_PAD) as u32
    }

    pub fn dump(&self, out: &mut [u8]) {
        let bw = self.bit_width();
        out[0] = bw;
        let core = bitpack::packed_len(self.values.len(), bw);
        bitpack::pack(&self.values, bw, &mut out[1..1 + core]);
    }
}

pub struct BitpackU32Decoder<'a> {
    data: &'a [u8],
    bit_width: u8,
    logical_index: u32,
    cached_group: Option<u32>,
    cache: [u32; 8],
}

impl<'a> BitpackU32Decoder<'a> {
    pub fn attach(src: &'a [u8]) -> Self {
        let bit_width = src[0];
        BitpackU32Decoder {
            data: &src[1..],
            bit_width,
            logical_index: 0,
            cached_group: None,
            cache: [0; 8],
        }
    }

    // for Section::find's direct binary search, skipping sequential decode
    pub fn packed(&self) -> (&'a [u8], u8) {
        (self.data, self.bit_width)
    }

    pub fn skip(&mut self, n: u32) {
        self.logical_index += n;
    }

    pub fn decode(&mut self) -> u32 {
        let group = self.logical_index / 8;
        if self.cached_group != Some(group) {
            self.cache = bitpack::unpack_group_of_8(self.data, group, self.bit_width);
            self.cached_group = Some(group);
        }
        let v = self.cache[(self.logical_index % 8) as usize];
        self.logical_index += 1;
        v
    }
}

// ---- u8 / PLAIN ----

#[derive(Default)]
pub struct PlainU8Encoder {
    buf: Vec<u8>,
}

impl PlainU8Encoder {
    pub fn encode(&mut self, value: u8) {
        self.buf.push(value);
    }
    pub fn estimate_size(&self) -> u32 {
        self.buf.len() as u32
    }
    pub fn close(&mut self) {}
    pub fn dump(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.buf);
    }
}

pub struct PlainU8Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PlainU8Decoder<'a> {
    pub fn attach(src: &'a [u8]) -> Self {
        PlainU8Decoder { data: src, pos: 0 }
    }
    pub fn skip(&mut self, n: u32) {
        self.pos += n as usize;
    }
    pub fn decode(&mut self) -> u8 {
        let v = self.data[self.pos];
        self.pos += 1;
        v
    }
}

// ---- u8 / RUNLENGTH (fixed u32 counts) ----

#[derive(Default)]
pub struct RunLengthU8Encoder {
    buf: Vec<u8>,
    pending: Option<(u8, u32)>,
}

impl RunLengthU8Encoder {
    fn flush(&mut self, value: u8, count: u32) {
        self.buf.push(value);
        self.buf.extend_from_slice(&count.to_le_bytes());
    }

    pub fn encode(&mut self, value: u8) {
        match self.pending {
            Some((v, c)) if v == value => self.pending = Some((v, c + 1)),
            Some((v, c)) => {
                self.flush(v, c);
                self.pending = Some((value, 1));
            }
            None => self.pending = Some((value, 1)),
        }
    }

    pub fn close(&mut self) {
        if let Some((v, c)) = self.pending.take() {
            self.flush(v, c);
        }
    }

    pub fn estimate_size(&self) -> u32 {
        let pending_len = if self.pending.is_some() { 5 } else { 0 };
        (self.buf.len() + pending_len) as u32
    }

    pub fn dump(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.buf);
    }
}

pub struct RunLengthU8Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    value: u8,
    remaining: u32,
}

impl<'a> RunLengthU8Decoder<'a> {
    fn load_next_run(&mut self) {
        if self.pos < self.data.len() {
            self.value = self.data[self.pos];
            self.pos += 1;
            self.remaining = get_u32(self.data, self.pos);
            self.pos += 4;
        }
    }

    pub fn attach(src: &'a [u8]) -> Self {
        let mut d = RunLengthU8Decoder { data: src, pos: 0, value: 0, remaining: 0 };
        d.load_next_run();
        d
    }

    pub fn skip(&mut self, n: u32) {
        let mut remain = n;
        while remain > 0 {
            if remain < self.remaining {
                self.remaining -= remain;
                remain = 0;
            } else {
                remain -= self.remaining;
                self.load_next_run();
            }
        }
    }

    pub fn decode(&mut self) -> u8 {
        let v = self.value;
        self.remaining -= 1;
        if self.remaining == 0 {
            self.load_next_run();
        }
        v
    }
}

// ---- u8 / RUNLENGTH-VARINT ----

#[derive(Default)]
pub struct RunLengthVarintU8Encoder {
    buf: Vec<u8>,
    pending: Option<(u8, u32)>,
}

impl RunLengthVarintU8Encoder {
    fn flush(&mut self, value: u8, count: u32) {
        self.buf.push(value);
        varint::write_u32(&mut self.buf, count);
    }

    pub fn encode(&mut self, value: u8) {
        match self.pending {
            Some((v, c)) if v == value => self.pending = Some((v, c + 1)),
            Some((v, c)) => {
                self.flush(v, c);
                self.pending = Some((value, 1));
            }
            None => self.pending = Some((value, 1)),
        }
    }

    pub fn close(&mut self) {
        if let Some((v, c)) = self.pending.take() {
            self.flush(v, c);
        }
    }

    pub fn estimate_size(&self) -> u32 {
        let pending_len = match self.pending {
            Some((_, c)) => 1 + varint::encoded_len_u32(c),
            None => 0,
        };
        (self.buf.len() + pending_len) as u32
    }

    pub fn dump(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.buf);
    }
}

pub struct RunLengthVarintU8Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    value: u8,
    remaining: u32,
}

impl<'a> RunLengthVarintU8Decoder<'a> {
    fn load_next_run(&mut self) {
        if self.pos < self.data.len() {
            self.value = self.data[self.pos];
            self.pos += 1;
            self.remaining = varint::read_u32(self.data, &mut self.pos);
        }
    }

    pub fn attach(src: &'a [u8]) -> Self {
        let mut d = RunLengthVarintU8Decoder { data: src, pos: 0, value: 0, remaining: 0 };
        d.load_next_run();
        d
    }

    pub fn skip(&mut self, n: u32) {
        let mut remain = n;
        while remain > 0 {
            if remain < self.remaining {
                self.remaining -= remain;
                remain = 0;
            } else {
                remain -= self.remaining;
                self.load_next_run();
            }
        }
    }

    pub fn decode(&mut self) -> u8 {
        let v = self.value;
        self.remaining -= 1;
        if self.remaining == 0 {
            self.load_next_run();
        }
        v
    }
}
