//! MurmurHash3 (x86_32, x86_128, x64_128) with one-shot and streaming front ends.
//!
//! Blocks are always decoded as little-endian words, so digests are identical on every
//! host regardless of its native byte order. The streaming hashers keep partial blocks
//! between calls to `update`, which makes any chunking of an input produce the same
//! digest as hashing it in one piece.

const C1_X86_32: u32 = 0xcc9e_2d51;
const C2_X86_32: u32 = 0x1b87_3593;

const C1_X86_128: u32 = 0x239b_961b;
const C2_X86_128: u32 = 0xab0e_9789;
const C3_X86_128: u32 = 0x38b3_4ae5;
const C4_X86_128: u32 = 0xa1e3_8b93;

const C1_X64_128: u64 = 0x87c3_7b91_1142_53d5;
const C2_X64_128: u64 = 0x4cf5_ad43_2745_937f;

#[inline]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

#[inline]
fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

/// Little-endian accumulation of up to 4 tail bytes.
#[inline]
fn tail_u32(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .enumerate()
        .fold(0u32, |k, (i, &b)| k ^ (u32::from(b) << (8 * i)))
}

/// Little-endian accumulation of up to 8 tail bytes.
#[inline]
fn tail_u64(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .enumerate()
        .fold(0u64, |k, (i, &b)| k ^ (u64::from(b) << (8 * i)))
}

#[inline]
fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[inline]
fn le_u64(bytes: &[u8]) -> u64 {
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Holds an incomplete block between `update` calls.
#[derive(Debug, Clone)]
struct BlockBuffer<const N: usize> {
    buf: [u8; N],
    filled: usize,
    total: u64,
}

impl<const N: usize> BlockBuffer<N> {
    fn new() -> Self {
        Self {
            buf: [0u8; N],
            filled: 0,
            total: 0,
        }
    }

    fn feed(&mut self, mut data: &[u8], mut process: impl FnMut(&[u8])) {
        self.total += data.len() as u64;

        if self.filled > 0 {
            let take = (N - self.filled).min(data.len());
            self.buf[self.filled..self.filled + take].copy_from_slice(&data[..take]);
            self.filled += take;
            data = &data[take..];
            if self.filled < N {
                return;
            }
            process(&self.buf);
            self.filled = 0;
        }

        let mut blocks = data.chunks_exact(N);
        for block in &mut blocks {
            process(block);
        }

        let rest = blocks.remainder();
        self.buf[..rest.len()].copy_from_slice(rest);
        self.filled = rest.len();
    }

    fn tail(&self) -> &[u8] {
        &self.buf[..self.filled]
    }
}

#[derive(Debug, Clone)]
struct StateX86_32 {
    h1: u32,
}

impl StateX86_32 {
    #[inline]
    fn mix_k1(k1: u32) -> u32 {
        k1.wrapping_mul(C1_X86_32)
            .rotate_left(15)
            .wrapping_mul(C2_X86_32)
    }

    fn block(&mut self, block: &[u8]) {
        self.h1 ^= Self::mix_k1(le_u32(block));
        self.h1 = self.h1.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    fn finish(mut self, tail: &[u8], len: u64) -> u32 {
        if !tail.is_empty() {
            self.h1 ^= Self::mix_k1(tail_u32(tail));
        }
        self.h1 ^= len as u32;
        fmix32(self.h1)
    }
}

#[derive(Debug, Clone)]
struct StateX86_128 {
    h: [u32; 4],
}

impl StateX86_128 {
    #[inline]
    fn mix_lane(lane: usize, k: u32) -> u32 {
        match lane {
            0 => k.wrapping_mul(C1_X86_128).rotate_left(15).wrapping_mul(C2_X86_128),
            1 => k.wrapping_mul(C2_X86_128).rotate_left(16).wrapping_mul(C3_X86_128),
            2 => k.wrapping_mul(C3_X86_128).rotate_left(17).wrapping_mul(C4_X86_128),
            _ => k.wrapping_mul(C4_X86_128).rotate_left(18).wrapping_mul(C1_X86_128),
        }
    }

    fn block(&mut self, block: &[u8]) {
        let [mut h1, mut h2, mut h3, mut h4] = self.h;

        h1 ^= Self::mix_lane(0, le_u32(&block[0..4]));
        h1 = h1.rotate_left(19).wrapping_add(h2);
        h1 = h1.wrapping_mul(5).wrapping_add(0x561c_cd1b);

        h2 ^= Self::mix_lane(1, le_u32(&block[4..8]));
        h2 = h2.rotate_left(17).wrapping_add(h3);
        h2 = h2.wrapping_mul(5).wrapping_add(0x0bca_a747);

        h3 ^= Self::mix_lane(2, le_u32(&block[8..12]));
        h3 = h3.rotate_left(15).wrapping_add(h4);
        h3 = h3.wrapping_mul(5).wrapping_add(0x96cd_1c35);

        h4 ^= Self::mix_lane(3, le_u32(&block[12..16]));
        h4 = h4.rotate_left(13).wrapping_add(h1);
        h4 = h4.wrapping_mul(5).wrapping_add(0x32ac_3b17);

        self.h = [h1, h2, h3, h4];
    }

    fn finish(mut self, tail: &[u8], len: u64) -> u128 {
        for (lane, chunk) in tail.chunks(4).enumerate() {
            self.h[lane] ^= Self::mix_lane(lane, tail_u32(chunk));
        }

        let len = len as u32;
        let [mut h1, mut h2, mut h3, mut h4] = self.h.map(|h| h ^ len);

        h1 = h1.wrapping_add(h2).wrapping_add(h3).wrapping_add(h4);
        h2 = h2.wrapping_add(h1);
        h3 = h3.wrapping_add(h1);
        h4 = h4.wrapping_add(h1);

        h1 = fmix32(h1);
        h2 = fmix32(h2);
        h3 = fmix32(h3);
        h4 = fmix32(h4);

        h1 = h1.wrapping_add(h2).wrapping_add(h3).wrapping_add(h4);
        h2 = h2.wrapping_add(h1);
        h3 = h3.wrapping_add(h1);
        h4 = h4.wrapping_add(h1);

        u128::from(h1) | u128::from(h2) << 32 | u128::from(h3) << 64 | u128::from(h4) << 96
    }
}

#[derive(Debug, Clone)]
struct StateX64_128 {
    h1: u64,
    h2: u64,
}

impl StateX64_128 {
    #[inline]
    fn mix_k1(k1: u64) -> u64 {
        k1.wrapping_mul(C1_X64_128)
            .rotate_left(31)
            .wrapping_mul(C2_X64_128)
    }

    #[inline]
    fn mix_k2(k2: u64) -> u64 {
        k2.wrapping_mul(C2_X64_128)
            .rotate_left(33)
            .wrapping_mul(C1_X64_128)
    }

    fn block(&mut self, block: &[u8]) {
        self.h1 ^= Self::mix_k1(le_u64(&block[0..8]));
        self.h1 = self.h1.rotate_left(27).wrapping_add(self.h2);
        self.h1 = self.h1.wrapping_mul(5).wrapping_add(0x52dc_e729);

        self.h2 ^= Self::mix_k2(le_u64(&block[8..16]));
        self.h2 = self.h2.rotate_left(31).wrapping_add(self.h1);
        self.h2 = self.h2.wrapping_mul(5).wrapping_add(0x3849_5ab5);
    }

    fn finish(mut self, tail: &[u8], len: u64) -> u128 {
        if tail.len() > 8 {
            self.h2 ^= Self::mix_k2(tail_u64(&tail[8..]));
        }
        if !tail.is_empty() {
            self.h1 ^= Self::mix_k1(tail_u64(&tail[..tail.len().min(8)]));
        }

        let mut h1 = self.h1 ^ len;
        let mut h2 = self.h2 ^ len;

        h1 = h1.wrapping_add(h2);
        h2 = h2.wrapping_add(h1);

        h1 = fmix64(h1);
        h2 = fmix64(h2);

        h1 = h1.wrapping_add(h2);
        h2 = h2.wrapping_add(h1);

        u128::from(h1) | u128::from(h2) << 64
    }
}

/// Streaming MurmurHash3 x86 32-bit.
#[derive(Debug, Clone)]
pub struct Murmur3x86_32 {
    state: StateX86_32,
    pending: BlockBuffer<4>,
}

impl Murmur3x86_32 {
    pub fn new(seed: u32) -> Self {
        Self {
            state: StateX86_32 { h1: seed },
            pending: BlockBuffer::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        let state = &mut self.state;
        self.pending.feed(data, |block| state.block(block));
    }

    pub fn finish(self) -> u32 {
        let tail = self.pending.tail();
        self.state.finish(tail, self.pending.total)
    }
}

/// Streaming MurmurHash3 x86 128-bit. The digest packs `h1` into the low 32 bits.
#[derive(Debug, Clone)]
pub struct Murmur3x86_128 {
    state: StateX86_128,
    pending: BlockBuffer<16>,
}

impl Murmur3x86_128 {
    pub fn new(seed: u32) -> Self {
        Self {
            state: StateX86_128 { h: [seed; 4] },
            pending: BlockBuffer::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        let state = &mut self.state;
        self.pending.feed(data, |block| state.block(block));
    }

    pub fn finish(self) -> u128 {
        let tail = self.pending.tail();
        self.state.finish(tail, self.pending.total)
    }
}

/// Streaming MurmurHash3 x64 128-bit. The digest packs `h1` into the low 64 bits.
#[derive(Debug, Clone)]
pub struct Murmur3x64_128 {
    state: StateX64_128,
    pending: BlockBuffer<16>,
}

impl Murmur3x64_128 {
    pub fn new(seed: u32) -> Self {
        let seed = u64::from(seed);
        Self {
            state: StateX64_128 { h1: seed, h2: seed },
            pending: BlockBuffer::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        let state = &mut self.state;
        self.pending.feed(data, |block| state.block(block));
    }

    pub fn finish(self) -> u128 {
        let tail = self.pending.tail();
        self.state.finish(tail, self.pending.total)
    }
}

pub fn murmur3_x86_32(data: &[u8], seed: u32) -> u32 {
    let mut hasher = Murmur3x86_32::new(seed);
    hasher.update(data);
    hasher.finish()
}

pub fn murmur3_x86_128(data: &[u8], seed: u32) -> u128 {
    let mut hasher = Murmur3x86_128::new(seed);
    hasher.update(data);
    hasher.finish()
}

pub fn murmur3_x64_128(data: &[u8], seed: u32) -> u128 {
    let mut hasher = Murmur3x64_128::new(seed);
    hasher.update(data);
    hasher.finish()
}

/// Renders an x86_128 digest as its four 32-bit words, `h1` first.
pub fn x86_128_hex(digest: u128) -> String {
    format!(
        "{:08x}{:08x}{:08x}{:08x}",
        digest as u32,
        (digest >> 32) as u32,
        (digest >> 64) as u32,
        (digest >> 96) as u32
    )
}

/// Renders an x64_128 digest as its two 64-bit words, `h1` first.
pub fn x64_128_hex(digest: u128) -> String {
    format!("{:016x}{:016x}", digest as u64, (digest >> 64) as u64)
}
