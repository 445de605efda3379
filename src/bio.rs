//! Bit-level I/O over 32-bit little-endian words.
//!
//! Bits are packed starting from the least significant bit of each word. The
//! writer always owns the write direction and the reader the read direction;
//! one buffer is never shared between both.

/// Word served once the reader runs off the end of its input.
pub const SENTINEL: u32 = 0x8000_0000;

const WORD_BITS: u32 = 32;

#[inline]
fn low_bits(value: u32, n: u32) -> u32 {
    if n >= WORD_BITS {
        value
    } else {
        value & ((1u32 << n) - 1)
    }
}

/// Length in bits of the Golomb-Rice code of `n` with parameter `k`.
#[inline]
pub fn sizeof_golomb_rice(k: u32, n: u32) -> u64 {
    u64::from(n.checked_shr(k).unwrap_or(0)) + 1 + u64::from(k)
}

/// Packs bits into a growing word buffer.
#[derive(Debug, Default)]
pub struct BitWriter {
    words: Vec<u32>,
    buffer: u32,
    count: u32,
}

impl BitWriter {
    /// Empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    fn flush_buffer(&mut self) {
        self.words.push(self.buffer);
        self.buffer = 0;
        self.count = 0;
    }

    /// Number of bits written so far.
    pub fn bits_written(&self) -> u64 {
        self.words.len() as u64 * u64::from(WORD_BITS) + u64::from(self.count)
    }

    /// Writes the low `n` bits of `value`, `n <= 32`.
    pub fn write_bits(&mut self, mut value: u32, mut n: u32) {
        assert!(n <= WORD_BITS, "cannot write more than 32 bits at once");

        // at most two words are touched
        while n > 0 {
            let m = (WORD_BITS - self.count).min(n);
            self.buffer |= low_bits(value, m) << self.count;
            self.count += m;
            if self.count == WORD_BITS {
                self.flush_buffer();
            }
            value = value.checked_shr(m).unwrap_or(0);
            n -= m;
        }
    }

    fn write_zero_bits(&mut self, mut n: u64) {
        while n > 0 {
            let m = u64::from(WORD_BITS - self.count).min(n) as u32;
            self.count += m;
            if self.count == WORD_BITS {
                self.flush_buffer();
            }
            n -= u64::from(m);
        }
    }

    /// Writes `n` copies of `bit`.
    pub fn write_run(&mut self, bit: bool, mut n: u64) {
        if !bit {
            self.write_zero_bits(n);
            return;
        }
        while n > 0 {
            let m = n.min(u64::from(WORD_BITS)) as u32;
            self.write_bits(u32::MAX, m);
            n -= u64::from(m);
        }
    }

    /// Writes a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(u32::from(bit), 1);
    }

    /// `q` zero bits followed by a terminating one bit.
    pub fn write_unary(&mut self, q: u32) {
        self.write_zero_bits(u64::from(q));
        self.write_bit(true);
    }

    /// Golomb-Rice code of `n` with parameter `k`: unary quotient, then the
    /// `k` low bits of `n`.
    pub fn write_golomb_rice(&mut self, k: u32, n: u32) {
        assert!(k <= WORD_BITS, "Golomb-Rice parameter out of range");
        self.write_unary(n.checked_shr(k).unwrap_or(0));
        self.write_bits(n, k);
    }

    /// Flushes the partial word and returns the bytes. The last word is
    /// trimmed to the bytes that actually carry bits.
    pub fn finish(mut self) -> Vec<u8> {
        let tail = self.count.div_ceil(8) as usize;
        let partial = (self.count > 0).then_some(self.buffer);

        let mut out = Vec::with_capacity(self.words.len() * 4 + tail);
        for word in self.words.drain(..) {
            out.extend_from_slice(&word.to_le_bytes());
        }
        if let Some(word) = partial {
            out.extend_from_slice(&word.to_le_bytes()[..tail]);
        }
        out
    }
}

/// Reads bits back in the order a [`BitWriter`] wrote them.
#[derive(Debug)]
pub struct BitReader {
    words: Vec<u32>,
    pos: usize,
    buffer: u32,
    count: u32,
    overrun: usize,
}

impl BitReader {
    /// Reader over `bytes`; a trailing partial word is zero-padded.
    pub fn new(bytes: &[u8]) -> Self {
        let words = bytes
            .chunks(4)
            .map(|chunk| {
                let mut word = [0u8; 4];
                word[..chunk.len()].copy_from_slice(chunk);
                u32::from_le_bytes(word)
            })
            .collect();
        Self {
            words,
            pos: 0,
            buffer: 0,
            count: WORD_BITS,
            overrun: 0,
        }
    }

    fn reload_buffer(&mut self) {
        match self.words.get(self.pos) {
            Some(&word) => {
                self.buffer = word;
                self.pos += 1;
            }
            None => {
                self.buffer = SENTINEL;
                self.overrun += 1;
            }
        }
        self.count = 0;
    }

    /// Sentinel words served so far.
    pub fn overrun(&self) -> usize {
        self.overrun
    }

    /// Reads `n <= 32` bits.
    pub fn read_bits(&mut self, n: u32) -> u32 {
        assert!(n <= WORD_BITS, "cannot read more than 32 bits at once");
        if n == 0 {
            return 0;
        }
        if self.count == WORD_BITS {
            self.reload_buffer();
        }

        // least-significant part from what is left in the buffer
        let s = (WORD_BITS - self.count).min(n);
        let mut w = low_bits(self.buffer, s);
        self.buffer = self.buffer.checked_shr(s).unwrap_or(0);
        self.count += s;

        let rest = n - s;
        if rest > 0 {
            self.reload_buffer();
            w |= low_bits(self.buffer, rest) << s;
            self.buffer = self.buffer.checked_shr(rest).unwrap_or(0);
            self.count += rest;
        }
        w
    }

    /// Reads a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> u32 {
        self.read_bits(1)
    }

    /// Counts zero bits up to and including the terminating one bit.
    pub fn read_unary(&mut self) -> u32 {
        let mut zeros = 0u32;
        loop {
            if self.count == WORD_BITS {
                self.reload_buffer();
            }
            let s = (WORD_BITS - self.count).min(self.buffer.trailing_zeros());
            self.buffer = self.buffer.checked_shr(s).unwrap_or(0);
            self.count += s;
            zeros = zeros.saturating_add(s);
            if self.count < WORD_BITS {
                break;
            }
        }
        // drop the terminator
        self.buffer >>= 1;
        self.count += 1;
        zeros
    }

    /// Inverse of [`BitWriter::write_golomb_rice`].
    pub fn read_golomb_rice(&mut self, k: u32) -> u32 {
        assert!(k <= WORD_BITS, "Golomb-Rice parameter out of range");
        let q = self.read_unary();
        q.checked_shl(k).unwrap_or(0) | self.read_bits(k)
    }
}
