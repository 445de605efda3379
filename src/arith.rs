//! 31-bit binary arithmetic coder with E1/E2/E3 renormalization.

use crate::bio::{BitReader, BitWriter};
use crate::model::FrequencyModel;
use crate::{X3Error, X3Result};

/// Top of the coding interval.
pub const MAX_RANGE: u32 = 0x7FFF_FFFF;
const FIRST_QUARTER: u32 = 0x2000_0000;
const HALF: u32 = 0x4000_0000;
const THIRD_QUARTER: u32 = 0x6000_0000;

const PRECISION: u32 = 31;

/// Encoding half of the coder, writing into its own [`BitWriter`].
#[derive(Debug)]
pub struct ArithmeticEncoder {
    low: u32,
    high: u32,
    scale: u64,
    bits: BitWriter,
}

impl Default for ArithmeticEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArithmeticEncoder {
    /// Full interval, empty output.
    pub fn new() -> Self {
        Self {
            low: 0,
            high: MAX_RANGE,
            scale: 0,
            bits: BitWriter::new(),
        }
    }

    /// Current `(low, high)`.
    pub fn interval(&self) -> (u32, u32) {
        (self.low, self.high)
    }

    /// Bits emitted so far, pending scale bits excluded.
    pub fn bits_written(&self) -> u64 {
        self.bits.bits_written()
    }

    fn emit(&mut self, bit: bool) {
        self.bits.write_bit(bit);
        self.bits.write_run(!bit, self.scale);
        self.scale = 0;
    }

    fn rescale(&mut self) {
        // E1/E2
        loop {
            if self.high < HALF {
                self.emit(false);
                self.low <<= 1;
                self.high = (self.high << 1) | 1;
            } else if self.low >= HALF {
                self.emit(true);
                self.low = (self.low - HALF) << 1;
                self.high = ((self.high - HALF) << 1) | 1;
            } else {
                break;
            }
        }

        // E3
        while FIRST_QUARTER <= self.low && self.high < THIRD_QUARTER {
            self.scale += 1;
            self.low = (self.low - FIRST_QUARTER) << 1;
            self.high = ((self.high - FIRST_QUARTER) << 1) | 1;
        }
    }

    /// Narrows the interval to `[low_freq, high_freq)` out of `total`.
    pub fn encode(&mut self, low_freq: u32, high_freq: u32, total: u32) {
        let range = self.high - self.low + 1;
        assert!(total > 0 && total <= range, "total outside the coder range");
        assert!(low_freq < high_freq && high_freq <= total, "empty symbol interval");

        let step = range / total;
        self.high = self.low + step * high_freq - 1;
        self.low += step * low_freq;
        self.rescale();
        debug_assert!(self.low < self.high && self.high <= MAX_RANGE);
    }

    /// Codes `symbol` under `model`; the model itself is not updated.
    pub fn encode_symbol(&mut self, model: &FrequencyModel, symbol: usize) {
        let Some(s) = model.get(symbol) else {
            panic!("symbol {symbol} outside a model of {} symbols", model.len());
        };
        let (low, high) = (s.cum_freq, s.high());
        self.encode(low, high, model.total());
    }

    /// Pins down the final interval and returns the coded bytes.
    pub fn finish(mut self) -> Vec<u8> {
        if self.low < FIRST_QUARTER {
            self.bits.write_bit(false);
            self.bits.write_run(true, self.scale + 1);
        } else {
            self.bits.write_bit(true);
            self.bits.write_run(false, self.scale);
        }
        self.bits.finish()
    }
}

/// Decoding half of the coder.
#[derive(Debug)]
pub struct ArithmeticDecoder {
    low: u32,
    high: u32,
    buffer: u32,
    bits: BitReader,
}

impl ArithmeticDecoder {
    /// Primes the look-ahead buffer with the first 31 bits of `input`.
    pub fn new(input: &[u8]) -> Self {
        let mut bits = BitReader::new(input);
        let mut buffer = 0;
        for _ in 0..PRECISION {
            buffer = (buffer << 1) | bits.read_bit();
        }
        Self {
            low: 0,
            high: MAX_RANGE,
            buffer,
            bits,
        }
    }

    /// Current `(low, high)`.
    pub fn interval(&self) -> (u32, u32) {
        (self.low, self.high)
    }

    /// Sentinel words read past the end of input.
    pub fn overrun(&self) -> usize {
        self.bits.overrun()
    }

    fn shift_in(&mut self, offset: u32) {
        let bit = self.bits.read_bit();
        self.buffer = (self.buffer.wrapping_sub(offset) << 1 | bit) & MAX_RANGE;
    }

    fn rescale(&mut self) {
        loop {
            if self.high < HALF {
                self.low <<= 1;
                self.high = (self.high << 1) | 1;
                self.shift_in(0);
            } else if self.low >= HALF {
                self.low = (self.low - HALF) << 1;
                self.high = ((self.high - HALF) << 1) | 1;
                self.shift_in(HALF);
            } else {
                break;
            }
        }

        while FIRST_QUARTER <= self.low && self.high < THIRD_QUARTER {
            self.low = (self.low - FIRST_QUARTER) << 1;
            self.high = ((self.high - FIRST_QUARTER) << 1) | 1;
            self.shift_in(FIRST_QUARTER);
        }
    }

    /// Width of one frequency unit for a model of `total`.
    fn step(&self, total: u32) -> X3Result<u32> {
        let range = self.high - self.low + 1;
        if total == 0 || total > range {
            return Err(X3Error::CorruptData);
        }
        Ok(range / total)
    }

    /// Which frequency unit the code value falls into.
    pub fn decode_target(&self, step: u32) -> u32 {
        self.buffer.wrapping_sub(self.low) / step
    }

    /// Decodes one symbol under `model`; the model itself is not updated.
    pub fn decode_symbol(&mut self, model: &FrequencyModel) -> X3Result<usize> {
        let total = model.total();
        let step = self.step(total)?;
        let target = self.decode_target(step);
        if target >= total {
            return Err(X3Error::CorruptData);
        }
        let s = *model.find(target).ok_or(X3Error::CorruptData)?;

        self.high = self.low + step * s.high() - 1;
        self.low += step * s.cum_freq;
        self.rescale();
        Ok(s.id)
    }
}
