//! Entropy backends the engine can be instantiated with.
//!
//! The engine only ever talks to a backend through three things: a [`Model`]
//! per coded stream, an encoder that writes a symbol under a model and a
//! decoder that reads one back. Model updates are driven by the engine so that
//! both directions mutate state at exactly the same points.

use std::fmt;

use crate::{X3Error, X3Result};
use crate::arith::{ArithmeticDecoder, ArithmeticEncoder};
use crate::bio::{BitReader, BitWriter};
use crate::dict::{MATCH_LOG_SIZE, MAX_MATCH_LEN};
use crate::golomb::GolombRiceModel;
use crate::model::FrequencyModel;

/// The streams a compressed file is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// Event selector.
    Event,
    /// `length - 1` of a literal run.
    Length,
    /// Literal bytes.
    Literal,
    /// Rank of a tag inside a context.
    Rank,
    /// Position in the cost-sorted dictionary.
    Index,
    /// Distance from the previous dictionary position.
    Delta,
}

/// Adaptive statistics for one integer stream.
pub trait Model: Clone + fmt::Debug {
    /// Bits `symbol` would take right now.
    fn cost(&self, symbol: usize) -> f64;
    /// Accounts for `symbol` having been coded.
    fn update(&mut self, symbol: usize);
    /// Grows the alphabet by one symbol.
    fn enlarge(&mut self);
}

/// Writes symbols.
pub trait SymbolEncoder<M> {
    /// Codes `symbol` under `model`.
    fn encode(&mut self, model: &M, symbol: usize);
    /// Terminates the stream.
    fn finish(self) -> Vec<u8>;
}

/// Reads symbols back.
pub trait SymbolDecoder<M> {
    /// Decodes the next symbol under `model`.
    fn decode(&mut self, model: &M) -> X3Result<usize>;
    /// Words read past the end of the input.
    fn overrun(&self) -> usize;
}

/// A complete coding scheme.
pub trait Backend {
    /// Per-stream statistics.
    type Model: Model;
    /// Encoding side.
    type Encoder: SymbolEncoder<Self::Model>;
    /// Decoding side.
    type Decoder: SymbolDecoder<Self::Model>;

    /// Short name for logs.
    const NAME: &'static str;

    /// Fresh model for `stream` over `alphabet` symbols.
    fn model(stream: Stream, alphabet: usize) -> Self::Model;
    /// Fresh encoder.
    fn encoder() -> Self::Encoder;
    /// Decoder over `input`.
    fn decoder(input: &[u8]) -> Self::Decoder;
}

impl Model for FrequencyModel {
    fn cost(&self, symbol: usize) -> f64 {
        FrequencyModel::cost(self, symbol)
    }

    fn update(&mut self, symbol: usize) {
        self.increment(symbol);
    }

    fn enlarge(&mut self) {
        FrequencyModel::enlarge(self);
    }
}

impl SymbolEncoder<FrequencyModel> for ArithmeticEncoder {
    fn encode(&mut self, model: &FrequencyModel, symbol: usize) {
        self.encode_symbol(model, symbol);
    }

    fn finish(self) -> Vec<u8> {
        ArithmeticEncoder::finish(self)
    }
}

impl SymbolDecoder<FrequencyModel> for ArithmeticDecoder {
    fn decode(&mut self, model: &FrequencyModel) -> X3Result<usize> {
        self.decode_symbol(model)
    }

    fn overrun(&self) -> usize {
        ArithmeticDecoder::overrun(self)
    }
}

/// Rank of each event selector symbol, cheapest first: ctx1, ctx0, index,
/// ctx2, index delta, literal, ctx3, eof. Indexed by symbol.
pub const SELECTOR_RANKS: [u32; 8] = [1, 0, 3, 6, 2, 4, 5, 7];

/// Initial selector frequencies, halving with each rank down to 1.
fn selector_frequencies() -> [u32; 8] {
    SELECTOR_RANKS.map(|rank| 1 << 5u32.saturating_sub(rank))
}

/// Every stream arithmetic coded against an adaptive frequency table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Arithmetic;

impl Backend for Arithmetic {
    type Model = FrequencyModel;
    type Encoder = ArithmeticEncoder;
    type Decoder = ArithmeticDecoder;

    const NAME: &'static str = "arithmetic";

    fn model(stream: Stream, alphabet: usize) -> FrequencyModel {
        match stream {
            Stream::Event => {
                debug_assert_eq!(alphabet, SELECTOR_RANKS.len());
                FrequencyModel::with_frequencies(&selector_frequencies())
            }
            _ => FrequencyModel::new(alphabet),
        }
    }

    fn encoder() -> ArithmeticEncoder {
        ArithmeticEncoder::new()
    }

    fn decoder(input: &[u8]) -> ArithmeticDecoder {
        ArithmeticDecoder::new(input)
    }
}

impl Model for GolombRiceModel {
    fn cost(&self, symbol: usize) -> f64 {
        self.sizeof(self.code_of(symbol)) as f64
    }

    fn update(&mut self, symbol: usize) {
        self.update_model(symbol as u64);
    }

    fn enlarge(&mut self) {}
}

impl SymbolEncoder<GolombRiceModel> for BitWriter {
    fn encode(&mut self, model: &GolombRiceModel, symbol: usize) {
        assert!(symbol <= u32::MAX as usize, "Golomb-Rice symbols are 32-bit");
        self.write_golomb_rice(model.parameter(), model.code_of(symbol));
    }

    fn finish(self) -> Vec<u8> {
        BitWriter::finish(self)
    }
}

impl SymbolDecoder<GolombRiceModel> for BitReader {
    fn decode(&mut self, model: &GolombRiceModel) -> X3Result<usize> {
        let code = self.read_golomb_rice(model.parameter());
        model.symbol_of(code).ok_or(X3Error::CorruptData)
    }

    fn overrun(&self) -> usize {
        BitReader::overrun(self)
    }
}

/// Every stream written as raw Golomb-Rice codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rice;

/// Initial parameter of the dictionary index stream.
const INDEX_K: u32 = 6;

impl Backend for Rice {
    type Model = GolombRiceModel;
    type Encoder = BitWriter;
    type Decoder = BitReader;

    const NAME: &'static str = "golomb-rice";

    fn model(stream: Stream, alphabet: usize) -> GolombRiceModel {
        match stream {
            Stream::Length => {
                debug_assert_eq!(1 << MATCH_LOG_SIZE, MAX_MATCH_LEN);
                GolombRiceModel::fixed(MATCH_LOG_SIZE)
            }
            Stream::Literal => GolombRiceModel::fixed(8),
            Stream::Event => {
                debug_assert_eq!(alphabet, SELECTOR_RANKS.len());
                GolombRiceModel::ranked(&SELECTOR_RANKS)
            }
            Stream::Index => GolombRiceModel::new(INDEX_K),
            Stream::Rank | Stream::Delta => GolombRiceModel::new(0),
        }
    }

    fn encoder() -> BitWriter {
        BitWriter::new()
    }

    fn decoder(input: &[u8]) -> BitReader {
        BitReader::new(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<B: Backend>(stream: Stream, alphabet: usize, symbols: &[usize]) {
        let mut model = B::model(stream, alphabet);
        let mut enc = B::encoder();
        for &s in symbols {
            enc.encode(&model, s);
            model.update(s);
        }
        let bytes = enc.finish();

        let mut model = B::model(stream, alphabet);
        let mut dec = B::decoder(&bytes);
        for &s in symbols {
            assert_eq!(dec.decode(&model).ok(), Some(s));
            model.update(s);
        }
    }

    #[test]
    fn both_backends_round_trip_every_stream() {
        let symbols: Vec<usize> = (0..600).map(|i| (i * i + 3) % 16).collect();
        let selectors: Vec<usize> = symbols.iter().map(|s| s % 8).collect();
        round_trip::<Arithmetic>(Stream::Event, 8, &selectors);
        round_trip::<Rice>(Stream::Event, 8, &selectors);
        for stream in [
            Stream::Length,
            Stream::Literal,
            Stream::Rank,
            Stream::Index,
            Stream::Delta,
        ] {
            round_trip::<Arithmetic>(stream, 16, &symbols);
            round_trip::<Rice>(stream, 16, &symbols);
        }
    }

    #[test]
    fn rice_index_starts_at_k6() {
        let model = Rice::model(Stream::Index, 0);
        assert_eq!(Model::cost(&model, 0), 7.0);
        assert_eq!(Model::cost(&model, 64), 8.0);
    }

    #[test]
    fn selector_prices_follow_ranks() {
        let rice = Rice::model(Stream::Event, 8);
        let costs: Vec<f64> = (0..8).map(|s| Model::cost(&rice, s)).collect();
        assert_eq!(costs, [2.0, 1.0, 4.0, 7.0, 3.0, 5.0, 6.0, 8.0]);

        let ac = Arithmetic::model(Stream::Event, 8);
        assert_eq!(ac.total(), 65);
        assert!(Model::cost(&ac, 1) < Model::cost(&ac, 0));
        assert!(Model::cost(&ac, 0) < Model::cost(&ac, 4));
        assert!(Model::cost(&ac, 4) < Model::cost(&ac, 2));
        assert_eq!(Model::cost(&ac, 6), Model::cost(&ac, 7));
    }

    #[test]
    fn unknown_selector_is_corrupt() {
        // a unary value past the last rank
        let mut w = BitWriter::new();
        w.write_unary(8);
        let bytes = w.finish();
        let model = Rice::model(Stream::Event, 8);
        let mut r = BitReader::new(&bytes);
        assert!(matches!(r.decode(&model), Err(X3Error::CorruptData)));
    }

    #[test]
    fn rice_literal_is_nine_bits() {
        let model = Rice::model(Stream::Literal, 256);
        assert_eq!(Model::cost(&model, 0), 9.0);
        assert_eq!(Model::cost(&model, 255), 9.0);
    }
}
