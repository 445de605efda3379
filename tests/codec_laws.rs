//! Property tests for the coding primitives.

use proptest::prelude::*;

use x3_core::arith::{ArithmeticDecoder, ArithmeticEncoder, MAX_RANGE};
use x3_core::bio::{BitReader, BitWriter, sizeof_golomb_rice};
use x3_core::dict::{Dictionary, MAX_MATCH_LEN};
use x3_core::golomb::{GolombRiceModel, optimal_k};
use x3_core::model::FrequencyModel;

/// A value together with a width it fits in.
fn field() -> impl Strategy<Value = (u32, u32)> {
    (0u32..=32).prop_flat_map(|n| {
        let max = if n == 32 { u32::MAX } else { (1u32 << n) - 1 };
        (0..=max, Just(n))
    })
}

#[derive(Debug, Clone)]
enum ModelOp {
    Increment(usize),
    Enlarge,
}

fn model_ops() -> impl Strategy<Value = Vec<ModelOp>> {
    prop::collection::vec(
        prop_oneof![
            3 => any::<usize>().prop_map(ModelOp::Increment),
            1 => Just(ModelOp::Enlarge),
        ],
        0..300,
    )
}

proptest! {
    #[test]
    fn prop_bits_round_trip(fields in prop::collection::vec(field(), 0..200)) {
        let mut w = BitWriter::new();
        for &(v, n) in &fields {
            w.write_bits(v, n);
        }
        let total: u64 = fields.iter().map(|&(_, n)| u64::from(n)).sum();
        prop_assert_eq!(w.bits_written(), total);

        let bytes = w.finish();
        prop_assert_eq!(bytes.len() as u64, total.div_ceil(8));

        let mut r = BitReader::new(&bytes);
        for &(v, n) in &fields {
            prop_assert_eq!(r.read_bits(n), v);
        }
    }

    #[test]
    fn prop_golomb_rice_round_trip(
        codes in prop::collection::vec((0u32..=31, 0u32..64, any::<u32>()), 1..100)
    ) {
        // short quotients keep the unary part small
        let codes: Vec<(u32, u32)> = codes
            .into_iter()
            .map(|(k, q, low)| {
                let rem = if k == 0 { 0 } else { low & ((1u32 << k) - 1) };
                (k, q.wrapping_shl(k) | rem)
            })
            .collect();

        let mut w = BitWriter::new();
        let mut expected = 0u64;
        for &(k, n) in &codes {
            let before = w.bits_written();
            w.write_golomb_rice(k, n);
            prop_assert_eq!(w.bits_written() - before, sizeof_golomb_rice(k, n));
            expected += sizeof_golomb_rice(k, n);
        }
        prop_assert_eq!(w.bits_written(), expected);

        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        for &(k, n) in &codes {
            prop_assert_eq!(r.read_golomb_rice(k), n);
        }
    }

    #[test]
    fn prop_frequency_model_prefix_sums(initial in 0usize..40, ops in model_ops()) {
        let mut m = FrequencyModel::new(initial);
        for op in ops {
            match op {
                ModelOp::Increment(s) if !m.is_empty() => m.increment(s % m.len()),
                ModelOp::Increment(_) => {}
                ModelOp::Enlarge => m.enlarge(),
            }
        }
        let mut cum = 0u32;
        for (i, s) in m.symbols().iter().enumerate() {
            prop_assert_eq!(s.id, i);
            prop_assert_eq!(s.cum_freq, cum);
            prop_assert!(s.freq >= 1);
            cum += s.freq;
        }
        prop_assert_eq!(m.total(), cum);
    }

    #[test]
    fn prop_recalc_k_is_a_floor(values in prop::collection::vec(0u64..100_000, 0..600)) {
        let mut gr = GolombRiceModel::new(0);
        for v in values {
            gr.update_model(v);
            let (sum, count) = (gr.sum(), gr.count());
            let k = gr.recalc_k();
            prop_assert_eq!(k, optimal_k(sum, count));
            if count > 0 {
                prop_assert!(count << k <= sum || k == 0);
                prop_assert!(count << (k + 1) > sum);
            }
        }
    }

    #[test]
    fn prop_tags_are_stable(
        strings in prop::collection::hash_set(prop::collection::vec(any::<u8>(), 1..=MAX_MATCH_LEN), 1..60),
        touches in prop::collection::vec(any::<usize>(), 0..200),
    ) {
        let strings: Vec<Vec<u8>> = strings.into_iter().collect();
        let mut d = Dictionary::new();
        for (i, s) in strings.iter().enumerate() {
            prop_assert_eq!(d.insert(s, i), i);
        }
        let mut cursor = strings.len();
        for t in touches {
            let tag = t % strings.len();
            d.touch(tag, cursor);
            cursor += 1 + t % 7;
            d.update_costs(cursor);

            for (tag, s) in strings.iter().enumerate() {
                let e = d.get(tag);
                prop_assert_eq!(e.tag(), tag);
                prop_assert_eq!(e.bytes(), &s[..]);
                prop_assert_eq!(d.tag_at(d.position_of(tag)), Some(tag));
            }
        }
        let costs: Vec<usize> = d.entries().iter().map(|e| e.cost()).collect();
        prop_assert!(costs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn prop_arithmetic_interval_never_collapses(
        alphabet in 1usize..300,
        message in prop::collection::vec(any::<usize>(), 0..1500),
    ) {
        let message: Vec<usize> = message.into_iter().map(|s| s % alphabet).collect();

        let mut model = FrequencyModel::new(alphabet);
        let mut enc = ArithmeticEncoder::new();
        for &s in &message {
            enc.encode_symbol(&model, s);
            model.increment(s);
            let (low, high) = enc.interval();
            prop_assert!(low < high && high <= MAX_RANGE);
            prop_assert!(high - low + 1 >= model.total());
        }
        let bytes = enc.finish();

        let mut model = FrequencyModel::new(alphabet);
        let mut dec = ArithmeticDecoder::new(&bytes);
        for &s in &message {
            prop_assert_eq!(dec.decode_symbol(&model).ok(), Some(s));
            model.increment(s);
            let (low, high) = dec.interval();
            prop_assert!(low < high && high <= MAX_RANGE);
        }
    }
}
