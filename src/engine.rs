//! The compressor and decompressor loops.
//!
//! At every cursor position the encoder either names a dictionary entry
//! (through whichever context or index coding is cheapest) or emits a literal
//! run that becomes a new entry. The decoder replays the same decisions from
//! the stream. All model mutations go through `Tables::observe_hit` and
//! `Tables::observe_literal`, which both directions call at the same points
//! with the same arguments.

use log::{debug, trace};

use crate::backend::{Arithmetic, Backend, Model, Stream, SymbolDecoder, SymbolEncoder};
use crate::config::Config;
use crate::context::Context;
use crate::dict::{Dictionary, MAX_MATCH_LEN};
use crate::matcher::MatchFinder;
use crate::tag_pair::TagPairIndex;
use crate::{X3Error, X3Result};

/// Contexts keyed by the last two literal bytes.
const CTX2_SIZE: usize = 1 << 16;
/// Contexts keyed by the last literal byte.
const CTX3_SIZE: usize = 1 << 8;

/// A decoder that has read this many words past the end never saw `Eof`.
const MAX_OVERRUN_WORDS: usize = 4;

/// What one step of the stream says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Rank in the context of the previous two tags.
    Ctx0 = 0,
    /// Rank in the context of the previous tag.
    Ctx1 = 1,
    /// Rank in the context of the last two bytes.
    Ctx2 = 2,
    /// Rank in the context of the last byte.
    Ctx3 = 3,
    /// Position in the dictionary.
    Index = 4,
    /// Position relative to the previous hit.
    IndexDelta = 5,
    /// New literal run.
    Literal = 6,
    /// End of stream.
    Eof = 7,
}

impl Event {
    /// Size of the event alphabet.
    pub const COUNT: usize = 8;

    /// All events in symbol order.
    pub const ALL: [Event; Event::COUNT] = [
        Event::Ctx0,
        Event::Ctx1,
        Event::Ctx2,
        Event::Ctx3,
        Event::Index,
        Event::IndexDelta,
        Event::Literal,
        Event::Eof,
    ];

    /// Coded symbol.
    pub fn symbol(self) -> usize {
        self as usize
    }

    /// Event for a decoded symbol.
    pub fn from_symbol(symbol: usize) -> Option<Self> {
        Self::ALL.get(symbol).copied()
    }

    /// `true` for events that name a dictionary entry.
    pub fn is_hit(self) -> bool {
        !matches!(self, Event::Literal | Event::Eof)
    }
}

/// Counters gathered over one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    /// Occurrences of each event, indexed by [`Event::symbol`].
    pub events: [u64; Event::COUNT],
    /// Estimated coded size of each event kind in bits (compression only).
    pub bits: [f64; Event::COUNT],
    /// Bytes carried in literal runs.
    pub literal_bytes: u64,
    /// Dictionary entries at the end of the run.
    pub dictionary_entries: usize,
    /// Distinct tag pairs at the end of the run.
    pub tag_pairs: usize,
    /// Uncompressed size.
    pub raw_bytes: usize,
    /// Compressed size.
    pub coded_bytes: usize,
}

impl Stats {
    /// Occurrences of `event`.
    pub fn count(&self, event: Event) -> u64 {
        self.events[event.symbol()]
    }

    /// Steps that named a dictionary entry.
    pub fn hits(&self) -> u64 {
        Event::ALL
            .iter()
            .filter(|e| e.is_hit())
            .map(|&e| self.count(e))
            .sum()
    }

    fn log(&self, direction: &str, backend: &str) {
        debug!(
            "{direction} ({backend}): {} -> {} bytes, {} hits, {} literals ({} bytes)",
            self.raw_bytes,
            self.coded_bytes,
            self.hits(),
            self.count(Event::Literal),
            self.literal_bytes
        );
        debug!(
            "events: ctx0 {}, ctx1 {}, ctx2 {}, ctx3 {}, index {}, delta {}, literal {}",
            self.events[0],
            self.events[1],
            self.events[2],
            self.events[3],
            self.events[4],
            self.events[5],
            self.events[6]
        );
        debug!(
            "context entries: ctx0 {}, ctx1 {}, ctx2 {CTX2_SIZE}, ctx3 {CTX3_SIZE}",
            self.tag_pairs, self.dictionary_entries
        );
    }
}

/// Recent history the contexts are keyed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct History {
    /// Tag before `tag`.
    prev_tag: usize,
    /// Tag of the last hit, 0 after a literal.
    tag: usize,
    /// Last two bytes before the cursor, older byte high.
    bytes: usize,
    /// Dictionary position of the last hit.
    prev_index: Option<usize>,
}

impl History {
    fn after_hit(&mut self, tag: usize, index: usize) {
        self.prev_tag = self.tag;
        self.tag = tag;
        self.prev_index = Some(index);
    }

    fn after_literal(&mut self) {
        self.prev_tag = 0;
        self.tag = 0;
        self.prev_index = None;
    }

    /// `data` ends at the cursor.
    fn refresh_bytes(&mut self, data: &[u8]) {
        if let [.., older, last] = data {
            self.bytes = usize::from(*last) | usize::from(*older) << 8;
        }
    }
}

/// Every piece of adaptive state, shared in shape by both directions.
struct Tables<B: Backend> {
    dict: Dictionary,
    pairs: TagPairIndex,
    /// keyed by tag-pair id, sized by the index capacity
    ctx0: Vec<Context<B::Model>>,
    /// keyed by previous tag, one per dictionary entry
    ctx1: Vec<Context<B::Model>>,
    ctx2: Vec<Context<B::Model>>,
    ctx3: Vec<Context<B::Model>>,
    events: B::Model,
    lengths: B::Model,
    literals: B::Model,
    index: B::Model,
    delta: B::Model,
}

fn fresh_context<B: Backend>() -> Context<B::Model> {
    Context::new(B::model(Stream::Rank, 0))
}

impl<B: Backend> Tables<B> {
    fn new() -> Self {
        let pairs = TagPairIndex::new();
        Self {
            ctx0: (0..pairs.capacity()).map(|_| fresh_context::<B>()).collect(),
            ctx1: Vec::new(),
            ctx2: (0..CTX2_SIZE).map(|_| fresh_context::<B>()).collect(),
            ctx3: (0..CTX3_SIZE).map(|_| fresh_context::<B>()).collect(),
            dict: Dictionary::new(),
            pairs,
            events: B::model(Stream::Event, Event::COUNT),
            lengths: B::model(Stream::Length, MAX_MATCH_LEN),
            literals: B::model(Stream::Literal, 256),
            index: B::model(Stream::Index, 0),
            delta: B::model(Stream::Delta, 0),
        }
    }

    /// Unknown pairs share slot 0.
    fn ctx0_slot(&self, h: &History) -> usize {
        self.pairs.query(h.prev_tag, h.tag).unwrap_or(0)
    }

    /// Context a context event is coded in.
    fn context(&self, h: &History, event: Event) -> Option<&Context<B::Model>> {
        match event {
            Event::Ctx0 => self.ctx0.get(self.ctx0_slot(h)),
            Event::Ctx1 => self.ctx1.get(h.tag),
            Event::Ctx2 => self.ctx2.get(h.bytes),
            Event::Ctx3 => self.ctx3.get(h.bytes & 0xFF),
            _ => None,
        }
    }

    /// Records that `tag`, at dictionary position `index`, was named through
    /// `event`. Every context learns the tag, whichever one carried it.
    fn observe_hit(&mut self, h: &History, event: Event, tag: usize, index: usize) {
        self.events.update(event.symbol());
        match (event, h.prev_index) {
            (Event::Index, _) => self.index.update(index),
            (Event::IndexDelta, Some(prev)) => self.delta.update(index - prev),
            _ => {}
        }

        let slot = self.ctx0_slot(h);
        self.ctx0[slot].observe(tag);
        self.ctx1[h.tag].observe(tag);
        self.ctx2[h.bytes].observe(tag);
        self.ctx3[h.bytes & 0xFF].observe(tag);

        // (tag, next) selects ctx0 on the next step
        if self.pairs.query(h.tag, tag).is_none() {
            if !self.pairs.can_add() {
                self.pairs.enlarge();
                let capacity = self.pairs.capacity();
                self.ctx0.resize_with(capacity, fresh_context::<B>);
            }
            self.pairs.add(h.tag, tag);
        }
    }

    /// Records a literal run and admits it to the dictionary. Literal bytes
    /// themselves are learned while they are coded.
    fn observe_literal(&mut self, span: &[u8], position: usize) -> usize {
        self.events.update(Event::Literal.symbol());
        self.lengths.update(span.len() - 1);

        let tag = self.dict.insert(span, position);
        self.ctx1.push(fresh_context::<B>());
        self.index.enlarge();
        self.delta.enlarge();
        debug_assert_eq!(self.ctx1.len(), self.dict.len());
        tag
    }
}

/// The cheapest way found to name a dictionary entry.
#[derive(Debug, Clone, Copy)]
struct Choice {
    event: Event,
    payload: usize,
    bits: f64,
}

/// One compression or decompression session.
///
/// State is rebuilt at the start of every call, so an engine can be reused;
/// separate engines share nothing.
pub struct Engine<B: Backend = Arithmetic> {
    config: Config,
    finder: MatchFinder,
    tables: Tables<B>,
    history: History,
    stats: Stats,
}

impl<B: Backend> Engine<B> {
    /// Engine tuned by `config`.
    pub fn new(config: Config) -> X3Result<Self> {
        let finder = MatchFinder::new(&config)?;
        Ok(Self {
            config,
            finder,
            tables: Tables::new(),
            history: History::default(),
            stats: Stats::default(),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Counters of the last run.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    fn reset(&mut self) {
        self.tables = Tables::new();
        self.history = History::default();
        self.stats = Stats::default();
    }

    fn choose(&self, tag: usize, index: usize) -> Choice {
        let t = &self.tables;
        let h = &self.history;
        let mut best = Choice {
            event: Event::Index,
            payload: index,
            bits: f64::INFINITY,
        };
        let mut consider = |event: Event, payload: usize, bits: f64| {
            if bits < best.bits {
                best = Choice {
                    event,
                    payload,
                    bits,
                };
            }
        };

        for event in [Event::Ctx0, Event::Ctx1, Event::Ctx2, Event::Ctx3] {
            let Some(ctx) = t.context(h, event) else {
                continue;
            };
            if let Some(rank) = ctx.rank_of(tag) {
                consider(event, rank, t.events.cost(event.symbol()) + ctx.cost(rank));
            }
        }
        consider(
            Event::Index,
            index,
            t.events.cost(Event::Index.symbol()) + t.index.cost(index),
        );
        if let Some(prev) = h.prev_index.filter(|&prev| index >= prev) {
            let delta = index - prev;
            consider(
                Event::IndexDelta,
                delta,
                t.events.cost(Event::IndexDelta.symbol()) + t.delta.cost(delta),
            );
        }
        best
    }

    /// Shared tail of a hit: learn, move the cursor, re-rank.
    fn commit_hit(&mut self, event: Event, tag: usize, index: usize, start: usize, data: &[u8]) {
        self.tables.observe_hit(&self.history, event, tag, index);
        self.tables.dict.touch(tag, start);
        self.history.after_hit(tag, index);

        let end = start + self.tables.dict.get(tag).len();
        self.history.refresh_bytes(&data[..end]);
        self.tables.dict.update_costs(end);
        self.stats.events[event.symbol()] += 1;
    }

    /// Shared tail of a literal run.
    fn commit_literal(&mut self, start: usize, len: usize, data: &[u8]) {
        let end = start + len;
        self.tables.observe_literal(&data[start..end], start);
        self.history.after_literal();
        self.history.refresh_bytes(&data[..end]);
        self.tables.dict.update_costs(end);
        self.stats.events[Event::Literal.symbol()] += 1;
        self.stats.literal_bytes += len as u64;
    }

    fn finish_stats(&mut self, raw: usize, coded: usize) {
        self.stats.dictionary_entries = self.tables.dict.len();
        self.stats.tag_pairs = self.tables.pairs.len();
        self.stats.raw_bytes = raw;
        self.stats.coded_bytes = coded;
    }

    /// Compresses `input` into a self-terminating stream.
    pub fn compress(&mut self, input: &[u8]) -> X3Result<Vec<u8>> {
        self.reset();
        let mut enc = B::encoder();
        let mut p = 0;

        while p < input.len() {
            let best_len = self.finder.best_match(input, p);
            let hit = self
                .tables
                .dict
                .find_match(&input[p..])
                .filter(|&tag| self.tables.dict.get(tag).len() >= best_len);

            match hit {
                Some(tag) => {
                    let index = self.tables.dict.position_of(tag);
                    let choice = self.choose(tag, index);
                    trace!("{p}: {:?} tag {tag} payload {}", choice.event, choice.payload);

                    enc.encode(&self.tables.events, choice.event.symbol());
                    match choice.event {
                        Event::Index => enc.encode(&self.tables.index, choice.payload),
                        Event::IndexDelta => enc.encode(&self.tables.delta, choice.payload),
                        event => {
                            let ctx = self.tables.context(&self.history, event);
                            if let Some(ctx) = ctx.filter(|ctx| ctx.needs_rank()) {
                                enc.encode(ctx.model(), choice.payload);
                            }
                        }
                    }
                    self.stats.bits[choice.event.symbol()] += choice.bits;

                    let len = self.tables.dict.get(tag).len();
                    self.commit_hit(choice.event, tag, index, p, input);
                    p += len;
                }
                None => {
                    let len = best_len;
                    trace!("{p}: Literal len {len}");
                    let t = &mut self.tables;
                    let mut bits = t.events.cost(Event::Literal.symbol()) + t.lengths.cost(len - 1);
                    enc.encode(&t.events, Event::Literal.symbol());
                    enc.encode(&t.lengths, len - 1);
                    for &b in &input[p..p + len] {
                        bits += t.literals.cost(usize::from(b));
                        enc.encode(&t.literals, usize::from(b));
                        t.literals.update(usize::from(b));
                    }
                    self.stats.bits[Event::Literal.symbol()] += bits;

                    self.commit_literal(p, len, input);
                    p += len;
                }
            }
        }

        self.stats.bits[Event::Eof.symbol()] += self.tables.events.cost(Event::Eof.symbol());
        enc.encode(&self.tables.events, Event::Eof.symbol());
        self.stats.events[Event::Eof.symbol()] += 1;
        let out = enc.finish();

        self.finish_stats(input.len(), out.len());
        self.stats.log("compress", B::NAME);
        Ok(out)
    }

    /// Reconstructs the bytes a [`compress`](Self::compress) call produced.
    pub fn decompress(&mut self, input: &[u8]) -> X3Result<Vec<u8>> {
        self.reset();
        let mut dec = B::decoder(input);
        let mut out = Vec::new();

        loop {
            if dec.overrun() > MAX_OVERRUN_WORDS {
                return Err(X3Error::CorruptData);
            }
            let symbol = dec.decode(&self.tables.events)?;
            let event = Event::from_symbol(symbol).ok_or(X3Error::CorruptData)?;
            let start = out.len();

            match event {
                Event::Eof => break,
                Event::Literal => {
                    let t = &mut self.tables;
                    let len = dec.decode(&t.lengths)? + 1;
                    if len > MAX_MATCH_LEN {
                        return Err(X3Error::CorruptData);
                    }
                    for _ in 0..len {
                        let b = dec.decode(&t.literals)?;
                        let byte = u8::try_from(b).map_err(|_| X3Error::CorruptData)?;
                        t.literals.update(b);
                        out.push(byte);
                    }
                    if t.dict.contains(&out[start..]) {
                        return Err(X3Error::CorruptData);
                    }
                    trace!("{start}: Literal len {len}");
                    self.commit_literal(start, len, &out);
                }
                _ => {
                    let (tag, index) = self.decode_hit(&mut dec, event)?;
                    trace!("{start}: {event:?} tag {tag}");
                    out.extend_from_slice(self.tables.dict.get(tag).bytes());
                    self.commit_hit(event, tag, index, start, &out);
                }
            }
        }
        self.stats.events[Event::Eof.symbol()] += 1;

        self.finish_stats(out.len(), input.len());
        self.stats.log("decompress", B::NAME);
        Ok(out)
    }

    /// Payload of a hit event, resolved to `(tag, dictionary position)`.
    fn decode_hit(&self, dec: &mut B::Decoder, event: Event) -> X3Result<(usize, usize)> {
        let t = &self.tables;
        let tag = match event {
            Event::Index => {
                let index = dec.decode(&t.index)?;
                t.dict.tag_at(index).ok_or(X3Error::CorruptData)?
            }
            Event::IndexDelta => {
                let prev = self.history.prev_index.ok_or(X3Error::CorruptData)?;
                let index = prev
                    .checked_add(dec.decode(&t.delta)?)
                    .ok_or(X3Error::CorruptData)?;
                t.dict.tag_at(index).ok_or(X3Error::CorruptData)?
            }
            _ => {
                let ctx = t
                    .context(&self.history, event)
                    .filter(|ctx| !ctx.is_empty())
                    .ok_or(X3Error::CorruptData)?;
                let rank = if ctx.needs_rank() { dec.decode(ctx.model())? } else { 0 };
                ctx.tag_at(rank).ok_or(X3Error::CorruptData)?
            }
        };
        Ok((tag, t.dict.position_of(tag)))
    }
}
