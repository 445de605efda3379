//! Context-modeled dictionary compression.
//!
//! The input is cut into strings that either hit a growing dictionary or are
//! sent as literals and added to it. A hit is coded as the rank of its tag in
//! one of four predictive contexts, or as a plain dictionary position, picking
//! whichever is cheapest at that moment. Two entropy backends are available:
//! [`Arithmetic`] (the default) and [`Rice`].
//!
//! ```
//! let data = b"abracadabra abracadabra abracadabra";
//! let packed = x3_core::compress(data, &x3_core::Config::default())?;
//! assert_eq!(x3_core::decompress(&packed)?, data);
//! # Ok::<(), x3_core::X3Error>(())
//! ```
#![forbid(clippy::let_underscore_drop)]
#![forbid(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error as ThisError;

pub mod arith;
pub mod backend;
pub mod bio;
pub mod config;
pub mod context;
pub mod dict;
pub mod engine;
pub mod golomb;
pub mod matcher;
pub mod model;
pub mod tag_pair;

pub use backend::{Arithmetic, Backend, Rice};
pub use config::Config;
pub use engine::{Engine, Event, Stats};

/// Result of every fallible operation in this crate.
pub type X3Result<T> = Result<T, X3Error>;

#[derive(ThisError, Debug)]
/// Everything that can go wrong.
pub enum X3Error {
    /// Reading or writing a file failed.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    /// The compressed stream is not something the encoder produces.
    #[error("Corrupt input data")]
    CorruptData,
    /// Rejected configuration.
    #[error("Config error: {0}")]
    ConfigError(&'static str),
    /// The match finder could not start its workers.
    #[error("Thread pool error: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),
}

/// Compresses `input` with the arithmetic backend.
pub fn compress(input: &[u8], config: &Config) -> X3Result<Vec<u8>> {
    Engine::<Arithmetic>::new(config.clone())?.compress(input)
}

/// Inverse of [`compress`].
pub fn decompress(input: &[u8]) -> X3Result<Vec<u8>> {
    Engine::<Arithmetic>::new(Config::default())?.decompress(input)
}

fn write_all<P: AsRef<Path>>(path: P, bytes: &[u8]) -> X3Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

/// Compress `input_path` → `output_path`; `None` uses [`Config::default`].
pub fn encode_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input_path: P,
    output_path: Q,
    config: Option<Config>,
) -> X3Result<()> {
    let config = config.unwrap_or_default();
    config.validate()?;

    // the whole file is modeled at once
    let input = fs::read(input_path.as_ref())?;
    let packed = compress(&input, &config)?;
    write_all(output_path, &packed)
}

/// Decompress `input_path` → `output_path`.
pub fn decode_file<P: AsRef<Path>, Q: AsRef<Path>>(input_path: P, output_path: Q) -> X3Result<()> {
    let packed = fs::read(input_path.as_ref())?;
    let output = decompress(&packed)?;
    write_all(output_path, &output)
}
