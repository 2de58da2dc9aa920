// This file is part of measure. Copyright © 2026 packed_cardinality contributors.
// measure is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use clap::{Parser, ValueEnum};

use packed_cardinality::CompressionFlags;

/// Measures a cardinality sketch over binary records read from stdin and
/// prints timing, estimate, and storage observables on stdout.
#[derive(Parser)]
#[command(version, about, author)]
pub struct CliArgs {
    /// Measurement mode
    #[arg(value_enum)]
    pub mode: Mode,

    /// Algorithm to measure
    #[arg(value_enum)]
    pub algorithm: Algorithm,

    /// Type of the input records
    #[arg(value_enum)]
    pub datatype: DataType,

    /// Number of registers; must be a power of two
    pub m: usize,

    /// Number of records to read from stdin
    pub n: usize,

    /// Compression policy; only valid with the hyperlogloglog algorithm
    #[arg(long, value_enum)]
    pub flags: Option<FlagsArg>,

    /// Length of each string record; required for the str datatype
    #[arg(long)]
    pub len: Option<usize>,
}

/// What gets timed
#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Time feeding all records into one sketch
    Query,
    /// Feed each half of the records into its own sketch, then time the
    /// merge alone
    Merge,
}

/// Sketch implementation under measurement
#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Plain HyperLogLog with bit-packed registers
    Hyperloglog,
    /// HyperLogLog with a zstd-compressed register block
    Hyperloglogzstd,
    /// Self-compressing base-plus-offset HyperLogLog
    Hyperlogloglog,
    /// Only hash the records, to isolate hashing cost
    Hashonly,
}

/// Binary layout of the records on stdin
#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Big-endian 64-bit integers
    Uint64,
    /// Fixed-length byte strings, `--len` bytes each
    Str,
    /// Pairs of big-endian 32-bit register index and rank
    Jr,
}

/// Compression policy names accepted by `--flags`
#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagsArg {
    /// Full compression after every register increase
    #[default]
    Default,
    /// Full compression, but only when the exception store grows
    Appendonly,
    /// Base increases only, after every register increase
    Increaseonly,
    /// Base increases only, and only when the exception store grows
    Appendincreaseonly,
    /// Keep the base pinned to the minimum register value
    Bottom,
}

impl FlagsArg {
    pub fn to_flags(self) -> CompressionFlags {
        match self {
            FlagsArg::Default => CompressionFlags::DEFAULT,
            FlagsArg::Appendonly => CompressionFlags::WHEN_APPEND,
            FlagsArg::Increaseonly => CompressionFlags::TYPE_INCREASE,
            FlagsArg::Appendincreaseonly => {
                CompressionFlags::WHEN_APPEND | CompressionFlags::TYPE_INCREASE
            }
            FlagsArg::Bottom => CompressionFlags::BOTTOM,
        }
    }
}
