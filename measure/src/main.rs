// This file is part of measure. Copyright © 2026 packed_cardinality contributors.
// measure is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use std::hint::black_box;
use std::ops::Range;
use std::process::ExitCode;
use std::time::Instant;

use cfg_if::cfg_if;
use clap::Parser;

#[cfg(feature = "zstd")]
use packed_cardinality::HyperLogLogZstd;
use packed_cardinality::{fibonacci_hash, item_hash, Error, HyperLogLog, HyperLogLogLog};

use crate::cli_args::{Algorithm, CliArgs, DataType, Mode};

mod cli_args;
mod data;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // help and version output are successful exits, everything else
            // is an argument error
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    if args.flags.is_some() && args.algorithm != Algorithm::Hyperlogloglog {
        eprintln!("flags are only supported for hyperlogloglog!");
        return ExitCode::FAILURE;
    }
    if args.mode == Mode::Merge && args.algorithm == Algorithm::Hashonly {
        eprintln!("hashonly does not support merging!");
        return ExitCode::FAILURE;
    }
    if args.algorithm == Algorithm::Hashonly && args.datatype == DataType::Jr {
        eprintln!("hashonly does not support the jr datatype!");
        return ExitCode::FAILURE;
    }
    if !args.m.is_power_of_two() {
        eprintln!("m must be a power of two!");
        return ExitCode::FAILURE;
    }
    if args.datatype == DataType::Str && args.len.is_none() {
        eprintln!("len must be set if the datatype is str");
        return ExitCode::FAILURE;
    }
    if args.datatype != DataType::Str && args.len.is_some() {
        eprintln!("len must not be set if the datatype is not str");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// The record streams a measurement can be fed with.
enum Input {
    Uint64(Vec<u64>),
    Str(Vec<Vec<u8>>),
    Jr(Vec<(usize, u8)>),
}

impl Input {
    fn len(&self) -> usize {
        match self {
            Input::Uint64(records) => records.len(),
            Input::Str(records) => records.len(),
            Input::Jr(records) => records.len(),
        }
    }

    fn feed<S: Sketch>(&self, sketch: &mut S, range: Range<usize>) {
        match self {
            Input::Uint64(records) => {
                for x in &records[range] {
                    sketch.insert_u64(*x);
                }
            }
            Input::Str(records) => {
                for x in &records[range] {
                    sketch.insert_bytes(x);
                }
            }
            Input::Jr(records) => {
                for &(j, r) in &records[range] {
                    sketch.insert_jr(j, r);
                }
            }
        }
    }
}

/// The sketch operations a measurement needs, with counter defaults for
/// sketches that never compress.
trait Sketch: Sized {
    fn insert_u64(&mut self, x: u64);
    fn insert_bytes(&mut self, x: &[u8]);
    fn insert_jr(&mut self, j: usize, r: u8);
    fn merge_with(&self, other: &Self) -> Result<Self, Error>;
    fn estimate(&self) -> f64;
    fn bit_size(&self) -> usize;
    fn compress_count(&self) -> u64 {
        0
    }
    fn rebase_count(&self) -> u64 {
        0
    }
}

impl Sketch for HyperLogLog {
    fn insert_u64(&mut self, x: u64) {
        self.add(&x);
    }

    fn insert_bytes(&mut self, x: &[u8]) {
        self.add(x);
    }

    fn insert_jr(&mut self, j: usize, r: u8) {
        self.add_jr(j, r);
    }

    fn merge_with(&self, other: &Self) -> Result<Self, Error> {
        self.merge(other)
    }

    fn estimate(&self) -> f64 {
        HyperLogLog::estimate(self)
    }

    fn bit_size(&self) -> usize {
        HyperLogLog::bit_size(self)
    }
}

impl Sketch for HyperLogLogLog {
    fn insert_u64(&mut self, x: u64) {
        self.add(&x);
    }

    fn insert_bytes(&mut self, x: &[u8]) {
        self.add(x);
    }

    fn insert_jr(&mut self, j: usize, r: u8) {
        self.add_jr(j, r);
    }

    fn merge_with(&self, other: &Self) -> Result<Self, Error> {
        self.merge(other)
    }

    fn estimate(&self) -> f64 {
        HyperLogLogLog::estimate(self)
    }

    fn bit_size(&self) -> usize {
        HyperLogLogLog::bit_size(self)
    }

    fn compress_count(&self) -> u64 {
        HyperLogLogLog::compress_count(self)
    }

    fn rebase_count(&self) -> u64 {
        HyperLogLogLog::rebase_count(self)
    }
}

#[cfg(feature = "zstd")]
impl Sketch for HyperLogLogZstd {
    fn insert_u64(&mut self, x: u64) {
        self.add(&x);
    }

    fn insert_bytes(&mut self, x: &[u8]) {
        self.add(x);
    }

    fn insert_jr(&mut self, j: usize, r: u8) {
        self.add_jr(j, r);
    }

    fn merge_with(&self, other: &Self) -> Result<Self, Error> {
        self.merge(other)
    }

    fn estimate(&self) -> f64 {
        HyperLogLogZstd::estimate(self)
    }

    fn bit_size(&self) -> usize {
        HyperLogLogZstd::bit_size(self)
    }
}

fn run(args: &CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    let input = match args.datatype {
        DataType::Uint64 => Input::Uint64(data::read_uint64(args.n)?),
        DataType::Str => Input::Str(data::read_str(args.n, args.len.unwrap_or(0))?),
        DataType::Jr => Input::Jr(data::read_jr(args.n)?),
    };

    match args.algorithm {
        Algorithm::Hyperloglog => measure(args.mode, &input, || HyperLogLog::new(args.m))?,
        Algorithm::Hyperloglogzstd => {
            cfg_if! {
                if #[cfg(feature = "zstd")] {
                    measure(args.mode, &input, || HyperLogLogZstd::new(args.m))?;
                } else {
                    return Err("this measure binary was compiled without zstd support".into());
                }
            }
        }
        Algorithm::Hyperlogloglog => {
            let flags = args.flags.unwrap_or_default().to_flags();
            measure(args.mode, &input, || {
                HyperLogLogLog::with_options(args.m, 3, flags)
            })?;
        }
        Algorithm::Hashonly => measure_hash(&input, args.m.ilog2()),
    }
    Ok(())
}

fn measure<S: Sketch>(
    mode: Mode,
    input: &Input,
    make: impl Fn() -> Result<S, Error>,
) -> Result<(), Error> {
    match mode {
        Mode::Query => {
            let mut sketch = make()?;
            let start = Instant::now();
            input.feed(&mut sketch, 0..input.len());
            report(start.elapsed().as_secs_f64(), &sketch);
        }
        Mode::Merge => {
            let mut first = make()?;
            let mut second = make()?;
            let half = input.len() / 2;
            input.feed(&mut first, 0..half);
            input.feed(&mut second, half..input.len());
            let start = Instant::now();
            let merged = first.merge_with(&second)?;
            report(start.elapsed().as_secs_f64(), &merged);
        }
    }
    Ok(())
}

/// Runs the records through the hashing pipeline alone, without a sketch.
fn measure_hash(input: &Input, bits: u32) {
    let start = Instant::now();
    match input {
        Input::Uint64(records) => {
            for x in records {
                black_box(fibonacci_hash(item_hash(x), bits));
            }
        }
        Input::Str(records) => {
            for x in records {
                black_box(fibonacci_hash(item_hash(&x[..]), bits));
            }
        }
        Input::Jr(_) => unreachable!("hashonly rejects the jr datatype"),
    }
    let seconds = start.elapsed().as_secs_f64();
    print_report(seconds, 0.0, 0, 0, 0);
}

fn report<S: Sketch>(seconds: f64, sketch: &S) {
    print_report(
        seconds,
        sketch.estimate(),
        sketch.bit_size(),
        sketch.compress_count(),
        sketch.rebase_count(),
    );
}

fn print_report(seconds: f64, estimate: f64, bit_size: usize, compress_count: u64, rebase_count: u64) {
    println!("time {seconds}");
    println!("estimate {estimate:.6}");
    println!("bitsize {bit_size}");
    println!("compressCount {compress_count}");
    println!("rebaseCount {rebase_count}");
}
