// This file is part of measure. Copyright © 2026 packed_cardinality contributors.
// measure is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use log::info;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generates binary measurement records on stdout.
#[derive(Parser)]
#[command(version, about, author)]
struct CliArgs {
    /// Number of records to generate
    n: u64,

    /// Record datatype
    #[arg(value_enum)]
    datatype: DataType,

    /// Random number generator seed
    seed: u64,

    /// Number of registers; required for the jr datatype
    #[arg(short)]
    m: Option<u64>,

    /// Length of each string record; required for the str datatype
    #[arg(long)]
    len: Option<usize>,
}

/// Binary layout of the generated records
#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
enum DataType {
    /// Uniform big-endian 64-bit integers
    Uint64,
    /// Uniform alphanumeric byte strings, `--len` bytes each
    Str,
    /// Pairs of big-endian 32-bit register index and geometric rank
    Jr,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    if args.m.is_some() && args.datatype != DataType::Jr {
        eprintln!("-m can be used only in conjunction with the jr datatype");
        return ExitCode::FAILURE;
    }
    if args.m.is_none() && args.datatype == DataType::Jr {
        eprintln!("the jr datatype requires -m");
        return ExitCode::FAILURE;
    }
    if args.m == Some(0) {
        eprintln!("-m must be positive");
        return ExitCode::FAILURE;
    }
    if args.len.is_some() && args.datatype != DataType::Str {
        eprintln!("--len can be used only in conjunction with the str datatype");
        return ExitCode::FAILURE;
    }
    if args.len.is_none() && args.datatype == DataType::Str {
        eprintln!("the str datatype requires --len");
        return ExitCode::FAILURE;
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let result = match args.datatype {
        DataType::Uint64 => generate_uint64(&mut rng, args.n),
        DataType::Str => generate_str(&mut rng, args.n, args.len.unwrap_or(0)),
        DataType::Jr => generate_jr(&mut rng, args.n, args.m.unwrap_or(0)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("failed to write records: {e}");
            ExitCode::FAILURE
        }
    }
}

fn generate_uint64(rng: &mut StdRng, n: u64) -> io::Result<()> {
    let start = Instant::now();
    let mut records = Vec::with_capacity(n as usize * 8);
    for _ in 0..n {
        records.extend_from_slice(&rng.gen::<u64>().to_be_bytes());
    }
    info!("data generation took {} s", start.elapsed().as_secs_f64());
    write_records(&records)
}

fn generate_str(rng: &mut StdRng, n: u64, len: usize) -> io::Result<()> {
    let start = Instant::now();
    let mut records = Vec::with_capacity(n as usize * len);
    for _ in 0..n as usize * len {
        records.push(rng.sample(Alphanumeric));
    }
    info!("data generation took {} s", start.elapsed().as_secs_f64());
    write_records(&records)
}

fn generate_jr(rng: &mut StdRng, n: u64, m: u64) -> io::Result<()> {
    let start = Instant::now();
    let mut records = Vec::with_capacity(n as usize * 8);
    for _ in 0..n {
        let j = rng.gen_range(0..m) as u32;
        let u: f64 = rng.gen();
        let r = (-(1.0 - u).log2()).ceil() as u32;
        records.extend_from_slice(&j.to_be_bytes());
        records.extend_from_slice(&r.to_be_bytes());
    }
    info!("data generation took {} s", start.elapsed().as_secs_f64());
    write_records(&records)
}

fn write_records(records: &[u8]) -> io::Result<()> {
    let start = Instant::now();
    let stdout = io::stdout().lock();
    let mut writer = BufWriter::new(stdout);
    writer.write_all(records)?;
    writer.flush()?;
    info!("data writing took {} s", start.elapsed().as_secs_f64());
    Ok(())
}
