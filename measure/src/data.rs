// This file is part of measure. Copyright © 2026 packed_cardinality contributors.
// measure is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use std::io::{self, Read};
use std::time::Instant;

use log::info;

/// Reads `n` big-endian 64-bit records from stdin.
pub fn read_uint64(n: usize) -> io::Result<Vec<u64>> {
    let start = Instant::now();
    let mut buf = vec![0u8; n * 8];
    io::stdin().lock().read_exact(&mut buf)?;
    let records = buf
        .chunks_exact(8)
        .map(|chunk| u64::from_be_bytes(chunk.try_into().unwrap()))
        .collect();
    info!("data reading took {} s", start.elapsed().as_secs_f64());
    Ok(records)
}

/// Reads `n` byte strings of `len` bytes each from stdin.
pub fn read_str(n: usize, len: usize) -> io::Result<Vec<Vec<u8>>> {
    let start = Instant::now();
    let mut buf = vec![0u8; n * len];
    io::stdin().lock().read_exact(&mut buf)?;
    let records = if len == 0 {
        vec![Vec::new(); n]
    } else {
        buf.chunks_exact(len).map(<[u8]>::to_vec).collect()
    };
    info!("data reading took {} s", start.elapsed().as_secs_f64());
    Ok(records)
}

/// Reads `n` pairs of big-endian 32-bit register index and rank from stdin.
pub fn read_jr(n: usize) -> io::Result<Vec<(usize, u8)>> {
    let start = Instant::now();
    let mut buf = vec![0u8; n * 8];
    io::stdin().lock().read_exact(&mut buf)?;
    let records = buf
        .chunks_exact(8)
        .map(|chunk| {
            let j = u32::from_be_bytes(chunk[..4].try_into().unwrap());
            let r = u32::from_be_bytes(chunk[4..].try_into().unwrap());
            (j as usize, r as u8)
        })
        .collect();
    info!("data reading took {} s", start.elapsed().as_secs_f64());
    Ok(records)
}
