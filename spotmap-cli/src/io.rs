//! File helpers: JSON inputs and outputs, raw `f32` volume dumps.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Result;

/// Reads a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Writes `value` as pretty JSON to `path`, or to stdout without a path.
pub fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, value)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}

/// Writes the buffers back to back as little-endian `f32`. Returns the
/// number of bytes written.
pub fn write_f32_le(path: &Path, buffers: &[&[f32]]) -> Result<usize> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0;
    for buffer in buffers {
        for value in *buffer {
            writer.write_all(&value.to_le_bytes())?;
        }
        written += buffer.len() * 4;
    }
    writer.flush()?;
    Ok(written)
}
