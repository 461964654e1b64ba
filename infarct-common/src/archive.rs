//! Reading and writing snapshot archives in the supported encodings.

use crate::config::OutputFormat;
use crate::snapshot::SnapshotArchive;
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// `<base>_snapshots.<ext>` with the extension matching the format.
pub fn snapshot_path(base_filename: &str, format: OutputFormat) -> PathBuf {
    PathBuf::from(format!("{}_snapshots.{}", base_filename, extension(format)))
}

pub fn extension(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Json => "json",
        OutputFormat::Bincode => "bin",
        OutputFormat::Messagepack => "msgpack",
    }
}

/// Guesses the archive format from a file extension.
pub fn format_from_path(path: &Path) -> Option<OutputFormat> {
    match path.extension()?.to_str()? {
        "json" => Some(OutputFormat::Json),
        "bin" => Some(OutputFormat::Bincode),
        "msgpack" => Some(OutputFormat::Messagepack),
        _ => None,
    }
}

pub fn write_archive(archive: &SnapshotArchive, path: &Path, format: OutputFormat) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create snapshot file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Json => serde_json::to_writer(&mut writer, archive)
            .with_context(|| format!("Failed to serialize snapshots to JSON in '{}'", path.display()))?,
        OutputFormat::Bincode => bincode::serialize_into(&mut writer, archive)
            .with_context(|| format!("Failed to serialize snapshots to bincode in '{}'", path.display()))?,
        OutputFormat::Messagepack => rmp_serde::encode::write(&mut writer, archive)
            .with_context(|| format!("Failed to serialize snapshots to MessagePack in '{}'", path.display()))?,
    }
    writer.flush()?;
    Ok(())
}

/// Reads an archive, picking the decoder from the file extension (`.json`, `.bin`, `.msgpack`).
pub fn read_archive(path: &Path) -> Result<SnapshotArchive> {
    let format = format_from_path(path).ok_or_else(|| {
        anyhow!(
            "Unsupported archive extension for {} (expected .json, .bin or .msgpack)",
            path.display()
        )
    })?;
    let file = File::open(path)
        .with_context(|| format!("Failed to open snapshot file '{}'", path.display()))?;
    let reader = BufReader::new(file);
    let archive = match format {
        OutputFormat::Json => serde_json::from_reader(reader).context("Failed to decode JSON archive")?,
        OutputFormat::Bincode => bincode::deserialize_from(reader).context("Failed to decode bincode archive")?,
        OutputFormat::Messagepack => {
            rmp_serde::decode::from_read(reader).context("Failed to decode MessagePack archive")?
        }
    };
    Ok(archive)
}
