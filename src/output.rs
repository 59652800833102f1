use crate::layout::BoardLayout;
use anyhow::{Context, Result};
use galton_common::{OutputConfig, Snapshot};
use log::{info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Snapshot file encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Bincode,
    MessagePack,
}

impl SnapshotFormat {
    /// Reads the configured format; unknown names fall back to JSON.
    pub fn from_config(output: &OutputConfig) -> Self {
        match output.format.as_deref().unwrap_or("json") {
            "json" => SnapshotFormat::Json,
            "bincode" => SnapshotFormat::Bincode,
            "messagepack" => SnapshotFormat::MessagePack,
            other => {
                warn!("Unknown output format: {}. Using JSON instead.", other);
                SnapshotFormat::Json
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::Bincode => "bin",
            SnapshotFormat::MessagePack => "msgpack",
        }
    }
}

/// Writes all snapshots to `<base>_snapshots.<ext>` and returns the path.
pub fn write_snapshots(output: &OutputConfig, snapshots: &[Snapshot]) -> Result<PathBuf> {
    let format = SnapshotFormat::from_config(output);
    let path = PathBuf::from(format!("{}_snapshots.{}", output.base_filename, format.extension()));
    let file = File::create(&path).with_context(|| format!("creating snapshot file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        SnapshotFormat::Json => serde_json::to_writer(&mut writer, snapshots)
            .with_context(|| format!("serializing snapshots to JSON in '{}'", path.display()))?,
        SnapshotFormat::Bincode => bincode::serialize_into(&mut writer, snapshots)
            .with_context(|| format!("serializing snapshots to bincode in '{}'", path.display()))?,
        SnapshotFormat::MessagePack => rmp_serde::encode::write(&mut writer, snapshots)
            .with_context(|| format!("serializing snapshots to MessagePack in '{}'", path.display()))?,
    }
    writer.flush()?;
    info!("{} snapshots saved to {}", snapshots.len(), path.display());
    Ok(path)
}

/// Writes one row per bin: partition number, x-interval, observed and
/// expected count.
pub fn write_histogram_csv(path: &Path, layout: &BoardLayout, counts: &[u32], expected: &[f64]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating '{}'", path.display()))?;
    writer.write_record(["partition", "left", "right", "count", "expected"])?;
    for (i, (count, expected)) in counts.iter().zip(expected).enumerate() {
        let Some((left, right)) = layout.bin_interval(i) else {
            break;
        };
        writer.write_record(&[
            (i + 1).to_string(),
            format!("{:.1}", left),
            format!("{:.1}", right),
            count.to_string(),
            format!("{:.2}", expected),
        ])?;
    }
    writer.flush()?;
    info!("Histogram saved to {}", path.display());
    Ok(())
}

/// Writes particle positions as `x,y` rows.
pub fn write_positions_csv(path: &Path, positions: &[(f32, f32)]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating '{}'", path.display()))?;
    writer.write_record(["x", "y"])?;
    for (x, y) in positions {
        writer.write_record(&[format!("{:.4}", x), format!("{:.4}", y)])?;
    }
    writer.flush()?;
    info!("Final positions saved to {}", path.display());
    Ok(())
}
