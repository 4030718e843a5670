pub(crate) mod encode;

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

use crate::descriptor::FileDescriptor;

/// Encodes the given files (directories are walked recursively) into a JSON
/// array of attachment descriptors, the format restore expects inside an
/// attachment field.
pub fn run_encode_flow(
    inputs: &[PathBuf],
    compress: bool,
    output_path: Option<&Path>,
) -> Result<Vec<FileDescriptor>> {
    let descriptors = encode_inputs(inputs, compress)?;

    let writer: Box<dyn Write> = match output_path {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, &descriptors)
        .context("Failed to serialize attachment descriptors")?;
    writer.write_all(b"\n")?;
    writer.flush().context("Failed to flush attachment descriptors")?;

    Ok(descriptors)
}

fn encode_inputs(inputs: &[PathBuf], compress: bool) -> Result<Vec<FileDescriptor>> {
    let mut descriptors = Vec::new();
    for input in inputs {
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk directory: {}", input.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let descriptor = encode::encode_path(entry.path(), compress)?;
            info!(path = %entry.path().display(), compressed = compress, "encoded attachment");
            descriptors.push(descriptor);
        }
    }
    Ok(descriptors)
}
