//! .tsfp file writer

use crate::format::{FpFile, FpHeader, FpMetadata};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct FpWriter {}

impl FpWriter {
    pub fn new() -> Self {
        Self {}
    }

    /// Write .tsfp file
    pub fn write(&self, path: &Path, fp_file: &FpFile) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create .tsfp file: {}", path.display()))?;

        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer, fp_file)?;
        writer.flush()?;

        Ok(())
    }

    /// Serialize into an in-memory buffer
    pub fn to_bytes(&self, fp_file: &FpFile) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf, fp_file)?;
        Ok(buf)
    }

    fn write_to<W: Write>(&self, writer: &mut W, fp_file: &FpFile) -> Result<()> {
        self.write_header(writer, &fp_file.header)?;
        self.write_metadata(writer, &fp_file.metadata)?;
        writer.write_all(&fp_file.payload())?;
        Ok(())
    }

    fn write_header<W: Write>(&self, writer: &mut W, header: &FpHeader) -> Result<()> {
        writer.write_all(&header.magic)?;
        writer.write_all(&header.version.to_le_bytes())?;
        writer.write_all(&header.flags.to_le_bytes())?;
        writer.write_all(&header.coefficients.to_le_bytes())?;
        writer.write_all(&header.reserved.to_le_bytes())?;
        writer.write_all(&header.num_frames.to_le_bytes())?;
        writer.write_all(&header.sample_rate.to_le_bytes())?;
        writer.write_all(&header.metadata_size.to_le_bytes())?;
        writer.write_all(&header.payload_size.to_le_bytes())?;
        writer.write_all(&header.checksum.to_le_bytes())?;

        Ok(())
    }

    fn write_metadata<W: Write>(&self, writer: &mut W, metadata: &FpMetadata) -> Result<()> {
        let json = serde_json::to_vec(metadata).context("Failed to serialize .tsfp metadata")?;
        writer.write_all(&json)?;
        Ok(())
    }
}

impl Default for FpWriter {
    fn default() -> Self {
        Self::new()
    }
}
