// ==============================================================================
// validator.rs - Input File Validation
// ==============================================================================
// Description: Validates variant input files (size, type, format) and
//              fingerprints them for the run manifest
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-08
// Version: 1.1.0
// Security: Allowlist-only file types, magic number verification
// ==============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::parsers::open_text;

const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024; // 2 GB

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Serialize)]
pub struct ValidatedInput {
    pub path: PathBuf,
    pub extension: String,
    pub size: u64,
    pub hash_sha256: String,
    pub validated_at: chrono::DateTime<chrono::Utc>,
}

pub struct InputValidator {
    max_file_size: u64,
    allowed_types: HashMap<&'static str, &'static [u8]>,
}

impl InputValidator {
    pub fn new() -> Self {
        let mut allowed_types: HashMap<&'static str, &'static [u8]> = HashMap::new();

        // Plain text, no magic number
        allowed_types.insert("vcf", &[]);
        allowed_types.insert("maf", &[]);
        allowed_types.insert("txt", &[]);
        allowed_types.insert("tsv", &[]);

        // Gzip / BGZF compressed
        allowed_types.insert("vcf.gz", &GZIP_MAGIC);
        allowed_types.insert("maf.gz", &GZIP_MAGIC);

        Self {
            max_file_size: MAX_FILE_SIZE,
            allowed_types,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn validate(&self, file_path: &Path) -> Result<ValidatedInput> {
        let file_name = file_path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file path: {}", file_path.display()))?
            .to_string_lossy()
            .to_string();

        info!("Validating input: {}", file_name);

        // 1. Size check
        let metadata = std::fs::metadata(file_path)
            .with_context(|| format!("Failed to get metadata for {}", file_path.display()))?;
        let size = metadata.len();

        if size > self.max_file_size {
            anyhow::bail!(
                "File too large: {} bytes (max: {} bytes)",
                size,
                self.max_file_size
            );
        }
        debug!("Size check passed: {} bytes", size);

        // 2. Extension check (allowlist)
        let ext = self.get_extension(&file_name)?;
        let expected_magic = self
            .allowed_types
            .get(ext.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid file type: {}", ext))?;
        debug!("Extension check passed: {}", ext);

        // 3. Magic number verification
        if !expected_magic.is_empty() {
            let actual_magic = self.read_magic_number(file_path, expected_magic.len())?;
            if actual_magic != *expected_magic {
                anyhow::bail!("Magic number mismatch for .{} file", ext);
            }
            debug!("Magic number check passed");
        }

        // 4. Content validation (basic format check)
        self.validate_content(file_path, &ext)?;
        debug!("Content validation passed");

        // 5. Compute SHA-256 hash
        let hash = self.compute_sha256(file_path)?;
        debug!("SHA-256: {}", hash);

        Ok(ValidatedInput {
            path: file_path.to_path_buf(),
            extension: ext,
            size,
            hash_sha256: hash,
            validated_at: chrono::Utc::now(),
        })
    }

    fn get_extension(&self, filename: &str) -> Result<String> {
        let lower = filename.to_lowercase();

        // Compound extensions
        for compound in ["vcf.gz", "maf.gz"] {
            if lower.ends_with(&format!(".{}", compound)) {
                return Ok(compound.to_string());
            }
        }

        match lower.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => Ok(ext.to_string()),
            _ => anyhow::bail!("No file extension found: {}", filename),
        }
    }

    fn read_magic_number(&self, path: &Path, len: usize) -> Result<Vec<u8>> {
        let mut file = File::open(path)?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)
            .context("File too short to carry a magic number")?;
        Ok(buffer)
    }

    fn validate_content(&self, path: &Path, ext: &str) -> Result<()> {
        match ext {
            "vcf" | "vcf.gz" => self.validate_vcf_format(path),
            "maf" | "maf.gz" => self.validate_maf_format(path),
            _ => Ok(()),
        }
    }

    fn validate_vcf_format(&self, path: &Path) -> Result<()> {
        let mut lines = open_text(path)?.lines();

        // First line should be ##fileformat=VCFv4.x
        let first_line = lines
            .next()
            .ok_or_else(|| anyhow::anyhow!("VCF file is empty"))??;

        if !first_line.starts_with("##fileformat=VCF") {
            anyhow::bail!("Invalid VCF format: missing fileformat header");
        }

        Ok(())
    }

    fn validate_maf_format(&self, path: &Path) -> Result<()> {
        let reader = open_text(path)?;

        // First non-comment line is the column header
        for line in reader.lines() {
            let line = line?;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            if !line.split('\t').any(|column| column == "Variant_Classification") {
                anyhow::bail!("Invalid MAF format: header has no Variant_Classification column");
            }
            return Ok(());
        }

        anyhow::bail!("MAF file has no header row")
    }

    fn compute_sha256(&self, path: &Path) -> Result<String> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 8192];

        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}
