// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for somatic VCF, MAF, mpileup and variant list files
// Author: Matt Barham
// Created: 2026-09-14
// Modified: 2026-10-06
// Version: 1.1.0
// ==============================================================================

pub mod vcf;
pub mod maf;
pub mod pileup;
pub mod variant_list;

pub use vcf::{parse_genotype_call, VcfParseError, VcfParser, VcfRow, VcfTable};
pub use maf::{MafParseError, MafParser, MafRow};
pub use pileup::{PileupParseError, PileupParser, PileupRecord};
pub use variant_list::{read_union_file, UnionFileError};

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Open a text file, transparently decompressing `.gz` inputs
pub(crate) fn open_text(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Sample name from a file path: the file name up to its first '.'
pub fn sample_name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    file_name
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}
