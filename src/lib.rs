// ==============================================================================
// lib.rs - SNV Discovery Library
// ==============================================================================
// Description: Library interface for somatic SNV discovery, reconciliation
//              and pileup re-analysis modules
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-12
// Version: 1.1.0
// ==============================================================================

pub mod parsers;
pub mod models;
pub mod filter;
pub mod sample_filter;
pub mod union;
pub mod reconcile;
pub mod discovery;
pub mod ingest;
pub mod config;
pub mod validator;
pub mod manifest;
pub mod output;
pub mod processor;
pub mod overlap;
pub mod quality;
pub mod pyclone;
