// ==============================================================================
// manifest.rs - Run Manifest for Discovery Runs
// ==============================================================================
// Description: Event log of a discovery run (inputs, stages, outputs) written
//              next to the results as JSON
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 1.1.0
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use uuid::Uuid;

use crate::validator::ValidatedInput;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunEventType {
    RunStarted,
    InputValidated,
    SampleIngested,
    SampleFiltered,
    UnionBuilt,
    FalsePositivesFound,
    OutputWritten,
    RunCompleted,
    RunFailed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RunEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: RunEventType,
    pub sample: Option<String>,
    pub resource: Option<String>,
    pub details: serde_json::Value,
    pub severity: LogSeverity,
}

impl RunEvent {
    pub fn new(
        event_type: RunEventType,
        sample: Option<String>,
        resource: Option<String>,
        details: serde_json::Value,
    ) -> Self {
        let severity = match event_type {
            RunEventType::RunFailed => LogSeverity::Error,
            _ => LogSeverity::Info,
        };

        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            sample,
            resource,
            details,
            severity,
        }
    }

    pub fn with_severity(mut self, severity: LogSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Fingerprint of one input file
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InputRecord {
    pub sample: String,
    pub path: String,
    pub size: u64,
    pub hash_sha256: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub tool_version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub inputs: Vec<InputRecord>,
    pub events: Vec<RunEvent>,
}

impl RunManifest {
    pub fn new() -> Self {
        let mut manifest = Self {
            run_id: Uuid::new_v4(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
            finished_at: None,
            inputs: Vec::new(),
            events: Vec::new(),
        };
        manifest.record(RunEvent::new(
            RunEventType::RunStarted,
            None,
            None,
            serde_json::json!({}),
        ));
        manifest
    }

    pub fn record(&mut self, event: RunEvent) {
        self.events.push(event);
    }

    /// Record a validated input and its fingerprint
    pub fn record_input(&mut self, sample: &str, input: &ValidatedInput) {
        let path = input.path.display().to_string();
        self.inputs.push(InputRecord {
            sample: sample.to_string(),
            path: path.clone(),
            size: input.size,
            hash_sha256: input.hash_sha256.clone(),
        });
        self.record(RunEvent::new(
            RunEventType::InputValidated,
            Some(sample.to_string()),
            Some(path),
            serde_json::json!({
                "extension": input.extension,
                "size": input.size,
                "hash": input.hash_sha256,
            }),
        ));
    }

    pub fn finish(&mut self, outcome: Result<(), String>) {
        let event = match outcome {
            Ok(()) => RunEvent::new(RunEventType::RunCompleted, None, None, serde_json::json!({})),
            Err(message) => RunEvent::new(
                RunEventType::RunFailed,
                None,
                None,
                serde_json::json!({ "error": message }),
            ),
        };
        self.record(event);
        self.finished_at = Some(Utc::now());
    }

    pub fn events_of<'a>(&'a self, event_type: &'a RunEventType) -> impl Iterator<Item = &'a RunEvent> + 'a {
        self.events.iter().filter(move |e| &e.event_type == event_type)
    }

    pub fn write(&self, path: &Path) -> Result<(), std::io::Error> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl Default for RunManifest {
    fn default() -> Self {
        Self::new()
    }
}
