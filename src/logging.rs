//! Exchange journal: one JSON line per completed chat exchange.
//!
//! Only metadata is recorded (route, model, status, timing, token counts). Message
//! content never reaches the journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const MAX_JOURNAL_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub timestamp: DateTime<Utc>,
    pub route: String,
    pub model: String,
    pub stream: bool,
    pub status: u16,
    /// Time spent waiting on the upstream, including image resolution.
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExchangeRecord {
    pub fn new(route: impl Into<String>, model: impl Into<String>, stream: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            route: route.into(),
            model: model.into(),
            stream,
            status: 200,
            latency_ms: 0,
            prompt_tokens: None,
            completion_tokens: None,
            error: None,
        }
    }

    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.prompt_tokens = Some(prompt_tokens);
        self.completion_tokens = Some(completion_tokens);
        self
    }

    pub fn failed(mut self, status: u16, error: impl Into<String>) -> Self {
        self.status = status;
        self.error = Some(error.into());
        self
    }
}

/// Bounded in-memory ring mirrored to an append-only JSONL file.
pub struct ExchangeLog {
    entries: VecDeque<ExchangeRecord>,
    file_path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl ExchangeLog {
    /// Open (or create) the journal, replaying the tail of an existing file into memory.
    pub fn open(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file_path = file_path.as_ref().to_path_buf();

        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut log = Self {
            entries: VecDeque::with_capacity(MAX_JOURNAL_ENTRIES),
            file_path,
            writer: None,
        };

        if log.file_path.exists() {
            let reader = BufReader::new(File::open(&log.file_path)?);
            for line in reader.lines().map_while(std::result::Result::ok) {
                if let Ok(record) = serde_json::from_str::<ExchangeRecord>(&line) {
                    log.remember(record);
                }
            }
        }

        log.writer = Some(log.append_writer()?);
        Ok(log)
    }

    /// Lines are buffered; they reach the file when the buffer fills, on [`flush`](Self::flush)
    /// or when the log is dropped.
    pub fn record(&mut self, record: ExchangeRecord) {
        if let Some(ref mut writer) = self.writer {
            if let Ok(json) = serde_json::to_string(&record) {
                let _ = writeln!(writer, "{json}");
            }
        }
        self.remember(record);
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        match self.writer {
            Some(ref mut writer) => writer.flush(),
            None => Ok(()),
        }
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<ExchangeRecord> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    /// Rewrite the file so it holds only what is still in memory.
    pub fn compact(&mut self) -> std::io::Result<()> {
        self.writer = None;
        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.file_path)?;
            let mut writer = BufWriter::new(file);
            for record in &self.entries {
                writeln!(writer, "{}", serde_json::to_string(record)?)?;
            }
            writer.flush()?;
        }
        self.writer = Some(self.append_writer()?);
        Ok(())
    }

    fn remember(&mut self, record: ExchangeRecord) {
        if self.entries.len() >= MAX_JOURNAL_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    fn append_writer(&self) -> std::io::Result<BufWriter<File>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        Ok(BufWriter::new(file))
    }
}

#[derive(Clone)]
pub struct SharedExchangeLog(Arc<Mutex<ExchangeLog>>);

impl SharedExchangeLog {
    pub fn open(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self(Arc::new(Mutex::new(ExchangeLog::open(file_path)?))))
    }

    pub fn record(&self, record: ExchangeRecord) {
        tracing::debug!(
            route = %record.route,
            model = %record.model,
            status = record.status,
            latency_ms = record.latency_ms,
            "Exchange recorded"
        );
        if let Ok(mut log) = self.0.lock() {
            log.record(record);
        }
    }

    pub fn recent(&self, limit: usize) -> Vec<ExchangeRecord> {
        self.0.lock().map(|l| l.recent(limit)).unwrap_or_default()
    }

    pub fn compact(&self) -> std::io::Result<()> {
        match self.0.lock() {
            Ok(mut log) => log.compact(),
            Err(_) => Ok(()),
        }
    }

    pub fn flush(&self) -> std::io::Result<()> {
        match self.0.lock() {
            Ok(mut log) => log.flush(),
            Err(_) => Ok(()),
        }
    }
}
