//! Parquet alert sink with batching and file rotation

use super::{AlertSink, StoreError};
use crate::model::{AlertEvent, Severity};
use crate::rules::RuleKind;
use arrow::array::{Array, ArrayRef, BooleanArray, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::collections::{HashSet, VecDeque};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// How many recent alert ids are remembered for idempotent saves
const SEEN_CAPACITY: usize = 10_000;

/// Consecutive failed writes after which the buffered batch is discarded
const MAX_FLUSH_FAILURES: u32 = 3;

/// Alert schema. Decimals are stored as strings to keep precision.
pub fn alert_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("user_id", DataType::Utf8, false),
        Field::new("subscription_id", DataType::Utf8, false),
        Field::new("symbol", DataType::Utf8, false),
        Field::new("stock_name", DataType::Utf8, false),
        Field::new("type", DataType::Utf8, false),
        Field::new("severity", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("message", DataType::Utf8, false),
        Field::new("ai_analysis", DataType::Utf8, true),
        Field::new("intensity", DataType::Utf8, false),
        Field::new("threshold", DataType::Utf8, false),
        Field::new("is_read", DataType::Boolean, false),
        Field::new("is_notified", DataType::Boolean, false),
        Field::new(
            "created_at",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
    ])
}

/// Write alerts to a new Parquet file
fn write_alerts(path: &Path, alerts: &[AlertEvent]) -> Result<(), StoreError> {
    let schema = Arc::new(alert_schema());
    let file = File::create(path)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    fn strings<'a>(alerts: &'a [AlertEvent], f: impl Fn(&'a AlertEvent) -> &'a str) -> ArrayRef {
        Arc::new(StringArray::from(alerts.iter().map(f).collect::<Vec<_>>()))
    }

    let ids: Vec<String> = alerts.iter().map(|a| a.id.to_string()).collect();
    let intensities: Vec<String> = alerts.iter().map(|a| a.intensity.to_string()).collect();
    let thresholds: Vec<String> = alerts.iter().map(|a| a.threshold.to_string()).collect();
    let created: Vec<i64> = alerts
        .iter()
        .map(|a| a.created_at.timestamp_micros())
        .collect();

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from_iter_values(ids.iter())) as ArrayRef,
            strings(alerts, |a| a.user_id.as_str()),
            strings(alerts, |a| a.subscription_id.as_str()),
            strings(alerts, |a| a.symbol.as_str()),
            strings(alerts, |a| a.stock_name.as_str()),
            strings(alerts, |a| a.kind.as_str()),
            strings(alerts, |a| a.severity.as_str()),
            strings(alerts, |a| a.title.as_str()),
            strings(alerts, |a| a.message.as_str()),
            Arc::new(StringArray::from(
                alerts
                    .iter()
                    .map(|a| a.ai_analysis.as_deref())
                    .collect::<Vec<_>>(),
            )) as ArrayRef,
            Arc::new(StringArray::from_iter_values(intensities.iter())) as ArrayRef,
            Arc::new(StringArray::from_iter_values(thresholds.iter())) as ArrayRef,
            Arc::new(BooleanArray::from(
                alerts.iter().map(|a| a.is_read).collect::<Vec<_>>(),
            )) as ArrayRef,
            Arc::new(BooleanArray::from(
                alerts.iter().map(|a| a.is_notified).collect::<Vec<_>>(),
            )) as ArrayRef,
            Arc::new(TimestampMicrosecondArray::from(created).with_timezone("UTC")) as ArrayRef,
        ],
    )?;

    writer.write(&batch)?;
    writer.close()?;

    tracing::debug!(path = ?path, count = alerts.len(), "Wrote alerts to Parquet");
    Ok(())
}

fn corrupt(what: impl Into<String>) -> StoreError {
    StoreError::Corrupt(what.into())
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| corrupt(format!("invalid {} column", name)))
}

fn bool_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a BooleanArray, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<BooleanArray>())
        .ok_or_else(|| corrupt(format!("invalid {} column", name)))
}

fn decimal(value: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(value).map_err(|e| corrupt(format!("decimal {}: {}", value, e)))
}

/// Read every alert from a Parquet file written by [`ParquetAlertSink`]
pub fn read_alerts(path: impl AsRef<Path>) -> Result<Vec<AlertEvent>, StoreError> {
    let file = File::open(path.as_ref())?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut alerts = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;

        let ids = string_column(&batch, "id")?;
        let user_ids = string_column(&batch, "user_id")?;
        let subscription_ids = string_column(&batch, "subscription_id")?;
        let symbols = string_column(&batch, "symbol")?;
        let stock_names = string_column(&batch, "stock_name")?;
        let kinds = string_column(&batch, "type")?;
        let severities = string_column(&batch, "severity")?;
        let titles = string_column(&batch, "title")?;
        let messages = string_column(&batch, "message")?;
        let analyses = string_column(&batch, "ai_analysis")?;
        let intensities = string_column(&batch, "intensity")?;
        let thresholds = string_column(&batch, "threshold")?;
        let read_flags = bool_column(&batch, "is_read")?;
        let notified_flags = bool_column(&batch, "is_notified")?;
        let created = batch
            .column_by_name("created_at")
            .and_then(|c| c.as_any().downcast_ref::<TimestampMicrosecondArray>())
            .ok_or_else(|| corrupt("invalid created_at column"))?;

        for i in 0..batch.num_rows() {
            let id = Uuid::parse_str(ids.value(i)).map_err(|e| corrupt(e.to_string()))?;
            let kind = RuleKind::from_str(kinds.value(i)).map_err(|e| corrupt(e.to_string()))?;
            let severity = Severity::from_str(severities.value(i)).map_err(corrupt)?;
            let created_at = DateTime::from_timestamp_micros(created.value(i))
                .ok_or_else(|| corrupt("invalid created_at"))?;

            alerts.push(AlertEvent {
                id,
                user_id: user_ids.value(i).to_string(),
                subscription_id: subscription_ids.value(i).to_string(),
                symbol: symbols.value(i).to_string(),
                stock_name: stock_names.value(i).to_string(),
                kind,
                severity,
                title: titles.value(i).to_string(),
                message: messages.value(i).to_string(),
                ai_analysis: (!analyses.is_null(i)).then(|| analyses.value(i).to_string()),
                intensity: decimal(intensities.value(i))?,
                threshold: decimal(thresholds.value(i))?,
                is_read: read_flags.value(i),
                is_notified: notified_flags.value(i),
                created_at,
            });
        }
    }

    Ok(alerts)
}

struct SinkState {
    buffer: Vec<AlertEvent>,
    seen: HashSet<Uuid>,
    seen_order: VecDeque<Uuid>,
    last_flush: DateTime<Utc>,
    files_written: u64,
    failed_flushes: u32,
}

impl SinkState {
    /// Remember an id; false if it was already known
    fn remember(&mut self, id: Uuid) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.seen_order.push_back(id);
        if self.seen_order.len() > SEEN_CAPACITY {
            if let Some(oldest) = self.seen_order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    /// Drop the buffered batch and forget its ids so a redelivery is stored
    fn discard_buffer(&mut self) -> usize {
        let dropped: HashSet<Uuid> = self.buffer.drain(..).map(|a| a.id).collect();
        self.seen.retain(|id| !dropped.contains(id));
        self.seen_order.retain(|id| !dropped.contains(id));
        self.failed_flushes = 0;
        dropped.len()
    }
}

/// Buffers alerts and writes them to `alerts_<YYYYmmdd_HHMMSS>.parquet` files.
///
/// Each flush produces one file. A buffer is flushed once it reaches
/// `flush_batch` alerts, or when [`AlertSink::flush`] is called.
pub struct ParquetAlertSink {
    output_dir: PathBuf,
    flush_batch: usize,
    state: Mutex<SinkState>,
}

impl ParquetAlertSink {
    pub fn new(output_dir: impl Into<PathBuf>, flush_batch: usize) -> Self {
        Self {
            output_dir: output_dir.into(),
            flush_batch: flush_batch.max(1),
            state: Mutex::new(SinkState {
                buffer: Vec::new(),
                seen: HashSet::new(),
                seen_order: VecDeque::new(),
                last_flush: Utc::now(),
                files_written: 0,
                failed_flushes: 0,
            }),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path for a file started at `timestamp`. Never returns an existing file.
    pub fn file_path(&self, timestamp: DateTime<Utc>) -> PathBuf {
        let stem = format!("alerts_{}", timestamp.format("%Y%m%d_%H%M%S"));
        let mut path = self.output_dir.join(format!("{}.parquet", stem));
        let mut n = 1;
        while path.exists() {
            path = self.output_dir.join(format!("{}_{}.parquet", stem, n));
            n += 1;
        }
        path
    }

    /// Alerts waiting to be written
    pub async fn pending(&self) -> usize {
        self.state.lock().await.buffer.len()
    }

    pub async fn files_written(&self) -> u64 {
        self.state.lock().await.files_written
    }

    pub async fn last_flush(&self) -> DateTime<Utc> {
        self.state.lock().await.last_flush
    }

    fn flush_locked(&self, state: &mut SinkState) -> Result<(), StoreError> {
        if state.buffer.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let path = self.file_path(now);
        let written = fs::create_dir_all(&self.output_dir)
            .map_err(StoreError::from)
            .and_then(|()| write_alerts(&path, &state.buffer));

        if let Err(e) = written {
            state.failed_flushes += 1;
            if state.failed_flushes >= MAX_FLUSH_FAILURES {
                let dropped = state.discard_buffer();
                tracing::error!(
                    dir = ?self.output_dir,
                    dropped,
                    error = %e,
                    "Alert writes keep failing, discarding buffered batch"
                );
            } else {
                tracing::warn!(
                    dir = ?self.output_dir,
                    pending = state.buffer.len(),
                    attempt = state.failed_flushes,
                    error = %e,
                    "Alert flush failed, keeping batch for retry"
                );
            }
            return Err(e);
        }

        tracing::info!(path = ?path, count = state.buffer.len(), "Flushed alerts");
        state.buffer.clear();
        state.failed_flushes = 0;
        state.last_flush = now;
        state.files_written += 1;
        Ok(())
    }
}

#[async_trait]
impl AlertSink for ParquetAlertSink {
    async fn save_alert(&self, alert: &AlertEvent) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if !state.remember(alert.id) {
            tracing::debug!(alert_id = %alert.id, "Alert already stored, skipping");
            return Ok(());
        }
        state.buffer.push(alert.clone());
        if state.buffer.len() >= self.flush_batch {
            self.flush_locked(&mut state)?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        self.flush_locked(&mut state)
    }
}
