//! Booking handoff - where confirmed selections go
//!
//! Checkout is someone else's job. The engine only hands over the request;
//! `JsonlHandoff` appends each one as a JSON line for the downstream
//! checkout process to pick up.

use crate::domain::booking::BookingRequest;
use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

#[async_trait]
pub trait BookingHandoff: Send + Sync {
    async fn submit(&self, request: &BookingRequest) -> anyhow::Result<()>;
}

/// Appends booking requests to a JSONL file
pub struct JsonlHandoff {
    file_path: PathBuf,
}

impl JsonlHandoff {
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        info!(file_path = %file_path.display(), "handoff_initialized");
        Self { file_path }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    async fn append_line(&self, line: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .await
            .with_context(|| format!("Failed to open {}", self.file_path.display()))?;

        file.write_all(format!("{}\n", line).as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", self.file_path.display()))?;
        file.flush().await?;
        debug!(file = %self.file_path.display(), bytes = %line.len(), "handoff_written");
        Ok(())
    }
}

#[async_trait]
impl BookingHandoff for JsonlHandoff {
    async fn submit(&self, request: &BookingRequest) -> anyhow::Result<()> {
        let line = serde_json::to_string(request).context("Failed to serialize booking")?;
        self.append_line(&line).await?;
        info!(
            booking_id = %request.booking_id,
            seats = %request.seat_ids.len(),
            total_price = %request.total_price,
            "booking_handed_off"
        );
        Ok(())
    }
}
