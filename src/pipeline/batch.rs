use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use tokio::task::JoinSet;

use crate::pipeline::parse;
use crate::types::activity::{ActivityRecord, FileFormat};

/// One file submitted to a read batch.
#[derive(Debug, Clone)]
pub enum SourceFile {
    Path(PathBuf),
    Bytes { name: String, bytes: Vec<u8> },
}

impl SourceFile {
    pub fn name(&self) -> String {
        match self {
            SourceFile::Path(path) => path.display().to_string(),
            SourceFile::Bytes { name, .. } => name.clone(),
        }
    }

    async fn load(self) -> std::io::Result<Vec<u8>> {
        match self {
            SourceFile::Path(path) => tokio::fs::read(path).await,
            SourceFile::Bytes { bytes, .. } => Ok(bytes),
        }
    }
}

/// Progress of one read batch. Owned by the batch; never shared between
/// batches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReadStatus {
    pub submitted: usize,
    pub completed: usize,
    pub activities: BTreeMap<String, ActivityRecord>,
}

impl ReadStatus {
    pub fn run_count(&self) -> usize {
        self.activities.len()
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.submitted
    }

    pub fn status_line(&self) -> String {
        format!(
            "Read {} of {} files. Found {} runs.",
            self.completed,
            self.submitted,
            self.run_count()
        )
    }

    fn merge(&mut self, activities: Vec<ActivityRecord>) {
        for activity in activities {
            let key = activity.key().to_string();
            if self.activities.insert(key, activity).is_some() {
                tracing::debug!("Replaced an earlier run with the same start time");
            }
        }
        self.completed += 1;
    }
}

/// Reads and parses every file concurrently.
///
/// `on_progress` runs after each completed file; `on_complete` runs once,
/// after the last one (immediately for an empty batch). Files that cannot be
/// read or parsed complete with no runs. Without an explicit `format`, each
/// file's extension decides its parser.
pub async fn read_batch<P, C>(
    files: Vec<SourceFile>,
    format: Option<FileFormat>,
    mut on_progress: P,
    on_complete: C,
) -> ReadStatus
where
    P: FnMut(&ReadStatus),
    C: FnOnce(&ReadStatus),
{
    let mut status = ReadStatus {
        submitted: files.len(),
        ..ReadStatus::default()
    };

    let mut pending = JoinSet::new();
    for file in files {
        pending.spawn(read_one(file, format));
    }

    while let Some(joined) = pending.join_next().await {
        let activities = joined.unwrap_or_else(|e| {
            tracing::warn!("File read task failed: {}", e);
            Vec::new()
        });
        status.merge(activities);
        tracing::debug!("{}", status.status_line());
        on_progress(&status);
    }

    tracing::info!("{}", status.status_line());
    on_complete(&status);
    status
}

async fn read_one(file: SourceFile, format: Option<FileFormat>) -> Vec<ActivityRecord> {
    let name = file.name();
    let Some(format) = format.or_else(|| FileFormat::from_filename(&name)) else {
        tracing::warn!("Skipping {}: unsupported file format", name);
        return Vec::new();
    };

    let bytes = match file.load().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", name, e);
            return Vec::new();
        }
    };

    let parsed = tokio::task::spawn_blocking(move || parse::parse(&bytes, format)).await;
    match parsed {
        Ok(Ok(activities)) => {
            tracing::debug!("{}: {} runs", name, activities.len());
            activities
        }
        Ok(Err(e)) => {
            tracing::warn!("Failed to parse {}: {}", name, e);
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("Parser for {} did not finish: {}", name, e);
            Vec::new()
        }
    }
}
