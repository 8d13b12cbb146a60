use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::{error::AppError, models::trip::TripRecord};

/// Where dashboards get their trip snapshot from. Called once per request.
#[async_trait]
pub trait TripSource: Send + Sync {
    async fn load(&self) -> Result<Vec<TripRecord>, AppError>;
}

/// Reads the fleet workbook exported as CSV, fresh on every load.
#[derive(Clone)]
pub struct CsvTripSource {
    path: Arc<PathBuf>,
}

impl CsvTripSource {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TripSource for CsvTripSource {
    async fn load(&self) -> Result<Vec<TripRecord>, AppError> {
        let raw = fs::read(self.path()).await?;
        let trips = parse_trips(&raw)?;
        debug!(
            "loaded {} trips from {}",
            trips.len(),
            self.path().display()
        );
        Ok(trips)
    }
}

/// Decodes CSV bytes into trips. Rows that cannot be decoded are skipped.
pub fn parse_trips(raw: &[u8]) -> Result<Vec<TripRecord>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(raw);

    // Fail early on a file without a header row.
    reader.headers()?;

    let mut trips = Vec::new();
    for (index, row) in reader.deserialize::<TripRecord>().enumerate() {
        match row {
            Ok(trip) => trips.push(trip),
            Err(err) => warn!("skipping trip row {}: {err}", index + 2),
        }
    }
    Ok(trips)
}

/// Fixed snapshot held in memory.
#[derive(Clone, Default)]
pub struct MemoryTripSource {
    trips: Arc<Vec<TripRecord>>,
}

impl MemoryTripSource {
    pub fn new(trips: Vec<TripRecord>) -> Self {
        Self {
            trips: Arc::new(trips),
        }
    }
}

#[async_trait]
impl TripSource for MemoryTripSource {
    async fn load(&self) -> Result<Vec<TripRecord>, AppError> {
        Ok(self.trips.as_ref().clone())
    }
}
