//! Read-only simulation record sets.
//!
//! A [`RecordSet`] reads its source the first time its rows are requested and
//! keeps them for the rest of the run. Loading happens under a mutex, so
//! concurrent metric evaluations referencing the same set read it once.

pub mod schema;
pub mod source;

pub use schema::{DelayRecord, PassengerRecord, RecordSchema, TripRecord};
pub use source::RecordSource;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tracing::info;

use crate::config::RecordSources;
use crate::error::QueryError;

enum Slot<T> {
    Unloaded(RecordSource),
    Loaded(Arc<[T]>),
}

/// A lazily loaded, immutable set of rows.
pub struct RecordSet<T> {
    slot: Mutex<Slot<T>>,
}

impl<T: RecordSchema> RecordSet<T> {
    pub fn new(source: RecordSource) -> Self {
        Self {
            slot: Mutex::new(Slot::Unloaded(source)),
        }
    }

    /// A set whose rows are already in memory.
    pub fn from_rows(rows: Vec<T>) -> Self {
        Self {
            slot: Mutex::new(Slot::Loaded(rows.into())),
        }
    }

    /// Returns the rows, reading the source on first call.
    ///
    /// A failed read leaves the set unloaded.
    pub fn rows(&self) -> Result<Arc<[T]>, QueryError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let rows: Arc<[T]> = match &*slot {
            Slot::Loaded(rows) => return Ok(Arc::clone(rows)),
            Slot::Unloaded(source) => {
                let start = Instant::now();
                let rows = source.read::<T>()?;
                info!(
                    kind = T::KIND,
                    path = %source.path().display(),
                    rows = rows.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Record set loaded"
                );
                rows.into()
            }
        };
        *slot = Slot::Loaded(Arc::clone(&rows));
        Ok(rows)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(
            *self.slot.lock().unwrap_or_else(PoisonError::into_inner),
            Slot::Loaded(_)
        )
    }
}

/// The three record sets of one simulation run.
pub struct RecordStore {
    pub passengers: RecordSet<PassengerRecord>,
    pub delays: RecordSet<DelayRecord>,
    pub trips: RecordSet<TripRecord>,
}

impl RecordStore {
    /// Binds the store to its sources without reading anything yet.
    pub fn open(sources: RecordSources) -> Self {
        Self {
            passengers: RecordSet::new(sources.passengers),
            delays: RecordSet::new(sources.delays),
            trips: RecordSet::new(sources.trips),
        }
    }

    pub fn from_rows(
        passengers: Vec<PassengerRecord>,
        delays: Vec<DelayRecord>,
        trips: Vec<TripRecord>,
    ) -> Self {
        Self {
            passengers: RecordSet::from_rows(passengers),
            delays: RecordSet::from_rows(delays),
            trips: RecordSet::from_rows(trips),
        }
    }
}
