//! Table records and the in-memory registry holding them

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::TableError, timer::SessionTiming};

pub type TableId = u32;

/// One billiards table as the dashboard sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub is_active: bool,
    pub guest_count: u32,
    pub server: Option<String>,
    pub notes: Option<String>,
    pub session: SessionTiming,
    pub updated_at: DateTime<Utc>,
}

impl Table {
    pub fn new(id: TableId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            is_active: false,
            guest_count: 0,
            server: None,
            notes: None,
            session: SessionTiming::default(),
            updated_at: now,
        }
    }

    fn reset(&mut self) {
        self.is_active = false;
        self.guest_count = 0;
        self.server = None;
        self.notes = None;
        self.session = SessionTiming::default();
    }
}

/// Optional detail changes, `None` leaves a field untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableDetails {
    pub guest_count: Option<u32>,
    /// An empty string clears the assignment
    pub server: Option<String>,
    pub notes: Option<String>,
}

/// Stand-in for the hosted table store
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: Mutex<BTreeMap<TableId, Table>>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with `count` idle tables numbered from 1
    pub fn seeded(count: u32, now: DateTime<Utc>) -> Self {
        let tables = (1..=count)
            .map(|id| (id, Table::new(id, format!("Table {}", id), now)))
            .collect();
        Self {
            tables: Mutex::new(tables),
        }
    }

    pub fn list(&self) -> Result<Vec<Table>, TableError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    pub fn active(&self) -> Result<Vec<Table>, TableError> {
        Ok(self
            .lock()?
            .values()
            .filter(|table| table.is_active)
            .cloned()
            .collect())
    }

    pub fn get(&self, id: TableId) -> Result<Table, TableError> {
        self.lock()?.get(&id).cloned().ok_or(TableError::NotFound(id))
    }

    /// Start a fresh session of `duration_seconds`
    pub fn start_session(
        &self,
        id: TableId,
        duration_seconds: f64,
        now: DateTime<Utc>,
    ) -> Result<Table, TableError> {
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(TableError::InvalidDuration(duration_seconds));
        }

        self.modify(id, now, |table| {
            if table.is_active {
                return Err(TableError::AlreadyRunning(id));
            }
            table.is_active = true;
            table.session = SessionTiming {
                duration_seconds,
                start_time: Some(now),
                ..SessionTiming::default()
            };
            info!("Table {} started for {}s", id, duration_seconds);
            Ok(())
        })
    }

    pub fn pause(&self, id: TableId, now: DateTime<Utc>) -> Result<Table, TableError> {
        self.modify(id, now, |table| {
            if !table.is_active {
                return Err(TableError::NotRunning(id));
            }
            if table.session.is_paused {
                return Err(TableError::AlreadyPaused(id));
            }
            table.session.is_paused = true;
            table.session.pause_time = Some(now);
            info!("Table {} paused", id);
            Ok(())
        })
    }

    /// Resume a paused session, banking the finished segment
    pub fn resume(&self, id: TableId, now: DateTime<Utc>) -> Result<Table, TableError> {
        self.modify(id, now, |table| {
            if !table.is_active {
                return Err(TableError::NotRunning(id));
            }
            if !table.session.is_paused {
                return Err(TableError::NotPaused(id));
            }

            let session = &mut table.session;
            let segment_end = session.pause_time.unwrap_or(now);
            if let Some(start) = session.start_time {
                session.accumulated_seconds +=
                    (segment_end - start).num_milliseconds() as f64 / 1000.0;
            }
            session.start_time = Some(now);
            session.is_paused = false;
            session.pause_time = None;
            info!(
                "Table {} resumed with {}s banked",
                id, session.accumulated_seconds
            );
            Ok(())
        })
    }

    /// Add (or with a negative delta, remove) allotted time
    pub fn add_time(
        &self,
        id: TableId,
        delta_seconds: f64,
        now: DateTime<Utc>,
    ) -> Result<Table, TableError> {
        if !delta_seconds.is_finite() {
            return Err(TableError::InvalidDuration(delta_seconds));
        }

        self.modify(id, now, |table| {
            if !table.is_active {
                return Err(TableError::NotRunning(id));
            }
            let session = &mut table.session;
            session.duration_seconds = (session.duration_seconds + delta_seconds).max(0.0);
            info!(
                "Table {} duration adjusted by {}s to {}s",
                id, delta_seconds, session.duration_seconds
            );
            Ok(())
        })
    }

    pub fn update_details(
        &self,
        id: TableId,
        details: TableDetails,
        now: DateTime<Utc>,
    ) -> Result<Table, TableError> {
        self.modify(id, now, |table| {
            if let Some(guest_count) = details.guest_count {
                table.guest_count = guest_count;
            }
            if let Some(server) = details.server {
                table.server = (!server.trim().is_empty()).then_some(server);
            }
            if let Some(notes) = details.notes {
                table.notes = (!notes.trim().is_empty()).then_some(notes);
            }
            Ok(())
        })
    }

    pub fn end_session(&self, id: TableId, now: DateTime<Utc>) -> Result<Table, TableError> {
        self.modify(id, now, |table| {
            if !table.is_active {
                return Err(TableError::NotRunning(id));
            }
            table.reset();
            info!("Table {} session ended", id);
            Ok(())
        })
    }

    fn modify<F>(&self, id: TableId, now: DateTime<Utc>, change: F) -> Result<Table, TableError>
    where
        F: FnOnce(&mut Table) -> Result<(), TableError>,
    {
        let mut tables = self.lock()?;
        let table = tables.get_mut(&id).ok_or(TableError::NotFound(id))?;
        change(table)?;
        table.updated_at = now;
        Ok(table.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<TableId, Table>>, TableError> {
        self.tables
            .lock()
            .map_err(|e| TableError::LockPoisoned(e.to_string()))
    }
}
