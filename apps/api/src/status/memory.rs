use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{StatusError, StatusStore};
use crate::models::job::StatusRecord;

/// In-memory status store with the same terminal guard as the database.
#[derive(Default)]
pub struct MemoryStatusStore {
    records: Mutex<HashMap<Uuid, StatusRecord>>,
    /// Every accepted write, in order.
    history: Mutex<Vec<StatusRecord>>,
}

impl MemoryStatusStore {
    pub fn history(&self, job_id: Uuid) -> Vec<StatusRecord> {
        self.history
            .lock()
            .expect("lock")
            .iter()
            .filter(|r| r.job_id == job_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn create(&self, record: &StatusRecord) -> Result<(), StatusError> {
        let mut records = self.records.lock().expect("lock");
        if !records.contains_key(&record.job_id) {
            records.insert(record.job_id, record.clone());
            self.history.lock().expect("lock").push(record.clone());
        }
        Ok(())
    }

    async fn update(&self, record: &StatusRecord) -> Result<(), StatusError> {
        let mut records = self.records.lock().expect("lock");
        match records.get(&record.job_id) {
            Some(existing) if !existing.status.is_terminal() => {
                records.insert(record.job_id, record.clone());
                self.history.lock().expect("lock").push(record.clone());
                Ok(())
            }
            _ => Err(StatusError::NotWritable(record.job_id)),
        }
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<StatusRecord>, StatusError> {
        Ok(self.records.lock().expect("lock").get(&job_id).cloned())
    }
}
