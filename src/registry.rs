//! In-memory map from challenge FQDN to the record ID hosting.de assigned
//!
//! Only kept for observability during the life of the process; deleting a
//! record matches on name, type and content and never needs the ID.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct RecordRegistry {
    ids: Mutex<HashMap<String, String>>,
}

impl RecordRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // The guard never lives across an await point.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores the record ID for `fqdn`, returning the one it replaced
    pub fn insert(&self, fqdn: &str, record_id: String) -> Option<String> {
        self.lock().insert(fqdn.to_string(), record_id)
    }

    /// Drops the entry for `fqdn`; a missing entry is not an error
    pub fn remove(&self, fqdn: &str) -> Option<String> {
        self.lock().remove(fqdn)
    }

    pub fn get(&self, fqdn: &str) -> Option<String> {
        self.lock().get(fqdn).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

//==============================================================================
// Tests
//==============================================================================
