#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use forge_lambda::adapters::counter_store::{CounterEntry, CounterStore, CounterStoreError};
use forge_lambda::adapters::object_store::{
    ObjectStoreError, ObjectVersion, VersionMarker, VersionPage, VersionedObjectStore,
};
use forge_lambda::adapters::stack_status::{StackStatusError, StackStatusSource};

/// In-memory counter store with SSM-style versioning: every `put` bumps the
/// version by one.
#[derive(Default)]
pub struct InMemoryCounterStore {
    entries: Mutex<BTreeMap<String, (String, i64)>>,
}

impl InMemoryCounterStore {
    pub fn seeded(name: &str, expression: &str) -> Self {
        let store = Self::default();
        store
            .entries
            .lock()
            .expect("poisoned mutex")
            .insert(name.to_string(), (expression.to_string(), 1));
        store
    }

    pub fn version_of(&self, name: &str) -> Option<i64> {
        self.entries
            .lock()
            .expect("poisoned mutex")
            .get(name)
            .map(|(_, version)| *version)
    }
}

impl CounterStore for InMemoryCounterStore {
    fn get(&self, name: &str) -> Result<CounterEntry, CounterStoreError> {
        let entries = self.entries.lock().expect("poisoned mutex");
        let (expression, version) = entries
            .get(name)
            .ok_or_else(|| CounterStoreError::NotFound(name.to_string()))?;
        Ok(CounterEntry {
            name: name.to_string(),
            expression: expression.clone(),
            version: *version,
        })
    }

    fn put(
        &self,
        name: &str,
        expression: &str,
        _description: &str,
    ) -> Result<i64, CounterStoreError> {
        let mut entries = self.entries.lock().expect("poisoned mutex");
        let entry = entries
            .entry(name.to_string())
            .or_insert_with(|| (String::new(), 0));
        entry.0 = expression.to_string();
        entry.1 += 1;
        Ok(entry.1)
    }
}

/// A bucket holding plain keys; listing pages through them `page_size` at a time.
pub struct InMemoryBucket {
    keys: Mutex<Vec<String>>,
    page_size: usize,
}

impl InMemoryBucket {
    pub fn with_keys(keys: &[&str], page_size: usize) -> Self {
        Self {
            keys: Mutex::new(keys.iter().map(|key| key.to_string()).collect()),
            page_size,
        }
    }

    pub fn remaining(&self) -> Vec<String> {
        self.keys.lock().expect("poisoned mutex").clone()
    }
}

impl VersionedObjectStore for InMemoryBucket {
    fn list_versions(
        &self,
        _bucket: &str,
        prefix: &str,
        marker: Option<&VersionMarker>,
    ) -> Result<VersionPage, ObjectStoreError> {
        let after = marker.and_then(|marker| marker.key_marker.clone());
        let matching: Vec<String> = self
            .keys
            .lock()
            .expect("poisoned mutex")
            .iter()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| after.as_ref().map_or(true, |after| *key > after))
            .cloned()
            .collect();

        let page: Vec<ObjectVersion> = matching
            .iter()
            .take(self.page_size)
            .map(|key| ObjectVersion {
                key: key.clone(),
                version_id: None,
            })
            .collect();
        let next = (matching.len() > self.page_size).then(|| VersionMarker {
            key_marker: page.last().map(|version| version.key.clone()),
            version_id_marker: None,
        });
        Ok(VersionPage {
            versions: page,
            next,
        })
    }

    fn delete_versions(
        &self,
        _bucket: &str,
        versions: &[ObjectVersion],
    ) -> Result<(), ObjectStoreError> {
        self.keys
            .lock()
            .expect("poisoned mutex")
            .retain(|key| !versions.iter().any(|version| &version.key == key));
        Ok(())
    }
}

pub struct FixedStackStatus(pub &'static str);

impl StackStatusSource for FixedStackStatus {
    fn stack_status(&self, _stack_id: &str) -> Result<String, StackStatusError> {
        Ok(self.0.to_string())
    }
}
