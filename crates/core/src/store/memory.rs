// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `KeyStore` implementation
//!
//! The reference store for tests and single-host deployments. Expiry is lazy:
//! an entry past its deadline is dropped the next time any operation touches
//! it, driven by the injected clock.

use super::{KeyStore, Namespace, SetMode, StoreError, StoreKey};
use crate::clock::{delta, Clock};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Clone, Debug)]
enum Value {
    Str(String),
    Set(HashSet<String>),
}

#[derive(Clone, Debug)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

/// Mutex-guarded map with TTL semantics
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drop the entry if its deadline has passed; returns whether it is live
    fn prune(entries: &mut HashMap<String, Entry>, key: &str, now: DateTime<Utc>) -> bool {
        match entries.get(key) {
            Some(entry) => match entry.expires_at {
                Some(deadline) if deadline <= now => {
                    entries.remove(key);
                    false
                }
                _ => true,
            },
            None => false,
        }
    }

    fn str_value<'a>(
        entries: &'a HashMap<String, Entry>,
        key: &StoreKey,
    ) -> Result<Option<&'a String>, StoreError> {
        match entries.get(&key.to_string()) {
            None => Ok(None),
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s)),
            Some(_) => Err(StoreError::WrongKind {
                key: key.to_string(),
            }),
        }
    }

    fn set_value<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &StoreKey,
    ) -> Result<Option<&'a mut Entry>, StoreError> {
        match entries.get_mut(&key.to_string()) {
            None => Ok(None),
            Some(entry) => match entry.value {
                Value::Set(_) => Ok(Some(entry)),
                Value::Str(_) => Err(StoreError::WrongKind {
                    key: key.to_string(),
                }),
            },
        }
    }
}

impl KeyStore for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        Self::prune(&mut entries, &key.to_string(), now);
        Ok(Self::str_value(&entries, key)?.cloned())
    }

    fn set(
        &self,
        key: &StoreKey,
        value: &str,
        mode: SetMode,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let rendered = key.to_string();
        let live = Self::prune(&mut entries, &rendered, now);

        let allowed = match mode {
            SetMode::Always => true,
            SetMode::IfAbsent => !live,
            SetMode::IfPresent => live,
        };
        if !allowed {
            return Ok(false);
        }
        if live {
            // Kind check before overwriting
            Self::str_value(&entries, key)?;
        }

        entries.insert(
            rendered,
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: ttl.map(|t| now + delta(t)),
            },
        );
        Ok(true)
    }

    fn set_if_value(
        &self,
        key: &StoreKey,
        expected: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let rendered = key.to_string();
        Self::prune(&mut entries, &rendered, now);

        match Self::str_value(&entries, key)? {
            Some(current) if current == expected => {
                entries.insert(
                    rendered,
                    Entry {
                        value: Value::Str(value.to_string()),
                        expires_at: ttl.map(|t| now + delta(t)),
                    },
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete(&self, key: &StoreKey) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let rendered = key.to_string();
        Self::prune(&mut entries, &rendered, now);
        Ok(entries.remove(&rendered).is_some())
    }

    fn delete_if_value(&self, key: &StoreKey, expected: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let rendered = key.to_string();
        Self::prune(&mut entries, &rendered, now);

        match Self::str_value(&entries, key)? {
            Some(current) if current == expected => {
                entries.remove(&rendered);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn expire(&self, key: &StoreKey, ttl: Duration) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let rendered = key.to_string();
        if !Self::prune(&mut entries, &rendered, now) {
            return Ok(false);
        }
        if let Some(entry) = entries.get_mut(&rendered) {
            entry.expires_at = Some(now + delta(ttl));
        }
        Ok(true)
    }

    fn expire_if_value(
        &self,
        key: &StoreKey,
        expected: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let rendered = key.to_string();
        Self::prune(&mut entries, &rendered, now);

        let matches = matches!(Self::str_value(&entries, key)?, Some(current) if current == expected);
        if !matches {
            return Ok(false);
        }
        if let Some(entry) = entries.get_mut(&rendered) {
            entry.expires_at = Some(now + delta(ttl));
        }
        Ok(true)
    }

    fn ttl(&self, key: &StoreKey) -> Result<Option<Duration>, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let rendered = key.to_string();
        if !Self::prune(&mut entries, &rendered, now) {
            return Ok(None);
        }
        Ok(entries
            .get(&rendered)
            .and_then(|entry| entry.expires_at)
            .and_then(|deadline| (deadline - now).to_std().ok()))
    }

    fn exists(&self, key: &StoreKey) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        Ok(Self::prune(&mut entries, &key.to_string(), now))
    }

    fn sadd(&self, key: &StoreKey, members: &[String]) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let rendered = key.to_string();
        let live = Self::prune(&mut entries, &rendered, now);

        if !live {
            let set: HashSet<String> = members.iter().cloned().collect();
            let added = set.len();
            entries.insert(
                rendered,
                Entry {
                    value: Value::Set(set),
                    expires_at: None,
                },
            );
            return Ok(added);
        }

        match Self::set_value(&mut entries, key)? {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => {
                let mut added = 0;
                for member in members {
                    if set.insert(member.clone()) {
                        added += 1;
                    }
                }
                Ok(added)
            }
            _ => Err(StoreError::WrongKind {
                key: key.to_string(),
            }),
        }
    }

    fn srem(&self, key: &StoreKey, members: &[String]) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let rendered = key.to_string();
        if !Self::prune(&mut entries, &rendered, now) {
            return Ok(0);
        }

        let mut removed = 0;
        let mut now_empty = false;
        if let Some(Entry {
            value: Value::Set(set),
            ..
        }) = Self::set_value(&mut entries, key)?
        {
            for member in members {
                if set.remove(member) {
                    removed += 1;
                }
            }
            now_empty = set.is_empty();
        }
        if now_empty {
            entries.remove(&rendered);
        }
        Ok(removed)
    }

    fn spop(&self, key: &StoreKey, count: usize) -> Result<Vec<String>, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let rendered = key.to_string();
        if !Self::prune(&mut entries, &rendered, now) {
            return Ok(Vec::new());
        }

        let mut popped = Vec::new();
        let mut now_empty = false;
        if let Some(Entry {
            value: Value::Set(set),
            ..
        }) = Self::set_value(&mut entries, key)?
        {
            // Sorted so tests see a deterministic pop order
            let mut members: Vec<String> = set.iter().cloned().collect();
            members.sort();
            for member in members.into_iter().take(count) {
                set.remove(&member);
                popped.push(member);
            }
            now_empty = set.is_empty();
        }
        if now_empty {
            entries.remove(&rendered);
        }
        Ok(popped)
    }

    fn smembers(&self, key: &StoreKey) -> Result<Vec<String>, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let rendered = key.to_string();
        if !Self::prune(&mut entries, &rendered, now) {
            return Ok(Vec::new());
        }
        match Self::set_value(&mut entries, key)? {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => {
                let mut members: Vec<String> = set.iter().cloned().collect();
                members.sort();
                Ok(members)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn scard(&self, key: &StoreKey) -> Result<usize, StoreError> {
        Ok(self.smembers(key)?.len())
    }

    fn sismember(&self, key: &StoreKey, member: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let rendered = key.to_string();
        if !Self::prune(&mut entries, &rendered, now) {
            return Ok(false);
        }
        match Self::set_value(&mut entries, key)? {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => Ok(set.contains(member)),
            _ => Ok(false),
        }
    }

    fn keys(&self, namespace: &Namespace, prefix: &str) -> Result<Vec<StoreKey>, StoreError> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let ns_prefix = format!("{}::", namespace);

        let rendered: Vec<String> = entries.keys().cloned().collect();
        let mut found = Vec::new();
        for full in rendered {
            if !Self::prune(&mut entries, &full, now) {
                continue;
            }
            if let Some(path) = full.strip_prefix(&ns_prefix) {
                if path.starts_with(prefix) {
                    found.push(StoreKey::from_path(namespace, path));
                }
            }
        }
        found.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(found)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
