//! JSON-file backed collections
//!
//! Every aggregate is cached in memory and mirrored to a JSON array on disk.
//! Mutations build the next snapshot, persist it, and only then swap it in,
//! so a failed write never leaves the cache ahead of the file.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Error;
use crate::Result;

/// A record that can live in a [`JsonCollection`].
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Key: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Human-readable name used in not-found errors
    const NAME: &'static str;

    fn key(&self) -> Self::Key;
}

/// Thread-safe keyed collection with file persistence
pub struct JsonCollection<T: Entity> {
    items: Arc<RwLock<HashMap<T::Key, T>>>,
    file_path: PathBuf,
}

impl<T: Entity> Clone for JsonCollection<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            file_path: self.file_path.clone(),
        }
    }
}

impl<T: Entity> JsonCollection<T> {
    /// Load the collection from `file_path`, starting empty if the file is absent.
    pub async fn open(file_path: PathBuf) -> Result<Self> {
        let items = if file_path.exists() {
            let content = tokio::fs::read_to_string(&file_path).await.map_err(|e| {
                Error::Storage(format!("Failed to read {}: {}", file_path.display(), e))
            })?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                let loaded: Vec<T> = serde_json::from_str(&content).map_err(|e| {
                    Error::Storage(format!("Failed to parse {}: {}", file_path.display(), e))
                })?;
                loaded.into_iter().map(|item| (item.key(), item)).collect()
            }
        } else {
            HashMap::new()
        };

        tracing::debug!(path = %file_path.display(), count = items.len(), "collection loaded");

        Ok(Self {
            items: Arc::new(RwLock::new(items)),
            file_path,
        })
    }

    pub async fn get(&self, key: T::Key) -> Option<T> {
        self.items.read().await.get(&key).cloned()
    }

    pub async fn list(&self) -> Vec<T> {
        self.items.read().await.values().cloned().collect()
    }

    pub async fn filter<P>(&self, predicate: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        self.items
            .read()
            .await
            .values()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }

    pub async fn find<P>(&self, predicate: P) -> Option<T>
    where
        P: Fn(&T) -> bool,
    {
        self.items
            .read()
            .await
            .values()
            .find(|item| predicate(item))
            .cloned()
    }

    pub async fn any<P>(&self, predicate: P) -> bool
    where
        P: Fn(&T) -> bool,
    {
        self.items.read().await.values().any(predicate)
    }

    /// Insert or replace a record.
    pub async fn insert(&self, item: T) -> Result<T> {
        let mut items = self.items.write().await;
        let mut next = items.clone();
        next.insert(item.key(), item.clone());

        self.persist_snapshot(&next).await?;
        *items = next;
        Ok(item)
    }

    /// Insert several records with a single write.
    pub async fn insert_many(&self, records: Vec<T>) -> Result<Vec<T>> {
        let mut items = self.items.write().await;
        let mut next = items.clone();
        for record in &records {
            next.insert(record.key(), record.clone());
        }

        self.persist_snapshot(&next).await?;
        *items = next;
        Ok(records)
    }

    /// Build a record while holding the write lock, so it can derive
    /// sequence numbers from the current contents.
    pub async fn insert_with<F>(&self, build: F) -> Result<T>
    where
        F: FnOnce(&HashMap<T::Key, T>) -> Result<T>,
    {
        let mut items = self.items.write().await;
        let item = build(&items)?;
        let mut next = items.clone();
        next.insert(item.key(), item.clone());

        self.persist_snapshot(&next).await?;
        *items = next;
        Ok(item)
    }

    /// Mutate a single record in place. Errors returned by `apply` abort the
    /// write.
    pub async fn update<F, R>(&self, key: T::Key, apply: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> Result<R>,
    {
        let mut items = self.items.write().await;
        let mut record = items
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::not_found(T::NAME, format!("{:?}", key)))?;
        let result = apply(&mut record)?;

        let mut next = items.clone();
        next.insert(key, record);

        self.persist_snapshot(&next).await?;
        *items = next;
        Ok(result)
    }

    /// Mutate every record matching `predicate`, returning how many changed.
    pub async fn update_where<P, F>(&self, predicate: P, mut apply: F) -> Result<usize>
    where
        P: Fn(&T) -> bool,
        F: FnMut(&mut T),
    {
        let mut items = self.items.write().await;
        let mut next = items.clone();
        let mut changed = 0usize;
        for item in next.values_mut().filter(|item| predicate(item)) {
            apply(item);
            changed += 1;
        }
        if changed == 0 {
            return Ok(0);
        }

        self.persist_snapshot(&next).await?;
        *items = next;
        Ok(changed)
    }

    pub async fn remove(&self, key: T::Key) -> Result<Option<T>> {
        let mut items = self.items.write().await;
        let Some(removed) = items.get(&key).cloned() else {
            return Ok(None);
        };

        let mut next = items.clone();
        next.remove(&key);

        self.persist_snapshot(&next).await?;
        *items = next;
        Ok(Some(removed))
    }

    pub async fn remove_where<P>(&self, predicate: P) -> Result<Vec<T>>
    where
        P: Fn(&T) -> bool,
    {
        let mut items = self.items.write().await;
        let removed: Vec<T> = items
            .values()
            .filter(|item| predicate(item))
            .cloned()
            .collect();
        if removed.is_empty() {
            return Ok(removed);
        }

        let mut next = items.clone();
        for item in &removed {
            next.remove(&item.key());
        }

        self.persist_snapshot(&next).await?;
        *items = next;
        Ok(removed)
    }

    async fn persist_snapshot(&self, items: &HashMap<T::Key, T>) -> Result<()> {
        let records: Vec<&T> = items.values().collect();
        let content = serde_json::to_string_pretty(&records)
            .map_err(|e| Error::Storage(format!("Failed to serialize {}: {}", T::NAME, e)))?;

        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
        }

        let parent = self.file_path.parent().unwrap_or_else(|| Path::new("."));
        let temp_path = parent.join(format!(".{}.tmp", Uuid::new_v4().as_hyphenated()));

        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write temp file: {}", e)))?;

        if let Err(err) = tokio::fs::rename(&temp_path, &self.file_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::Storage(format!(
                "Failed to finalize write of {}: {}",
                self.file_path.display(),
                err
            )));
        }

        Ok(())
    }
}
