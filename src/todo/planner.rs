use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::internal_error::{InternalError, InternalResult};

use super::data::{Snapshot, UserToken};
use super::save_queue::SaveQueue;
use super::store::TaskStore;

/// Owner of every open planner document.
///
/// Documents are loaded on first use and then served from memory. A
/// mutation changes the in-memory copy and hands the result to the save
/// queue, so a store outage never loses or blocks local changes. Only
/// documents that exist in the store or have been changed are kept open.
pub struct Planner {
    store: Arc<dyn TaskStore>,
    saves: SaveQueue,
    documents: Mutex<HashMap<UserToken, Snapshot>>,
}

impl Planner {
    pub fn new(store: Arc<dyn TaskStore>, saves: SaveQueue) -> Planner {
        Planner {
            store,
            saves,
            documents: Mutex::new(HashMap::new()),
        }
    }

    // Cached documents are only ever replaced whole, so a panic while the
    // lock was held cannot leave one half-written.
    fn documents(&self) -> MutexGuard<'_, HashMap<UserToken, Snapshot>> {
        self.documents.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("recovering document cache after a panic");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Loads `token` into the cache. `Ok(None)` means nothing is stored yet.
    fn open<'a>(
        &self,
        documents: &'a mut HashMap<UserToken, Snapshot>,
        token: &UserToken,
    ) -> InternalResult<Option<&'a mut Snapshot>> {
        if !documents.contains_key(token) {
            match self.store.load_all(token) {
                Ok(snapshot) => {
                    documents.insert(token.clone(), snapshot);
                }
                Err(InternalError::NotFound) => return Ok(None),
                Err(e) => return Err(e),
            }
        }

        Ok(documents.get_mut(token))
    }

    /// Unknown tokens read as an empty document without opening one.
    pub fn read<T>(&self, token: &UserToken, f: impl FnOnce(&Snapshot) -> T) -> InternalResult<T> {
        let mut documents = self.documents();

        match self.open(&mut documents, token)? {
            Some(snapshot) => Ok(f(snapshot)),
            None => Ok(f(&Snapshot::default())),
        }
    }

    /// Applies `f` to the document and schedules a save if it succeeded.
    /// A failed mutation leaves the document as it was.
    pub fn mutate<T>(
        &self,
        token: &UserToken,
        f: impl FnOnce(&mut Snapshot) -> InternalResult<T>,
    ) -> InternalResult<T> {
        let mut documents = self.documents();

        let mut working = match self.open(&mut documents, token)? {
            Some(snapshot) => snapshot.clone(),
            None => Snapshot::default(),
        };
        let result = f(&mut working)?;

        let changed = match documents.get(token) {
            Some(current) => *current != working,
            None => working != Snapshot::default(),
        };

        if changed {
            if !documents.contains_key(token) {
                tracing::info!(%token, "starting a new document");
            }
            self.saves.enqueue(token.clone(), working.clone());
            documents.insert(token.clone(), working);
        }

        Ok(result)
    }

    /// The current document for `token`. Unlike `read`, an unknown token is
    /// reported as `NotFound` instead of being served as an empty document.
    pub fn document(&self, token: &UserToken) -> InternalResult<Snapshot> {
        let documents = self.documents();

        match documents.get(token) {
            Some(snapshot) => Ok(snapshot.clone()),
            None => self.store.load_all(token),
        }
    }

    /// Replaces the whole document and writes it without waiting for the
    /// debounce window. The new document is served even if the write fails.
    pub async fn replace_document(&self, token: &UserToken, snapshot: Snapshot) -> InternalResult<()> {
        let saved = {
            let mut documents = self.documents();
            let saved = self.saves.save_now(token.clone(), snapshot.clone());
            documents.insert(token.clone(), snapshot);
            saved
        };

        saved.await
    }

    pub async fn flush(&self) {
        self.saves.flush().await;
    }
}
