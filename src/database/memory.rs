use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex},
};

use eyre::Result;

use crate::model::Medal;

use super::{MedalReader, MedalStore};

/// In-memory medal storage.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<BTreeMap<i32, Medal>>>,
    failing: Arc<HashSet<i32>>,
}

impl MemoryStore {
    /// Storing any of the given medal ids fails.
    pub fn failing(ids: impl IntoIterator<Item = i32>) -> Self {
        Self {
            failing: Arc::new(ids.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn rows(&self) -> BTreeMap<i32, Medal> {
        self.rows.lock().unwrap().clone()
    }
}

impl MedalStore for MemoryStore {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn replace_medal(&self, medal: &Medal) -> Result<()> {
        let medal_id = medal
            .medal_id
            .ok_or_else(|| eyre!("cannot store medal without a valid medal id"))?;

        ensure!(!self.failing.contains(&medal_id), "connection lost");

        self.rows.lock().unwrap().insert(medal_id, medal.clone());

        Ok(())
    }

    async fn prune_medals(&self, keep: &[i32]) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|medal_id, _| keep.contains(medal_id));

        Ok((before - rows.len()) as u64)
    }
}

impl MedalReader for MemoryStore {
    async fn fetch_medals(&self) -> Result<Vec<Medal>> {
        Ok(self.rows().into_values().collect())
    }

    async fn fetch_medal(&self, medal_id: i32) -> Result<Option<Medal>> {
        Ok(self.rows.lock().unwrap().get(&medal_id).cloned())
    }
}
