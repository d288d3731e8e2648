//! Series pool sampling without replacement, one rotation at a time.
//!
//! Every id is drawn once per rotation. When the rotation runs dry the next
//! draw refills it from the full pool first, so ids only repeat after every
//! other id has appeared since the last refill.

use std::collections::BTreeSet;

use rand::Rng;

use crate::domain::error::ForecastGameError;

#[derive(Debug, Clone)]
pub struct PoolSampler {
    all_ids: Vec<String>,
    unused_ids: Vec<String>,
    rotations: u64,
}

impl PoolSampler {
    /// Builds a pool from `ids`; duplicates collapse to one entry.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let all_ids: Vec<String> = ids
            .into_iter()
            .map(Into::into)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            unused_ids: all_ids.clone(),
            all_ids,
            rotations: 0,
        }
    }

    /// Draws one id not yet used in the current rotation.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<String, ForecastGameError> {
        if self.all_ids.is_empty() {
            return Err(ForecastGameError::PoolExhaustedPermanently);
        }

        if self.unused_ids.is_empty() {
            self.refill();
            tracing::debug!(
                rotation = self.rotations,
                pool_size = self.all_ids.len(),
                "series rotation exhausted, starting a new one"
            );
        }

        let idx = rng.gen_range(0..self.unused_ids.len());
        let id = self.unused_ids.swap_remove(idx);
        tracing::debug!(series_id = %id, remaining = self.unused_ids.len(), "drew series");
        Ok(id)
    }

    /// Starts a fresh rotation regardless of how much of the current one is left.
    pub fn reset(&mut self) {
        self.refill();
    }

    fn refill(&mut self) {
        self.unused_ids.clone_from(&self.all_ids);
        self.rotations += 1;
    }

    pub fn all_ids(&self) -> &[String] {
        &self.all_ids
    }

    pub fn remaining(&self) -> usize {
        self.unused_ids.len()
    }

    pub fn is_unused(&self, id: &str) -> bool {
        self.unused_ids.iter().any(|u| u == id)
    }

    /// Number of refills so far, automatic or explicit.
    pub fn rotations(&self) -> u64 {
        self.rotations
    }
}
