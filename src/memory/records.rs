use rand::seq::{index, SliceRandom};
use rand::Rng;
use serde::Serialize;

use crate::domain::Record;
use crate::error::{BatchError, Result};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    records: Vec<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResultSetProgress {
    pub total: usize,
    pub prepared: usize,
    pub complete: usize,
    pub pending: usize,
}

impl RecordSet {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, idx: usize) -> Option<&Record> {
        self.records.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Record> {
        self.records.get_mut(idx)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.records.iter_mut()
    }

    pub fn into_inner(self) -> Vec<Record> {
        self.records
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.records.shuffle(rng);
    }

    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R, size: usize) -> Result<Self> {
        if size > self.records.len() {
            return Err(BatchError::Configuration(format!(
                "debug sample of {size} records requested from {} records",
                self.records.len()
            )));
        }
        let picked = index::sample(rng, self.records.len(), size);
        let mut slots: Vec<Option<Record>> = self.records.into_iter().map(Some).collect();
        let records = picked
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect();
        Ok(Self { records })
    }

    pub fn progress(&self) -> ResultSetProgress {
        let prepared = self.records.iter().filter(|r| r.prepared().is_some()).count();
        let complete = self.records.iter().filter(|r| r.is_complete()).count();
        ResultSetProgress {
            total: self.records.len(),
            prepared,
            complete,
            pending: self.records.len() - complete,
        }
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}
