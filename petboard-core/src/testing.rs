//! Testing utilities for the dashboard engine.
//!
//! `TreeSource` is an in-memory document tree implementing the remote-tree
//! seams, so scanner and settings tests (and integration tests) run without
//! any network access. Fetches and mutations are recorded for assertions.

use crate::scan::BlockSource;
use crate::settings::BlockSink;
use notion::{Block, NewBlock};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// An in-memory block tree with scripted failures.
#[derive(Default)]
pub struct TreeSource {
    children: HashMap<String, Vec<Block>>,
    blocks: HashMap<String, Block>,
    /// Node ids whose child listing fails with a 502.
    pub failing: HashSet<String>,
    fetches: Mutex<Vec<String>>,
    mutations: Mutex<Vec<String>>,
}

impl TreeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block under `parent`. The block is also retrievable by id.
    pub fn add(&mut self, parent: &str, id: &str, kind: &str, text: &str, has_children: bool) {
        let block = Block {
            id: id.to_string(),
            kind: kind.to_string(),
            plain_text: text.to_string(),
            equation_text: String::new(),
            has_children,
        };
        self.blocks.insert(id.to_string(), block.clone());
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(block);
    }

    /// Ids whose children were fetched, in order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    /// Mutations applied, in order, as `"append:<parent>"` / `"delete:<id>"`.
    pub fn mutations(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }

    fn service_error(&self) -> notion::Error {
        notion::Error::Api {
            status: 502,
            message: "bad gateway".to_string(),
        }
    }
}

impl BlockSource for TreeSource {
    async fn children_of(&self, block_id: &str) -> Result<Vec<Block>, notion::Error> {
        self.fetches.lock().unwrap().push(block_id.to_string());
        if self.failing.contains(block_id) {
            return Err(self.service_error());
        }
        Ok(self.children.get(block_id).cloned().unwrap_or_default())
    }

    async fn block(&self, block_id: &str) -> Result<Block, notion::Error> {
        if self.failing.contains(block_id) {
            return Err(self.service_error());
        }
        self.blocks
            .get(block_id)
            .cloned()
            .ok_or(notion::Error::Api {
                status: 404,
                message: "block not found".to_string(),
            })
    }
}

impl BlockSink for TreeSource {
    async fn append(
        &self,
        parent_id: &str,
        children: &[NewBlock],
    ) -> Result<Vec<Block>, notion::Error> {
        self.mutations
            .lock()
            .unwrap()
            .push(format!("append:{parent_id}"));
        // Synthesize created blocks with predictable ids.
        let base = self.mutations.lock().unwrap().len() * 100;
        Ok(children
            .iter()
            .enumerate()
            .map(|(i, _)| Block {
                id: format!("created-{}", base + i),
                kind: "block".to_string(),
                plain_text: String::new(),
                equation_text: String::new(),
                has_children: false,
            })
            .collect())
    }

    async fn delete(&self, block_id: &str) -> Result<(), notion::Error> {
        self.mutations
            .lock()
            .unwrap()
            .push(format!("delete:{block_id}"));
        Ok(())
    }
}
