// This file is part of explorer-sync.
// Copyright (C) 2025 Kodebox
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Test doubles and fixtures.

use crate::{
    domain::{Block, Node, Reporter, SyncEvent, Transaction},
    infra::storage::sqlite::SqliteStorage,
};
use explorer_common::{
    domain::{BlockHash, ByteArray},
    error::BoxError,
    infra::{
        migrations,
        pool::sqlite::{Config, SqlitePool},
    },
};
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use std::{ops::RangeInclusive, sync::Arc};
use thiserror::Error;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock as AsyncRwLock};

/// A scriptable in-memory [Node].
#[derive(Clone)]
pub struct MockNode {
    state: Arc<RwLock<State>>,
    gate: Arc<AsyncRwLock<()>>,
}

struct State {
    chain: Vec<Block>,
    highest_height: Option<u32>,
    pending: Vec<Transaction>,
    unreachable: bool,
    fail_at: u32,
}

impl MockNode {
    pub fn new(chain: Vec<Block>) -> Self {
        let state = State {
            chain,
            highest_height: None,
            pending: vec![],
            unreachable: false,
            fail_at: u32::MAX,
        };

        Self {
            state: Arc::new(RwLock::new(state)),
            gate: Default::default(),
        }
    }

    pub fn set_chain(&self, chain: Vec<Block>) {
        self.state.write().chain = chain;
    }

    /// Report the given height instead of the one of the last block.
    pub fn set_highest_height(&self, height: u32) {
        self.state.write().highest_height = Some(height);
    }

    pub fn set_pending(&self, pending: Vec<Transaction>) {
        self.state.write().pending = pending;
    }

    /// Fail all operations.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.write().unreachable = unreachable;
    }

    /// Fail getting blocks at or above the given height.
    pub fn fail_at(&self, height: u32) {
        self.state.write().fail_at = height;
    }

    /// Block getting the highest height until the returned guard is dropped.
    pub async fn hold(&self) -> OwnedRwLockWriteGuard<()> {
        self.gate.clone().write_owned().await
    }
}

#[derive(Debug, Error)]
#[error("node unreachable")]
pub struct MockNodeError;

impl Node for MockNode {
    type Error = MockNodeError;

    async fn highest_height(&self) -> Result<u32, Self::Error> {
        let _gate = self.gate.read().await;

        let state = self.state.read();
        if state.unreachable {
            return Err(MockNodeError);
        }

        let height = state
            .highest_height
            .or_else(|| state.chain.last().map(|block| block.height))
            .unwrap_or_default();
        Ok(height)
    }

    async fn block_at(&self, height: u32) -> Result<Option<Block>, Self::Error> {
        let state = self.state.read();
        if state.unreachable || height >= state.fail_at {
            return Err(MockNodeError);
        }

        Ok(state.chain.get(height as usize).cloned())
    }

    async fn pending_transactions(&self) -> Result<Vec<Transaction>, Self::Error> {
        let state = self.state.read();
        if state.unreachable {
            return Err(MockNodeError);
        }

        Ok(state.pending.clone())
    }
}

/// A [Reporter] recording all events.
#[derive(Clone, Default)]
pub struct RecordingReporter(Arc<Mutex<Vec<SyncEvent>>>);

impl RecordingReporter {
    pub fn events(&self) -> Vec<SyncEvent> {
        self.0.lock().clone()
    }

    /// Heights of retracted blocks in order.
    pub fn retracted(&self) -> Vec<u32> {
        self.0
            .lock()
            .iter()
            .filter_map(|event| match event {
                SyncEvent::BlockRetracted(block) => Some(block.height),
                _ => None,
            })
            .collect()
    }

    /// Heights of completed cycles in order.
    pub fn completed(&self) -> Vec<Option<u32>> {
        self.0
            .lock()
            .iter()
            .filter_map(|event| match event {
                SyncEvent::CycleCompleted { height, .. } => Some(*height),
                _ => None,
            })
            .collect()
    }

    pub fn failed(&self) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|event| matches!(event, SyncEvent::CycleFailed { .. }))
            .count()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: SyncEvent) {
        self.0.lock().push(event);
    }
}

/// A chain of blocks tagged with the given byte, starting at genesis.
pub fn chain(tag: u8, heights: RangeInclusive<u32>) -> Vec<Block> {
    let mut blocks = Vec::<Block>::new();

    for height in heights {
        let block = match blocks.last() {
            Some(parent) => block(tag, height, parent),
            None => block(tag, height, &genesis_parent()),
        };
        blocks.push(block);
    }

    blocks
}

/// A block tagged with the given byte on top of the given parent.
pub fn block(tag: u8, height: u32, parent: &Block) -> Block {
    let mut hash = [0; 32];
    hash[0] = tag;
    hash[1..5].copy_from_slice(&height.to_be_bytes());

    Block {
        hash: ByteArray(hash),
        height,
        parent_hash: parent.hash,
        author: format!("author-{}", tag as char),
        timestamp: 1_537_944_287 + height as u64,
        transactions: vec![],
    }
}

pub fn transaction(n: u8) -> Transaction {
    let hash = ByteArray([n; 32]);

    Transaction {
        hash,
        payload: json!({ "hash": hash, "seq": n }),
    }
}

/// A [SqliteStorage] on a migrated in-memory database.
pub async fn storage() -> Result<SqliteStorage, BoxError> {
    let pool = SqlitePool::new(Config::default()).await?;
    migrations::sqlite::run(&pool).await?;
    Ok(SqliteStorage::new(pool))
}

fn genesis_parent() -> Block {
    Block {
        hash: BlockHash::default(),
        height: 0,
        parent_hash: BlockHash::default(),
        author: String::new(),
        timestamp: 0,
        transactions: vec![],
    }
}
