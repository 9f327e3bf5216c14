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

use crate::domain::{Block, BlockInfo, PendingTransaction};
use explorer_common::domain::{BlockHash, TransactionHash};

/// Storage abstraction: the explorer index.
#[trait_variant::make(Send)]
pub trait Storage
where
    Self: Clone + Send + Sync + 'static,
{
    /// Get the highest stored [Block], `None` if no block has been stored yet.
    async fn get_highest_block(&self) -> Result<Option<BlockInfo>, sqlx::Error>;

    /// Get the stored [Block] at the given height.
    async fn get_block(&self, height: u32) -> Result<Option<BlockInfo>, sqlx::Error>;

    /// Save the given [Block] together with its transactions.
    async fn save_block(&self, block: &Block) -> Result<(), sqlx::Error>;

    /// Remove the [Block] with the given hash together with its transactions.
    async fn remove_block(&self, hash: BlockHash) -> Result<(), sqlx::Error>;

    /// Check whether a transaction with the given hash is contained in any stored [Block].
    async fn block_contains_transaction(
        &self,
        hash: TransactionHash,
    ) -> Result<bool, sqlx::Error>;

    /// Get all stored [PendingTransaction]s regardless of their status.
    async fn get_pending_transactions(&self) -> Result<Vec<PendingTransaction>, sqlx::Error>;

    /// Insert the given [PendingTransaction] or replace payload and status of an existing one.
    async fn save_pending_transaction(
        &self,
        pending_transaction: &PendingTransaction,
    ) -> Result<(), sqlx::Error>;

    /// Delete the [PendingTransaction] with the given hash.
    async fn delete_pending_transaction(&self, hash: TransactionHash) -> Result<(), sqlx::Error>;
}
