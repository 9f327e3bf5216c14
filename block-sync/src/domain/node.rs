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

use crate::domain::{Block, Transaction};
use std::error::Error as StdError;

/// Node abstraction: the source of truth for canonical blocks and pending transactions.
#[trait_variant::make(Send)]
pub trait Node
where
    Self: Clone + Send + Sync + 'static,
{
    /// Error type for all node operations. Implementations must fail rather than return stale
    /// data if the node cannot be reached.
    type Error: StdError + Send + Sync + 'static;

    /// Get the height of the best block.
    async fn highest_height(&self) -> Result<u32, Self::Error>;

    /// Get the canonical [Block] at the given height, if any.
    async fn block_at(&self, height: u32) -> Result<Option<Block>, Self::Error>;

    /// Get the currently pending [Transaction]s.
    async fn pending_transactions(&self) -> Result<Vec<Transaction>, Self::Error>;
}
