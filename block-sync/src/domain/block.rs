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

use crate::domain::Transaction;
use explorer_common::domain::BlockHash;

/// Relevant block data from the perspective of the explorer index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub hash: BlockHash,
    pub height: u32,
    pub parent_hash: BlockHash,
    pub author: String,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
}

/// Identity of a stored [Block]: what is needed to chain and compare blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub hash: BlockHash,
    pub height: u32,
    pub parent_hash: BlockHash,
}

impl From<&Block> for BlockInfo {
    fn from(block: &Block) -> Self {
        Self {
            hash: block.hash,
            height: block.height,
            parent_hash: block.parent_hash,
        }
    }
}
