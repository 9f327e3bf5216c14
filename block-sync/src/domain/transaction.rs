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

use explorer_common::domain::{PendingStatus, TransactionHash};
use serde_json::Value;

/// A transaction (parcel) as reported by the node, either pending or included in a block.
///
/// Only the hash is interpreted; the payload is kept as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub hash: TransactionHash,
    pub payload: Value,
}

/// A stored pending transaction record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: TransactionHash,
    pub payload: Value,
    pub status: PendingStatus,
}

impl PendingTransaction {
    /// Create a new [PendingTransaction] for the given [Transaction] with the given status.
    pub fn new(transaction: Transaction, status: PendingStatus) -> Self {
        let Transaction { hash, payload } = transaction;

        Self {
            hash,
            payload,
            status,
        }
    }
}
