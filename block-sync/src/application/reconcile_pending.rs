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

use crate::{
    application::Error,
    domain::{
        Node, PendingSummary, PendingTransaction, Reporter, SyncEvent, Transaction,
        storage::Storage,
    },
};
use explorer_common::domain::{PendingStatus, TransactionHash};
use fastrace::trace;
use std::collections::HashMap;

/// Bring the stored pending transactions into agreement with the node's pending transactions:
/// - stored ones no longer pending at the node are deleted if contained in a stored block, else
///   marked dead,
/// - new ones are stored as pending,
/// - dead ones pending again at the node are revived.
///
/// Running this again with unchanged pending transactions at the node changes nothing.
#[trace]
pub async fn reconcile_pending(
    node: &impl Node,
    storage: &impl Storage,
    reporter: &impl Reporter,
) -> Result<PendingSummary, Error> {
    // Keyed by hash; the node might report a transaction more than once.
    let live = node
        .pending_transactions()
        .await
        .map_err(Error::node)?
        .into_iter()
        .map(|transaction| (transaction.hash, transaction))
        .collect::<HashMap<TransactionHash, Transaction>>();

    let indexed = storage
        .get_pending_transactions()
        .await?
        .into_iter()
        .map(|pending_transaction| (pending_transaction.hash, pending_transaction))
        .collect::<HashMap<TransactionHash, PendingTransaction>>();

    let mut summary = PendingSummary {
        live: live.len(),
        indexed: indexed.len(),
        ..Default::default()
    };

    // Drop confirmed or vanished ones before reviving.
    for pending_transaction in indexed.values() {
        if live.contains_key(&pending_transaction.hash) {
            continue;
        }

        if storage
            .block_contains_transaction(pending_transaction.hash)
            .await?
        {
            storage
                .delete_pending_transaction(pending_transaction.hash)
                .await?;
            summary.confirmed += 1;
        } else {
            if pending_transaction.status != PendingStatus::Dead {
                let dead = PendingTransaction {
                    status: PendingStatus::Dead,
                    ..pending_transaction.clone()
                };
                storage.save_pending_transaction(&dead).await?;
                summary.marked_dead += 1;
            }
            summary.dead += 1;
        }
    }

    // Add new ones.
    for transaction in live.values() {
        if !indexed.contains_key(&transaction.hash) {
            let pending_transaction =
                PendingTransaction::new(transaction.clone(), PendingStatus::Pending);
            storage.save_pending_transaction(&pending_transaction).await?;
            summary.added += 1;
        }
    }

    // Revive dead ones.
    for transaction in live.values() {
        let is_dead = indexed
            .get(&transaction.hash)
            .is_some_and(|pending_transaction| pending_transaction.status == PendingStatus::Dead);

        if is_dead {
            let pending_transaction =
                PendingTransaction::new(transaction.clone(), PendingStatus::Pending);
            storage.save_pending_transaction(&pending_transaction).await?;
            summary.revived += 1;
        }
    }

    reporter.report(SyncEvent::PendingReconciled(summary));

    Ok(summary)
}
