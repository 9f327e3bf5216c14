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
    domain::{BlockInfo, Node, Reporter, SyncEvent, storage::Storage},
};
use fastrace::trace;

/// Bring the stored blocks into agreement with the node's canonical chain and return the
/// highest stored height afterwards.
///
/// Blocks are stored strictly in increasing height order, each one only if its parent hash matches
/// the hash of the stored block below. On a mismatch, stored blocks are retracted from the top
/// down to the highest height where stored and canonical block agree, then syncing resumes from
/// there.
#[trace]
pub async fn sync_blocks(
    node: &impl Node,
    storage: &impl Storage,
    reporter: &impl Reporter,
) -> Result<Option<u32>, Error> {
    let mut indexed_height = storage.get_highest_block().await?.map(|block| block.height);
    let node_height = node.highest_height().await.map_err(Error::node)?;
    reporter.report(SyncEvent::BlockSyncStarted {
        indexed_height,
        node_height,
    });

    // The stored tip itself may have been replaced without the height growing, or the node's
    // chain may have become shorter.
    if let Some(height) = indexed_height {
        indexed_height = Some(retract_blocks(height, node, storage, reporter).await?);
    }

    while indexed_height < Some(node_height) {
        let height = indexed_height.map_or(0, |height| height + 1);
        let block = node
            .block_at(height)
            .await
            .map_err(Error::node)?
            .ok_or(Error::MissingBlock {
                height,
                node_height,
            })?;

        if let Some(parent_height) = indexed_height {
            let parent_hash = storage
                .get_block(parent_height)
                .await?
                .map(|parent| parent.hash);

            if parent_hash != Some(block.parent_hash) {
                let trusted_height = retract_blocks(parent_height, node, storage, reporter).await?;

                // Nothing retracted means the node contradicts itself, probably because its chain
                // changed in between; the next cycle will retry.
                if trusted_height == parent_height {
                    return Err(Error::UnexpectedParent { height });
                }

                indexed_height = Some(trusted_height);
                continue;
            }
        }

        storage.save_block(&block).await?;
        reporter.report(SyncEvent::BlockIndexed {
            block: BlockInfo::from(&block),
            transaction_count: block.transactions.len(),
        });

        indexed_height = Some(height);
    }

    Ok(indexed_height)
}

/// Walk down from the given height, removing each stored block which differs from the node's
/// block at the same height, and return the first height where both agree.
///
/// The genesis block is never removed: if even the stored genesis block differs, the stored
/// chain cannot be trusted at all and [Error::ChainInconsistency] is returned.
#[trace]
async fn retract_blocks(
    mut height: u32,
    node: &impl Node,
    storage: &impl Storage,
    reporter: &impl Reporter,
) -> Result<u32, Error> {
    let mut retracted = 0;

    loop {
        let stored_block = storage.get_block(height).await?;
        let canonical_hash = node
            .block_at(height)
            .await
            .map_err(Error::node)?
            .map(|block| block.hash);

        match stored_block {
            Some(stored_block) if Some(stored_block.hash) == canonical_hash => {
                if retracted > 0 {
                    reporter.report(SyncEvent::RetractionBounded { height, retracted });
                }
                return Ok(height);
            }

            _ if height == 0 => return Err(Error::ChainInconsistency { retracted }),

            Some(stored_block) => {
                storage.remove_block(stored_block.hash).await?;
                reporter.report(SyncEvent::BlockRetracted(stored_block));
                retracted += 1;
            }

            // A gap, nothing to retract at this height.
            None => {}
        }

        height -= 1;
    }
}
