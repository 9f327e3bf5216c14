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

use crate::domain::{PendingSummary, Reporter, SyncEvent};
use log::{debug, error, info, warn};
use metrics::{Counter, Gauge, counter, gauge};

/// A [Reporter] emitting structured log records and updating metrics.
#[derive(Clone)]
pub struct TelemetryReporter {
    metrics: Metrics,
}

impl TelemetryReporter {
    pub fn new() -> Self {
        Self {
            metrics: Metrics::new(),
        }
    }
}

impl Default for TelemetryReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for TelemetryReporter {
    fn report(&self, event: SyncEvent) {
        match event {
            SyncEvent::CycleStarted => debug!("sync cycle started"),

            SyncEvent::BlockSyncStarted {
                indexed_height,
                node_height,
            } => {
                match indexed_height {
                    Some(indexed_height) => {
                        info!(indexed_height, node_height; "syncing blocks");
                        self.metrics.block_height.set(indexed_height);
                    }

                    None => info!(node_height; "syncing blocks, no block synchronized yet"),
                }
                self.metrics.node_block_height.set(node_height);
            }

            SyncEvent::BlockIndexed {
                block,
                transaction_count,
            } => {
                info!(
                    hash:% = block.hash,
                    height = block.height,
                    parent_hash:% = block.parent_hash,
                    transaction_count;
                    "block synchronized"
                );
                self.metrics.block_height.set(block.height);
            }

            SyncEvent::BlockRetracted(block) => {
                warn!(hash:% = block.hash, height = block.height; "block retracted");
                self.metrics.retracted_blocks.increment(1);
                self.metrics.block_height.set(block.height.saturating_sub(1));
            }

            SyncEvent::RetractionBounded { height, retracted } => {
                warn!(height, retracted; "retraction stopped at common block");
            }

            SyncEvent::PendingReconciled(summary) => {
                let PendingSummary {
                    live,
                    indexed,
                    added,
                    confirmed,
                    marked_dead,
                    revived,
                    dead,
                } = summary;

                if marked_dead > 0 {
                    warn!(marked_dead; "pending transactions vanished without being confirmed");
                }
                info!(
                    live,
                    indexed,
                    added,
                    confirmed,
                    marked_dead,
                    revived,
                    dead;
                    "pending transactions reconciled"
                );

                self.metrics.pending_transactions.set(live as f64);
                self.metrics.dead_pending_transactions.set(dead as f64);
            }

            SyncEvent::CycleCompleted { height, duration } => {
                debug!(height:?, duration:?; "sync cycle completed");
            }

            SyncEvent::CycleSkipped => {
                warn!("sync cycle skipped, previous one still running");
            }

            SyncEvent::CycleFailed { error, fatal } => {
                error!(error, fatal; "sync cycle failed");
                self.metrics.failed_cycles.increment(1);
            }

            SyncEvent::SchedulingStarted { schedule } => {
                info!(schedule; "scheduling sync cycles");
            }

            SyncEvent::SchedulingStopped => info!("sync cycles stopped"),
        }
    }
}

#[derive(Clone)]
struct Metrics {
    block_height: Gauge,
    node_block_height: Gauge,
    retracted_blocks: Counter,
    pending_transactions: Gauge,
    dead_pending_transactions: Gauge,
    failed_cycles: Counter,
}

impl Metrics {
    fn new() -> Self {
        Self {
            block_height: gauge!("explorer_sync_block_height"),
            node_block_height: gauge!("explorer_sync_node_block_height"),
            retracted_blocks: counter!("explorer_sync_retracted_blocks"),
            pending_transactions: gauge!("explorer_sync_pending_transactions"),
            dead_pending_transactions: gauge!("explorer_sync_dead_pending_transactions"),
            failed_cycles: counter!("explorer_sync_failed_cycles"),
        }
    }
}
