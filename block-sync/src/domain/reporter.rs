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

use crate::domain::BlockInfo;
use std::time::Duration;

/// Receives the [SyncEvent]s of the synchronization; injected instead of logging directly.
pub trait Reporter
where
    Self: Clone + Send + Sync + 'static,
{
    /// Report the given event.
    fn report(&self, event: SyncEvent);
}

/// Something noteworthy which happened while synchronizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A cycle has started.
    CycleStarted,

    /// Block synchronization has started.
    BlockSyncStarted {
        indexed_height: Option<u32>,
        node_height: u32,
    },

    /// A block has been indexed.
    BlockIndexed {
        block: BlockInfo,
        transaction_count: usize,
    },

    /// An indexed block has been removed because it is no longer canonical.
    BlockRetracted(BlockInfo),

    /// Retracting stopped at the given height, where index and node agree again.
    RetractionBounded { height: u32, retracted: u32 },

    /// Pending transactions have been reconciled.
    PendingReconciled(PendingSummary),

    /// A cycle has completed.
    CycleCompleted {
        height: Option<u32>,
        duration: Duration,
    },

    /// A cycle has been skipped, because the previous one is still running.
    CycleSkipped,

    /// A cycle has failed. Fatal failures cannot be fixed by retrying.
    CycleFailed { error: String, fatal: bool },

    /// Recurring cycles have been scheduled.
    SchedulingStarted { schedule: String },

    /// Recurring cycles have been stopped.
    SchedulingStopped,
}

/// Outcome of reconciling pending transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingSummary {
    /// Distinct transactions reported pending by the node.
    pub live: usize,

    /// Stored pending transaction records before reconciling.
    pub indexed: usize,

    /// Newly stored pending transactions.
    pub added: usize,

    /// Records deleted, because their transaction is contained in a block.
    pub confirmed: usize,

    /// Records newly marked dead.
    pub marked_dead: usize,

    /// Dead records marked pending again.
    pub revived: usize,

    /// Dead records after reconciling.
    pub dead: usize,
}

/// A [Reporter] that "does nothing".
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn report(&self, _event: SyncEvent) {}
}
