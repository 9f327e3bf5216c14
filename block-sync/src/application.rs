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

mod reconcile_pending;
mod schedule;
mod scheduler;
mod sync_blocks;

pub use reconcile_pending::reconcile_pending;
pub use schedule::*;
pub use scheduler::*;
pub use sync_blocks::sync_blocks;

use crate::domain::{Node, PendingSummary, Reporter, SyncEvent, storage::Storage};
use explorer_common::error::{BoxError, StdErrorExt};
use fastrace::{Span, future::FutureExt, prelude::SpanContext};
use serde::Deserialize;
use std::{error::Error as StdError, sync::Arc, time::Instant};
use thiserror::Error;
use tokio::{sync::Mutex, task::JoinError};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// When to run sync cycles after the initial one.
    pub schedule: Schedule,
}

/// Error possibly returned by a sync cycle or the [Scheduler].
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot get data from node")]
    Node(#[source] BoxError),

    #[error("cannot access storage")]
    Storage(#[from] sqlx::Error),

    #[error("node reports height {node_height}, but has no block at height {height}")]
    MissingBlock { height: u32, node_height: u32 },

    #[error("parent of block at height {height} from node does not match the node's block below")]
    UnexpectedParent { height: u32 },

    #[error(
        "indexed blocks diverge from the node's chain down to the genesis block \
         after retracting {retracted} blocks"
    )]
    ChainInconsistency { retracted: u32 },

    #[error("scheduler task failed")]
    Scheduler(#[from] JoinError),
}

impl Error {
    /// Whether this error cannot be fixed by retrying, i.e. requires operator intervention.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ChainInconsistency { .. })
    }

    fn node<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Error::Node(error.into())
    }
}

/// Outcome of a successful sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    /// Highest indexed block height after the cycle.
    pub height: Option<u32>,

    pub pending: PendingSummary,
}

/// Runs sync cycles, i.e. [sync_blocks] followed by [reconcile_pending], at most one at a time.
#[derive(Clone)]
pub struct Worker<N, S, R> {
    node: N,
    storage: S,
    reporter: R,
    in_flight: Arc<Mutex<()>>,
}

impl<N, S, R> Worker<N, S, R>
where
    N: Node,
    S: Storage,
    R: Reporter,
{
    pub fn new(node: N, storage: S, reporter: R) -> Self {
        Self {
            node,
            storage,
            reporter,
            in_flight: Default::default(),
        }
    }

    /// Run a sync cycle unless one is already running, in which case `None` is returned right
    /// away. Errors are reported before being returned.
    pub async fn sync(&self) -> Result<Option<CycleSummary>, Error> {
        let Ok(_in_flight) = self.in_flight.try_lock() else {
            self.reporter.report(SyncEvent::CycleSkipped);
            return Ok(None);
        };

        let result = self
            .run_cycle()
            .in_span(Span::root("sync-cycle", SpanContext::random()))
            .await;

        match result {
            Ok(summary) => Ok(Some(summary)),

            Err(error) => {
                self.reporter.report(SyncEvent::CycleFailed {
                    error: error.as_chain(),
                    fatal: error.is_fatal(),
                });
                Err(error)
            }
        }
    }

    async fn run_cycle(&self) -> Result<CycleSummary, Error> {
        let start = Instant::now();
        self.reporter.report(SyncEvent::CycleStarted);

        let height = sync_blocks(&self.node, &self.storage, &self.reporter).await?;
        let pending = reconcile_pending(&self.node, &self.storage, &self.reporter).await?;

        self.reporter.report(SyncEvent::CycleCompleted {
            height,
            duration: start.elapsed(),
        });

        Ok(CycleSummary { height, pending })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        application::{CycleSummary, Error, Worker},
        domain::{PendingSummary, SyncEvent},
        infra::testing::{MockNode, RecordingReporter, chain, storage, transaction},
    };
    use assert_matches::assert_matches;
    use explorer_common::error::BoxError;
    use tokio::task;

    #[tokio::test]
    async fn test_sync() -> Result<(), BoxError> {
        let node = MockNode::new(chain(b'a', 0..=3));
        node.set_pending(vec![transaction(1)]);
        let reporter = RecordingReporter::default();
        let worker = Worker::new(node, storage().await?, reporter.clone());

        let summary = worker.sync().await?;
        assert_eq!(
            summary,
            Some(CycleSummary {
                height: Some(3),
                pending: PendingSummary {
                    live: 1,
                    added: 1,
                    ..Default::default()
                }
            })
        );

        let events = reporter.events();
        assert_eq!(events.first(), Some(&SyncEvent::CycleStarted));
        assert_matches!(
            events.last(),
            Some(SyncEvent::CycleCompleted {
                height: Some(3),
                ..
            })
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_skipped() -> Result<(), BoxError> {
        let node = MockNode::new(chain(b'a', 0..=1));
        let reporter = RecordingReporter::default();
        let worker = Worker::new(node.clone(), storage().await?, reporter.clone());

        let gate = node.hold().await;
        let running = task::spawn({
            let worker = worker.clone();
            async move { worker.sync().await }
        });
        while !reporter.events().contains(&SyncEvent::CycleStarted) {
            task::yield_now().await;
        }

        let summary = worker.sync().await?;
        assert_eq!(summary, None);
        assert!(reporter.events().contains(&SyncEvent::CycleSkipped));

        drop(gate);
        let summary = running.await??;
        assert_matches!(summary, Some(CycleSummary { height: Some(1), .. }));

        // Not running anymore.
        let summary = worker.sync().await?;
        assert!(summary.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_failed() -> Result<(), BoxError> {
        let node = MockNode::new(chain(b'a', 0..=1));
        node.set_unreachable(true);
        let reporter = RecordingReporter::default();
        let worker = Worker::new(node, storage().await?, reporter.clone());

        let summary = worker.sync().await;
        assert_matches!(summary, Err(Error::Node(_)));
        assert_eq!(reporter.failed(), 1);
        assert_eq!(reporter.completed(), vec![]);

        Ok(())
    }
}
