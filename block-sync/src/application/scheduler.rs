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
    application::{Config, Error, Schedule, Worker},
    domain::{Node, Reporter, SyncEvent, storage::Storage},
};
use tokio::{select, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Runs sync cycles: one right away, then recurring ones according to the configured [Schedule].
#[derive(Debug)]
pub struct Scheduler {
    cancel_token: CancellationToken,
    task: JoinHandle<Result<(), Error>>,
}

impl Scheduler {
    /// Run the initial sync cycle and spawn a task running the recurring ones, unless the initial
    /// cycle failed fatally. A recurring cycle only starts after the previous one has finished.
    pub async fn start<N, S, R>(config: Config, worker: Worker<N, S, R>) -> Result<Self, Error>
    where
        N: Node,
        S: Storage,
        R: Reporter,
    {
        // Non-fatal failures have already been reported and are retried on the next tick.
        match worker.sync().await {
            Err(error) if error.is_fatal() => return Err(error),
            _ => {}
        }

        let cancel_token = CancellationToken::new();
        let task = tokio::spawn(run(config.schedule, worker, cancel_token.clone()));

        Ok(Self { cancel_token, task })
    }

    /// Cancel the recurring sync cycles. A running cycle is completed. Can be called any number
    /// of times.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Get a [StopHandle] for stopping this [Scheduler] from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.cancel_token.clone())
    }

    /// Wait until the recurring sync cycles end, either after being stopped or because of a
    /// fatal error, which is returned.
    pub async fn join(self) -> Result<(), Error> {
        self.task.await?
    }
}

#[derive(Debug, Clone)]
pub struct StopHandle(CancellationToken);

impl StopHandle {
    /// See [Scheduler::stop].
    pub fn stop(&self) {
        self.0.cancel();
    }
}

async fn run<N, S, R>(
    schedule: Schedule,
    worker: Worker<N, S, R>,
    cancel_token: CancellationToken,
) -> Result<(), Error>
where
    N: Node,
    S: Storage,
    R: Reporter,
{
    worker.reporter.report(SyncEvent::SchedulingStarted {
        schedule: schedule.to_string(),
    });

    let mut ticker = schedule.ticker();

    loop {
        select! {
            biased;

            _ = cancel_token.cancelled() => {
                worker.reporter.report(SyncEvent::SchedulingStopped);
                return Ok(());
            }

            _ = ticker.tick() => {}
        }

        // Failures have already been reported; only fatal ones end the sync cycles.
        match worker.sync().await {
            Err(error) if error.is_fatal() => return Err(error),
            _ => {}
        }
    }
}
