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

use anyhow::Context;
use block_sync::{
    application::{Scheduler, Worker},
    config::Config,
    infra::{self, node::JsonRpcNode, reporter::TelemetryReporter},
};
use explorer_common::{config::ConfigExt, infra::migrations, telemetry};
use log::{error, info, warn};
use std::panic;
use tokio::{
    select,
    signal::unix::{SignalKind, signal},
};

#[tokio::main]
async fn main() {
    // Initialize logging.
    telemetry::init_logging();

    // Replace the default panic hook with one that uses structured logging at ERROR level.
    panic::set_hook(Box::new(|panic| error!(panic:%; "process panicked")));

    // Run and log any error.
    if let Err(error) = run().await {
        let backtrace = error.backtrace();
        let error = format!("{error:#}");
        error!(error, backtrace:%; "process exited with ERROR")
    }
}

async fn run() -> anyhow::Result<()> {
    // Load configuration.
    let Config {
        run_migrations,
        application_config,
        infra_config,
        telemetry_config:
            telemetry::Config {
                tracing_config,
                metrics_config,
            },
    } = Config::load().context("load configuration")?;

    // Initialize tracing and metrics.
    telemetry::init_tracing(tracing_config);
    telemetry::init_metrics(metrics_config);

    info!(
        run_migrations,
        application_config:?,
        infra_config:?;
        "starting"
    );

    let infra::Config {
        storage_config,
        node_config,
    } = infra_config;

    let node = JsonRpcNode::new(node_config).context("create JsonRpcNode")?;

    #[cfg(not(feature = "cloud"))]
    let storage = {
        use explorer_common::infra::pool::sqlite::SqlitePool;

        let pool = SqlitePool::new(storage_config)
            .await
            .context("create DB pool for Sqlite")?;
        if run_migrations {
            migrations::sqlite::run(&pool)
                .await
                .context("run Sqlite migrations")?;
        }
        infra::storage::sqlite::SqliteStorage::new(pool)
    };

    #[cfg(feature = "cloud")]
    let storage = {
        use explorer_common::infra::pool::postgres::PostgresPool;

        let pool = PostgresPool::new(storage_config)
            .await
            .context("create DB pool for Postgres")?;
        if run_migrations {
            migrations::postgres::run(&pool)
                .await
                .context("run Postgres migrations")?;
        }
        infra::storage::postgres::PostgresStorage::new(pool)
    };

    let worker = Worker::new(node, storage, TelemetryReporter::new());
    let scheduler = Scheduler::start(application_config, worker)
        .await
        .context("run initial sync cycle")?;
    let stop_handle = scheduler.stop_handle();
    let mut join = Box::pin(scheduler.join());

    let mut sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;

    select! {
        result = &mut join => {
            result.context("run sync cycles")?;
            warn!("sync cycles ended unexpectedly");
            return Ok(());
        }

        _ = sigterm.recv() => info!("received SIGTERM"),

        _ = tokio::signal::ctrl_c() => info!("received Ctrl-C"),
    }

    // Let a running cycle complete.
    stop_handle.stop();
    join.await.context("complete sync cycle")?;
    info!("stopped");

    Ok(())
}
