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

use log::debug;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::{ops::Deref, time::Duration};
use thiserror::Error;

/// New type for `sqlx::PgPool`, allowing for some custom extensions as well as security.
///
/// To use as `&sqlx::PgPool` in `Query::execute`, use its `Deref` implementation: `&*pool` or
/// `pool.deref()`.
#[derive(Debug, Clone)]
pub struct PostgresPool(sqlx::PgPool);

impl PostgresPool {
    /// Try to create a new [PostgresPool] with the given config.
    pub async fn new(config: Config) -> Result<Self, Error> {
        let Config {
            host,
            port,
            dbname,
            user,
            password,
            sslmode,
            max_connections,
            idle_timeout,
            max_lifetime,
        } = config;

        let connect_options = PgConnectOptions::new()
            .host(&host)
            .port(port)
            .database(&dbname)
            .username(&user)
            .password(password.expose_secret())
            .ssl_mode(sslmode);

        let inner = PgPoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(Some(idle_timeout))
            .max_lifetime(max_lifetime)
            .connect_with(connect_options)
            .await?;
        let pool = PostgresPool(inner);
        debug!(pool:?; "created pool");

        Ok(pool)
    }
}

impl Deref for PostgresPool {
    type Target = sqlx::PgPool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Error possibly returned by [PostgresPool::new].
#[derive(Debug, Error)]
#[error("cannot create postgres connection pool")]
pub struct Error(#[from] sqlx::Error);

/// Configuration for [PostgresPool].
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,

    #[serde(default = "port_default")]
    pub port: u16,

    pub dbname: String,

    pub user: String,

    pub password: SecretString,

    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "sslmode_default")]
    pub sslmode: PgSslMode,

    #[serde(default = "max_connections_default")]
    pub max_connections: u32,

    #[serde(with = "humantime_serde", default = "idle_timeout_default")]
    pub idle_timeout: Duration,

    #[serde(with = "humantime_serde", default = "max_lifetime_default")]
    pub max_lifetime: Duration,
}

fn port_default() -> u16 {
    5432
}

fn sslmode_default() -> PgSslMode {
    PgSslMode::Prefer
}

fn max_connections_default() -> u32 {
    10
}

fn idle_timeout_default() -> Duration {
    Duration::from_secs(60)
}

fn max_lifetime_default() -> Duration {
    Duration::from_secs(5 * 60)
}
