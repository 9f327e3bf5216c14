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
    domain::{Block, BlockInfo, PendingTransaction, storage::Storage},
    infra::storage::{BlockRow, PendingTransactionRow},
};
use explorer_common::{
    domain::{BlockHash, TransactionHash},
    infra::pool::postgres::PostgresPool,
};
use fastrace::trace;
use futures::{TryStreamExt, future};
use indoc::indoc;
use sqlx::{Postgres, QueryBuilder, Row, types::Json};
use std::iter;

type Tx = sqlx::Transaction<'static, Postgres>;

/// Postgres based implementation of [Storage].
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PostgresPool,
}

impl PostgresStorage {
    /// Create a new [PostgresStorage].
    pub fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

impl Storage for PostgresStorage {
    #[trace]
    async fn get_highest_block(&self) -> Result<Option<BlockInfo>, sqlx::Error> {
        let query = indoc! {"
            SELECT hash, height, parent_hash
            FROM blocks
            ORDER BY height DESC
            LIMIT 1
        "};

        sqlx::query_as::<_, BlockRow>(query)
            .fetch_optional(&*self.pool)
            .await?
            .map(BlockInfo::try_from)
            .transpose()
    }

    #[trace(properties = { "height": "{height}" })]
    async fn get_block(&self, height: u32) -> Result<Option<BlockInfo>, sqlx::Error> {
        let query = indoc! {"
            SELECT hash, height, parent_hash
            FROM blocks
            WHERE height = $1
        "};

        sqlx::query_as::<_, BlockRow>(query)
            .bind(height as i64)
            .fetch_optional(&*self.pool)
            .await?
            .map(BlockInfo::try_from)
            .transpose()
    }

    #[trace]
    async fn save_block(&self, block: &Block) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        save_block(block, &mut tx).await?;
        tx.commit().await
    }

    #[trace(properties = { "hash": "{hash}" })]
    async fn remove_block(&self, hash: BlockHash) -> Result<(), sqlx::Error> {
        // Transactions are deleted by cascade.
        let query = indoc! {"
            DELETE FROM blocks
            WHERE hash = $1
        "};

        sqlx::query(query)
            .bind(hash.as_ref())
            .execute(&*self.pool)
            .await?;

        Ok(())
    }

    #[trace(properties = { "hash": "{hash}" })]
    async fn block_contains_transaction(
        &self,
        hash: TransactionHash,
    ) -> Result<bool, sqlx::Error> {
        let query = indoc! {"
            SELECT EXISTS (
                SELECT 1
                FROM transactions
                WHERE hash = $1
            )
        "};

        let (contained,) = sqlx::query_as::<_, (bool,)>(query)
            .bind(hash.as_ref())
            .fetch_one(&*self.pool)
            .await?;

        Ok(contained)
    }

    #[trace]
    async fn get_pending_transactions(&self) -> Result<Vec<PendingTransaction>, sqlx::Error> {
        let query = indoc! {"
            SELECT hash, payload, status
            FROM pending_transactions
        "};

        sqlx::query_as::<_, PendingTransactionRow>(query)
            .fetch(&*self.pool)
            .and_then(|row| future::ready(PendingTransaction::try_from(row)))
            .try_collect::<Vec<_>>()
            .await
    }

    #[trace]
    async fn save_pending_transaction(
        &self,
        pending_transaction: &PendingTransaction,
    ) -> Result<(), sqlx::Error> {
        let query = indoc! {"
            INSERT INTO pending_transactions (hash, payload, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (hash) DO UPDATE
            SET payload = excluded.payload, status = excluded.status
        "};

        sqlx::query(query)
            .bind(pending_transaction.hash.as_ref())
            .bind(Json(&pending_transaction.payload))
            .bind(pending_transaction.status)
            .execute(&*self.pool)
            .await?;

        Ok(())
    }

    #[trace(properties = { "hash": "{hash}" })]
    async fn delete_pending_transaction(&self, hash: TransactionHash) -> Result<(), sqlx::Error> {
        let query = indoc! {"
            DELETE FROM pending_transactions
            WHERE hash = $1
        "};

        sqlx::query(query)
            .bind(hash.as_ref())
            .execute(&*self.pool)
            .await?;

        Ok(())
    }
}

#[trace]
async fn save_block(block: &Block, tx: &mut Tx) -> Result<(), sqlx::Error> {
    let query = indoc! {"
        INSERT INTO blocks (
            hash,
            height,
            parent_hash,
            author,
            timestamp
        )
    "};

    let timestamp =
        i64::try_from(block.timestamp).map_err(|error| sqlx::Error::Encode(error.into()))?;

    let block_id = QueryBuilder::new(query)
        .push_values(iter::once(block), |mut q, block| {
            let Block {
                hash,
                height,
                parent_hash,
                author,
                ..
            } = block;
            q.push_bind(hash.as_ref())
                .push_bind(*height as i64)
                .push_bind(parent_hash.as_ref())
                .push_bind(author)
                .push_bind(timestamp);
        })
        .push(" RETURNING id")
        .build()
        .fetch_one(&mut **tx)
        .await?
        .try_get::<i64, _>("id")?;

    if !block.transactions.is_empty() {
        let query = indoc! {"
            INSERT INTO transactions (
                block_id,
                hash,
                block_index,
                payload
            )
        "};

        QueryBuilder::new(query)
            .push_values(
                block.transactions.iter().enumerate(),
                |mut q, (index, transaction)| {
                    q.push_bind(block_id)
                        .push_bind(transaction.hash.as_ref())
                        .push_bind(index as i32)
                        .push_bind(Json(&transaction.payload));
                },
            )
            .build()
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}
