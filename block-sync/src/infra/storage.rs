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

#[cfg(feature = "cloud")]
pub mod postgres;
pub mod sqlite;

use crate::domain::{BlockInfo, PendingTransaction};
use explorer_common::domain::{ByteArray, PendingStatus};
use serde_json::Value;
use sqlx::{FromRow, types::Json};

#[derive(Debug, FromRow)]
struct BlockRow {
    hash: Vec<u8>,
    height: i64,
    parent_hash: Vec<u8>,
}

impl TryFrom<BlockRow> for BlockInfo {
    type Error = sqlx::Error;

    fn try_from(row: BlockRow) -> Result<Self, Self::Error> {
        let BlockRow {
            hash,
            height,
            parent_hash,
        } = row;

        let height = u32::try_from(height).map_err(|error| sqlx::Error::Decode(error.into()))?;

        Ok(BlockInfo {
            hash: byte_array(hash)?,
            height,
            parent_hash: byte_array(parent_hash)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct PendingTransactionRow {
    hash: Vec<u8>,
    payload: Json<Value>,
    status: PendingStatus,
}

impl TryFrom<PendingTransactionRow> for PendingTransaction {
    type Error = sqlx::Error;

    fn try_from(row: PendingTransactionRow) -> Result<Self, Self::Error> {
        let PendingTransactionRow {
            hash,
            payload,
            status,
        } = row;

        Ok(PendingTransaction {
            hash: byte_array(hash)?,
            payload: payload.0,
            status,
        })
    }
}

fn byte_array<const N: usize>(bytes: Vec<u8>) -> Result<ByteArray<N>, sqlx::Error> {
    ByteArray::try_from(bytes).map_err(|error| sqlx::Error::Decode(error.into()))
}
