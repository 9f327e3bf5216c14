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

mod bytes;

pub use bytes::*;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Hash of a block; 32 bytes on the wire, hex-encoded with an optional `0x` prefix.
pub type BlockHash = ByteArray<32>;

/// Hash of a transaction (parcel); 32 bytes on the wire, hex-encoded with an optional `0x`
/// prefix.
pub type TransactionHash = ByteArray<32>;

/// Status of a stored pending transaction.
///
/// A confirmed transaction has no status: once it is found inside an indexed block its pending
/// record is deleted.
#[derive(
    Debug, Display, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type,
)]
#[cfg_attr(feature = "cloud", sqlx(type_name = "PENDING_STATUS"))]
pub enum PendingStatus {
    /// Reported as pending by the node.
    #[default]
    Pending,

    /// No longer reported as pending by the node and not found in any indexed block.
    Dead,
}
