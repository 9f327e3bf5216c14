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

use crate::domain::{Block, Node, Transaction};
use explorer_common::domain::{BlockHash, TransactionHash};
use fastrace::trace;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use thiserror::Error;

/// A [Node] implementation calling the JSON-RPC 2.0 API of a CodeChain node over HTTP.
#[derive(Debug, Clone)]
pub struct JsonRpcNode {
    client: Client,
    url: String,
    next_id: Arc<AtomicU64>,
}

impl JsonRpcNode {
    /// Create a new [JsonRpcNode] with the given [Config]. The node is not contacted.
    pub fn new(config: Config) -> Result<Self, Error> {
        let Config { url, timeout } = config;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Client)?;

        Ok(Self {
            client,
            url,
            next_id: Default::default(),
        })
    }

    async fn call<T>(&self, method: &'static str, params: Value) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id; "calling node");

        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|error| Error::request(method, error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status { method, status });
        }

        let response = response
            .json::<RpcResponse>()
            .await
            .map_err(|error| Error::request(method, error))?;

        if let Some(RpcError { code, message }) = response.error {
            return Err(Error::Rpc {
                method,
                code,
                message,
            });
        }

        serde_json::from_value(response.result).map_err(|source| Error::Decode { method, source })
    }
}

impl Node for JsonRpcNode {
    type Error = Error;

    #[trace]
    async fn highest_height(&self) -> Result<u32, Self::Error> {
        self.call("chain_getBestBlockNumber", json!([])).await
    }

    #[trace(properties = { "height": "{height}" })]
    async fn block_at(&self, height: u32) -> Result<Option<Block>, Self::Error> {
        let block = self
            .call::<Option<RpcBlock>>("chain_getBlockByNumber", json!([height]))
            .await?;

        block
            .map(|block| {
                if block.number != height {
                    return Err(Error::UnexpectedHeight {
                        requested: height,
                        actual: block.number,
                    });
                }

                block.try_into()
            })
            .transpose()
    }

    #[trace]
    async fn pending_transactions(&self) -> Result<Vec<Transaction>, Self::Error> {
        const METHOD: &str = "chain_getPendingParcels";

        self.call::<Vec<Value>>(METHOD, json!([]))
            .await?
            .into_iter()
            .map(|parcel| {
                transaction(parcel).map_err(|source| Error::Decode {
                    method: METHOD,
                    source,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub url: String,

    #[serde(with = "humantime_serde", default = "timeout_default")]
    pub timeout: Duration,
}

/// Error possibly returned by [JsonRpcNode] operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot create HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("node unreachable calling {method}")]
    Unreachable {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("timeout calling {method}")]
    Timeout {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot call {method}")]
    Request {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} calling {method}")]
    Status {
        method: &'static str,
        status: StatusCode,
    },

    #[error("{method} failed with code {code}: {message}")]
    Rpc {
        method: &'static str,
        code: i64,
        message: String,
    },

    #[error("cannot decode result of {method}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("requested block at height {requested}, but got one at height {actual}")]
    UnexpectedHeight { requested: u32, actual: u32 },
}

impl Error {
    fn request(method: &'static str, source: reqwest::Error) -> Self {
        if source.is_connect() {
            Error::Unreachable { method, source }
        } else if source.is_timeout() {
            Error::Timeout { method, source }
        } else {
            Error::Request { method, source }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,

    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlock {
    number: u32,
    hash: BlockHash,
    parent_hash: BlockHash,
    timestamp: u64,
    author: String,
    parcels: Vec<Value>,
}

impl TryFrom<RpcBlock> for Block {
    type Error = Error;

    fn try_from(block: RpcBlock) -> Result<Self, Self::Error> {
        let RpcBlock {
            number,
            hash,
            parent_hash,
            timestamp,
            author,
            parcels,
        } = block;

        let transactions = parcels
            .into_iter()
            .map(transaction)
            .collect::<Result<_, _>>()
            .map_err(|source| Error::Decode {
                method: "chain_getBlockByNumber",
                source,
            })?;

        Ok(Block {
            hash,
            height: number,
            parent_hash,
            author,
            timestamp,
            transactions,
        })
    }
}

/// Only the hash is interpreted, the whole parcel is kept as payload.
#[derive(Debug, Deserialize)]
struct RpcParcel {
    hash: TransactionHash,
}

fn transaction(parcel: Value) -> Result<Transaction, serde_json::Error> {
    let RpcParcel { hash } = RpcParcel::deserialize(&parcel)?;

    Ok(Transaction {
        hash,
        payload: parcel,
    })
}

fn timeout_default() -> Duration {
    Duration::from_secs(10)
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::Node,
        infra::node::{Config, Error, JsonRpcNode},
    };
    use assert_matches::assert_matches;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use explorer_common::error::BoxError;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::net::TcpListener;

    const HASH_0: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";
    const HASH_1: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";
    const HASH_2: &str = "0x2222222222222222222222222222222222222222222222222222222222222222";
    const HASH_3: &str = "0x3333333333333333333333333333333333333333333333333333333333333333";

    #[tokio::test]
    async fn test_node() -> Result<(), BoxError> {
        let url = serve(Router::new().route("/", post(codechain))).await?;
        let node = JsonRpcNode::new(config(url))?;

        let height = node.highest_height().await?;
        assert_eq!(height, 1);

        let block = node.block_at(1).await?;
        assert_matches!(block, Some(block) => {
            assert_eq!(block.height, 1);
            assert_eq!(block.hash.to_string(), HASH_1.trim_start_matches("0x"));
            assert_eq!(block.parent_hash.to_string(), HASH_0.trim_start_matches("0x"));
            assert_eq!(block.author, "tccq9h7vnl68frvqapzv3tujrxtxtwqdnxw6yamrrgd");
            assert_eq!(block.timestamp, 1_537_944_287);
            assert_eq!(block.transactions.len(), 1);
            assert_eq!(block.transactions[0].hash.to_string(), HASH_2.trim_start_matches("0x"));
            assert_eq!(block.transactions[0].payload["seq"], 7);
        });

        let block = node.block_at(2).await?;
        assert!(block.is_none());

        let pending_transactions = node.pending_transactions().await?;
        assert_eq!(pending_transactions.len(), 1);
        assert_eq!(
            pending_transactions[0].hash.to_string(),
            HASH_3.trim_start_matches("0x")
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_unexpected_height() -> Result<(), BoxError> {
        let url = serve(Router::new().route("/", post(codechain))).await?;
        let node = JsonRpcNode::new(config(url))?;

        let block = node.block_at(0).await;
        assert_matches!(
            block,
            Err(Error::UnexpectedHeight {
                requested: 0,
                actual: 1
            })
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_rpc_error() -> Result<(), BoxError> {
        let router = Router::new().route(
            "/",
            post(|Json(request): Json<Value>| async move {
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": request["id"],
                    "error": { "code": -32601, "message": "Method not found" }
                }))
            }),
        );
        let url = serve(router).await?;
        let node = JsonRpcNode::new(config(url))?;

        let height = node.highest_height().await;
        assert_matches!(
            height,
            Err(Error::Rpc { code: -32601, message, .. }) if message == "Method not found"
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_decode_error() -> Result<(), BoxError> {
        let router = Router::new().route(
            "/",
            post(|| async { Json(json!({ "jsonrpc": "2.0", "id": 0, "result": "tip" })) }),
        );
        let url = serve(router).await?;
        let node = JsonRpcNode::new(config(url))?;

        let height = node.highest_height().await;
        assert_matches!(
            height,
            Err(Error::Decode {
                method: "chain_getBestBlockNumber",
                ..
            })
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_status_error() -> Result<(), BoxError> {
        let router = Router::new().route("/", post(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let url = serve(router).await?;
        let node = JsonRpcNode::new(config(url))?;

        let pending_transactions = node.pending_transactions().await;
        assert_matches!(
            pending_transactions,
            Err(Error::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                ..
            })
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable() -> Result<(), BoxError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        drop(listener);
        let node = JsonRpcNode::new(config(url))?;

        let height = node.highest_height().await;
        assert_matches!(height, Err(Error::Unreachable { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_timeout() -> Result<(), BoxError> {
        let router = Router::new().route(
            "/",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "jsonrpc": "2.0", "id": 0, "result": 42 }))
            }),
        );
        let url = serve(router).await?;
        let node = JsonRpcNode::new(Config {
            url,
            timeout: Duration::from_millis(100),
        })?;

        let height = node.highest_height().await;
        assert_matches!(height, Err(Error::Timeout { .. }));

        Ok(())
    }

    #[test]
    fn test_config() -> Result<(), BoxError> {
        let config = serde_json::from_value::<Config>(json!({ "url": "http://localhost:8080" }))?;
        assert_eq!(config.timeout, Duration::from_secs(10));

        let config = serde_json::from_value::<Config>(
            json!({ "url": "http://localhost:8080", "timeout": "500ms" }),
        )?;
        assert_eq!(config.timeout, Duration::from_millis(500));

        Ok(())
    }

    fn config(url: String) -> Config {
        Config {
            url,
            timeout: Duration::from_secs(5),
        }
    }

    async fn serve(router: Router) -> Result<String, BoxError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        tokio::spawn(async move { axum::serve(listener, router).await });
        Ok(url)
    }

    /// A node with blocks 0 and 1, the latter containing a parcel, and a pending parcel.
    async fn codechain(Json(request): Json<Value>) -> Json<Value> {
        let result = match request["method"].as_str() {
            Some("chain_getBestBlockNumber") => json!(1),

            Some("chain_getBlockByNumber") => match request["params"][0].as_u64() {
                // Deliberately wrong to provoke a height mismatch.
                Some(0) => block(1, HASH_1, HASH_0, vec![]),
                Some(1) => block(1, HASH_1, HASH_0, vec![json!({ "hash": HASH_2, "seq": 7 })]),
                _ => Value::Null,
            },

            Some("chain_getPendingParcels") => json!([{ "hash": HASH_3, "seq": 8 }]),

            _ => Value::Null,
        };

        Json(json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "result": result
        }))
    }

    fn block(number: u32, hash: &str, parent_hash: &str, parcels: Vec<Value>) -> Value {
        json!({
            "number": number,
            "hash": hash,
            "parentHash": parent_hash,
            "timestamp": 1_537_944_287,
            "author": "tccq9h7vnl68frvqapzv3tujrxtxtwqdnxw6yamrrgd",
            "parcels": parcels,
        })
    }
}
