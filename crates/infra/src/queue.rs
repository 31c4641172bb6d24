//! # 通知トリガーキュー
//!
//! 通知 ID を運ぶトリガーメッセージの受信を抽象化する。
//!
//! ## Redis 実装
//!
//! Redis リストを FIFO キューとして使う。投入側は `RPUSH`、ワーカーは `LPOP`。
//! 空のときは `wait` だけ待ってから `None` を返す（ポーリング）。
//! `BLPOP` は `ConnectionManager` の応答タイムアウトと干渉するため使わない。
//!
//! 取り出したメッセージは処理結果にかかわらずキューへ戻さない。

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::error::InfraError;

/// トリガーキュートレイト
#[async_trait]
pub trait TriggerQueue: Send + Sync {
    /// メッセージを 1 件取り出す
    ///
    /// キューが空なら最大 `wait` 待って `Ok(None)` を返す。
    async fn receive(&self, wait: Duration) -> Result<Option<Vec<u8>>, InfraError>;
}

/// Redis リストによるトリガーキュー
#[derive(Clone)]
pub struct RedisTriggerQueue {
    conn:       ConnectionManager,
    queue_name: String,
}

impl RedisTriggerQueue {
    /// Redis に接続してキューを作成する
    pub async fn new(redis_url: &str, queue_name: impl Into<String>) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            queue_name: queue_name.into(),
        })
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// メッセージを末尾に追加する（ローカル実行・テスト用）
    pub async fn push(&self, payload: &[u8]) -> Result<(), InfraError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.rpush(&self.queue_name, payload).await?;
        Ok(())
    }
}

#[async_trait]
impl TriggerQueue for RedisTriggerQueue {
    async fn receive(&self, wait: Duration) -> Result<Option<Vec<u8>>, InfraError> {
        let mut conn = self.conn.clone();
        let payload: Option<Vec<u8>> = conn.lpop(&self.queue_name, None).await?;

        if payload.is_none() {
            tokio::time::sleep(wait).await;
        }
        Ok(payload)
    }
}
