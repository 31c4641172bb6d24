//! # Dispatcher
//!
//! 通知 1 件の配信（run）を実行する。
//!
//! ## 流れ
//!
//! 1. コネクションを 1 本取得する（どの経路で抜けてもドロップで返却される）
//! 2. 通知レコードを取得する。失敗したら完了記録を書かずに終了
//! 3. 受信者を列挙し、受信者ごとに件名・本文を差し込んで送信する
//!    （同時送信数は `send_concurrency` まで。1 件の失敗は他に影響しない）
//! 4. 全送信結果を StatusFinalizer に渡して完了記録を書く
//!
//! ## 配信期限
//!
//! `run_deadline` を過ぎると送信中のものはキャンセルされる。
//! それまでに集まった結果は `truncated` として記録し、
//! 1 件も集まっていなければ `DeadlineExceeded` で終了する（書き込みなし）。

use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use techconf_domain::{
    notification::{Notification, NotificationId, NotificationStatus, SendOutcome},
    personalize::personalize,
};
use techconf_infra::db::{ConnectionProvider, RunConnection};
use tokio::time::Instant;

use super::{ContentStore, Sender, StatusFinalizer};
use crate::error::DispatchError;

/// 配信 1 回あたりの設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// 同時送信数の上限（`usize::MAX` で無制限）
    pub send_concurrency: usize,
    /// 1 通あたりの送信タイムアウト
    pub send_timeout:     Duration,
    /// 配信 1 回の期限
    pub run_deadline:     Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            send_concurrency: usize::MAX,
            send_timeout:     Duration::from_secs(10),
            run_deadline:     Duration::from_secs(300),
        }
    }
}

/// 配信結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    pub notification_id:     NotificationId,
    pub status:              NotificationStatus,
    pub recipients_notified: i32,
    /// 送信を試みた受信者数
    pub attempted:           usize,
    /// 期限切れで未送信の受信者が残った
    pub truncated:           bool,
}

pub struct Dispatcher {
    connections: Arc<dyn ConnectionProvider>,
    store:       Arc<ContentStore>,
    sender:      Sender,
    finalizer:   StatusFinalizer,
    settings:    DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        connections: Arc<dyn ConnectionProvider>,
        store: Arc<ContentStore>,
        sender: Sender,
        finalizer: StatusFinalizer,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            connections,
            store,
            sender,
            finalizer,
            settings,
        }
    }

    /// 通知を全受信者に配信し、完了記録を書く
    #[tracing::instrument(name = "dispatch_run", skip_all, fields(notification.id = %id))]
    pub async fn run(&self, id: NotificationId) -> Result<RunResult, DispatchError> {
        let deadline = Instant::now() + self.settings.run_deadline;
        let mut conn = self.connections.acquire().await?;

        let notification = self.store.fetch_notification(&mut conn, id).await?;
        if notification.status().is_terminal() {
            // 完了済みの通知を再配信しない
            return Err(DispatchError::ConcurrentUpdate(id));
        }

        let (outcomes, truncated) = self.fan_out(&mut conn, &notification, deadline).await?;
        if truncated && outcomes.is_empty() {
            return Err(DispatchError::DeadlineExceeded(id));
        }

        let completion = self
            .finalizer
            .finalize(&mut conn, id, &outcomes, truncated)
            .await?;

        Ok(RunResult {
            notification_id: id,
            status: completion.status(),
            recipients_notified: completion.recipients_notified(),
            attempted: outcomes.len(),
            truncated,
        })
    }

    /// 受信者ごとに差し込み・送信し、結果を集める
    ///
    /// 戻り値の `bool` は期限切れで打ち切ったかどうか。
    async fn fan_out(
        &self,
        conn: &mut RunConnection,
        notification: &Notification,
        deadline: Instant,
    ) -> Result<(Vec<SendOutcome>, bool), DispatchError> {
        let id = notification.id();
        let mut sends = self
            .store
            .list_recipients(conn)
            .map(move |recipient| async move {
                let recipient = recipient?;
                let subject = personalize(notification.subject(), &recipient);
                let body = personalize(notification.body(), &recipient);
                Ok::<_, DispatchError>(self.sender.send(id, &recipient, subject, body).await)
            })
            .buffer_unordered(self.settings.send_concurrency);

        let mut outcomes = Vec::new();
        loop {
            match tokio::time::timeout_at(deadline, sends.next()).await {
                Ok(Some(outcome)) => outcomes.push(outcome?),
                Ok(None) => return Ok((outcomes, false)),
                Err(_) => {
                    tracing::warn!(
                        notification.id = %id,
                        attempted = outcomes.len(),
                        "配信期限を超過したため残りの送信を打ち切ります"
                    );
                    return Ok((outcomes, true));
                }
            }
        }
    }
}
