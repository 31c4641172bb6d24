//! # ContentStore
//!
//! 通知レコードと受信者名簿へのアクセスをまとめ、インフラ層のエラーを
//! 配信エラー（[`DispatchError`]）に変換する。

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use techconf_domain::notification::{
    Notification,
    NotificationCompletion,
    NotificationId,
    NotificationStatus,
    Recipient,
};
use techconf_infra::{
    db::RunConnection,
    repository::{AttendeeRepository, NotificationRepository},
};

use crate::error::DispatchError;

pub struct ContentStore {
    notifications: Arc<dyn NotificationRepository>,
    attendees:     Arc<dyn AttendeeRepository>,
}

impl ContentStore {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        attendees: Arc<dyn AttendeeRepository>,
    ) -> Self {
        Self {
            notifications,
            attendees,
        }
    }

    /// 通知レコードを取得する（読み取りのみ）
    ///
    /// # エラー
    ///
    /// - `NotFound`: 該当する行がない
    /// - `InvalidContent`: 件名または本文が NULL・空・空白のみ
    /// - `StoreUnavailable`: DB エラー
    pub async fn fetch_notification(
        &self,
        conn: &mut RunConnection,
        id: NotificationId,
    ) -> Result<Notification, DispatchError> {
        let row = self
            .notifications
            .find_by_id(conn, id)
            .await?
            .ok_or(DispatchError::NotFound(id))?;

        Notification::from_db(
            id,
            row.subject,
            row.message,
            NotificationStatus::from_db(row.status.as_deref()),
            row.completed_at,
            row.recipients_notified,
        )
        .map_err(|e| DispatchError::InvalidContent {
            id,
            reason: e.to_string(),
        })
    }

    /// 受信者を列挙する
    ///
    /// 行は消費された分だけ DB から読まれる。呼ぶたびに最初から列挙し直す。
    pub fn list_recipients<'c>(
        &'c self,
        conn: &'c mut RunConnection,
    ) -> BoxStream<'c, Result<Recipient, DispatchError>> {
        self.attendees
            .stream_all(conn)
            .map_err(DispatchError::from)
            .boxed()
    }

    /// 完了記録を書き込む
    ///
    /// 既に終端ステータスなら `ConcurrentUpdate`（値は変更されない）。
    pub async fn update_status(
        &self,
        conn: &mut RunConnection,
        id: NotificationId,
        completion: &NotificationCompletion,
    ) -> Result<(), DispatchError> {
        self.notifications
            .complete(conn, id, completion)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    DispatchError::ConcurrentUpdate(id)
                } else {
                    DispatchError::StoreUnavailable(e)
                }
            })
    }
}
