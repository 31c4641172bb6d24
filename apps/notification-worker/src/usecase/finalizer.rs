//! # StatusFinalizer
//!
//! 配信 1 回ぶんの送信結果を集計し、通知レコードに完了記録を書き込む。
//! 集計規則は [`NotificationCompletion::derive`] を参照。

use std::sync::Arc;

use techconf_domain::{
    clock::Clock,
    notification::{NotificationCompletion, NotificationId, SendOutcome},
};
use techconf_infra::db::RunConnection;
use techconf_shared::{event_log::event, log_business_event};

use super::ContentStore;
use crate::error::DispatchError;

pub struct StatusFinalizer {
    store: Arc<ContentStore>,
    clock: Arc<dyn Clock>,
}

impl StatusFinalizer {
    pub fn new(store: Arc<ContentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 送信結果から完了記録を導出して書き込む
    ///
    /// `outcomes` は全受信者ぶん揃っていること（`truncated` の場合を除く）。
    /// 書き込みは 1 回だけ試み、`ConcurrentUpdate` でも再試行しない。
    /// 失敗はログに出さずに返す（ログは呼び出し元の TriggerIntake が出す）。
    pub async fn finalize(
        &self,
        conn: &mut RunConnection,
        id: NotificationId,
        outcomes: &[SendOutcome],
        truncated: bool,
    ) -> Result<NotificationCompletion, DispatchError> {
        let completion = NotificationCompletion::derive(outcomes, truncated, self.clock.now());

        self.store.update_status(conn, id, &completion).await?;

        let status: &'static str = completion.status().into();
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::FINALIZED,
            event.result = event::result::SUCCESS,
            notification.id = %id,
            notification.status = status,
            notification.recipients_notified = completion.recipients_notified(),
            notification.attempted = outcomes.len(),
            notification.truncated = truncated,
            "通知配信完了"
        );

        Ok(completion)
    }
}
