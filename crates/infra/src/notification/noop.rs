//! Noop 通知送信実装
//!
//! メールを送らずにログだけ出す。ローカル実行やドライランで使う。
//! 宛先の検証は他のバックエンドと同じく行うので、空や不正なアドレスの参加者は
//! ドライランでも失敗として数えられ、完了記録の通知数が本番と一致する。

use async_trait::async_trait;
use techconf_domain::notification::{EmailMessage, NotificationError};

use super::{NotificationSender, validate_address};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotificationSender;

#[async_trait]
impl NotificationSender for NoopNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let to = validate_address(&email.to)?;
        tracing::info!(
            notification.recipient = %to,
            notification.subject = %email.subject,
            body_len = email.body.len(),
            "Noop: 通知メールの送信をスキップ"
        );
        Ok(())
    }
}
