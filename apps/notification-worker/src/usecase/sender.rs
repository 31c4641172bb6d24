//! # Sender
//!
//! 1 受信者への送信を行い、結果を [`SendOutcome`] として返す。
//!
//! 送信はエラーを返さない。バックエンドのエラー、宛先不正、タイムアウトは
//! すべて失敗の `SendOutcome` になり、他の受信者への送信には影響しない。

use std::{sync::Arc, time::Duration};

use techconf_domain::notification::{EmailMessage, NotificationId, Recipient, SendOutcome};
use techconf_infra::notification::NotificationSender;
use techconf_shared::{
    event_log::{error, event},
    log_business_event,
};

pub struct Sender {
    backend: Arc<dyn NotificationSender>,
    timeout: Duration,
}

impl Sender {
    /// # 引数
    ///
    /// - `backend`: 送信バックエンド
    /// - `timeout`: 1 通あたりの送信タイムアウト
    pub fn new(backend: Arc<dyn NotificationSender>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// 差し込み済みの件名・本文を 1 受信者に送信する
    pub async fn send(
        &self,
        notification_id: NotificationId,
        recipient: &Recipient,
        subject: String,
        body: String,
    ) -> SendOutcome {
        let email = EmailMessage {
            to: recipient.email.clone(),
            subject,
            body,
        };

        let result = match tokio::time::timeout(self.timeout, self.backend.send_email(&email)).await
        {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("送信がタイムアウトしました: {:?}", self.timeout)),
        };

        match result {
            Ok(()) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::EMAIL_SENT,
                    event.result = event::result::SUCCESS,
                    notification.id = %notification_id,
                    notification.recipient = %email.to,
                    "通知メール送信成功"
                );
                SendOutcome::success(email.to)
            }
            Err(detail) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::EMAIL_FAILED,
                    event.result = event::result::FAILURE,
                    notification.id = %notification_id,
                    notification.recipient = %email.to,
                    error.category = error::category::EXTERNAL_SERVICE,
                    error.kind = error::kind::SEND_FAILURE,
                    error = %detail,
                    "通知メール送信失敗"
                );
                SendOutcome::failure(email.to, detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use techconf_infra::mock::MockNotificationSender;

    use super::*;

    fn ann() -> Recipient {
        Recipient::new("Ann", "Lee", "ann@example.com")
    }

    #[tokio::test]
    async fn test_送信成功は成功の結果になる() {
        let backend = MockNotificationSender::new();
        let sut = Sender::new(Arc::new(backend.clone()), Duration::from_secs(10));

        let outcome = sut
            .send(NotificationId::new(42), &ann(), "Welcome Ann".into(), "Hi".into())
            .await;

        assert_eq!(outcome, SendOutcome::success("ann@example.com"));
        let sent = backend.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Welcome Ann");
        assert_eq!(sent[0].body, "Hi");
    }

    #[tokio::test]
    async fn test_バックエンドの失敗は失敗の結果になる() {
        let backend = MockNotificationSender::new();
        backend.fail_for("ann@example.com");
        let sut = Sender::new(Arc::new(backend), Duration::from_secs(10));

        let outcome = sut
            .send(NotificationId::new(42), &ann(), "s".into(), "b".into())
            .await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.recipient_email(), "ann@example.com");
        assert!(outcome.error_detail().is_some());
    }

    #[tokio::test]
    async fn test_空の宛先は失敗の結果になる() {
        let sut = Sender::new(Arc::new(MockNotificationSender::new()), Duration::from_secs(10));

        let outcome = sut
            .send(NotificationId::new(42), &Recipient::new("", "", ""), "s".into(), "b".into())
            .await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.recipient_email(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_タイムアウトは失敗の結果になる() {
        let backend = MockNotificationSender::new();
        backend.delay_for("ann@example.com", Duration::from_secs(60));
        let sut = Sender::new(Arc::new(backend.clone()), Duration::from_secs(10));

        let outcome = sut
            .send(NotificationId::new(42), &ann(), "s".into(), "b".into())
            .await;

        assert!(!outcome.succeeded());
        assert!(outcome.error_detail().unwrap().contains("タイムアウト"));
        assert!(backend.sent().is_empty());
    }
}
