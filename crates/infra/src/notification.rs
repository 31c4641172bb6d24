//! # 通知送信
//!
//! 参加者へのメール送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **4 つの実装**: SendGrid（本番既定）、SMTP（Mailpit 開発用）、SES、Noop（テスト用）
//! - **環境変数切替**: `NOTIFICATION_BACKEND` でランタイム選択

mod noop;
mod sendgrid;
mod ses;
mod smtp;

use async_trait::async_trait;
pub use noop::NoopNotificationSender;
pub use sendgrid::SendGridNotificationSender;
pub use ses::SesNotificationSender;
pub use smtp::SmtpNotificationSender;
use techconf_domain::notification::{EmailMessage, NotificationError};

/// メール送信トレイト
///
/// 1 通ごとの送信結果だけを返す。タイムアウトや失敗の集計は呼び出し側の責務。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを送信する
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError>;
}

/// 宛先アドレスを検証する
///
/// 空文字や `@` を含まない値はプロバイダに問い合わせる前に弾く。
pub fn validate_address(address: &str) -> Result<lettre::Address, NotificationError> {
    address
        .trim()
        .parse::<lettre::Address>()
        .map_err(|e| NotificationError::InvalidAddress(format!("{address:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("ann@example.com")]
    #[case("  bo@example.com ")]
    fn test_正しいアドレスは受け付ける(#[case] address: &str) {
        assert!(validate_address(address).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("not-an-address")]
    #[case("@example.com")]
    fn test_不正なアドレスはinvalid_addressになる(#[case] address: &str) {
        let result = validate_address(address);

        assert!(matches!(result, Err(NotificationError::InvalidAddress(_))));
    }
}
