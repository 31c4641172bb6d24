//! # 通知
//!
//! 参加者向け一斉通知に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 備考 |
//! |---|------------|------|
//! | [`Notification`] | 通知レコード | 件名・本文テンプレートと配信ステータス |
//! | [`Recipient`] | 受信者 | `attendee` テーブルの 1 行 |
//! | [`SendOutcome`] | 送信結果 | 受信者 1 人ぶんの成功/失敗。永続化しない |
//! | [`NotificationCompletion`] | 完了記録 | ファイナライズで書き込む終端ステータス |
//!
//! ## ステータス遷移
//!
//! ```text
//! pending ──(finalize)──→ completed | partially_failed | failed
//! ```
//!
//! 終端ステータスへの遷移は 1 回きり。2 回目のファイナライズはリポジトリ層で
//! 競合として拒否される。

use std::{num::ParseIntError, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

use crate::DomainError;

// =========================================================================
// NotificationId
// =========================================================================

/// 通知 ID
///
/// `notification` テーブルの主キー（SERIAL）。採番はこのシステムの外で行われる。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    derive_more::Display,
)]
#[display("{_0}")]
pub struct NotificationId(i32);

impl NotificationId {
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

/// 10 進整数文字列からの変換（キューメッセージのデコードに使用）
impl FromStr for NotificationId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

// =========================================================================
// NotificationStatus
// =========================================================================

/// 通知ステータス
///
/// `notification.status` カラムに snake_case で格納される。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// 配信待ち（作成直後）
    Pending,
    /// 配信中
    InProgress,
    /// 全員に送信成功（または受信者 0 人）
    Completed,
    /// 一部の受信者への送信が失敗
    PartiallyFailed,
    /// 全員への送信が失敗
    Failed,
}

impl NotificationStatus {
    /// 終端ステータスか
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::PartiallyFailed | Self::Failed
        )
    }

    /// DB のステータス文字列から復元する
    ///
    /// 旧フロントエンドが書き込んだ自由記述（"Notifications submitted" 等）は
    /// 未配信として扱う。
    pub fn from_db(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::Pending)
    }

    /// 終端ステータスの DB 文字列一覧
    pub fn terminal_values() -> Vec<&'static str> {
        use strum::IntoEnumIterator;

        Self::iter()
            .filter(|s| s.is_terminal())
            .map(Into::into)
            .collect()
    }
}

// =========================================================================
// Notification
// =========================================================================

/// 通知レコード
///
/// 件名 (`subject`) と本文 (`body`) は受信者ごとの差し込み前のテンプレート。
/// どちらも空でないことが生成時に保証される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    id: NotificationId,
    subject: String,
    body: String,
    status: NotificationStatus,
    completed_at: Option<DateTime<Utc>>,
    recipients_notified: Option<i32>,
}

impl Notification {
    /// データベースから通知を復元する
    ///
    /// 件名・本文が NULL・空文字・空白のみの場合はバリデーションエラー。
    pub fn from_db(
        id: NotificationId,
        subject: Option<String>,
        body: Option<String>,
        status: NotificationStatus,
        completed_at: Option<DateTime<Utc>>,
        recipients_notified: Option<i32>,
    ) -> Result<Self, DomainError> {
        let subject = require_text(subject, "件名")?;
        let body = require_text(body, "本文")?;

        Ok(Self {
            id,
            subject,
            body,
            status,
            completed_at,
            recipients_notified,
        })
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn status(&self) -> NotificationStatus {
        self.status
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn recipients_notified(&self) -> Option<i32> {
        self.recipients_notified
    }
}

fn require_text(value: Option<String>, label: &str) -> Result<String, DomainError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DomainError::Validation(format!("{label}が空です"))),
    }
}

// =========================================================================
// Recipient
// =========================================================================

/// 受信者（参加者）
///
/// 参加者名簿はこのシステムの外で管理される。読み取り専用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub first_name: String,
    pub last_name:  String,
    /// 送信先メールアドレス
    pub email:      String,
}

impl Recipient {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name:  last_name.into(),
            email:      email.into(),
        }
    }
}

// =========================================================================
// SendOutcome
// =========================================================================

/// 受信者 1 人ぶんの送信結果
///
/// `error_detail` は失敗時にのみ存在する。コンストラクタを
/// [`success`](SendOutcome::success) / [`failure`](SendOutcome::failure)
/// に限定してこの不変条件を守る。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    recipient_email: String,
    error_detail: Option<String>,
}

impl SendOutcome {
    pub fn success(recipient_email: impl Into<String>) -> Self {
        Self {
            recipient_email: recipient_email.into(),
            error_detail: None,
        }
    }

    pub fn failure(recipient_email: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            recipient_email: recipient_email.into(),
            error_detail: Some(detail.into()),
        }
    }

    pub fn recipient_email(&self) -> &str {
        &self.recipient_email
    }

    pub fn succeeded(&self) -> bool {
        self.error_detail.is_none()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }
}

// =========================================================================
// NotificationCompletion
// =========================================================================

/// 完了記録
///
/// ファイナライズで `notification` に書き込む値。`status` は常に終端。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationCompletion {
    status: NotificationStatus,
    completed_at: DateTime<Utc>,
    recipients_notified: i32,
}

impl NotificationCompletion {
    /// 送信結果の集合から完了記録を導出する
    ///
    /// 上から順に最初に一致した規則を採用する:
    ///
    /// | 条件 | ステータス | 通知数 |
    /// |------|-----------|--------|
    /// | 送信 0 件 | `completed` | 0 |
    /// | 全件成功 | `completed` | 成功数 |
    /// | 成功と失敗が混在 | `partially_failed` | 成功数 |
    /// | 全件失敗 | `failed` | 0 |
    ///
    /// ## 打ち切り時の拡張
    ///
    /// 上の表は送信結果だけで決まる。`truncated`（期限切れで未送信の受信者が
    /// 残った）はその規則への追加で、送信 1 件以上で `completed` になる結果を
    /// `partially_failed` に落とす。全員に届いていないのに `completed` と
    /// 記録しないため、同じ送信結果の集合でも `truncated` によってステータスが変わる。
    /// 送信 0 件・一部失敗・全件失敗の行は `truncated` の影響を受けない。
    pub fn derive(outcomes: &[SendOutcome], truncated: bool, completed_at: DateTime<Utc>) -> Self {
        let attempted = outcomes.len();
        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();

        let status = if attempted == 0 {
            NotificationStatus::Completed
        } else if succeeded == attempted {
            if truncated {
                NotificationStatus::PartiallyFailed
            } else {
                NotificationStatus::Completed
            }
        } else if succeeded > 0 {
            NotificationStatus::PartiallyFailed
        } else {
            NotificationStatus::Failed
        };

        Self {
            status,
            completed_at,
            recipients_notified: i32::try_from(succeeded).unwrap_or(i32::MAX),
        }
    }

    pub fn status(&self) -> NotificationStatus {
        self.status
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn recipients_notified(&self) -> i32 {
        self.recipients_notified
    }
}

// =========================================================================
// EmailMessage / NotificationError
// =========================================================================

/// メールメッセージ
///
/// 差し込み済みの件名・本文。`NotificationSender` に渡される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:      String,
    /// 件名
    pub subject: String,
    /// プレーンテキスト本文
    pub body:    String,
}

/// メール送信エラー
///
/// 送信バックエンド（SendGrid / SMTP / SES）固有のエラーを文字列化して保持する。
#[derive(Debug, Error)]
pub enum NotificationError {
    /// 送信先・送信元アドレスが不正
    #[error("メールアドレスが不正: {0}")]
    InvalidAddress(String),

    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),
}
