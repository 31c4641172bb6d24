//! # ビジネスイベントログとエラーコンテキストの構造化ヘルパー
//!
//! 配信の成否を `jq` で追えるよう、ログフィールドの命名規約と
//! ヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] で出力する。`event.kind = "business_event"` が自動付与される。
//!
//! ## エラーコンテキスト
//!
//! `tracing::error!` / `tracing::warn!` に `error.category` と `error.kind` を付ける。
//! 失敗ログには必ず `notification.id` を含める。
//!
//! ```rust,ignore
//! tracing::error!(
//!     notification.id = %id,
//!     error.category = error::category::INFRASTRUCTURE,
//!     error.kind = error::kind::STORE_UNAVAILABLE,
//!     error = %e,
//!     "通知の取得に失敗"
//! );
//! ```

/// ビジネスイベントを構造化ログとして出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: [`event::category`] の定数
/// - `event.action`: [`event::action`] の定数
/// - `event.result`: [`event::result`] の定数
/// - `notification.id`: 対象の通知 ID
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const NOTIFICATION: &str = "notification";
    }

    /// イベントアクション
    pub mod action {
        pub const TRIGGER_RECEIVED: &str = "notification.trigger_received";
        pub const EMAIL_SENT: &str = "notification.email_sent";
        pub const EMAIL_FAILED: &str = "notification.email_failed";
        pub const FINALIZED: &str = "notification.finalized";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// 入力（キューメッセージ、通知レコードの内容）
        pub const INPUT: &str = "input";
        /// インフラストラクチャ（DB、Redis）
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// 外部サービス呼び出し（メール送信プロバイダ）
        pub const EXTERNAL_SERVICE: &str = "external_service";
    }

    /// エラー種別
    pub mod kind {
        pub const MALFORMED_TRIGGER: &str = "malformed_trigger";
        pub const NOT_FOUND: &str = "not_found";
        pub const INVALID_CONTENT: &str = "invalid_content";
        pub const SEND_FAILURE: &str = "send_failure";
        pub const CONCURRENT_UPDATE: &str = "concurrent_update";
        pub const STORE_UNAVAILABLE: &str = "store_unavailable";
        pub const DEADLINE_EXCEEDED: &str = "deadline_exceeded";
        pub const QUEUE: &str = "queue";
    }
}
