//! # TechConf ドメイン層
//!
//! 参加者向け通知配信のドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **純粋性**: DB・メール送信・キューには一切依存しない
//! - **不変条件を型で表現**: `SendOutcome` は失敗時のみエラー詳細を持ち、
//!   `NotificationCompletion` は終端ステータスのみを保持する
//! - **決定的な集計**: 送信結果の集合から完了ステータスを一意に導出する
//!
//! ## 依存関係の方向
//!
//! ```text
//! notification-worker → infra → domain
//!          ↘                      ↑
//!            shared ──────────────┘（依存しない）
//! ```
//!
//! ## モジュール構成
//!
//! - [`clock`] - 完了日時の時刻プロバイダ
//! - [`error`] - ドメイン層エラー
//! - [`notification`] - 通知・受信者・送信結果・完了記録
//! - [`personalize`] - 件名・本文の受信者別差し込み
//!
//! ## 使用例
//!
//! ```rust
//! use techconf_domain::notification::{NotificationCompletion, NotificationStatus, SendOutcome};
//!
//! let outcomes = vec![
//!     SendOutcome::success("a@x.com"),
//!     SendOutcome::failure("b@x.com", "mailbox unavailable"),
//! ];
//! let completion = NotificationCompletion::derive(&outcomes, false, chrono::Utc::now());
//!
//! assert_eq!(completion.status(), NotificationStatus::PartiallyFailed);
//! assert_eq!(completion.recipients_notified(), 1);
//! ```

pub mod clock;
pub mod error;
pub mod notification;
pub mod personalize;

pub use error::DomainError;
