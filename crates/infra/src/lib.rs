//! # TechConf インフラ層
//!
//! 通知ワーカーが外部システムと通信するためのインフラストラクチャ層。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL の接続プールと配信ごとのスコープ付きコネクション
//! - **リポジトリ実装**: 通知レコード・参加者名簿の読み書き
//! - **メール送信**: SendGrid / SMTP / SES / Noop の送信バックエンド
//! - **トリガーキュー**: Redis リストからの通知 ID 受信
//!
//! ## 依存関係
//!
//! ```text
//! notification-worker → infra → domain
//!          ↘
//!            shared
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL 接続管理と [`db::RunConnection`]
//! - [`error`] - インフラ層エラー定義
//! - [`notification`] - メール送信バックエンド
//! - [`queue`] - 通知トリガーキュー
//! - [`repository`] - リポジトリ実装
//! - `mock` - インメモリモック（`test-utils` feature）

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod queue;
pub mod repository;

pub use error::InfraError;
