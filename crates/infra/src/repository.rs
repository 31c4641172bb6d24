//! # リポジトリ実装
//!
//! 通知レコードと参加者名簿へのアクセスを提供する。
//!
//! ## 設計方針
//!
//! - **コネクションは引数で受け取る**: リポジトリ自身はプールを持たず、
//!   配信ごとの [`RunConnection`](crate::db::RunConnection) を使う
//! - **実行時クエリ**: `sqlx::query_as` + `FromRow` で行をマッピングする
//! - **テスタビリティ**: トレイト経由でモック可能（`mock` モジュール）

pub mod attendee_repository;
pub mod notification_repository;

pub use attendee_repository::{AttendeeRepository, PostgresAttendeeRepository};
pub use notification_repository::{
    NotificationRepository,
    NotificationRow,
    PostgresNotificationRepository,
};
