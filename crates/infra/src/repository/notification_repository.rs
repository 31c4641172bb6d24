//! # NotificationRepository
//!
//! `notification` テーブルの読み取りと完了記録の書き込みを担当する。
//!
//! ## 二重ファイナライズの防止
//!
//! 完了記録は「現在のステータスが終端でない」ことを条件にした単一の UPDATE で
//! 書き込む。0 行更新なら [`InfraError::conflict`] を返す。
//! 行ロックは取らない（同一 ID の並行ファイナライズはこの条件で直列化される）。
//!
//! ## 日時カラム
//!
//! `completed_at` はタイムゾーンなしの `TIMESTAMP` カラムで、UTC の値を格納する。
//! 読み書きとも `NaiveDateTime` を経由し、ドメインには `DateTime<Utc>` で渡す。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use techconf_domain::notification::{NotificationCompletion, NotificationId, NotificationStatus};

use crate::{db::RunConnection, error::InfraError};

/// `notification` テーブルの行
///
/// 件名・本文のバリデーションはユースケース層で
/// `Notification::from_db` を通して行う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRow {
    pub id: i32,
    pub subject: Option<String>,
    /// 本文テンプレート（カラム名は `message`）
    pub message: Option<String>,
    pub status: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub recipients_notified: Option<i32>,
}

/// `notification` テーブルの生の行（`completed_at` は UTC の naive 値）
#[derive(Debug, sqlx::FromRow)]
struct NotificationRecord {
    id:                  i32,
    subject:             Option<String>,
    message:             Option<String>,
    status:              Option<String>,
    completed_at:        Option<NaiveDateTime>,
    recipients_notified: Option<i32>,
}

impl From<NotificationRecord> for NotificationRow {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id:                  record.id,
            subject:             record.subject,
            message:             record.message,
            status:              record.status,
            completed_at:        record.completed_at.map(|at| at.and_utc()),
            recipients_notified: record.recipients_notified,
        }
    }
}

/// 通知リポジトリトレイト
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// ID で通知を取得する
    ///
    /// # 戻り値
    ///
    /// - `Ok(Some(row))`: 見つかった場合
    /// - `Ok(None)`: 見つからない場合
    /// - `Err(_)`: データベースエラー
    async fn find_by_id(
        &self,
        conn: &mut RunConnection,
        id: NotificationId,
    ) -> Result<Option<NotificationRow>, InfraError>;

    /// 完了記録を書き込む
    ///
    /// 既に終端ステータスの場合（または行が存在しない場合）は Conflict。
    async fn complete(
        &self,
        conn: &mut RunConnection,
        id: NotificationId,
        completion: &NotificationCompletion,
    ) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の NotificationRepository
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresNotificationRepository;

impl PostgresNotificationRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(notification.id = %id))]
    async fn find_by_id(
        &self,
        conn: &mut RunConnection,
        id: NotificationId,
    ) -> Result<Option<NotificationRow>, InfraError> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            r#"
            SELECT id, subject, message, status, completed_at, recipients_notified
            FROM notification
            WHERE id = $1
            "#,
        )
        .bind(id.as_i32())
        .fetch_optional(conn.pg()?)
        .await?;

        Ok(record.map(NotificationRow::from))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(notification.id = %id))]
    async fn complete(
        &self,
        conn: &mut RunConnection,
        id: NotificationId,
        completion: &NotificationCompletion,
    ) -> Result<(), InfraError> {
        let status: &'static str = completion.status().into();
        let terminal: Vec<String> = NotificationStatus::terminal_values()
            .into_iter()
            .map(String::from)
            .collect();

        let result = sqlx::query(
            r#"
            UPDATE notification
            SET status = $2,
                completed_at = $3,
                recipients_notified = $4
            WHERE id = $1
              AND COALESCE(status, '') <> ALL($5)
            "#,
        )
        .bind(id.as_i32())
        .bind(status)
        .bind(completion.completed_at().naive_utc())
        .bind(completion.recipients_notified())
        .bind(terminal)
        .execute(conn.pg()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict("Notification", id.to_string()));
        }

        Ok(())
    }
}
