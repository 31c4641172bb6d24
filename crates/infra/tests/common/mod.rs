//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するシードデータ投入ヘルパー。
//! Rust の統合テスト規約に従い `tests/common/mod.rs` に配置。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sqlx::PgPool;

/// テストで使う固定の完了日時
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap()
}

/// 通知レコードを挿入して ID を返す
pub async fn insert_notification(
    pool: &PgPool,
    subject: Option<&str>,
    message: Option<&str>,
    status: Option<&str>,
) -> i32 {
    sqlx::query_scalar(
        r#"
        INSERT INTO notification (subject, message, status, submitted_date)
        VALUES ($1, $2, $3, NOW())
        RETURNING id
        "#,
    )
    .bind(subject)
    .bind(message)
    .bind(status)
    .fetch_one(pool)
    .await
    .expect("通知の挿入に失敗")
}

/// 参加者レコードを挿入する
pub async fn insert_attendee(
    pool: &PgPool,
    first_name: Option<&str>,
    last_name: Option<&str>,
    email: Option<&str>,
) {
    sqlx::query("INSERT INTO attendee (first_name, last_name, email) VALUES ($1, $2, $3)")
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .execute(pool)
        .await
        .expect("参加者の挿入に失敗");
}
