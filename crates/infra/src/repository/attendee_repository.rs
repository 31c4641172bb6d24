//! # AttendeeRepository
//!
//! `attendee` テーブルから通知の受信者を列挙する。
//!
//! 参加者数に上限はないため、全件を `Vec` に読み込まず
//! DB カーソルからのストリームとして返す。呼び出すたびに新しいクエリを発行するので
//! 何度でも最初から列挙し直せる。

use futures::{StreamExt, stream::BoxStream};
use techconf_domain::notification::Recipient;

use crate::{db::RunConnection, error::InfraError};

#[derive(Debug, sqlx::FromRow)]
struct AttendeeRow {
    first_name: Option<String>,
    last_name:  Option<String>,
    email:      Option<String>,
}

impl From<AttendeeRow> for Recipient {
    /// NULL は空文字として扱う（空のアドレスは送信時に失敗として記録される）
    fn from(row: AttendeeRow) -> Self {
        Recipient::new(
            row.first_name.unwrap_or_default(),
            row.last_name.unwrap_or_default(),
            row.email.unwrap_or_default(),
        )
    }
}

/// 参加者リポジトリトレイト
pub trait AttendeeRepository: Send + Sync {
    /// 全参加者を受信者として列挙する
    ///
    /// 0 件は正常（エラーではない）。ストリームはコネクションを借用するため、
    /// 消費し終えるまで同じコネクションで他のクエリは発行できない。
    fn stream_all<'c>(
        &'c self,
        conn: &'c mut RunConnection,
    ) -> BoxStream<'c, Result<Recipient, InfraError>>;
}

/// PostgreSQL 実装の AttendeeRepository
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresAttendeeRepository;

impl PostgresAttendeeRepository {
    pub fn new() -> Self {
        Self
    }
}

impl AttendeeRepository for PostgresAttendeeRepository {
    fn stream_all<'c>(
        &'c self,
        conn: &'c mut RunConnection,
    ) -> BoxStream<'c, Result<Recipient, InfraError>> {
        let pg = match conn.pg() {
            Ok(pg) => pg,
            Err(e) => return futures::stream::once(async move { Err(e) }).boxed(),
        };

        sqlx::query_as::<_, AttendeeRow>("SELECT first_name, last_name, email FROM attendee")
            .fetch(pg)
            .map(|row| row.map(Recipient::from).map_err(InfraError::from))
            .boxed()
    }
}
