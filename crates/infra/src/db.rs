//! # PostgreSQL データベース接続管理
//!
//! 接続プールの作成と、配信 1 回ぶんのスコープ付きコネクションを提供する。
//!
//! ## 設計方針
//!
//! - **グローバルな接続を持たない**: 配信（run）ごとにプールから 1 本借り、
//!   [`RunConnection`] として各コンポーネントに明示的に渡す
//! - **確実な返却**: `RunConnection` のドロップでプールへ返却される。
//!   成功・エラー・キャンセル（future のドロップ）のいずれでも同じ
//! - **接続パラメータは分割指定**: `DB_HOST` / `DB_NAME` / `DB_USER` /
//!   `DB_PASSWORD` から `PgConnectOptions` を組み立てる（URL エスケープ不要）
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use techconf_infra::db::{self, ConnectionProvider, DbSettings, PgConnectionProvider};
//!
//! let pool = db::create_pool(&settings).await?;
//! let provider = PgConnectionProvider::new(pool);
//!
//! let mut conn = provider.acquire().await?;
//! // conn を repository に渡す。スコープを抜けるとプールに返却される
//! ```

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    PgConnection,
    PgPool,
    Postgres,
    pool::PoolConnection,
    postgres::{PgConnectOptions, PgPoolOptions},
};

use crate::error::InfraError;

/// DB 接続パラメータ
#[derive(Clone)]
pub struct DbSettings {
    pub host:            String,
    pub port:            u16,
    pub database:        String,
    pub user:            String,
    pub password:        String,
    /// プールの最大接続数（同時に走る配信数以上にする）
    pub max_connections: u32,
}

impl std::fmt::Debug for DbSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl DbSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
    }
}

/// PostgreSQL 接続プールを作成する
///
/// 起動時に一度だけ呼び出す。接続取得は 5 秒でタイムアウトし、
/// 以降の `acquire` は `InfraErrorKind::Database(PoolTimedOut)` を返す。
pub async fn create_pool(settings: &DbSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(settings.connect_options())
        .await
}

// =============================================================================
// RunConnection
// =============================================================================

/// 配信 1 回ぶんのスコープ付き DB コネクション
///
/// リポジトリの全メソッドが `&mut RunConnection` を要求する。
/// ドロップ時に `PoolConnection` がプールへ返却される。
pub struct RunConnection(RunConnectionInner);

enum RunConnectionInner {
    Pg(PoolConnection<Postgres>),
    /// 保持中はトークンの参照カウントが 1 増える（返却漏れの検証用）
    #[cfg(any(test, feature = "test-utils"))]
    Mock(std::sync::Arc<()>),
}

impl RunConnection {
    /// プールからコネクションを取得する
    pub async fn acquire(pool: &PgPool) -> Result<Self, InfraError> {
        Ok(Self(RunConnectionInner::Pg(pool.acquire().await?)))
    }

    /// テスト用のモックコネクション
    ///
    /// インメモリのモックリポジトリは DB コネクションを使わない。
    #[cfg(any(test, feature = "test-utils"))]
    pub fn mock() -> Self {
        Self::mock_with_token(std::sync::Arc::new(()))
    }

    /// 参照カウントで保持状況を追跡できるモックコネクション
    #[cfg(any(test, feature = "test-utils"))]
    pub fn mock_with_token(token: std::sync::Arc<()>) -> Self {
        Self(RunConnectionInner::Mock(token))
    }

    /// Postgres リポジトリ実装が使う生のコネクション
    pub(crate) fn pg(&mut self) -> Result<&mut PgConnection, InfraError> {
        match &mut self.0 {
            RunConnectionInner::Pg(conn) => Ok(&mut **conn),
            #[cfg(any(test, feature = "test-utils"))]
            RunConnectionInner::Mock(_) => Err(InfraError::unexpected(
                "モックコネクションで Postgres リポジトリが呼ばれた",
            )),
        }
    }
}

// =============================================================================
// ConnectionProvider
// =============================================================================

/// コネクション取得の抽象化
///
/// ユースケース層は `PgPool` に直接依存せず、この trait 経由で
/// [`RunConnection`] を取得する。
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn acquire(&self) -> Result<RunConnection, InfraError>;
}

/// Postgres 用 ConnectionProvider
#[derive(Debug, Clone)]
pub struct PgConnectionProvider {
    pool: PgPool,
}

impl PgConnectionProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionProvider for PgConnectionProvider {
    async fn acquire(&self) -> Result<RunConnection, InfraError> {
        RunConnection::acquire(&self.pool).await
    }
}
