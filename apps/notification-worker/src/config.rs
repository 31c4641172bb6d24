//! # 通知ワーカー設定
//!
//! 環境変数から通知ワーカーの設定を読み込む。
//! テストでは [`WorkerConfig::from_lookup`] に任意の検索関数を渡す。

use std::{env, str::FromStr, time::Duration};

use techconf_infra::db::DbSettings;

use crate::{error::ConfigError, usecase::DispatchSettings};

/// 通知ワーカーの設定
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// データベース接続
    pub db: DbSettings,
    /// 通知送信設定
    pub notification: NotificationConfig,
    /// Redis 接続 URL
    pub redis_url: String,
    /// トリガーキュー（Redis リスト）名
    pub trigger_queue_name: String,
    /// キューが空のときの待機時間
    pub queue_poll_interval: Duration,
    /// 配信 1 回あたりの設定
    pub dispatch: DispatchSettings,
    /// 同時に走らせる配信数
    pub max_concurrent_runs: usize,
}

/// 送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationBackend {
    SendGrid,
    Smtp,
    Ses,
    Noop,
}

impl FromStr for NotificationBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sendgrid" => Ok(Self::SendGrid),
            "smtp" => Ok(Self::Smtp),
            "ses" => Ok(Self::Ses),
            "noop" => Ok(Self::Noop),
            _ => Err(()),
        }
    }
}

/// 通知送信の設定
///
/// `NOTIFICATION_BACKEND` 環境変数で送信バックエンドを切り替える:
/// - `sendgrid`: SendGrid API 経由で送信（既定、`EMAIL_API_KEY` 必須）
/// - `smtp`: Mailpit（開発）/ SMTP サーバー経由で送信
/// - `ses`: Amazon SES v2 経由で送信
/// - `noop`: 送信しない（ログ出力のみ）
#[derive(Clone)]
pub struct NotificationConfig {
    pub backend:       NotificationBackend,
    /// SendGrid API キー（backend=sendgrid の場合に必須）
    pub email_api_key: Option<String>,
    /// 送信元メールアドレス
    pub from_address:  String,
    /// SMTP ホスト（backend=smtp の場合に使用）
    pub smtp_host:     String,
    /// SMTP ポート（backend=smtp の場合に使用）
    pub smtp_port:     u16,
}

impl std::fmt::Debug for NotificationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationConfig")
            .field("backend", &self.backend)
            .field("email_api_key", &self.email_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("from_address", &self.from_address)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

impl WorkerConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 検索関数から設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        let max_concurrent_runs = vars.positive("MAX_CONCURRENT_RUNS", 4)?;
        let send_concurrency = match vars.get("SEND_CONCURRENCY") {
            Some(_) => vars.positive("SEND_CONCURRENCY", 1)?,
            None => usize::MAX,
        };

        let db = DbSettings {
            host:            vars.required("DB_HOST")?,
            port:            vars.parse_or("DB_PORT", 5432)?,
            database:        vars.required("DB_NAME")?,
            user:            vars.required("DB_USER")?,
            password:        vars.required("DB_PASSWORD")?,
            // 配信ごとに 1 本 + 余裕 1 本
            max_connections: u32::try_from(max_concurrent_runs + 1).unwrap_or(u32::MAX),
        };

        Ok(Self {
            db,
            notification: NotificationConfig::from_vars(&vars)?,
            redis_url: vars.or("REDIS_URL", "redis://localhost:6379"),
            trigger_queue_name: vars.or("TRIGGER_QUEUE_NAME", "notificationqueue"),
            queue_poll_interval: Duration::from_millis(vars.parse_or("QUEUE_POLL_INTERVAL_MS", 500)?),
            dispatch: DispatchSettings {
                send_concurrency,
                send_timeout: Duration::from_secs(vars.positive("SEND_TIMEOUT_SECS", 10)? as u64),
                run_deadline: Duration::from_secs(vars.positive("RUN_DEADLINE_SECS", 300)? as u64),
            },
            max_concurrent_runs,
        })
    }
}

impl NotificationConfig {
    fn from_vars(vars: &Vars<'_>) -> Result<Self, ConfigError> {
        let backend = match vars.get("NOTIFICATION_BACKEND") {
            Some(value) => value.parse().map_err(|()| ConfigError::Invalid {
                var: "NOTIFICATION_BACKEND",
                value,
            })?,
            None => NotificationBackend::SendGrid,
        };

        let email_api_key = vars.get("EMAIL_API_KEY");
        if backend == NotificationBackend::SendGrid && email_api_key.is_none() {
            return Err(ConfigError::Missing("EMAIL_API_KEY"));
        }

        Ok(Self {
            backend,
            email_api_key,
            from_address: vars.or("NOTIFICATION_FROM_ADDRESS", "info@techconf.com"),
            smtp_host: vars.or("SMTP_HOST", "localhost"),
            smtp_port: vars.parse_or("SMTP_PORT", 1025)?,
        })
    }
}

/// 環境変数の読み取りヘルパー（空文字は未設定扱い）
struct Vars<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Vars<'_> {
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.get(var).ok_or(ConfigError::Missing(var))
    }

    fn or(&self, var: &str, default: &str) -> String {
        self.get(var).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: FromStr>(&self, var: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(var) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { var, value }),
            None => Ok(default),
        }
    }

    /// 1 以上の整数
    fn positive(&self, var: &'static str, default: usize) -> Result<usize, ConfigError> {
        let value = self.parse_or(var, default)?;
        if value == 0 {
            return Err(ConfigError::Invalid {
                var,
                value: "0".to_string(),
            });
        }
        Ok(value)
    }
}
