//! # 通知ワーカー
//!
//! TechConf の参加者向け通知メールを配信する常駐プロセス。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `DB_HOST` / `DB_NAME` / `DB_USER` / `DB_PASSWORD` | **Yes** | PostgreSQL 接続 |
//! | `DB_PORT` | No | PostgreSQL ポート（デフォルト: `5432`） |
//! | `EMAIL_API_KEY` | sendgrid 時 | SendGrid API キー |
//! | `NOTIFICATION_BACKEND` | No | `sendgrid` / `smtp` / `ses` / `noop`（デフォルト: `sendgrid`） |
//! | `NOTIFICATION_FROM_ADDRESS` | No | 送信元（デフォルト: `info@techconf.com`） |
//! | `SMTP_HOST` / `SMTP_PORT` | No | smtp 時の接続先（デフォルト: `localhost` / `1025`） |
//! | `REDIS_URL` | No | トリガーキューの Redis（デフォルト: `redis://localhost:6379`） |
//! | `TRIGGER_QUEUE_NAME` | No | Redis リスト名（デフォルト: `notificationqueue`） |
//! | `QUEUE_POLL_INTERVAL_MS` | No | キューが空のときの待機（デフォルト: `500`） |
//! | `SEND_CONCURRENCY` | No | 同時送信数（デフォルト: 無制限） |
//! | `SEND_TIMEOUT_SECS` | No | 1 通あたりのタイムアウト（デフォルト: `10`） |
//! | `RUN_DEADLINE_SECS` | No | 配信 1 回の期限（デフォルト: `300`） |
//! | `MAX_CONCURRENT_RUNS` | No | 同時に走る配信数（デフォルト: `4`） |
//! | `LOG_FORMAT` | No | `json` / `pretty`（デフォルト: `pretty`） |
//! | `RUST_LOG` | No | ログフィルタ（デフォルト: `info,techconf=debug`） |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（Mailpit に送信）
//! NOTIFICATION_BACKEND=smtp cargo run -p techconf-notification-worker
//! ```

use std::sync::Arc;

use anyhow::Context as _;
use techconf_domain::clock::SystemClock;
use techconf_infra::{
    db::{self, PgConnectionProvider},
    notification::{
        NoopNotificationSender,
        NotificationSender,
        SendGridNotificationSender,
        SesNotificationSender,
        SmtpNotificationSender,
    },
    queue::RedisTriggerQueue,
    repository::{PostgresAttendeeRepository, PostgresNotificationRepository},
};
use techconf_notification_worker::{
    config::{NotificationBackend, NotificationConfig, WorkerConfig},
    error::ConfigError,
    intake::TriggerIntake,
    usecase::{ContentStore, Dispatcher, Sender, StatusFinalizer},
    worker::{Worker, wait_for_signal},
};
use techconf_shared::observability::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::from_env("notification-worker"));

    let config = WorkerConfig::from_env().context("設定の読み込みに失敗しました")?;
    tracing::info!(
        backend = ?config.notification.backend,
        queue = %config.trigger_queue_name,
        "通知ワーカーを起動します"
    );

    let pool = db::create_pool(&config.db)
        .await
        .context("データベース接続に失敗しました")?;
    tracing::info!("データベースに接続しました");

    let queue = RedisTriggerQueue::new(&config.redis_url, config.trigger_queue_name.clone())
        .await
        .context("Redis 接続に失敗しました")?;
    tracing::info!("Redis に接続しました");

    let store = Arc::new(ContentStore::new(
        Arc::new(PostgresNotificationRepository::new()),
        Arc::new(PostgresAttendeeRepository::new()),
    ));
    let dispatcher = Dispatcher::new(
        Arc::new(PgConnectionProvider::new(pool)),
        store.clone(),
        Sender::new(
            build_sender(&config.notification).await?,
            config.dispatch.send_timeout,
        ),
        StatusFinalizer::new(store, Arc::new(SystemClock)),
        config.dispatch,
    );
    let intake = TriggerIntake::new(Arc::new(dispatcher));

    Worker::new(
        Arc::new(queue),
        Arc::new(intake),
        config.queue_poll_interval,
        config.max_concurrent_runs,
    )
    .run(wait_for_signal(tokio::signal::ctrl_c()))
    .await;

    Ok(())
}

/// 設定に応じた送信バックエンドを作成する
async fn build_sender(
    config: &NotificationConfig,
) -> Result<Arc<dyn NotificationSender>, ConfigError> {
    let from_address = config.from_address.clone();

    let sender: Arc<dyn NotificationSender> = match config.backend {
        NotificationBackend::SendGrid => {
            let api_key = config
                .email_api_key
                .clone()
                .ok_or(ConfigError::Missing("EMAIL_API_KEY"))?;
            Arc::new(SendGridNotificationSender::new(api_key, from_address))
        }
        NotificationBackend::Smtp => Arc::new(SmtpNotificationSender::new(
            &config.smtp_host,
            config.smtp_port,
            from_address,
        )),
        NotificationBackend::Ses => {
            let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let client = aws_sdk_sesv2::Client::new(&aws_config);
            Arc::new(SesNotificationSender::new(client, from_address))
        }
        NotificationBackend::Noop => Arc::new(NoopNotificationSender),
    };

    Ok(sender)
}
