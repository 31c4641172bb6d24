//! # キュー消費ループ
//!
//! トリガーキューからメッセージを取り出し、配信をタスクとして起動する。
//! 同時に走る配信数は `max_concurrent_runs` まで。
//!
//! 停止シグナルを受けたら新しいメッセージの受信をやめ、
//! 実行中の配信が終わるのを待ってから戻る。
//! 停止シグナルの登録に失敗した場合は停止せずに消費を続ける。

use std::{future::Future, sync::Arc, time::Duration};

use futures::FutureExt;
use techconf_infra::queue::TriggerQueue;
use techconf_shared::event_log::error;
use tokio::{sync::Semaphore, task::JoinSet};

use crate::intake::TriggerIntake;

pub struct Worker {
    queue:               Arc<dyn TriggerQueue>,
    intake:              Arc<TriggerIntake>,
    poll_interval:       Duration,
    max_concurrent_runs: usize,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn TriggerQueue>,
        intake: Arc<TriggerIntake>,
        poll_interval: Duration,
        max_concurrent_runs: usize,
    ) -> Self {
        Self {
            queue,
            intake,
            poll_interval,
            max_concurrent_runs,
        }
    }

    /// `shutdown` が完了するまでメッセージを処理し続ける
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_runs));
        let mut runs = JoinSet::new();
        let mut shutdown = std::pin::pin!(shutdown);

        tracing::info!(
            max_concurrent_runs = self.max_concurrent_runs,
            "トリガーキューの消費を開始します"
        );

        loop {
            while let Some(joined) = runs.try_join_next() {
                log_join_error(joined);
            }

            // 空き枠を待つ間も停止シグナルを受け付ける
            let permit = tokio::select! {
                () = &mut shutdown => break,
                permit = semaphore.clone().acquire_owned() => permit,
            };
            let Ok(permit) = permit else { break };

            // 受信途中のメッセージを失わないよう、停止確認は受信の合間に行う
            if (&mut shutdown).now_or_never().is_some() {
                break;
            }

            match self.queue.receive(self.poll_interval).await {
                Ok(Some(payload)) => {
                    let intake = self.intake.clone();
                    runs.spawn(async move {
                        let _permit = permit;
                        // エラーは TriggerIntake がログ出力済み。メッセージは破棄する
                        let _ = intake.on_message(&payload).await;
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(
                        error.category = error::category::INFRASTRUCTURE,
                        error.kind = error::kind::QUEUE,
                        error = %e,
                        "トリガーキューからの受信に失敗"
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        tracing::info!(in_flight = runs.len(), "停止します。実行中の配信の完了を待ちます");
        while let Some(joined) = runs.join_next().await {
            log_join_error(joined);
        }
        tracing::info!("トリガーキューの消費を停止しました");
    }
}

/// 停止シグナルを待つ
///
/// シグナルハンドラの登録に失敗したらログを出し、以後は完了しない。
pub async fn wait_for_signal(signal: impl Future<Output = std::io::Result<()>>) {
    match signal.await {
        Ok(()) => tracing::info!("停止シグナルを受信しました"),
        Err(e) => {
            tracing::error!(
                error.category = error::category::INFRASTRUCTURE,
                error = %e,
                "シグナルハンドラの登録に失敗しました。停止シグナルなしで動作を続けます"
            );
            std::future::pending::<()>().await;
        }
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "配信タスクが異常終了しました");
    }
}
