//! # TriggerIntake
//!
//! トリガーメッセージ（通知 ID の 10 進文字列）を受け取り、配信を 1 回起動する。
//!
//! ペイロードは UTF-8 として読み、前後の ASCII 空白を除いて `i32` にパースする。
//! 読めなければ `MalformedTrigger` で、配信は起動しない。
//! エラーはログに出した上で呼び出し元（キュー消費ループ）に返す。
//! メッセージの再投入はしない。

use std::sync::Arc;

use async_trait::async_trait;
use techconf_domain::notification::NotificationId;
use techconf_shared::{
    event_log::event,
    log_business_event,
};

use crate::{
    error::{DispatchError, IntakeError},
    usecase::{Dispatcher, RunResult},
};

/// 配信の起動
///
/// テストで配信を差し替えられるよう trait にしている。
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn run(&self, id: NotificationId) -> Result<RunResult, DispatchError>;
}

#[async_trait]
impl Dispatch for Dispatcher {
    async fn run(&self, id: NotificationId) -> Result<RunResult, DispatchError> {
        Dispatcher::run(self, id).await
    }
}

pub struct TriggerIntake {
    dispatcher: Arc<dyn Dispatch>,
}

impl TriggerIntake {
    pub fn new(dispatcher: Arc<dyn Dispatch>) -> Self {
        Self { dispatcher }
    }

    /// トリガーメッセージを 1 件処理する
    pub async fn on_message(&self, raw: &[u8]) -> Result<RunResult, IntakeError> {
        let id = match parse_trigger(raw) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    error.category = e.category(),
                    error.kind = e.kind(),
                    error = %e,
                    "トリガーメッセージを破棄します"
                );
                return Err(e);
            }
        };

        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::TRIGGER_RECEIVED,
            event.result = event::result::SUCCESS,
            notification.id = %id,
            "通知トリガーを受信"
        );

        match self.dispatcher.run(id).await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::error!(
                    notification.id = %id,
                    error.category = e.category(),
                    error.kind = e.kind(),
                    error = %e,
                    "通知の配信に失敗"
                );
                Err(e.into())
            }
        }
    }
}

/// ペイロードを通知 ID として読む
pub fn parse_trigger(raw: &[u8]) -> Result<NotificationId, IntakeError> {
    let malformed = || IntakeError::MalformedTrigger {
        payload: String::from_utf8_lossy(raw).into_owned(),
    };

    let text = std::str::from_utf8(raw).map_err(|_| malformed())?;
    let digits = text.trim_ascii();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    digits
        .parse::<i32>()
        .map(NotificationId::new)
        .map_err(|_| malformed())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use techconf_domain::notification::NotificationStatus;

    use super::*;

    /// 呼び出しを記録する配信
    #[derive(Default)]
    struct RecordingDispatch {
        calls:     Mutex<Vec<NotificationId>>,
        not_found: bool,
    }

    #[async_trait]
    impl Dispatch for RecordingDispatch {
        async fn run(&self, id: NotificationId) -> Result<RunResult, DispatchError> {
            self.calls.lock().unwrap().push(id);
            if self.not_found {
                return Err(DispatchError::NotFound(id));
            }
            Ok(RunResult {
                notification_id:     id,
                status:              NotificationStatus::Completed,
                recipients_notified: 0,
                attempted:           0,
                truncated:           false,
            })
        }
    }

    #[rstest]
    #[case(b"42", 42)]
    #[case(b" 42\n", 42)]
    #[case(b"\t7\r\n", 7)]
    #[case(b"0", 0)]
    #[case(b"2147483647", i32::MAX)]
    fn test_10進整数をパースできる(#[case] raw: &[u8], #[case] expected: i32) {
        assert_eq!(parse_trigger(raw).unwrap(), NotificationId::new(expected));
    }

    #[rstest]
    #[case(b"abc")]
    #[case(b"")]
    #[case(b"   ")]
    #[case(b"4 2")]
    #[case(b"-1")]
    #[case(b"+1")]
    #[case(b"1.5")]
    #[case(b"2147483648")]
    #[case(b"\xff\xfe")]
    fn test_不正なペイロードはmalformed_trigger(#[case] raw: &[u8]) {
        assert!(matches!(
            parse_trigger(raw),
            Err(IntakeError::MalformedTrigger { .. })
        ));
    }

    #[tokio::test]
    async fn test_正しいトリガーで配信を1回起動する() {
        let dispatch = Arc::new(RecordingDispatch::default());
        let sut = TriggerIntake::new(dispatch.clone());

        let result = sut.on_message(b"42").await.unwrap();

        assert_eq!(result.notification_id, NotificationId::new(42));
        assert_eq!(*dispatch.calls.lock().unwrap(), vec![NotificationId::new(42)]);
    }

    #[tokio::test]
    async fn test_不正なトリガーでは配信を起動しない() {
        let dispatch = Arc::new(RecordingDispatch::default());
        let sut = TriggerIntake::new(dispatch.clone());

        let result = sut.on_message(b"abc").await;

        assert!(matches!(
            result,
            Err(IntakeError::MalformedTrigger { ref payload }) if payload == "abc"
        ));
        assert!(dispatch.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_配信エラーはそのまま返す() {
        let dispatch = Arc::new(RecordingDispatch {
            not_found: true,
            ..RecordingDispatch::default()
        });
        let sut = TriggerIntake::new(dispatch.clone());

        let result = sut.on_message(b"999").await;

        assert!(matches!(
            result,
            Err(IntakeError::Dispatch(DispatchError::NotFound(_)))
        ));
        assert_eq!(dispatch.calls.lock().unwrap().len(), 1);
    }
}
