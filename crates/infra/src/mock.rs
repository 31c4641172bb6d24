//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリのリポジトリ・送信・キュー実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! techconf-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use techconf_domain::notification::{
    EmailMessage,
    NotificationCompletion,
    NotificationError,
    NotificationId,
    NotificationStatus,
    Recipient,
};

use crate::{
    db::{ConnectionProvider, RunConnection},
    error::InfraError,
    notification::{NotificationSender, validate_address},
    queue::TriggerQueue,
    repository::{AttendeeRepository, NotificationRepository, NotificationRow},
};

// ===== MockConnectionProvider =====

/// モックコネクションを払い出す ConnectionProvider
///
/// 払い出したコネクションが全て返却されたかを [`open_connections`](Self::open_connections)
/// で確認できる。
#[derive(Clone, Default)]
pub struct MockConnectionProvider {
    /// 払い出したコネクションが内側の `Arc` を 1 つずつ保持する
    token:       Arc<Arc<()>>,
    acquired:    Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MockConnectionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以降の acquire を失敗させる（DB ダウンの再現）
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// これまでに払い出した数
    pub fn acquired_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// 未返却のコネクション数
    pub fn open_connections(&self) -> usize {
        let token: &Arc<()> = &self.token;
        Arc::strong_count(token) - 1
    }
}

#[async_trait]
impl ConnectionProvider for MockConnectionProvider {
    async fn acquire(&self) -> Result<RunConnection, InfraError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(RunConnection::mock_with_token(Arc::clone(&*self.token)))
    }
}

// ===== MockNotificationRepository =====

#[derive(Clone, Default)]
pub struct MockNotificationRepository {
    rows:        Arc<Mutex<HashMap<i32, NotificationRow>>>,
    completions: Arc<Mutex<Vec<(NotificationId, NotificationCompletion)>>>,
    unavailable: Arc<AtomicBool>,
}

impl MockNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// status が NULL の配信待ちレコードを追加する
    pub fn add_pending(&self, id: i32, subject: Option<&str>, message: Option<&str>) {
        self.add_row(NotificationRow {
            id,
            subject: subject.map(str::to_string),
            message: message.map(str::to_string),
            status: None,
            completed_at: None,
            recipients_notified: None,
        });
    }

    pub fn add_row(&self, row: NotificationRow) {
        self.rows.lock().unwrap().insert(row.id, row);
    }

    pub fn row(&self, id: i32) -> Option<NotificationRow> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    /// 成功した完了記録の書き込み（書き込み順）
    pub fn completions(&self) -> Vec<(NotificationId, NotificationCompletion)> {
        self.completions.lock().unwrap().clone()
    }

    /// 以降の全操作を DB エラーにする
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), InfraError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationRepository for MockNotificationRepository {
    async fn find_by_id(
        &self,
        _conn: &mut RunConnection,
        id: NotificationId,
    ) -> Result<Option<NotificationRow>, InfraError> {
        self.check_available()?;
        Ok(self.row(id.as_i32()))
    }

    async fn complete(
        &self,
        _conn: &mut RunConnection,
        id: NotificationId,
        completion: &NotificationCompletion,
    ) -> Result<(), InfraError> {
        self.check_available()?;

        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&id.as_i32())
            .filter(|row| !NotificationStatus::from_db(row.status.as_deref()).is_terminal())
            .ok_or_else(|| InfraError::conflict("Notification", id.to_string()))?;

        let status: &'static str = completion.status().into();
        row.status = Some(status.to_string());
        row.completed_at = Some(completion.completed_at());
        row.recipients_notified = Some(completion.recipients_notified());

        self.completions.lock().unwrap().push((id, *completion));
        Ok(())
    }
}

// ===== MockAttendeeRepository =====

#[derive(Clone, Default)]
pub struct MockAttendeeRepository {
    recipients:   Arc<Mutex<Vec<Recipient>>>,
    stream_calls: Arc<AtomicUsize>,
    unavailable:  Arc<AtomicBool>,
}

impl MockAttendeeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipients(recipients: Vec<Recipient>) -> Self {
        let repo = Self::new();
        *repo.recipients.lock().unwrap() = recipients;
        repo
    }

    /// `stream_all` が呼ばれた回数
    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    /// 以降のストリームを DB エラー 1 件で終わらせる
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl AttendeeRepository for MockAttendeeRepository {
    fn stream_all<'c>(
        &'c self,
        _conn: &'c mut RunConnection,
    ) -> BoxStream<'c, Result<Recipient, InfraError>> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return futures::stream::once(async { Err(InfraError::from(sqlx::Error::PoolTimedOut)) })
                .boxed();
        }

        let snapshot = self.recipients.lock().unwrap().clone();
        futures::stream::iter(snapshot.into_iter().map(Ok)).boxed()
    }
}

// ===== MockNotificationSender =====

/// 送信内容を記録するモック送信
///
/// 宛先ごとに失敗や遅延を仕込める。同時送信数の最大値も記録する。
#[derive(Clone, Default)]
pub struct MockNotificationSender {
    sent:          Arc<Mutex<Vec<EmailMessage>>>,
    failing:       Arc<Mutex<HashSet<String>>>,
    delays:        Arc<Mutex<HashMap<String, Duration>>>,
    default_delay: Arc<Mutex<Option<Duration>>>,
    in_flight:     Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した宛先への送信を失敗させる
    pub fn fail_for(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    /// 指定した宛先への送信を遅延させる
    pub fn delay_for(&self, address: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(address.to_string(), delay);
    }

    /// 全宛先への送信を遅延させる（個別指定が優先）
    pub fn delay_all(&self, delay: Duration) {
        *self.default_delay.lock().unwrap() = Some(delay);
    }

    /// 送信に成功したメール（完了順）
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn delay_of(&self, address: &str) -> Option<Duration> {
        self.delays
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .or(*self.default_delay.lock().unwrap())
    }
}

/// 送信中カウンタをスコープで管理する（キャンセル時も減算される）
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay_of(&email.to) {
            tokio::time::sleep(delay).await;
        }

        validate_address(&email.to)?;
        if self.failing.lock().unwrap().contains(&email.to) {
            return Err(NotificationError::SendFailed(format!(
                "mailbox unavailable: {}",
                email.to
            )));
        }

        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ===== MockTriggerQueue =====

#[derive(Clone, Default)]
pub struct MockTriggerQueue {
    messages: Arc<Mutex<VecDeque<Vec<u8>>>>,
}

impl MockTriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, payload: &[u8]) {
        self.messages.lock().unwrap().push_back(payload.to_vec());
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TriggerQueue for MockTriggerQueue {
    async fn receive(&self, wait: Duration) -> Result<Option<Vec<u8>>, InfraError> {
        let payload = self.messages.lock().unwrap().pop_front();
        if payload.is_none() {
            tokio::time::sleep(wait).await;
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use futures::TryStreamExt;
    use pretty_assertions::assert_eq;
    use techconf_domain::notification::SendOutcome;

    use super::*;

    fn completion() -> NotificationCompletion {
        NotificationCompletion::derive(
            &[SendOutcome::success("ann@example.com")],
            false,
            Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_完了記録は2回目でconflictになる() {
        let repo = MockNotificationRepository::new();
        repo.add_pending(42, Some("Welcome"), Some("Hello"));
        let mut conn = RunConnection::mock();
        let id = NotificationId::new(42);

        repo.complete(&mut conn, id, &completion()).await.unwrap();
        let second = repo.complete(&mut conn, id, &completion()).await;

        assert!(second.unwrap_err().is_conflict());
        assert_eq!(repo.completions().len(), 1);
        assert_eq!(repo.row(42).unwrap().status.as_deref(), Some("completed"));
    }

    #[tokio::test]
    async fn test_存在しないidの完了記録はconflictになる() {
        let repo = MockNotificationRepository::new();
        let mut conn = RunConnection::mock();

        let result = repo.complete(&mut conn, NotificationId::new(7), &completion()).await;

        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_受信者ストリームは何度でも最初から列挙できる() {
        let repo = MockAttendeeRepository::with_recipients(vec![
            Recipient::new("Ann", "Lee", "ann@example.com"),
            Recipient::new("Bo", "Kim", "bo@example.com"),
        ]);
        let mut conn = RunConnection::mock();

        let first: Vec<Recipient> = repo.stream_all(&mut conn).try_collect().await.unwrap();
        let second: Vec<Recipient> = repo.stream_all(&mut conn).try_collect().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.stream_calls(), 2);
    }

    #[tokio::test]
    async fn test_モック送信は失敗指定の宛先だけ失敗する() {
        let sender = MockNotificationSender::new();
        sender.fail_for("b@x.com");
        let email = |to: &str| EmailMessage {
            to:      to.to_string(),
            subject: "s".to_string(),
            body:    "b".to_string(),
        };

        assert!(sender.send_email(&email("a@x.com")).await.is_ok());
        assert!(sender.send_email(&email("b@x.com")).await.is_err());
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_コネクションの返却を追跡できる() {
        let provider = MockConnectionProvider::new();
        let _clone = provider.clone();

        let conn = provider.acquire().await.unwrap();
        assert_eq!(provider.open_connections(), 1);
        drop(conn);

        assert_eq!(provider.open_connections(), 0);
        assert_eq!(provider.acquired_count(), 1);
    }

    #[tokio::test]
    async fn test_空のキューはnoneを返す() {
        let queue = MockTriggerQueue::new();
        queue.push(b"42");

        assert_eq!(queue.receive(Duration::ZERO).await.unwrap(), Some(b"42".to_vec()));
        assert_eq!(queue.receive(Duration::ZERO).await.unwrap(), None);
    }
}
