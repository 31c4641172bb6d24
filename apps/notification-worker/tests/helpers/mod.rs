//! 通知配信テストビルダー
//!
//! TriggerIntake から StatusFinalizer までを、インメモリモックで組み立てる。

#![allow(dead_code)]

pub mod log_capture;

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use techconf_domain::{clock::FixedClock, notification::Recipient};
use techconf_infra::mock::{
    MockAttendeeRepository,
    MockConnectionProvider,
    MockNotificationRepository,
    MockNotificationSender,
};
use techconf_notification_worker::{
    intake::TriggerIntake,
    usecase::{ContentStore, DispatchSettings, Dispatcher, Sender, StatusFinalizer},
};

/// 通知配信テストビルダー
///
/// モックへのハンドルを保持するので、組み立て後も送信内容や
/// 書き込まれた完了記録を検証できる。
pub struct DispatchTestBuilder {
    pub connections:   MockConnectionProvider,
    pub notifications: MockNotificationRepository,
    pub attendees:     MockAttendeeRepository,
    pub backend:       MockNotificationSender,
    pub settings:      DispatchSettings,
    now:               DateTime<Utc>,
}

impl DispatchTestBuilder {
    pub fn new() -> Self {
        Self {
            connections:   MockConnectionProvider::new(),
            notifications: MockNotificationRepository::new(),
            attendees:     MockAttendeeRepository::new(),
            backend:       MockNotificationSender::new(),
            settings:      DispatchSettings::default(),
            now:           Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap(),
        }
    }

    /// 参加者を指定
    pub fn with_attendees(mut self, recipients: Vec<Recipient>) -> Self {
        self.attendees = MockAttendeeRepository::with_recipients(recipients);
        self
    }

    /// 配信設定を指定
    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// 配信待ちの通知を登録する
    pub fn add_notification(&self, id: i32, subject: &str, body: &str) {
        self.notifications.add_pending(id, Some(subject), Some(body));
    }

    /// 送信済みメールの件名（ソート済み）
    pub fn sent_subjects(&self) -> Vec<String> {
        let mut subjects: Vec<String> = self.backend.sent().into_iter().map(|m| m.subject).collect();
        subjects.sort();
        subjects
    }

    pub fn build_dispatcher(&self) -> Dispatcher {
        let store = Arc::new(ContentStore::new(
            Arc::new(self.notifications.clone()),
            Arc::new(self.attendees.clone()),
        ));
        Dispatcher::new(
            Arc::new(self.connections.clone()),
            store.clone(),
            Sender::new(Arc::new(self.backend.clone()), self.settings.send_timeout),
            StatusFinalizer::new(store, Arc::new(FixedClock::new(self.now))),
            self.settings,
        )
    }

    pub fn build_intake(&self) -> TriggerIntake {
        TriggerIntake::new(Arc::new(self.build_dispatcher()))
    }
}
