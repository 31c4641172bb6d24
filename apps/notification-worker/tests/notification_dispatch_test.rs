//! 通知配信の統合テスト
//!
//! トリガーメッセージの受信から完了記録までを、インメモリモックで通しで検証する。
//!
//! ## テストケース
//!
//! - 全員に送信成功 → `completed`、件名が受信者ごとに差し込まれる
//! - 一部の送信失敗 → `partially_failed`、成功数だけ数える
//! - 参加者 0 人 → `completed`、0 件、送信なし
//! - 不正なペイロード → `MalformedTrigger`、配信は起動しない
//! - 存在しない ID → `NotFound`、書き込みなし
//! - 同じ ID の再トリガー → `ConcurrentUpdate`、完了記録は変わらない
//! - 完了記録の書き込み失敗 → エラーログは 1 件だけ

mod helpers;

use helpers::{
    DispatchTestBuilder,
    log_capture::{error_messages, setup_capture},
};
use pretty_assertions::assert_eq;
use techconf_domain::notification::{NotificationStatus, Recipient};
use techconf_notification_worker::error::{DispatchError, IntakeError};

fn ann_and_bo() -> Vec<Recipient> {
    vec![
        Recipient::new("Ann", "Lee", "a@x.com"),
        Recipient::new("Bo", "Kim", "b@x.com"),
    ]
}

#[tokio::test]
async fn test_全員に送信成功するとcompletedで2件と記録される() {
    // Arrange
    let builder = DispatchTestBuilder::new().with_attendees(ann_and_bo());
    builder.add_notification(42, "Welcome {first_name}", "See you at TechConf, {first_name}!");
    let sut = builder.build_intake();

    // Act
    let result = sut.on_message(b"42").await.unwrap();

    // Assert
    assert_eq!(result.status, NotificationStatus::Completed);
    assert_eq!(result.recipients_notified, 2);
    assert_eq!(builder.sent_subjects(), vec!["Welcome Ann", "Welcome Bo"]);

    let row = builder.notifications.row(42).unwrap();
    assert_eq!(row.status.as_deref(), Some("completed"));
    assert_eq!(row.recipients_notified, Some(2));
    assert_eq!(row.completed_at, Some(builder.now()));
}

#[tokio::test]
async fn test_一部の送信失敗でpartially_failedと1件が記録される() {
    // Arrange
    let builder = DispatchTestBuilder::new().with_attendees(ann_and_bo());
    builder.add_notification(42, "Welcome {first_name}", "Hello");
    builder.backend.fail_for("b@x.com");
    let sut = builder.build_intake();

    // Act
    let result = sut.on_message(b"42").await.unwrap();

    // Assert
    assert_eq!(result.status, NotificationStatus::PartiallyFailed);
    assert_eq!(result.recipients_notified, 1);
    assert_eq!(builder.sent_subjects(), vec!["Welcome Ann"]);
    assert_eq!(
        builder.notifications.row(42).unwrap().status.as_deref(),
        Some("partially_failed")
    );
}

#[tokio::test]
async fn test_参加者0人ならcompletedで0件と記録され送信しない() {
    // Arrange
    let builder = DispatchTestBuilder::new();
    builder.add_notification(42, "Welcome {first_name}", "Hello");
    let sut = builder.build_intake();

    // Act
    let result = sut.on_message(b"42").await.unwrap();

    // Assert
    assert_eq!(result.status, NotificationStatus::Completed);
    assert_eq!(result.recipients_notified, 0);
    assert!(builder.backend.sent().is_empty());
    assert_eq!(builder.notifications.row(42).unwrap().recipients_notified, Some(0));
}

#[tokio::test]
async fn test_不正なペイロードは配信を起動しない() {
    // Arrange
    let builder = DispatchTestBuilder::new().with_attendees(ann_and_bo());
    builder.add_notification(42, "Welcome", "Hello");
    let sut = builder.build_intake();

    // Act
    let result = sut.on_message(b"abc").await;

    // Assert
    assert!(matches!(result, Err(IntakeError::MalformedTrigger { .. })));
    assert_eq!(builder.connections.acquired_count(), 0);
    assert!(builder.backend.sent().is_empty());
}

#[tokio::test]
async fn test_存在しないidはnot_foundで何も書き込まない() {
    // Arrange
    let builder = DispatchTestBuilder::new().with_attendees(ann_and_bo());
    let sut = builder.build_intake();

    // Act
    let result = sut.on_message(b"42").await;

    // Assert
    assert!(matches!(
        result,
        Err(IntakeError::Dispatch(DispatchError::NotFound(_)))
    ));
    assert!(builder.notifications.completions().is_empty());
    assert!(builder.backend.sent().is_empty());
}

#[tokio::test]
async fn test_同じidの再トリガーはconcurrent_updateで完了記録は変わらない() {
    // Arrange
    let builder = DispatchTestBuilder::new().with_attendees(ann_and_bo());
    builder.add_notification(42, "Welcome {first_name}", "Hello");
    let sut = builder.build_intake();
    sut.on_message(b"42").await.unwrap();
    let first = builder.notifications.row(42);

    // Act
    let second = sut.on_message(b"42").await;

    // Assert
    assert!(matches!(
        second,
        Err(IntakeError::Dispatch(DispatchError::ConcurrentUpdate(_)))
    ));
    assert_eq!(builder.notifications.row(42), first);
    assert_eq!(builder.notifications.completions().len(), 1);
    assert_eq!(builder.connections.open_connections(), 0);
}

#[tokio::test]
async fn test_完了記録の書き込み失敗はエラーログが1件だけ出る() {
    // Arrange
    let builder = DispatchTestBuilder::new().with_attendees(ann_and_bo());
    builder.add_notification(42, "Welcome {first_name}", "Hello");
    let sut = builder.build_intake();
    sut.on_message(b"42").await.unwrap();
    let (_guard, events) = setup_capture();

    // Act
    let second = sut.on_message(b"42").await;

    // Assert
    assert!(matches!(
        second,
        Err(IntakeError::Dispatch(DispatchError::ConcurrentUpdate(_)))
    ));
    assert_eq!(error_messages(&events), vec!["通知の配信に失敗"]);
}
