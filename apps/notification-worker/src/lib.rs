//! # TechConf 通知ワーカー
//!
//! トリガーキューから通知 ID を受け取り、全参加者にパーソナライズした
//! メールを送信して、結果を通知レコードに記録する。
//!
//! ```text
//! Redis リスト ──▶ Worker ──▶ TriggerIntake ──▶ Dispatcher
//!                                                  │
//!                    ┌─────────────────────────────┼──────────────────┐
//!                    ▼                             ▼                  ▼
//!              ContentStore ◀──────────── StatusFinalizer        Sender × N
//!               (PostgreSQL)                                   (メール送信)
//! ```

pub mod config;
pub mod error;
pub mod intake;
pub mod usecase;
pub mod worker;
