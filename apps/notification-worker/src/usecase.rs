//! # ユースケース層
//!
//! 通知 1 件の配信（run）を構成するコンポーネント。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリ・送信バックエンド・時刻を `Arc<dyn Trait>` で外部から注入
//! - **明示的なコネクション**: 配信ごとに 1 本取得した `RunConnection` を各コンポーネントに渡す
//!
//! ## モジュール構成
//!
//! - `content_store`: 通知レコード・受信者の読み取りと完了記録の書き込み
//! - `sender`: 1 受信者への送信（失敗・タイムアウトは結果に変換）
//! - `finalizer`: 送信結果の集計と完了記録
//! - `dispatcher`: 上記を束ねて 1 件の通知を配信する

pub mod content_store;
pub mod dispatcher;
pub mod finalizer;
pub mod sender;

pub use content_store::ContentStore;
pub use dispatcher::{DispatchSettings, Dispatcher, RunResult};
pub use finalizer::StatusFinalizer;
pub use sender::Sender;
