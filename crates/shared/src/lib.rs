//! # TechConf 共有ユーティリティ
//!
//! ワーカーとインフラ層の双方から使うロギング基盤。
//! ビジネスロジックは含まない。

pub mod event_log;
pub mod observability;
