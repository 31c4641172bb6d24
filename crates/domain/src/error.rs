//! # ドメイン層エラー定義
//!
//! 通知レコードの内容がビジネスルールに違反している場合のエラー型。
//!
//! ## 使用例
//!
//! ```rust
//! use techconf_domain::DomainError;
//!
//! fn require_subject(subject: &str) -> Result<(), DomainError> {
//!     if subject.trim().is_empty() {
//!         return Err(DomainError::Validation("件名は必須です".to_string()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_subject("").is_err());
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 通知の件名・本文が空、ステータス文字列が解釈できない等。
    #[error("バリデーションエラー: {0}")]
    Validation(String),
}
