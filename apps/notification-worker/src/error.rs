//! # 通知ワーカーのエラー定義
//!
//! 配信（run）・トリガー受信・設定読み込みで発生するエラー。
//! 各エラーはログの `error.kind` に使う種別文字列を返す。

use techconf_domain::notification::NotificationId;
use techconf_infra::InfraError;
use techconf_shared::event_log::error::{category, kind};
use thiserror::Error;

/// 配信 1 回で発生するエラー
///
/// 送信失敗はここには含まれない（受信者ごとの結果として記録される）。
#[derive(Debug, Error)]
pub enum DispatchError {
    /// 通知レコードが存在しない
    #[error("通知が見つかりません: id={0}")]
    NotFound(NotificationId),

    /// 件名または本文が空
    #[error("通知の内容が不正です: id={id}: {reason}")]
    InvalidContent { id: NotificationId, reason: String },

    /// 既に終端ステータスに到達している
    #[error("通知は既に完了しています: id={0}")]
    ConcurrentUpdate(NotificationId),

    /// DB に到達できない、またはクエリが失敗した
    #[error("ストアにアクセスできません: {0}")]
    StoreUnavailable(#[from] InfraError),

    /// 送信結果が 1 件も集まらないまま配信期限を過ぎた
    #[error("配信期限を超過しました: id={0}")]
    DeadlineExceeded(NotificationId),
}

impl DispatchError {
    /// ログの `error.kind`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => kind::NOT_FOUND,
            Self::InvalidContent { .. } => kind::INVALID_CONTENT,
            Self::ConcurrentUpdate(_) => kind::CONCURRENT_UPDATE,
            Self::StoreUnavailable(_) => kind::STORE_UNAVAILABLE,
            Self::DeadlineExceeded(_) => kind::DEADLINE_EXCEEDED,
        }
    }

    /// ログの `error.category`
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound(_) | Self::InvalidContent { .. } => category::INPUT,
            Self::ConcurrentUpdate(_) | Self::StoreUnavailable(_) | Self::DeadlineExceeded(_) => {
                category::INFRASTRUCTURE
            }
        }
    }
}

/// トリガーメッセージ処理のエラー
#[derive(Debug, Error)]
pub enum IntakeError {
    /// ペイロードが 10 進整数として読めない
    #[error("トリガーメッセージが不正です: {payload:?}")]
    MalformedTrigger { payload: String },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl IntakeError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedTrigger { .. } => kind::MALFORMED_TRIGGER,
            Self::Dispatch(e) => e.kind(),
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::MalformedTrigger { .. } => category::INPUT,
            Self::Dispatch(e) => e.category(),
        }
    }
}

/// 設定読み込みのエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{var} の値が不正です: {value:?}")]
    Invalid { var: &'static str, value: String },
}
