//! SendGrid 通知送信実装
//!
//! SendGrid v3 Mail Send API（`POST /v3/mail/send`）を reqwest で呼び出す。
//! API キーは Bearer トークンとして送る。本番の既定バックエンド。

use async_trait::async_trait;
use serde::Serialize;
use techconf_domain::notification::{EmailMessage, NotificationError};

use super::{NotificationSender, validate_address};

const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com";

/// SendGrid 通知送信
#[derive(Clone)]
pub struct SendGridNotificationSender {
    base_url:     String,
    api_key:      String,
    from_address: String,
    client:       reqwest::Client,
}

impl std::fmt::Debug for SendGridNotificationSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridNotificationSender")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl SendGridNotificationSender {
    /// 新しい SendGrid 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `api_key`: SendGrid API キー（`EMAIL_API_KEY`）
    /// - `from_address`: 送信元メールアドレス（SendGrid で認証済みであること）
    pub fn new(api_key: String, from_address: String) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, from_address)
    }

    /// 接続先を差し替えて作成する（ローカルのモックサーバー向け）
    pub fn with_base_url(base_url: &str, api_key: String, from_address: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            from_address,
            client: reqwest::Client::new(),
        }
    }
}

// ===== リクエストボディ =====

#[derive(Debug, Serialize)]
struct MailSendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from:             EmailAddress<'a>,
    subject:          &'a str,
    content:          [MailContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [EmailAddress<'a>; 1],
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct MailContent<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value:        &'a str,
}

impl<'a> MailSendRequest<'a> {
    fn new(from: &'a str, to: &'a str, subject: &'a str, body: &'a str) -> Self {
        Self {
            personalizations: [Personalization {
                to: [EmailAddress { email: to }],
            }],
            from: EmailAddress { email: from },
            subject,
            content: [MailContent {
                content_type: "text/plain",
                value:        body,
            }],
        }
    }
}

#[async_trait]
impl NotificationSender for SendGridNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let to = validate_address(&email.to)?.to_string();
        let url = format!("{}/v3/mail/send", self.base_url);
        let request = MailSendRequest::new(&self.from_address, &to, &email.subject, &email.body);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SendGrid 接続失敗: {e}")))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(NotificationError::SendFailed(format!(
                    "SendGrid 送信失敗 {status}: {body}"
                )))
            }
        }
    }
}
