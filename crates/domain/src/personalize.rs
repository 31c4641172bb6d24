//! # 差し込み（パーソナライズ）
//!
//! 件名・本文テンプレート中のトークンを受信者の氏名で置換する。
//!
//! 置換はリテラルな文字列置換のみ。認識するトークンは [`FIRST_NAME_TOKEN`] と
//! [`LAST_NAME_TOKEN`] の 2 つで、それ以外の `{...}` はそのまま残す。
//! テンプレートエンジンは使わない（未知トークンでエラーにしないため）。

use crate::notification::Recipient;

/// 名のトークン
pub const FIRST_NAME_TOKEN: &str = "{first_name}";
/// 姓のトークン
pub const LAST_NAME_TOKEN: &str = "{last_name}";

/// テンプレートを受信者向けに差し込む
///
/// 1 パスで走査するため、差し込んだ氏名にトークン文字列が含まれていても再置換しない。
pub fn personalize(template: &str, recipient: &Recipient) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix(FIRST_NAME_TOKEN) {
            out.push_str(&recipient.first_name);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(LAST_NAME_TOKEN) {
            out.push_str(&recipient.last_name);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}
