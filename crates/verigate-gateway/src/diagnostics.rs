use serde::Serialize;
use verigate_core::validate::mask_token;

/// Fixed set of facts about one gateway decision.
///
/// Attached to responses only when debug output is enabled. Tokens appear
/// masked; the verify token never appears at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_found: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortened: Option<bool>,
}

impl Diagnostics {
    pub(crate) fn with_page_token(mut self, raw: &str) -> Self {
        self.page_token = Some(mask_token(raw));
        self
    }
}
