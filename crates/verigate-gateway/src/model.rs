use serde::{Deserialize, Serialize};

/// Query string of `/verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

/// Query string of `/redirect` and `/mark-visited`.
#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortener: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub service: &'static str,
    pub version: &'static str,
}
