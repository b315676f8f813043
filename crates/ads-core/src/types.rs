use serde::{Deserialize, Serialize};

/// Body of `POST /api/insert`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertAdRequest {
    #[serde(alias = "ID")]
    pub id: i64,
    #[serde(rename = "projectName")]
    pub project_name: String,
    pub text: String,
}

/// Body of `POST /api/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAdRequest {
    #[serde(rename = "projectName")]
    pub project_name: String,
    pub text: String,
}

/// Body of `DELETE /api/delete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteAdRequest {
    #[serde(alias = "ID")]
    pub id: i64,
}

/// One ranked search hit. Smaller distance = more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdMatch {
    pub id: i64,
    #[serde(rename = "projectName")]
    pub project: String,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// `{status, details}` reply of the insert and delete endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: Status,
    pub details: String,
}

impl StatusResponse {
    pub fn success(details: impl Into<String>) -> Self {
        Self { status: Status::Success, details: details.into() }
    }

    pub fn error(details: impl Into<String>) -> Self {
        Self { status: Status::Error, details: details.into() }
    }
}
