//! API request and response types

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use crate::database::parse_date_bound;
use crate::database::DateRange;
use crate::database::EndBoundary;
use crate::database::NameMatch;
use crate::database::ReportQuery;
use crate::database::ResultOrder;
use crate::models::Report;
use crate::LabRagError;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Error half of every handler result, rendered in the response envelope
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl From<LabRagError> for ApiError {
    fn from(err: LabRagError) -> Self {
        let status = match err.root() {
            LabRagError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LabRagError::NotFound(_) => StatusCode::NOT_FOUND,
            root if root.is_connectivity() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// `GET /api/reports` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListReportsQuery {
    #[serde(default)]
    pub order: ResultOrder,
}

/// Report search request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub match_mode: NameMatch,
    /// `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or RFC 3339
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    /// Overrides the configured end-date policy
    #[serde(default)]
    pub end_boundary: Option<EndBoundary>,
    #[serde(default)]
    pub newest_first: bool,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl SearchRequest {
    /// Turn the request into a store query
    pub fn to_query(&self, default_boundary: EndBoundary) -> crate::Result<ReportQuery> {
        let mut query = ReportQuery::all();

        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            query = query.with_name(name, self.match_mode);
        }

        match (&self.start, &self.end) {
            (Some(start), Some(end)) => {
                let range = DateRange::new(
                    parse_date_bound(start)?,
                    parse_date_bound(end)?,
                    self.end_boundary.unwrap_or(default_boundary),
                )?;
                query = query.within(range);
            }
            (None, None) => {}
            _ => {
                return Err(LabRagError::InvalidInput(
                    "start and end must be given together".to_string(),
                ))
            }
        }

        if self.newest_first {
            query = query.newest_first();
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }

        query.validate()?;
        Ok(query)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub count: usize,
    pub reports: Vec<Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchResponse {
    pub fn new(reports: Vec<Report>) -> Self {
        let message = reports.is_empty().then(|| "No records found".to_string());
        Self {
            count: reports.len(),
            reports,
            message,
        }
    }
}

/// Analysis request
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
    /// Analyze the reports returned by this session's last search
    #[serde(default)]
    pub use_last_search: bool,
    /// Analyze the reports matching this filter; ignored with `use_last_search`
    #[serde(default)]
    pub filter: Option<SearchRequest>,
}

/// Summary request
#[derive(Debug, Default, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub id: i64,
    pub deleted: bool,
}
