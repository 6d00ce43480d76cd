//! Success envelope: `{"success": true, "data": ...}`

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The full envelope as a JSON value (stored for idempotent replays)
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(Envelope {
            success: true,
            data: &self.data,
        })
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(Envelope {
                success: true,
                data: self.data,
            }),
        )
            .into_response()
    }
}
