//! Synthetic response for API requests that neither network nor cache can answer

use crate::error::TilawahResult;
use crate::fetch::Response;
use serde::{Deserialize, Serialize};

pub const OFFLINE_STATUS: u16 = 503;

/// Body of the offline response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineBody {
    pub status: String,
    pub message: String,
    pub offline: bool,
}

impl OfflineBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            offline: true,
        }
    }

    /// Recognize an offline body in a response
    pub fn parse(response: &Response) -> Option<Self> {
        if response.status != OFFLINE_STATUS {
            return None;
        }
        serde_json::from_slice::<Self>(&response.body)
            .ok()
            .filter(|body| body.offline)
    }
}

/// 503 with `Content-Type: application/json`
pub fn offline_response(message: &str) -> TilawahResult<Response> {
    Response::json(OFFLINE_STATUS, &OfflineBody::new(message))
}
