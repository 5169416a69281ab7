use crate::calendar::Assignment;
use crate::config::ScheduleRequest;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:5000/schedule";
pub const SERVICE_URL_ENV: &str = "TIMETABLED_SERVICE_URL";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const UNEXPECTED_SHAPE: &str = "unexpected response from scheduling service";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleResponse {
    Assignments(Vec<Assignment>),
    Failure { error: String },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("scheduling service unreachable: {0}")]
    Transport(String),
    #[error("scheduling service sent an unreadable body: {0}")]
    InvalidBody(String),
}

/// An array is a schedule; an `{"error": ...}` object or any other shape is a failure.
///
/// Items are read one by one so a bad record never sinks the rest. Items that
/// are not objects are dropped.
pub fn parse_schedule_response(value: &Value) -> ScheduleResponse {
    match value {
        Value::Array(items) => {
            let mut assignments = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                if !item.is_object() {
                    log::warn!("schedule record #{} is not an object, dropped", index);
                    continue;
                }
                match Assignment::deserialize(item) {
                    Ok(a) => assignments.push(a),
                    Err(e) => log::warn!("schedule record #{} dropped: {}", index, e),
                }
            }
            ScheduleResponse::Assignments(assignments)
        }
        Value::Object(obj) => match obj.get("error").and_then(|v| v.as_str()) {
            Some(msg) => ScheduleResponse::Failure {
                error: msg.to_string(),
            },
            None => ScheduleResponse::Failure {
                error: UNEXPECTED_SHAPE.to_string(),
            },
        },
        _ => ScheduleResponse::Failure {
            error: UNEXPECTED_SHAPE.to_string(),
        },
    }
}

pub trait ScheduleService {
    fn request_schedule(&self, body: &ScheduleRequest) -> Result<Value, ServiceError>;
}

pub struct HttpScheduleService {
    agent: ureq::Agent,
    url: String,
}

impl HttpScheduleService {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            url: url.into(),
        }
    }
}

impl ScheduleService for HttpScheduleService {
    fn request_schedule(&self, body: &ScheduleRequest) -> Result<Value, ServiceError> {
        let payload =
            serde_json::to_string(body).map_err(|e| ServiceError::InvalidBody(e.to_string()))?;
        let response = match self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_string(&payload)
        {
            Ok(r) => r,
            // Error statuses still carry the service's `{"error": ...}` body.
            Err(ureq::Error::Status(code, r)) => {
                log::warn!("scheduling service answered HTTP {}", code);
                r
            }
            Err(ureq::Error::Transport(t)) => return Err(ServiceError::Transport(t.to_string())),
        };
        let text = response
            .into_string()
            .map_err(|e| ServiceError::InvalidBody(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| ServiceError::InvalidBody(e.to_string()))
    }
}
