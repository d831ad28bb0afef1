//! Ingest message model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One published message, as the edge node sends it
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestMessage {
    #[validate(length(min = 1, max = 256))]
    pub topic: String,

    #[validate(length(max = 4096))]
    pub payload: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MessageBatch {
    #[validate(length(min = 1, max = 1000), nested)]
    pub messages: Vec<IngestMessage>,
}

/// Body of `POST /api/v1/messages`: a batch or a single message
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IngestRequest {
    Batch(MessageBatch),
    Single(IngestMessage),
}

impl IngestRequest {
    pub fn into_messages(self) -> Result<Vec<IngestMessage>, validator::ValidationErrors> {
        match self {
            IngestRequest::Batch(batch) => {
                batch.validate()?;
                Ok(batch.messages)
            }
            IngestRequest::Single(message) => {
                message.validate()?;
                Ok(vec![message])
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub accepted: usize,
    pub slots: Vec<String>,
    pub server_time: i64,
}
