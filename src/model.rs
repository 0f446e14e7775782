//! Wire models shared by the platform's services.

use serde::{Deserialize, Serialize};

/// Acknowledgement returned by synchronisation endpoints.
///
/// ```
/// use interlink::model::SyncServiceResponse;
///
/// let ack: SyncServiceResponse =
///     serde_json::from_str(r#"{"success":true,"message":"synced","affectedAmount":12}"#).unwrap();
/// assert_eq!(ack.affected_amount, Some(12));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncServiceResponse {
    /// Whether the synchronisation went through.
    #[serde(default)]
    pub success: bool,

    /// Human readable outcome.
    #[serde(default)]
    pub message: Option<String>,

    /// Number of records touched, when the endpoint reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_amount: Option<i64>,
}

impl SyncServiceResponse {
    pub fn new(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: Some(message.into()),
            affected_amount: None,
        }
    }

    pub fn with_affected_amount(mut self, amount: i64) -> Self {
        self.affected_amount = Some(amount);
        self
    }
}
