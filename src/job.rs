//! Server-reported job snapshots.
//!
//! Every API response that describes a job is decoded into a fresh
//! [`JobState`]. Snapshots are never patched in place: the orchestrator
//! threads the latest one forward, so the value it holds is always exactly
//! what the service said last.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Lifecycle tag of a conversion job, driven entirely by the service.
///
/// The client never invents a transition; it only reads the tag back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    New,
    Uploaded,
    Queued,
    Analysing,
    Processing,
    Complete,
    Failed,
    SubscriptionRequired,
    PaymentRequired,
    /// Any tag this client does not know. Resolved as a failure.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// The service is still working on the job; keep polling.
    pub fn is_in_progress(self) -> bool {
        match self {
            JobStatus::Queued | JobStatus::Analysing | JobStatus::Processing => true,
            JobStatus::New
            | JobStatus::Uploaded
            | JobStatus::Complete
            | JobStatus::Failed
            | JobStatus::SubscriptionRequired
            | JobStatus::PaymentRequired
            | JobStatus::Unknown => false,
        }
    }

    /// Wire spelling of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::New => "New",
            JobStatus::Uploaded => "Uploaded",
            JobStatus::Queued => "Queued",
            JobStatus::Analysing => "Analysing",
            JobStatus::Processing => "Processing",
            JobStatus::Complete => "Complete",
            JobStatus::Failed => "Failed",
            JobStatus::SubscriptionRequired => "SubscriptionRequired",
            JobStatus::PaymentRequired => "PaymentRequired",
            JobStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One snapshot of a job as reported by the service.
///
/// Fields the service omits decode as `None`; a response that omits `ID`
/// therefore yields a snapshot without an id, exactly as reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    /// Opaque job id. The service may send it as a string or a number; it
    /// is kept as text either way.
    #[serde(rename = "ID", default, deserialize_with = "opaque_id")]
    pub id: Option<String>,

    #[serde(rename = "Status", default)]
    pub status: Option<JobStatus>,

    /// Human-readable text, usually populated on failure.
    #[serde(rename = "Message", default)]
    pub message: Option<String>,

    #[serde(rename = "PercentComplete", default)]
    pub percent_complete: Option<f64>,

    #[serde(rename = "ResultRows", default)]
    pub result_rows: Option<u64>,

    /// Result location. Only meaningful once `status` is `Complete`;
    /// use [`JobState::result_location`].
    #[serde(rename = "ResultUrl", default)]
    pub result_url: Option<String>,
}

impl JobState {
    /// Decode a snapshot from a raw API response body.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// True while the service is still queueing, analysing or processing.
    pub fn is_in_progress(&self) -> bool {
        self.status.is_some_and(JobStatus::is_in_progress)
    }

    /// Status tag for logs, `"<none>"` when the service sent none.
    pub fn status_label(&self) -> &'static str {
        self.status.map(JobStatus::as_str).unwrap_or("<none>")
    }

    /// The job id, if non-empty.
    pub fn job_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Where to download the generated SQL.
    ///
    /// Must only be called on a `Complete` snapshot.
    pub fn result_location(&self) -> Option<&str> {
        debug_assert_eq!(
            self.status,
            Some(JobStatus::Complete),
            "result location read on a job that is not complete"
        );
        self.result_url.as_deref()
    }
}

fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|id| match id {
        RawId::Text(s) => s,
        RawId::Unsigned(n) => n.to_string(),
        RawId::Signed(n) => n.to_string(),
        RawId::Float(n) => n.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_pascal_case_response() {
        let body = br#"{
            "ID": "12345",
            "Status": "Complete",
            "Message": null,
            "PercentComplete": 100,
            "ResultRows": 250,
            "ResultUrl": "https://sqlizer.io/downloads/12345"
        }"#;
        let state = JobState::from_json(body).unwrap();
        assert_eq!(state.job_id(), Some("12345"));
        assert_eq!(state.status, Some(JobStatus::Complete));
        assert_eq!(state.percent_complete, Some(100.0));
        assert_eq!(state.result_rows, Some(250));
        assert_eq!(
            state.result_location(),
            Some("https://sqlizer.io/downloads/12345")
        );
    }

    #[test]
    fn missing_fields_decode_as_none() {
        let state =
            JobState::from_json(br#"{"Status":"Failed","Message":"That file is too big"}"#)
                .unwrap();
        assert_eq!(state.id, None);
        assert_eq!(state.job_id(), None);
        assert_eq!(state.status, Some(JobStatus::Failed));
        assert_eq!(state.message.as_deref(), Some("That file is too big"));
    }

    #[test]
    fn unknown_status_maps_to_unknown() {
        let state = JobState::from_json(br#"{"ID":"1","Status":"Exploded"}"#).unwrap();
        assert_eq!(state.status, Some(JobStatus::Unknown));
        assert!(!state.is_in_progress());
    }

    #[test]
    fn only_three_statuses_keep_polling() {
        let polling: Vec<JobStatus> = [
            JobStatus::New,
            JobStatus::Uploaded,
            JobStatus::Queued,
            JobStatus::Analysing,
            JobStatus::Processing,
            JobStatus::Complete,
            JobStatus::Failed,
            JobStatus::SubscriptionRequired,
            JobStatus::PaymentRequired,
            JobStatus::Unknown,
        ]
        .into_iter()
        .filter(|s| s.is_in_progress())
        .collect();
        assert_eq!(
            polling,
            vec![JobStatus::Queued, JobStatus::Analysing, JobStatus::Processing]
        );
    }

    #[test]
    fn empty_state_is_not_in_progress() {
        let state = JobState::default();
        assert!(!state.is_in_progress());
        assert_eq!(state.status_label(), "<none>");
    }

    #[test]
    fn numeric_id_is_kept_as_text() {
        let state = JobState::from_json(br#"{"ID":12345,"Status":"Queued"}"#).unwrap();
        assert_eq!(state.job_id(), Some("12345"));
        assert!(state.is_in_progress());

        let state = JobState::from_json(br#"{"ID":null,"Status":"New"}"#).unwrap();
        assert_eq!(state.id, None);
    }

    #[test]
    fn boolean_id_is_rejected() {
        assert!(JobState::from_json(br#"{"ID":true}"#).is_err());
    }

    #[test]
    fn empty_id_is_treated_as_missing() {
        let state = JobState {
            id: Some(String::new()),
            ..JobState::default()
        };
        assert_eq!(state.job_id(), None);
    }
}
