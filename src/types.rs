use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One job posting as extracted from a listing page. Field names double as
/// the table-store column names, so they are part of the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPost {
    pub org_name: String,
    pub job_title: String,
    pub salary: Option<String>,
    pub location: String,
    pub contract_type: ContractType,
    pub location_type: LocationType,
    pub date_posted: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractType {
    Contract,
    #[serde(rename = "Full-time")]
    FullTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationType {
    Remote,
    OnSite,
    Hybrid,
}

/// Per-batch outcome from a record sink push.
#[derive(Debug, Default)]
pub struct PushReport {
    pub pushed: usize,
    pub failures: Vec<PushFailure>,
}

#[derive(Debug)]
pub struct PushFailure {
    pub index: usize,
    pub error: String,
}

/// How a scrape run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// Pagination stalled: the post-click URL matched the pre-click URL,
    /// or no next-page control was present.
    Exhausted {
        pages_visited: usize,
        records_pushed: usize,
    },
    /// The page-visit safety bound stopped the loop before the site did.
    SafetyLimitHit {
        pages_visited: usize,
        records_pushed: usize,
    },
}

/// Outcome of one reader fetch, successful or not. Written verbatim as one
/// JSONL line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResult {
    pub url: String,
    pub status: u16,
    pub fetched_at: DateTime<Utc>,
    pub content: Option<String>,
    #[serde(default)]
    pub meta: Map<String, Value>,
    pub error: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn job_post_wire_names() {
        let post = JobPost {
            org_name: "Open Data Collective".into(),
            job_title: "Data Engineer".into(),
            salary: None,
            location: "Minneapolis, MN".into(),
            contract_type: ContractType::FullTime,
            location_type: LocationType::OnSite,
            date_posted: "3 days ago".into(),
            url: "https://example.org/jobs/123".into(),
        };

        let v = serde_json::to_value(&post).unwrap();
        assert_eq!(v["contract_type"], "Full-time");
        assert_eq!(v["location_type"], "on-site");
        assert!(v["salary"].is_null());
        assert_eq!(v["org_name"], "Open Data Collective");
    }

    #[test]
    fn enum_values_round_trip() {
        for raw in ["\"Contract\"", "\"Full-time\""] {
            let c: ContractType = serde_json::from_str(raw).unwrap();
            assert_eq!(serde_json::to_string(&c).unwrap(), raw);
        }
        for raw in ["\"remote\"", "\"on-site\"", "\"hybrid\""] {
            let l: LocationType = serde_json::from_str(raw).unwrap();
            assert_eq!(serde_json::to_string(&l).unwrap(), raw);
        }
    }
}
