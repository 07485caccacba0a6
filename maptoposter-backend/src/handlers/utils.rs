use std::collections::HashMap;

use maptoposter_job_queue::{JobRecord, JobStatus};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::ApiError;

/// Read and parse the `jobId` path parameter.
///
/// Anything that is not a UUID cannot name a job, so it is reported as not
/// found rather than as a malformed request.
pub fn job_id_from_path(path: &HashMap<String, String>) -> Result<Uuid, ApiError> {
    let raw = path
        .get("jobId")
        .ok_or_else(|| ApiError::bad_request("missing jobId path parameter"))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Job not found"))
}

pub fn file_url(job_id: &Uuid) -> String {
    format!("/api/download/{job_id}")
}

pub fn job_to_payload(record: &JobRecord) -> Value {
    let mut object = Map::new();
    object.insert("jobId".to_string(), json!(record.id));
    object.insert("status".to_string(), json!(record.status));
    object.insert("message".to_string(), json!(record.message));
    object.insert("progress".to_string(), json!(record.progress));

    if record.status == JobStatus::Completed {
        object.insert("fileUrl".to_string(), json!(file_url(&record.id)));
    }

    Value::Object(object)
}

/// Parse an optional boolean query parameter.
pub fn parse_bool_param(
    raw: Option<&String>,
    fallback: bool,
    field: &str,
) -> Result<bool, ApiError> {
    match raw.map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(fallback),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ApiError::bad_request(format!("{field} must be true or false"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_url_only_for_completed_jobs() {
        let mut record = JobRecord::new(Uuid::new_v4(), json!({}));
        let queued = job_to_payload(&record);
        assert_eq!(queued["status"], "queued");
        assert_eq!(queued["progress"], 0);
        assert!(queued.get("fileUrl").is_none());

        record.start("Starting poster generation").unwrap();
        record
            .complete(std::path::PathBuf::from("/tmp/x.png"), "done")
            .unwrap();
        let done = job_to_payload(&record);
        assert_eq!(done["fileUrl"], format!("/api/download/{}", record.id));
        assert_eq!(done["jobId"], record.id.to_string());
    }

    #[test]
    fn job_id_parsing() {
        let mut path = HashMap::new();
        assert!(matches!(job_id_from_path(&path), Err(ApiError::BadRequest(_))));
        path.insert("jobId".to_string(), "nope".to_string());
        assert!(matches!(job_id_from_path(&path), Err(ApiError::NotFound(_))));
        let id = Uuid::new_v4();
        path.insert("jobId".to_string(), id.to_string());
        assert_eq!(job_id_from_path(&path).unwrap(), id);
    }

    #[test]
    fn bool_params() {
        assert!(parse_bool_param(None, true, "download").unwrap());
        assert!(!parse_bool_param(Some(&"False".to_string()), true, "download").unwrap());
        assert!(parse_bool_param(Some(&"1".to_string()), false, "download").unwrap());
        assert!(parse_bool_param(Some(&"maybe".to_string()), true, "download").is_err());
    }
}
