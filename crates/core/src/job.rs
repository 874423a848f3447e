//! Render job documents and the storage hand-off key scheme.
//!
//! A job is created per render request, persisted as a JSON object keyed
//! by its identifier, and handed to the instance as a storage pointer in
//! its boot metadata. The worker signals completion by dropping a
//! zero-byte marker object under the job's output prefix.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// File name of the zero-byte completion marker the worker writes.
pub const COMPLETION_MARKER: &str = "DONE.flag";

/// Worker-local scratch directory for render outputs before upload.
pub const WORKER_OUTPUT_PATH: &str = "/tmp/comfy-out";

/// A render request as received from the client.
///
/// Either a full workflow graph or a bare prompt must be present; the
/// worker expands a bare prompt into its default workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Full ComfyUI workflow graph (opaque to the dispatcher).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Value>,
    /// Bare prompt, used when no workflow graph is supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Model to fetch before rendering (https download or storage URI).
    pub model_url: String,
    /// Optional sampler override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler: Option<String>,
    /// Optional step-count override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
}

/// The persisted job document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderJob {
    /// Unique job identifier (128-bit random).
    pub job_id: String,
    /// Annotated copy of the workflow graph or expanded prompt.
    pub workflow: Value,
    /// Model the worker must fetch before rendering.
    pub model_url: String,
}

/// Generate a fresh job identifier.
///
/// UUID v4 gives 122 random bits, so two calls collide with negligible
/// probability.
pub fn new_job_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Object key for the persisted job document under the jobs location.
pub fn job_object_key(job_id: &str) -> String {
    format!("{job_id}.json")
}

/// Key prefix under which the worker uploads this job's artifacts.
pub fn output_prefix(job_id: &str) -> String {
    format!("{job_id}/")
}

/// Key of the completion marker for this job.
pub fn marker_key(job_id: &str) -> String {
    format!("{job_id}/{COMPLETION_MARKER}")
}

impl RenderJob {
    /// Build the job document for `request` without mutating it.
    ///
    /// The workflow graph is deep-cloned before being annotated with the
    /// job identifier (`client_id`) and the worker-local output path, so
    /// the caller's structure is bit-identical before and after.
    pub fn prepare(job_id: &str, request: &RenderRequest) -> Result<Self, CoreError> {
        let mut workflow = match (&request.workflow, &request.prompt) {
            (Some(graph), _) => graph.clone(),
            (None, Some(prompt)) => serde_json::json!({ "prompt": prompt }),
            (None, None) => {
                return Err(CoreError::Internal(
                    "Render request must carry a workflow or a prompt".to_string(),
                ))
            }
        };

        let obj = workflow.as_object_mut().ok_or_else(|| {
            CoreError::Internal("Workflow must be a JSON object".to_string())
        })?;
        obj.insert("client_id".to_string(), Value::String(job_id.to_string()));
        obj.insert(
            "output_path".to_string(),
            Value::String(WORKER_OUTPUT_PATH.to_string()),
        );
        if let Some(sampler) = &request.sampler {
            obj.insert("sampler".to_string(), Value::String(sampler.clone()));
        }
        if let Some(steps) = request.steps {
            obj.insert("steps".to_string(), Value::from(steps));
        }

        Ok(RenderJob {
            job_id: job_id.to_string(),
            workflow,
            model_url: request.model_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_with_workflow() -> RenderRequest {
        RenderRequest {
            workflow: Some(json!({"3": {"class_type": "KSampler", "inputs": {"seed": 42}}})),
            prompt: None,
            model_url: "gs://models/x.safetensors".to_string(),
            sampler: None,
            steps: None,
        }
    }

    #[test]
    fn prepare_never_mutates_the_request() {
        let request = request_with_workflow();
        let before = serde_json::to_string(&request).unwrap();

        let job = RenderJob::prepare("job-1", &request).unwrap();
        assert_eq!(job.workflow["client_id"], "job-1");

        let after = serde_json::to_string(&request).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn prepare_annotates_the_copy() {
        let job = RenderJob::prepare("job-1", &request_with_workflow()).unwrap();
        assert_eq!(job.workflow["client_id"], "job-1");
        assert_eq!(job.workflow["output_path"], WORKER_OUTPUT_PATH);
        // Original nodes survive.
        assert_eq!(job.workflow["3"]["inputs"]["seed"], 42);
    }

    #[test]
    fn prepare_carries_sampler_and_steps() {
        let mut request = request_with_workflow();
        request.sampler = Some("euler_a".to_string());
        request.steps = Some(28);

        let job = RenderJob::prepare("job-2", &request).unwrap();
        assert_eq!(job.workflow["sampler"], "euler_a");
        assert_eq!(job.workflow["steps"], 28);
    }

    #[test]
    fn prepare_expands_bare_prompt() {
        let request = RenderRequest {
            workflow: None,
            prompt: Some("a cat".to_string()),
            model_url: "gs://models/x.safetensors".to_string(),
            sampler: None,
            steps: None,
        };

        let job = RenderJob::prepare("job-3", &request).unwrap();
        assert_eq!(job.workflow["prompt"], "a cat");
        assert_eq!(job.workflow["client_id"], "job-3");
    }

    #[test]
    fn prepare_rejects_empty_request() {
        let request = RenderRequest {
            workflow: None,
            prompt: None,
            model_url: "gs://models/x.safetensors".to_string(),
            sampler: None,
            steps: None,
        };
        assert!(RenderJob::prepare("job-4", &request).is_err());
    }

    #[test]
    fn job_ids_are_unique() {
        let a = new_job_id();
        let b = new_job_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn key_scheme() {
        assert_eq!(job_object_key("abc"), "abc.json");
        assert_eq!(output_prefix("abc"), "abc/");
        assert_eq!(marker_key("abc"), "abc/DONE.flag");
    }
}
