//! Model server discovery.
//!
//! Pings the configured Ollama-style server once at startup and lists the
//! locally downloaded models from its `/api/tags` endpoint.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("model server unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("model server returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to parse model list: {0}")]
    Parse(#[source] reqwest::Error),
}

/// A single model entry returned by `/api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServedModel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ServedModel>,
}

pub(crate) fn tags_url(base_url: &str) -> String {
    format!("{}/api/tags", base_url.trim_end_matches('/'))
}

/// Return the models the server has available.
pub fn fetch_models(base_url: &str) -> Result<Vec<ServedModel>, ProbeError> {
    let url = tags_url(base_url);
    let unreachable = |source| ProbeError::Unreachable {
        url: url.clone(),
        source,
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .map_err(unreachable)?;
    let response = client.get(&url).send().map_err(unreachable)?;

    if !response.status().is_success() {
        return Err(ProbeError::Status(response.status()));
    }

    let tags: TagsResponse = response.json().map_err(ProbeError::Parse)?;
    Ok(tags.models)
}

/// True when `model` (with or without a `:tag` suffix) is in `models`.
pub fn has_model(models: &[ServedModel], model: &str) -> bool {
    models.iter().any(|m| {
        m.name == model || m.name.split_once(':').is_some_and(|(base, _)| base == model)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn served(names: &[&str]) -> Vec<ServedModel> {
        names
            .iter()
            .map(|n| ServedModel {
                name: n.to_string(),
            })
            .collect()
    }

    #[test]
    fn tags_url_trims_trailing_slash() {
        assert_eq!(tags_url("http://localhost:11434/"), "http://localhost:11434/api/tags");
        assert_eq!(tags_url("http://gpu-box:8080"), "http://gpu-box:8080/api/tags");
    }

    #[test]
    fn model_match_ignores_tag_suffix() {
        let models = served(&["llama3:latest", "qwen2.5:7b"]);
        assert!(has_model(&models, "llama3"));
        assert!(has_model(&models, "qwen2.5:7b"));
        assert!(!has_model(&models, "qwen2"));
        assert!(!has_model(&[], "llama3"));
    }

    #[test]
    fn unreachable_server_is_an_error() {
        // Port 9 (discard) is closed on test machines.
        let err = fetch_models("http://127.0.0.1:9").unwrap_err();
        assert!(matches!(err, ProbeError::Unreachable { .. }));
    }
}
