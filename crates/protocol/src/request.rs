use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON body of a prompt exchange
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// The project index document, already stringified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_index: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_contents: Option<BTreeMap<String, String>>,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_project_index(mut self, index_json: impl Into<String>) -> Self {
        self.project_index = Some(index_json.into());
        self
    }

    #[must_use]
    pub fn with_file_contents(mut self, files: BTreeMap<String, String>) -> Self {
        if !files.is_empty() {
            self.file_contents = Some(files);
        }
        self
    }

    pub fn to_body(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Header lines for a JSON body of `body_len` bytes.
pub fn json_headers(body_len: usize) -> Vec<String> {
    vec![
        "Content-Type: application/json".to_string(),
        format!("Content-Length: {body_len}"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn minimal_body_only_has_prompt() {
        let body = PromptRequest::new("make the player jump").to_body().unwrap();
        assert_eq!(
            String::from_utf8(body).unwrap(),
            r#"{"prompt":"make the player jump"}"#
        );
    }

    #[test]
    fn project_index_is_sent_as_string() {
        let request = PromptRequest::new("hi")
            .with_model("claude-3-opus-20240229")
            .with_project_index("{\"scripts\":[]}");
        let value: serde_json::Value = serde_json::from_slice(&request.to_body().unwrap()).unwrap();

        assert_eq!(value["model"], "claude-3-opus-20240229");
        assert!(value["project_index"].is_string());
        assert_eq!(value["project_index"], "{\"scripts\":[]}");
    }

    #[test]
    fn empty_file_map_is_dropped() {
        let request = PromptRequest::new("hi").with_file_contents(BTreeMap::new());
        assert!(request.file_contents.is_none());
    }

    #[test]
    fn content_length_counts_bytes() {
        let body = PromptRequest::new("héllo").to_body().unwrap();
        let headers = json_headers(body.len());
        assert_eq!(headers[1], format!("Content-Length: {}", body.len()));
        assert_eq!(body.len(), r#"{"prompt":"héllo"}"#.len());
    }
}
