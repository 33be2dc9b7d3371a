//! Background removal through the Gemini `generateContent` REST endpoint.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::remover::{BackgroundRemover, ISOLATION_PROMPT};
use crate::source::SourceImage;

/// Image-capable model used unless overridden.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
/// Base URL of the Generative Language API.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// HTTP client for Gemini image editing.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a client with the default endpoint and model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollaboratorUnavailable`] if `api_key` is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::CollaboratorUnavailable("missing API key".into()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key,
        })
    }

    /// Create a client from the key in [`API_KEY_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollaboratorUnavailable`] if the variable is unset or blank.
    pub fn from_env() -> Result<Self> {
        Self::new(std::env::var(API_KEY_ENV).unwrap_or_default())
    }

    /// Use another model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use another API base URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl BackgroundRemover for GeminiClient {
    async fn remove_background(&self, source: &SourceImage) -> Result<Vec<u8>> {
        let body = GenerateRequest::isolate(source);
        tracing::info!(model = %self.model, len = source.bytes().len(), "requesting background removal");

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::CollaboratorUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::CollaboratorUnavailable(format!("HTTP {status}: {text}")));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| Error::ExtractionFailed {
            reason: format!("unreadable response: {e}"),
        })?;
        extract_image(parsed)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

impl GenerateRequest {
    fn isolate(source: &SourceImage) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart {
                        inline_data: Some(Blob {
                            mime_type: Some(source.mime_type().to_string()),
                            data: STANDARD.encode(source.bytes()),
                        }),
                        text: None,
                    },
                    RequestPart {
                        inline_data: None,
                        text: Some(ISOLATION_PROMPT.to_string()),
                    },
                ],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<Blob>,
    text: Option<String>,
}

/// Take the first inline image of the first candidate.
fn extract_image(response: GenerateResponse) -> Result<Vec<u8>> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let mut remark = None;
    for part in parts {
        if let Some(blob) = part.inline_data {
            return STANDARD
                .decode(blob.data.trim())
                .map_err(|e| Error::ExtractionFailed {
                    reason: format!("image data is not valid base64: {e}"),
                });
        }
        if remark.is_none() {
            remark = part.text;
        }
    }

    Err(Error::ExtractionFailed {
        reason: match remark {
            Some(text) => format!("no image part returned (model said: {text})"),
            None => "no image part returned".to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn blank_key_is_unavailable() {
        assert!(matches!(
            GeminiClient::new("  "),
            Err(Error::CollaboratorUnavailable(_))
        ));
    }

    #[test]
    fn url_joins_endpoint_and_model() {
        let client = GeminiClient::new("k")
            .unwrap()
            .with_endpoint("http://localhost:8080/v1beta/")
            .with_model("m");
        assert_eq!(client.url(), "http://localhost:8080/v1beta/models/m:generateContent");
    }

    #[test]
    fn first_inline_image_is_decoded() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[
                {"text":"Here you go"},
                {"inlineData":{"mimeType":"image/png","data":"AQID"}},
                {"inlineData":{"mimeType":"image/png","data":"BAUG"}}
            ]}}]}"#,
        );
        assert_eq!(extract_image(response).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn text_only_answer_is_extraction_failure() {
        let response = parse(r#"{"candidates":[{"content":{"parts":[{"text":"I cannot"}]}}]}"#);
        match extract_image(response) {
            Err(Error::ExtractionFailed { reason }) => assert!(reason.contains("I cannot")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_answer_is_extraction_failure() {
        for json in [r#"{}"#, r#"{"candidates":[]}"#, r#"{"candidates":[{}]}"#] {
            assert!(matches!(
                extract_image(parse(json)),
                Err(Error::ExtractionFailed { .. })
            ));
        }
    }

    #[test]
    fn corrupt_base64_is_extraction_failure() {
        let response =
            parse(r#"{"candidates":[{"content":{"parts":[{"inlineData":{"data":"@@@"}}]}}]}"#);
        assert!(matches!(
            extract_image(response),
            Err(Error::ExtractionFailed { .. })
        ));
    }

    #[test]
    fn request_carries_image_and_prompt() {
        let png = {
            let image = image::RgbaImage::new(1, 1);
            let mut buf = std::io::Cursor::new(Vec::new());
            image.write_to(&mut buf, image::ImageFormat::Png).unwrap();
            buf.into_inner()
        };
        let source = SourceImage::from_bytes(png.clone()).unwrap();
        let json = serde_json::to_value(GenerateRequest::isolate(&source)).unwrap();
        let parts = &json["contents"][0]["parts"];

        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(
            STANDARD
                .decode(parts[0]["inlineData"]["data"].as_str().unwrap())
                .unwrap(),
            png
        );
        assert!(parts[0].get("text").is_none());
        assert_eq!(parts[1]["text"], ISOLATION_PROMPT);
    }
}
