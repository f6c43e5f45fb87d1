//! OCR gateway. A thin trait over the vision service, a production client
//! for the Gemini REST API, and a retrying gateway that degrades to a
//! failure sentinel instead of surfacing transport errors to the pipeline.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR service unreachable: {0}")]
    Unreachable(String),

    #[error("OCR request timed out")]
    Timeout,

    #[error("OCR service returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// One OCR attempt against the vision service.
pub trait OcrEngine: Send + Sync {
    fn extract_text(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Result of a gateway recognition. `Failed` means every attempt was
/// exhausted; the pipeline continues without OCR text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    Text(String),
    Failed,
}

pub struct OcrGateway {
    engine: Box<dyn OcrEngine>,
    attempts: u32,
    initial_backoff: Duration,
}

impl OcrGateway {
    pub fn new(engine: Box<dyn OcrEngine>) -> Self {
        Self::with_policy(engine, 3, Duration::from_secs(2))
    }

    pub fn with_policy(engine: Box<dyn OcrEngine>, attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            engine,
            attempts: attempts.max(1),
            initial_backoff,
        }
    }

    /// Run OCR with retries. The backoff doubles between attempts.
    pub fn recognize(&self, image: &[u8]) -> OcrOutcome {
        let mut backoff = self.initial_backoff;
        for attempt in 1..=self.attempts {
            match self.engine.extract_text(image) {
                Ok(text) => {
                    tracing::debug!(attempt, chars = text.len(), "OCR succeeded");
                    return OcrOutcome::Text(text);
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "OCR attempt failed");
                    if attempt < self.attempts {
                        std::thread::sleep(backoff);
                        backoff *= 2;
                    }
                }
            }
        }
        tracing::error!(attempts = self.attempts, "OCR failed, continuing without text");
        OcrOutcome::Failed
    }
}

const OCR_PROMPT: &str =
    "Extract all visible text from this payment receipt image. \
     Return the text exactly as printed, one line per receipt line.";

/// Gemini vision client. One generateContent call per attempt, with the
/// receipt image inlined as base64.
pub struct GeminiOcr {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiOcr {
    pub fn new(endpoint: String, api_key: String, timeout: Duration) -> Result<Self, OcrError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OcrError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

impl OcrEngine for GeminiOcr {
    fn extract_text(&self, image: &[u8]) -> Result<String, OcrError> {
        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": OCR_PROMPT },
                    {
                        "inline_data": {
                            "mime_type": "image/jpeg",
                            "data": BASE64.encode(image),
                        }
                    }
                ]
            }]
        });

        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::InvalidResponse(format!(
                "unexpected status {status}"
            )));
        }

        let value: serde_json::Value = response
            .json()
            .map_err(|e| OcrError::InvalidResponse(e.to_string()))?;
        let text = value["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| OcrError::InvalidResponse("no text in response".into()))?;
        // A well-formed response with no recognized text is still a failure.
        if text.trim().is_empty() {
            return Err(OcrError::InvalidResponse("empty text in response".into()));
        }
        Ok(text.to_string())
    }
}

fn map_transport_error(err: reqwest::Error) -> OcrError {
    if err.is_timeout() {
        OcrError::Timeout
    } else if err.is_connect() {
        OcrError::Unreachable(err.to_string())
    } else {
        OcrError::InvalidResponse(err.to_string())
    }
}

/// Scripted engine for tests. Pops one result per call.
#[cfg(test)]
pub struct MockOcr {
    script: std::sync::Mutex<std::collections::VecDeque<Result<String, OcrError>>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockOcr {
    pub fn scripted(script: Vec<Result<String, OcrError>>) -> Self {
        Self {
            script: std::sync::Mutex::new(script.into()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn always(text: &str) -> Self {
        Self::scripted(vec![Ok(text.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl OcrEngine for MockOcr {
    fn extract_text(&self, _image: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        match script.pop_front() {
            Some(result) => result,
            // An exhausted single-entry script keeps returning the last kind
            // of answer a real service would: nothing.
            None => Err(OcrError::Unreachable("script exhausted".into())),
        }
    }
}

#[cfg(test)]
impl OcrEngine for std::sync::Arc<MockOcr> {
    fn extract_text(&self, image: &[u8]) -> Result<String, OcrError> {
        self.as_ref().extract_text(image)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn fast_gateway(engine: MockOcr, attempts: u32) -> OcrGateway {
        OcrGateway::with_policy(Box::new(engine), attempts, Duration::ZERO)
    }

    #[test]
    fn first_attempt_success_skips_retries() {
        let gateway = fast_gateway(MockOcr::always("receipt text"), 3);
        assert_eq!(
            gateway.recognize(b"img"),
            OcrOutcome::Text("receipt text".into())
        );
    }

    #[test]
    fn transient_failures_are_retried() {
        let mock = MockOcr::scripted(vec![
            Err(OcrError::Timeout),
            Err(OcrError::Unreachable("refused".into())),
            Ok("third time".into()),
        ]);
        let gateway = fast_gateway(mock, 3);
        assert_eq!(
            gateway.recognize(b"img"),
            OcrOutcome::Text("third time".into())
        );
    }

    #[test]
    fn exhausted_attempts_degrade_to_failure() {
        let mock = MockOcr::scripted(vec![
            Err(OcrError::Timeout),
            Err(OcrError::Timeout),
            Err(OcrError::Timeout),
        ]);
        let gateway = fast_gateway(mock, 3);
        assert_eq!(gateway.recognize(b"img"), OcrOutcome::Failed);
    }

    #[test]
    fn attempt_count_is_respected() {
        let mock = Arc::new(MockOcr::scripted(vec![
            Err(OcrError::Timeout),
            Err(OcrError::Timeout),
            Ok("too late".into()),
        ]));
        let gateway = OcrGateway::with_policy(Box::new(mock.clone()), 2, Duration::ZERO);
        assert_eq!(gateway.recognize(b"img"), OcrOutcome::Failed);
        assert_eq!(mock.calls(), 2);
    }
}
