//! Gemini adapter: Implementation of NarrativeGenerator over the
//! `generateContent` REST endpoint.
//!
//! Calls are blocking and bounded by connect/read/write timeouts plus a cap on
//! the response size. The API key travels in a header, never in the URL, so
//! it cannot end up in access logs.

use std::io::Read;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use zeroize::Zeroizing;

use crate::ports::{NarrativeError, NarrativeGenerator, NarrativeRequest};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const MAX_RESPONSE_BYTES: usize = 256 * 1024;

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Narrative generator backed by Google's Gemini API.
pub struct GeminiNarrative {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: Zeroizing<String>,
}

impl GeminiNarrative {
    /// Create a client; `timeout` bounds the whole call as well as each
    /// connect, read and write.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Zeroizing<String>,
        timeout: Duration,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build();
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            agent,
            endpoint,
            model: model.into(),
            api_key,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

impl NarrativeGenerator for GeminiNarrative {
    fn generate(&self, request: &NarrativeRequest<'_>) -> Result<String, NarrativeError> {
        tracing::debug!("Requesting narrative for {}", request.disease);

        let body = json!({
            "contents": [{ "parts": [{ "text": request.prompt() }] }]
        });

        let response = match self
            .agent
            .post(&self.url())
            .set("x-goog-api-key", self.api_key.as_str())
            .send_json(body)
        {
            Ok(r) => r,
            Err(ureq::Error::Status(code, _)) => return Err(NarrativeError::Status(code)),
            Err(ureq::Error::Transport(t)) => {
                return Err(NarrativeError::Transport(t.kind().to_string()))
            }
        };

        let bytes = read_bounded(response, MAX_RESPONSE_BYTES)?;
        let parsed: GenerateResponse = serde_json::from_slice(&bytes)
            .map_err(|e| NarrativeError::InvalidResponse(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        let text = text.trim();
        if text.is_empty() {
            return Err(NarrativeError::Empty);
        }
        Ok(text.to_string())
    }
}

fn read_bounded(response: ureq::Response, max_bytes: usize) -> Result<Vec<u8>, NarrativeError> {
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(max_bytes as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| NarrativeError::Transport(e.to_string()))?;
    if bytes.len() > max_bytes {
        return Err(NarrativeError::InvalidResponse(format!(
            "response exceeded {max_bytes} bytes"
        )));
    }
    Ok(bytes)
}

/// Stand-in used when no API key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNarrative;

impl NarrativeGenerator for DisabledNarrative {
    fn generate(&self, _request: &NarrativeRequest<'_>) -> Result<String, NarrativeError> {
        Err(NarrativeError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{validate, Disease, NormalizedPayload};
    use serde_json::json;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    /// Serve exactly one HTTP response on a local port; returns the base URL.
    fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                drain_request(&mut stream);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}")
    }

    /// Read headers and the full body so closing the socket does not reset it.
    fn drain_request(stream: &mut std::net::TcpStream) {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let Ok(n) = stream.read(&mut buf) else { return };
            if n == 0 {
                return;
            }
            data.extend_from_slice(&buf[..n]);
            let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&data[..end]).to_ascii_lowercase();
            let body_len = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= end + 4 + body_len {
                return;
            }
        }
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn payload() -> NormalizedPayload {
        let raw = json!({
            "Pregnancies": 1, "Glucose": 90, "BloodPressure": 70, "SkinThickness": 20,
            "Insulin": 80, "BMI": 22.0, "DiabetesPedigreeFunction": 0.2, "Age": 30
        });
        validate(Disease::Diabetes.profile(), &raw).expect("valid")
    }

    fn client(endpoint: String) -> GeminiNarrative {
        GeminiNarrative::new(
            endpoint,
            DEFAULT_MODEL,
            Zeroizing::new("test-key".to_string()),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_extracts_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Low risk. "},{"text":"Stay active."}]}}]}"#;
        let endpoint = serve_once(http_response("200 OK", body));
        let payload = payload();
        let request = NarrativeRequest {
            disease: Disease::Diabetes,
            prediction: 0,
            probability: 0.1,
            payload: &payload,
        };

        let text = client(endpoint).generate(&request).expect("narrative");
        assert_eq!(text, "Low risk. Stay active.");
    }

    #[test]
    fn test_http_error_status() {
        let endpoint = serve_once(http_response("500 Internal Server Error", "{}"));
        let payload = payload();
        let request = NarrativeRequest {
            disease: Disease::Diabetes,
            prediction: 0,
            probability: 0.1,
            payload: &payload,
        };

        let err = client(endpoint).generate(&request).expect_err("500");
        assert!(matches!(err, NarrativeError::Status(500)));
    }

    #[test]
    fn test_empty_candidates() {
        let endpoint = serve_once(http_response("200 OK", r#"{"candidates":[]}"#));
        let payload = payload();
        let request = NarrativeRequest {
            disease: Disease::Diabetes,
            prediction: 0,
            probability: 0.1,
            payload: &payload,
        };

        let err = client(endpoint).generate(&request).expect_err("empty");
        assert!(matches!(err, NarrativeError::Empty));
    }

    #[test]
    fn test_unreachable_endpoint() {
        // Bind then drop to get a port with nothing listening.
        let port = TcpListener::bind("127.0.0.1:0")
            .expect("bind")
            .local_addr()
            .expect("addr")
            .port();
        let payload = payload();
        let request = NarrativeRequest {
            disease: Disease::Diabetes,
            prediction: 0,
            probability: 0.1,
            payload: &payload,
        };

        let err = client(format!("http://127.0.0.1:{port}"))
            .generate(&request)
            .expect_err("connection refused");
        assert!(matches!(err, NarrativeError::Transport(_)));
    }

    #[test]
    fn test_slow_response_hits_overall_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                drain_request(&mut stream);
                let body = r#"{"candidates":[{"content":{"parts":[{"text":"slow"}]}}]}"#;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                // Each byte arrives well inside the per-read timeout.
                for b in body.bytes() {
                    if stream.write_all(&[b]).and_then(|()| stream.flush()).is_err() {
                        return;
                    }
                    thread::sleep(Duration::from_millis(150));
                }
            }
        });

        let payload = payload();
        let request = NarrativeRequest {
            disease: Disease::Diabetes,
            prediction: 0,
            probability: 0.1,
            payload: &payload,
        };
        let client = GeminiNarrative::new(
            format!("http://{addr}"),
            DEFAULT_MODEL,
            Zeroizing::new("test-key".to_string()),
            Duration::from_secs(1),
        );

        let started = std::time::Instant::now();
        let result = client.generate(&request);
        assert!(result.is_err(), "slow body must not complete: {result:?}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_disabled() {
        let payload = payload();
        let request = NarrativeRequest {
            disease: Disease::Heart,
            prediction: 1,
            probability: 0.9,
            payload: &payload,
        };
        assert!(matches!(
            DisabledNarrative.generate(&request),
            Err(NarrativeError::Disabled)
        ));
    }
}
