use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::config::Config;
use crate::errors::{CustomResult, Error, NarrativeTransportSnafu};
use crate::models::{CoachingPayload, Narrative};

#[derive(Serialize, Debug)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for the external text generation service.
#[derive(Debug, Clone)]
pub enum NarrativeClient {
    Disabled,
    Http {
        client: reqwest::Client,
        endpoint: String,
        model: String,
        timeout: Duration,
    },
}

impl NarrativeClient {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> NarrativeClient {
        NarrativeClient::Http {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        }
    }

    /// disabled when no endpoint is configured
    pub fn from_config(config: &Config) -> NarrativeClient {
        match &config.narrative_endpoint {
            Some(endpoint) => NarrativeClient::new(
                endpoint,
                &config.narrative_model,
                Duration::from_secs(config.narrative_timeout_secs),
            ),
            None => NarrativeClient::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, NarrativeClient::Http { .. })
    }

    /// # request a narrative
    /// the whole exchange, body included, is bounded by the timeout.
    pub async fn request(&self, payload: &CoachingPayload) -> CustomResult<Narrative> {
        let NarrativeClient::Http { client, endpoint, model, timeout } = self else {
            return Err(Error::MalformedNarrativeError {
                reason: "narrative service is disabled".to_string(),
            });
        };

        let body = GenerateRequest {
            model: model.as_str(),
            prompt: build_prompt(payload),
            stream: false,
        };
        let url = format!("{}/api/generate", endpoint);

        let exchange = async {
            let response = client
                .post(&url)
                .json(&body)
                .send()
                .await
                .context(NarrativeTransportSnafu)?;

            if !response.status().is_success() {
                return Err(Error::NarrativeStatusError {
                    status: response.status().as_u16(),
                });
            }

            let generated = response
                .json::<GenerateResponse>()
                .await
                .context(NarrativeTransportSnafu)?;
            Ok::<GenerateResponse, Error>(generated)
        };

        let generated = tokio::time::timeout(*timeout, exchange)
            .await
            .map_err(|_| Error::NarrativeTimeoutError {
                seconds: timeout.as_secs(),
            })??;

        parse_narrative(&generated.response)
    }

    /// # narrative for a driver, or nothing
    /// every failure is logged and leaves the statistics to stand alone.
    pub async fn synthesize(&self, payload: &CoachingPayload) -> Option<Narrative> {
        if !self.is_enabled() {
            return None;
        }

        match self.request(payload).await {
            Ok(narrative) => {
                debug!(target: "narrative:synthesize", "narrative for {} / {}", payload.race_id, payload.driver_id);
                Some(narrative)
            }
            Err(error) => {
                warn!(
                    target: "narrative:synthesize",
                    "no narrative for {} / {}: {}",
                    payload.race_id, payload.driver_id, error
                );
                None
            }
        }
    }
}

pub fn build_prompt(payload: &CoachingPayload) -> String {
    let statistics = serde_json::to_string_pretty(payload).unwrap_or_default();

    format!(
        "You are a racing performance analyst coaching driver {driver} in race {race}.\n\
         The statistics below were computed from the race telemetry. Gaps are seconds lost \
         against the best case composite lap; a lower field percentile is faster.\n\n\
         {statistics}\n\n\
         Be evidence based. Facts state only what the numbers show and cite sections or laps. \
         Hypotheses are clearly labelled possible explanations. Recommendations are specific \
         techniques the driver can measure and change.\n\n\
         Return ONLY valid JSON of this shape:\n\
         {{\"facts\": [\"...\"], \"hypotheses\": [\"...\"], \"recommendations\": [\"...\"]}}\n",
        driver = payload.driver_id,
        race = payload.race_id,
        statistics = statistics,
    )
}

/// the json object inside a fenced block, or the outermost braces
fn extract_json(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        let end = rest.find("```")?;
        return Some(rest[..end].trim());
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn clean(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// # parse the generated text
/// the three lists must all be present and hold at least one line between them.
pub fn parse_narrative(text: &str) -> CustomResult<Narrative> {
    let json = extract_json(text).ok_or_else(|| Error::MalformedNarrativeError {
        reason: "no json object in response".to_string(),
    })?;

    let narrative: Narrative = serde_json::from_str(json).map_err(|error| Error::MalformedNarrativeError {
        reason: error.to_string(),
    })?;

    let narrative = Narrative {
        facts: clean(narrative.facts),
        hypotheses: clean(narrative.hypotheses),
        recommendations: clean(narrative.recommendations),
    };

    if narrative.facts.is_empty() && narrative.hypotheses.is_empty() && narrative.recommendations.is_empty() {
        return Err(Error::MalformedNarrativeError {
            reason: "narrative is empty".to_string(),
        });
    }

    Ok(narrative)
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::models::{PatternSummary, WeatherSummary};

    fn payload() -> CoachingPayload {
        CoachingPayload {
            track_id: "barber".to_string(),
            race_id: "barber-race-1".to_string(),
            driver_id: "7".to_string(),
            theoretical_best_lap_s: 99.0,
            section_gaps: vec![],
            pattern: PatternSummary {
                lap_count: 4,
                best_lap_s: Some(100.2),
                mean_lap_s: Some(100.4),
                consistency_score: Some(5.0),
                consistency: None,
                trend: None,
            },
            weather: WeatherSummary::default(),
        }
    }

    /// answers a single request with `body` as the generated text
    async fn serve_once(generated: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let body = serde_json::json!({ "response": generated }).to_string();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0u8; 4096];
            loop {
                let read = socket.read(&mut buffer).await.unwrap();
                request.extend_from_slice(&buffer[..read]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + length {
                        break;
                    }
                }
                if read == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        format!("http://{}", address)
    }

    #[test]
    fn parses_fenced_json() {
        let text = "Here you go:\n```json\n{\"facts\": [\"Lap 3 was 0.4s off\"], \"hypotheses\": [], \"recommendations\": [\" Brake later into turn 5 \", \"\"]}\n```";
        let narrative = parse_narrative(text).unwrap();
        assert_eq!(narrative.facts, vec!["Lap 3 was 0.4s off"]);
        assert_eq!(narrative.recommendations, vec!["Brake later into turn 5"]);
    }

    #[test]
    fn parses_bare_object_in_prose() {
        let text = "Sure. {\"facts\": [\"a\"], \"hypotheses\": [\"b\"], \"recommendations\": [\"c\"]} Hope it helps.";
        assert_eq!(parse_narrative(text).unwrap().hypotheses, vec!["b"]);
    }

    #[test]
    fn rejects_malformed_output() {
        assert!(matches!(parse_narrative("no json here"), Err(Error::MalformedNarrativeError { .. })));
        assert!(matches!(
            parse_narrative("{\"facts\": [\"a\"]}"),
            Err(Error::MalformedNarrativeError { .. })
        ));
        assert!(matches!(
            parse_narrative("{\"facts\": [], \"hypotheses\": [\" \"], \"recommendations\": []}"),
            Err(Error::MalformedNarrativeError { .. })
        ));
    }

    #[test]
    fn prompt_carries_the_statistics() {
        let prompt = build_prompt(&payload());
        assert!(prompt.contains("\"theoretical_best_lap_s\": 99.0"));
        assert!(prompt.contains("\"recommendations\""));
    }

    #[tokio::test]
    async fn disabled_client_gives_no_narrative() {
        assert!(NarrativeClient::Disabled.synthesize(&payload()).await.is_none());
        assert!(!NarrativeClient::from_config(&Config::default()).is_enabled());
    }

    #[tokio::test]
    async fn reads_narrative_from_service() {
        let endpoint = serve_once("{\"facts\": [\"f\"], \"hypotheses\": [\"h\"], \"recommendations\": [\"r\"]}").await;
        let client = NarrativeClient::new(&endpoint, "gemma3:4b", Duration::from_secs(5));

        let narrative = client.synthesize(&payload()).await.unwrap();
        assert_eq!(narrative.facts, vec!["f"]);
    }

    #[tokio::test]
    async fn malformed_service_output_falls_back() {
        let endpoint = serve_once("I cannot help with that.").await;
        let client = NarrativeClient::new(&endpoint, "gemma3:4b", Duration::from_secs(5));

        assert!(client.synthesize(&payload()).await.is_none());
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // accept and never answer
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = NarrativeClient::new(&format!("http://{}", address), "gemma3:4b", Duration::from_millis(200));
        let error = client.request(&payload()).await.unwrap_err();
        assert!(matches!(error, Error::NarrativeTimeoutError { .. }));
    }
}
