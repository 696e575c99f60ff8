use std::collections::{HashMap, HashSet};
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::Duration;

use regex::Regex;
use serde_json::Value;

use crate::config::Config;
use crate::error::AppError;
use crate::scraper::record::ParsedLocation;

const CONFIDENCE_THRESHOLD: f64 = 0.5;
const LLM_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const LLM_MAX_ATTEMPTS: u32 = 3;

const SYSTEM_PROMPT: &str = "You are a location parsing expert. Parse location strings into structured data with city, country, and region fields. Always respond with valid JSON.\n\n\
Rules:\n\
- Extract city, country, and region\n\
- Use \"Remote\" for region if the location indicates remote work\n\
- Use full country names (e.g., \"United States\", not \"US\")\n\
- If uncertain, use \"Unknown\" for that field\n\
- Region must be one of: Americas, Europe, Asia, Oceania, Africa, Remote, Unknown\n\
- Confidence score: 0.1-1.0 based on clarity of input\n\n\
For a single location:\n\
{\"city\": \"string\", \"country\": \"string\", \"region\": \"string\", \"confidence\": float}\n\n\
For multiple locations, return an array of the same length as the input:\n\
[{\"city\": \"string\", \"country\": \"string\", \"region\": \"string\", \"confidence\": float}, ...]";

static LOCATIONS_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*locations\s*:?\s*").expect("valid regex"));

/// Strip the "Locations:" boilerplate job boards prepend to location text.
/// Shared by the platform parsers and the enrichment fallback.
pub fn clean_location(raw: &str) -> String {
    LOCATIONS_PREFIX.replace(raw, "").trim().to_string()
}

/// Minimal client for an OpenAI-compatible chat-completions endpoint.
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(LLM_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Llm(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// One chat completion, retried up to three times with 1s/2s/4s backoff.
    async fn chat(&self, user_prompt: &str) -> Result<String, AppError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt },
            ],
        });

        let mut backoff = Duration::from_secs(1);
        let mut last_error = String::new();
        for attempt in 1..=LLM_MAX_ATTEMPTS {
            match self.chat_once(&body).await {
                Ok(content) => return Ok(content),
                Err(error) => {
                    tracing::warn!(
                        "LLM request failed on attempt {attempt}/{LLM_MAX_ATTEMPTS}: {error}"
                    );
                    last_error = error.to_string();
                    if attempt < LLM_MAX_ATTEMPTS {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }
        Err(AppError::Llm(format!("max retries exceeded: {last_error}")))
    }

    async fn chat_once(&self, body: &Value) -> Result<String, AppError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Llm(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Llm(format!(
                "LLM endpoint returned {}",
                response.status()
            )));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("failed to decode completion: {e}")))?;
        let content = data
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| AppError::Llm("malformed completion response".to_string()))?;

        if content.trim().is_empty() {
            return Err(AppError::Llm("empty response from LLM".to_string()));
        }
        Ok(content.to_string())
    }
}

/// Structured location enrichment with batching, caching, a confidence
/// gate, and a fallback that keeps the pipeline alive when the LLM is
/// disabled or failing.
///
/// The cache is written once per normalized key; concurrent parses of the
/// same key may issue duplicate LLM calls, which is accepted to keep the
/// design lock-free across await points.
pub struct LocationIntelligence {
    client: Option<LlmClient>,
    cache: Mutex<HashMap<String, ParsedLocation>>,
}

impl LocationIntelligence {
    pub fn new(client: Option<LlmClient>) -> Self {
        Self {
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        if !config.enable_location_intelligence {
            tracing::info!("Location intelligence disabled; using fallback parsing");
            return Ok(Self::disabled());
        }
        match &config.llm_api_key {
            Some(api_key) => {
                let client = LlmClient::new(&config.llm_base_url, api_key, &config.llm_model)?;
                tracing::info!("Location intelligence enabled with model {}", config.llm_model);
                Ok(Self::new(Some(client)))
            }
            None => {
                tracing::warn!(
                    "Location intelligence enabled but LLM_API_KEY is unset; using fallback parsing"
                );
                Ok(Self::disabled())
            }
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, ParsedLocation>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Parse one location string: cache, then LLM, then fallback. The
    /// batch path covers the pipeline; this is the single-string variant
    /// for callers outside it.
    #[allow(dead_code)]
    pub async fn parse_single(&self, raw: &str) -> ParsedLocation {
        if raw.trim().is_empty() {
            return ParsedLocation::unknown();
        }
        let key = cache_key(raw);
        if let Some(hit) = self.cache().get(&key) {
            return hit.clone();
        }

        let parsed = match &self.client {
            None => ParsedLocation::fallback(clean_location(raw)),
            Some(client) => match parse_single_llm(client, raw).await {
                Ok(parsed) if parsed.confidence >= CONFIDENCE_THRESHOLD => parsed.normalized(),
                Ok(parsed) => {
                    tracing::info!(
                        "LLM confidence too low ({}) for '{raw}', using fallback",
                        parsed.confidence
                    );
                    ParsedLocation::fallback(clean_location(raw))
                }
                Err(error) => {
                    tracing::warn!("LLM parsing failed for '{raw}': {error}");
                    ParsedLocation::fallback(clean_location(raw))
                }
            },
        };

        self.cache().insert(key, parsed.clone());
        parsed
    }

    /// Parse many location strings with one LLM call for all cache misses.
    /// Results come back in input order; every entry has all four fields
    /// regardless of what the LLM did.
    pub async fn parse_batch(&self, raws: &[String]) -> Vec<ParsedLocation> {
        if raws.is_empty() {
            return Vec::new();
        }

        let mut misses: Vec<String> = Vec::new();
        {
            let cache = self.cache();
            let mut seen: HashSet<String> = HashSet::new();
            for raw in raws {
                if raw.trim().is_empty() {
                    continue;
                }
                let key = cache_key(raw);
                if cache.contains_key(&key) || !seen.insert(key) {
                    continue;
                }
                misses.push(raw.clone());
            }
        }

        if !misses.is_empty() {
            let resolved: Vec<ParsedLocation> = match &self.client {
                None => misses
                    .iter()
                    .map(|raw| ParsedLocation::fallback(clean_location(raw)))
                    .collect(),
                Some(client) => match parse_batch_llm(client, &misses).await {
                    Ok(values) => misses
                        .iter()
                        .enumerate()
                        .map(|(i, raw)| match values.get(i).and_then(validate_item) {
                            Some(parsed) if parsed.confidence >= CONFIDENCE_THRESHOLD => {
                                parsed.normalized()
                            }
                            Some(parsed) => {
                                tracing::info!(
                                    "LLM confidence too low ({}) for '{raw}', using fallback",
                                    parsed.confidence
                                );
                                ParsedLocation::fallback(clean_location(raw))
                            }
                            None => {
                                tracing::warn!("Missing or invalid LLM result for '{raw}'");
                                ParsedLocation::fallback(clean_location(raw))
                            }
                        })
                        .collect(),
                    Err(error) => {
                        tracing::warn!("Batch LLM processing failed: {error}; using fallback");
                        misses
                            .iter()
                            .map(|raw| ParsedLocation::fallback(clean_location(raw)))
                            .collect()
                    }
                },
            };

            let mut cache = self.cache();
            for (raw, parsed) in misses.iter().zip(resolved) {
                cache.insert(cache_key(raw), parsed);
            }
        }

        let cache = self.cache();
        raws.iter()
            .map(|raw| {
                if raw.trim().is_empty() {
                    ParsedLocation::unknown()
                } else {
                    cache
                        .get(&cache_key(raw))
                        .cloned()
                        .unwrap_or_else(|| ParsedLocation::fallback(clean_location(raw)))
                }
            })
            .collect()
    }
}

fn cache_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

async fn parse_single_llm(client: &LlmClient, raw: &str) -> Result<ParsedLocation, AppError> {
    let content = client.chat(&format!("Parse this location: {raw}")).await?;
    let payload = extract_json_payload(&content);
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| AppError::Llm(format!("malformed JSON in LLM response: {e}")))?;
    validate_item(&value).ok_or_else(|| AppError::Llm(format!("invalid location record: {value}")))
}

async fn parse_batch_llm(client: &LlmClient, locations: &[String]) -> Result<Vec<Value>, AppError> {
    let numbered: Vec<String> = locations
        .iter()
        .enumerate()
        .map(|(i, location)| format!("{}. {location}", i + 1))
        .collect();
    let content = client
        .chat(&format!("Parse these locations:\n{}", numbered.join("\n")))
        .await?;
    let payload = extract_json_payload(&content);
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| AppError::Llm(format!("malformed JSON in LLM response: {e}")))?;
    match value {
        Value::Array(items) => Ok(items),
        // A single-location batch may come back as a bare object.
        Value::Object(_) => Ok(vec![value]),
        other => Err(AppError::Llm(format!("unexpected response shape: {other}"))),
    }
}

/// A usable record must carry all four fields with the right types.
fn validate_item(value: &Value) -> Option<ParsedLocation> {
    let object = value.as_object()?;
    for key in ["city", "country", "region", "confidence"] {
        if !object.contains_key(key) {
            return None;
        }
    }
    serde_json::from_value(value.clone()).ok()
}

/// Models wrap JSON answers in code fences or prose; dig the payload out.
fn extract_json_payload(text: &str) -> &str {
    let text = text.trim();
    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }
    let start = text.find(['[', '{']);
    let end = text.rfind([']', '}']);
    if let (Some(start), Some(end)) = (start, end)
        && end >= start
    {
        return text[start..=end].trim();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_location_strips_prefix_variants() {
        assert_eq!(clean_location("Locations: London, UK"), "London, UK");
        assert_eq!(clean_location("locations Remote"), "Remote");
        assert_eq!(clean_location("LOCATIONS:Paris"), "Paris");
        assert_eq!(clean_location("  Berlin  "), "Berlin");
        assert_eq!(clean_location(""), "");
    }

    #[test]
    fn extract_json_payload_handles_fences_and_prose() {
        assert_eq!(
            extract_json_payload("```json\n[{\"city\": \"a\"}]\n```"),
            "[{\"city\": \"a\"}]"
        );
        assert_eq!(
            extract_json_payload("```\n{\"city\": \"a\"}\n```"),
            "{\"city\": \"a\"}"
        );
        assert_eq!(
            extract_json_payload("Here you go:\n[{\"city\": \"a\"}]\nHope that helps!"),
            "[{\"city\": \"a\"}]"
        );
        assert_eq!(
            extract_json_payload("{\"city\": \"a\"}"),
            "{\"city\": \"a\"}"
        );
    }

    #[test]
    fn validate_item_requires_all_four_fields() {
        let complete = serde_json::json!({
            "city": "London", "country": "United Kingdom",
            "region": "Europe", "confidence": 0.9
        });
        assert!(validate_item(&complete).is_some());

        let missing = serde_json::json!({ "city": "London", "country": "UK", "region": "Europe" });
        assert!(validate_item(&missing).is_none());

        let wrong_type = serde_json::json!({
            "city": 3, "country": "UK", "region": "Europe", "confidence": 0.9
        });
        assert!(validate_item(&wrong_type).is_none());

        assert!(validate_item(&serde_json::json!("London")).is_none());
    }

    #[tokio::test]
    async fn disabled_parser_falls_back_per_item() {
        let parser = LocationIntelligence::disabled();
        let raws = vec![
            "Locations: London, UK".to_string(),
            "Berlin, Germany".to_string(),
        ];
        let parsed = parser.parse_batch(&raws).await;
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].city, "London, UK");
        assert_eq!(parsed[0].country, "Unknown");
        assert_eq!(parsed[0].region, "Unknown");
        assert!((parsed[0].confidence - 0.1).abs() < f64::EPSILON);
        assert_eq!(parsed[1].city, "Berlin, Germany");
    }

    #[tokio::test]
    async fn empty_batch_returns_empty_without_work() {
        let parser = LocationIntelligence::disabled();
        assert!(parser.parse_batch(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn batch_preserves_input_order_with_duplicates() {
        let parser = LocationIntelligence::disabled();
        let raws = vec![
            "Paris".to_string(),
            "Tokyo".to_string(),
            "paris ".to_string(),
        ];
        let parsed = parser.parse_batch(&raws).await;
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].city, "Paris");
        assert_eq!(parsed[1].city, "Tokyo");
        // Same normalized key as the first entry, served from cache.
        assert_eq!(parsed[2], parsed[0]);
    }

    #[tokio::test]
    async fn blank_locations_map_to_unknown() {
        let parser = LocationIntelligence::disabled();
        let raws = vec!["".to_string(), "  ".to_string()];
        let parsed = parser.parse_batch(&raws).await;
        assert_eq!(parsed[0], ParsedLocation::unknown());
        assert_eq!(parsed[1], ParsedLocation::unknown());
    }

    #[tokio::test]
    async fn single_results_are_cached() {
        let parser = LocationIntelligence::disabled();
        let first = parser.parse_single("Locations: Oslo").await;
        let second = parser.parse_single("locations: oslo").await;
        assert_eq!(first, second);
        assert_eq!(parser.cache().len(), 1);
    }
}
