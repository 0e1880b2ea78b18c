/// Texture Fetcher - talks to the identity and texture endpoints
use crate::{
    config::EndpointConfig,
    error::{SkinError, SkinResult},
    skin::{parse_identity, FetchResult, TextureProperty, TEXTURES_PROPERTY},
};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    StatusCode,
};
use serde::Deserialize;
use tracing::{debug, error};
use uuid::Uuid;

/// Longest player name the identity service accepts
pub const MAX_NAME_LENGTH: usize = 16;

/// Source of identities and textures used by the resolver
#[async_trait]
pub trait TextureSource: Send + Sync {
    /// Look up the UUID currently owning `name`
    async fn resolve_identity(&self, name: &str) -> SkinResult<Uuid>;

    /// Fetch the signed texture of `id`
    async fn fetch_texture(&self, id: Uuid) -> SkinResult<FetchResult>;
}

/// Primary texture endpoint body
#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    properties: Vec<RawProperty>,
}

#[derive(Debug, Deserialize)]
struct RawProperty {
    name: Option<String>,
    value: String,
    signature: Option<String>,
}

/// Alternate texture endpoint body: `textures.raw.{value,signature}`
#[derive(Debug, Deserialize)]
struct FallbackProfileResponse {
    textures: FallbackTextures,
}

#[derive(Debug, Deserialize)]
struct FallbackTextures {
    raw: RawTexture,
}

#[derive(Debug, Deserialize)]
struct RawTexture {
    value: String,
    signature: String,
}

/// HTTP implementation of [`TextureSource`]
#[derive(Clone)]
pub struct TextureFetcher {
    http_client: reqwest::Client,
    config: EndpointConfig,
}

impl TextureFetcher {
    /// Create a new texture fetcher
    pub fn new(config: EndpointConfig) -> SkinResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .build()
            .map_err(|e| SkinError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Fetch from the primary endpoint. A 429 surfaces as `RateLimited`.
    async fn fetch_primary(&self, id: Uuid) -> SkinResult<FetchResult> {
        let url = format!("{}{}?unsigned=false", self.config.profile_url, id.simple());

        let response = self.http_client.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.text().await?;
                let texture = parse_profile(&body)?;
                Ok(FetchResult::skin(id, texture))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(SkinError::RateLimited(id)),
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
                Err(SkinError::UserNotFound(id.to_string()))
            }
            _ => {
                log_unexpected_response(&url, response).await;
                Err(SkinError::UserNotFound(id.to_string()))
            }
        }
    }

    /// Fetch from the alternate endpoint. A 429 here yields the rate-limited sentinel.
    async fn fetch_fallback(&self, id: Uuid) -> SkinResult<FetchResult> {
        let url = format!("{}{}", self.config.fallback_profile_url, id.hyphenated());

        let response = self.http_client.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.text().await?;
                let texture = parse_fallback_profile(&body)?;
                Ok(FetchResult::skin(id, texture))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                debug!("Alternate texture endpoint rate limited for {}", id);
                Ok(FetchResult::RateLimited { id })
            }
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
                Err(SkinError::UserNotFound(id.to_string()))
            }
            _ => {
                log_unexpected_response(&url, response).await;
                Err(SkinError::UserNotFound(id.to_string()))
            }
        }
    }
}

#[async_trait]
impl TextureSource for TextureFetcher {
    async fn resolve_identity(&self, name: &str) -> SkinResult<Uuid> {
        if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
            return Err(SkinError::UserNotFound(name.to_string()));
        }

        let url = format!("{}{}", self.config.uuid_url, urlencoding::encode(name));

        let response = self.http_client.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.text().await?;
                parse_identity_body(&body).ok_or_else(|| {
                    SkinError::MalformedResponse(format!("Invalid UUID for {}: {}", name, body))
                })
            }
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
                Err(SkinError::UserNotFound(name.to_string()))
            }
            _ => {
                log_unexpected_response(&url, response).await;
                Err(SkinError::UserNotFound(name.to_string()))
            }
        }
    }

    async fn fetch_texture(&self, id: Uuid) -> SkinResult<FetchResult> {
        match self.fetch_primary(id).await {
            Err(SkinError::RateLimited(_)) => {
                debug!("Primary texture endpoint rate limited for {}, trying alternate", id);
                self.fetch_fallback(id).await
            }
            other => other,
        }
    }
}

/// The lookup endpoint answers with a JSON string, some mirrors with bare text
fn parse_identity_body(body: &str) -> Option<Uuid> {
    match serde_json::from_str::<String>(body) {
        Ok(raw) => parse_identity(&raw),
        Err(_) => parse_identity(body),
    }
}

fn parse_profile(body: &str) -> SkinResult<TextureProperty> {
    let profile: ProfileResponse = serde_json::from_str(body)?;

    let property = profile
        .properties
        .into_iter()
        .find(|p| p.name.as_deref().map_or(true, |name| name == TEXTURES_PROPERTY))
        .ok_or_else(|| SkinError::MalformedResponse("Profile has no textures property".to_string()))?;

    let signature = property
        .signature
        .ok_or_else(|| SkinError::MalformedResponse("Textures property is unsigned".to_string()))?;

    Ok(TextureProperty::new(property.value, signature))
}

fn parse_fallback_profile(body: &str) -> SkinResult<TextureProperty> {
    let profile: FallbackProfileResponse = serde_json::from_str(body)?;
    let raw = profile.textures.raw;
    Ok(TextureProperty::new(raw.value, raw.signature))
}

async fn log_unexpected_response(url: &str, response: reqwest::Response) {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {}>", e));

    error!("Received response: {} for {}", status, url);
    error!("Error stream: {}", body);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identity_body() {
        let id = "069a79f4-44e9-4726-a5be-fca90e38aaf5";
        let expected = Uuid::parse_str(id).unwrap();

        assert_eq!(parse_identity_body(&format!("\"{}\"", id)), Some(expected));
        assert_eq!(parse_identity_body(id), Some(expected));
        assert_eq!(parse_identity_body("\"069a79f444e94726a5befca90e38aaf5\""), Some(expected));
        assert_eq!(parse_identity_body("{}"), None);
    }

    #[test]
    fn test_parse_profile_picks_textures() {
        let body = r#"{
            "id": "069a79f444e94726a5befca90e38aaf5",
            "name": "Notch",
            "properties": [
                {"name": "other", "value": "x", "signature": "y"},
                {"name": "textures", "value": "dGV4dHVyZXM=", "signature": "c2ln"}
            ]
        }"#;

        let texture = parse_profile(body).unwrap();
        assert_eq!(texture, TextureProperty::new("dGV4dHVyZXM=", "c2ln"));
    }

    #[test]
    fn test_parse_profile_without_properties() {
        let err = parse_profile(r#"{"id": "x", "properties": []}"#).unwrap_err();
        assert!(matches!(err, SkinError::MalformedResponse(_)));

        let err = parse_profile("not json").unwrap_err();
        assert!(matches!(err, SkinError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_profile_requires_signature() {
        let body = r#"{"properties": [{"name": "textures", "value": "v"}]}"#;
        assert!(matches!(parse_profile(body), Err(SkinError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_fallback_profile() {
        let body = r#"{
            "uuid": "069a79f4-44e9-4726-a5be-fca90e38aaf5",
            "textures": {"raw": {"value": "dmFs", "signature": "c2ln"}}
        }"#;

        assert_eq!(
            parse_fallback_profile(body).unwrap(),
            TextureProperty::new("dmFs", "c2ln")
        );
    }

    #[tokio::test]
    async fn test_long_name_is_rejected_without_request() {
        let fetcher = TextureFetcher::new(EndpointConfig {
            // Unroutable, any request would fail with an HTTP error instead
            uuid_url: "http://127.0.0.1:9/".to_string(),
            ..EndpointConfig::default()
        })
        .unwrap();

        let err = fetcher
            .resolve_identity("ThisNameIsWayTooLong")
            .await
            .unwrap_err();
        assert!(matches!(err, SkinError::UserNotFound(_)));
    }
}
