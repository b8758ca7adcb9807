use anyhow::{Context, Result, bail};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngExt;
use sha2::{Digest, Sha256};
use url::{Url, form_urlencoded};

use crate::config::OAuthSettings;

const SCOPES: &str = "openid email profile";

/// The signed-in agent, as stored after login.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Identity {
    pub email: String,
    pub id_token: String,
    /// Expiration timestamp in milliseconds since epoch.
    pub expires: u64,
}

impl Identity {
    pub fn is_expired(&self) -> bool {
        now_ms() >= self.expires
    }
}

/// PKCE verifier and challenge pair.
struct Pkce {
    verifier: String,
    challenge: String,
}

/// Generate a PKCE code verifier and S256 challenge.
fn generate_pkce() -> Pkce {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    let verifier = URL_SAFE_NO_PAD.encode(bytes);

    let hash = Sha256::digest(verifier.as_bytes());
    let challenge = URL_SAFE_NO_PAD.encode(hash);

    Pkce {
        verifier,
        challenge,
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Build the authorization URL for the agent to visit.
/// Returns (url, pkce_verifier); keep the verifier for the token exchange.
pub fn build_authorize_url(settings: &OAuthSettings) -> (String, String) {
    let pkce = generate_pkce();

    let params = [
        ("client_id", settings.client_id.as_str()),
        ("response_type", "code"),
        ("redirect_uri", settings.redirect_uri.as_str()),
        ("scope", SCOPES),
        ("access_type", "offline"),
        ("prompt", "consent"),
        ("code_challenge", &pkce.challenge),
        ("code_challenge_method", "S256"),
        ("state", &pkce.verifier),
    ];

    let url = format!("{}?{}", settings.authorize_url, encode_pairs(&params));
    (url, pkce.verifier)
}

/// Accept either the bare code or the whole redirect URL the browser landed on.
pub fn extract_code(input: &str) -> String {
    let input = input.trim();
    Url::parse(input)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(k, _)| k == "code")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_else(|| input.to_string())
}

/// Exchange an authorization code for an identity token.
pub async fn exchange_code(settings: &OAuthSettings, code: &str, verifier: &str) -> Result<Identity> {
    let body = encode_pairs(&[
        ("grant_type", "authorization_code"),
        ("client_id", &settings.client_id),
        ("client_secret", &settings.client_secret),
        ("code", code),
        ("redirect_uri", &settings.redirect_uri),
        ("code_verifier", verifier),
    ]);

    let client = reqwest::Client::new();
    let resp = client
        .post(&settings.token_url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let text = resp.text().await.unwrap_or_default();
        bail!("token exchange failed: {}", text);
    }

    let data: TokenResponse = resp.json().await?;
    let email = decode_email(&data.id_token)?;

    // 5 minute buffer before expiry
    let expires = (now_ms() + data.expires_in * 1000).saturating_sub(5 * 60 * 1000);

    Ok(Identity {
        email,
        id_token: data.id_token,
        expires,
    })
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    id_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Read the `email` claim from an id token. The signature is not checked;
/// the token came straight from the token endpoint over TLS.
pub fn decode_email(id_token: &str) -> Result<String> {
    let payload = id_token
        .split('.')
        .nth(1)
        .context("id token is not a JWT")?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .context("id token payload is not base64")?;
    let claims: serde_json::Value =
        serde_json::from_slice(&bytes).context("id token payload is not JSON")?;
    match claims.get("email").and_then(|e| e.as_str()) {
        Some(email) if !email.is_empty() => Ok(email.to_string()),
        _ => bail!("id token has no email claim"),
    }
}

fn encode_pairs(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
