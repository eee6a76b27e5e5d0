use crate::api::spotify::SpotifyClient;
use crate::config::Config;
use crate::error::CollectError;
use anyhow::{anyhow, Result};
use tracing::info;
use url::Url;

/// Manual OAuth helper (authorization-code flow):
/// 1. Build the authorize URL from the config and print it.
/// 2. User opens it, approves, and is redirected to the redirect URI.
/// 3. User pastes the full redirect URL back into the terminal.
/// 4. The `code` param is exchanged for access + refresh tokens.
/// 5. Tokens are written to the configured token cache.
pub async fn run_spotify_auth(cfg: &Config, client: &SpotifyClient) -> Result<()> {
    if cfg.client_secret().is_empty() {
        return Err(CollectError::Config("a client secret is required to authorize".into()).into());
    }

    let url = authorize_url(cfg, client.auth_base())?;
    println!(
        "Open this URL in your browser and authorize the application:\n\n{}\n",
        url
    );
    println!("After authorizing, copy the full redirect URL and paste it here:");
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let code = code_from_redirect(input.trim())?;

    client.exchange_code(&code, &cfg.redirect_uri).await?;
    info!("Spotify token cached at {}", cfg.token_cache.display());
    println!("Saved token to {}. You can now run `collect`.", cfg.token_cache.display());
    Ok(())
}

pub fn authorize_url(cfg: &Config, auth_base: &str) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/authorize", auth_base))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &cfg.client_id)
        .append_pair("scope", &cfg.scope)
        .append_pair("redirect_uri", &cfg.redirect_uri);
    Ok(url)
}

/// Pull the `code` query parameter out of a pasted redirect URL.
pub fn code_from_redirect(redirect: &str) -> Result<String> {
    let parsed = Url::parse(redirect).map_err(|e| anyhow!("invalid url pasted: {}", e))?;
    if let Some((_, err)) = parsed.query_pairs().find(|(k, _)| k == "error") {
        return Err(CollectError::Auth(format!("authorization denied: {}", err)).into());
    }
    let code = parsed
        .query_pairs()
        .find(|(k, _)| k == "code")
        .ok_or_else(|| CollectError::Auth("no code in redirect URL".into()))?
        .1
        .into_owned();
    Ok(code)
}
