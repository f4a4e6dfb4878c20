mod config;
mod token_storage;

pub use config::Settings;
pub use token_storage::FileTokenStore;

use crate::error::AuthError;
use kudos_api::endpoints::auth::LoginResponse;
use kudos_api::{Client, HttpTransport};
use secrecy::SecretString;
use std::io::Write;
use std::sync::Arc;

/// Client wired to the real backend and the on-disk session.
pub type PortalClient = Client<HttpTransport, Arc<FileTokenStore>>;

/// Load and validate settings, printing guidance when they are unusable.
pub fn load_settings() -> Result<Settings, AuthError> {
    let settings = Settings::new().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("\nA config.toml (or the file named by KUDOS_CONFIG) may contain:");
        eprintln!("\nbase_url = \"https://cyber-cats.ru/api\"");
        eprintln!("# base_url = \"http://localhost:5000/api\"  # For local development");
        eprintln!("# timeout_secs = 30");
        AuthError::Configuration(e.to_string())
    })?;

    settings.validate().map_err(|e| {
        eprintln!("Configuration validation failed: {}", e);
        AuthError::Configuration(e)
    })?;

    Ok(settings)
}

/// Build a client from settings, restoring the saved session and refresh cookie.
pub fn restore_session(settings: &Settings) -> Result<PortalClient, AuthError> {
    let transport = HttpTransport::new(settings.base_url.clone(), settings.timeout())?;
    let store = match &settings.session_path {
        Some(path) => FileTokenStore::open(path)?,
        None => FileTokenStore::new()?,
    };

    if let Some(session) = store.session() {
        tracing::debug!(login = ?session.login, saved_at = %session.saved_at, "Restoring session");
        if let Some(cookie) = &session.refresh_cookie {
            transport.restore_refresh_cookies(cookie);
        }
    }

    Ok(Client::new(transport, Arc::new(store)))
}

/// Log in and remember who did, along with the refresh cookie the backend set.
pub async fn login(
    client: &PortalClient,
    login: &str,
    password: SecretString,
) -> Result<LoginResponse, AuthError> {
    let response = client.login(login, password).await?;
    client
        .storage()
        .remember(login, response.role, client.transport().saved_refresh_cookies())?;
    Ok(response)
}

/// Save the current refresh cookie; the backend may rotate it on refresh.
pub fn persist_refresh_cookie(client: &PortalClient) -> Result<(), AuthError> {
    client
        .storage()
        .set_refresh_cookie(client.transport().saved_refresh_cookies())
}

/// Prompt for credentials on the terminal and log in.
pub async fn login_interactive(client: &PortalClient) -> Result<LoginResponse, AuthError> {
    println!("\n=== Kudos portal login ===\n");
    let (login_name, password) = prompt_credentials().await?;

    let response = login(client, &login_name, password).await?;
    println!("✓ Logged in as {}\n", login_name);
    Ok(response)
}

/// Make sure the client holds a session, asking the user to log in when it does not.
pub async fn ensure_session(client: &PortalClient) -> Result<(), AuthError> {
    if client.is_authenticated() {
        return Ok(());
    }

    tracing::info!("No saved session, prompting for credentials");
    login_interactive(client).await?;
    Ok(())
}

async fn prompt_credentials() -> Result<(String, SecretString), AuthError> {
    let prompt = tokio::task::spawn_blocking(|| -> std::io::Result<(String, SecretString)> {
        print!("Login: ");
        std::io::stdout().flush()?;

        let mut login = String::new();
        std::io::stdin().read_line(&mut login)?;
        let password = rpassword::prompt_password("Password: ")?;
        Ok((login.trim().to_string(), SecretString::from(password)))
    });

    let (login, password) = prompt
        .await
        .map_err(|e| AuthError::Prompt(e.to_string()))??;
    if login.is_empty() {
        return Err(AuthError::Prompt("login is required".to_string()));
    }
    Ok((login, password))
}
