use weektab::components::google_calendar::{IdentityProvider, LoopbackOAuthProvider};
use weektab::config::Config;
use weektab::error::{env_error, TabResult};
use weektab::startup;

#[tokio::main]
async fn main() -> miette::Result<()> {
    startup::init_logging()?;
    let token = request_token().await?;

    println!("Authorization successful. Add this line to your .env:");
    println!("GOOGLE_ACCESS_TOKEN={}", token);
    Ok(())
}

async fn request_token() -> TabResult<String> {
    let config = Config::load()?;

    let client_id = config
        .google_client_id
        .ok_or_else(|| env_error("GOOGLE_CLIENT_ID"))?;
    let client_secret = config
        .google_client_secret
        .ok_or_else(|| env_error("GOOGLE_CLIENT_SECRET"))?;

    println!("Opening browser for Google Calendar authorization...");
    let provider = LoopbackOAuthProvider::new(client_id, client_secret, config.oauth_redirect_port);
    provider.get_auth_token(true).await
}
