use std::env;

mod config;
mod credentials;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use credentials::FileCredentialStore;
use fitbit_core::auth::{run_loopback_flow, run_manual_flow};
use fitbit_core::services::{Period, TimeSeriesRange, TimeSeriesResource};
use fitbit_core::{ClientOptions, FitbitClient, FitbitError, OAuthConfig, Token};
use serde_json::Value;
use tokio::task;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_PROFILE: &str = "default";
const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8787/callback";

#[derive(Parser, Debug)]
#[command(author, version, about = "Fitbit Web API CLI")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Profile name for stored credentials
    #[arg(long, global = true, default_value = DEFAULT_PROFILE)]
    profile: String,
    /// OAuth client id (falls back to FITBIT_CLIENT_ID)
    #[arg(long = "client-id", global = true)]
    client_id: Option<String>,
    /// OAuth client secret (falls back to FITBIT_CLIENT_SECRET)
    #[arg(long = "client-secret", global = true)]
    client_secret: Option<String>,
    /// Redirect URI registered for the application (falls back to FITBIT_REDIRECT_URI)
    #[arg(long = "redirect-uri", global = true)]
    redirect_uri: Option<String>,
    /// Log requests and token activity to stderr
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Authentication related commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Show the authorized user's profile
    Profile(JsonArgs),
    /// Activity summary for a day
    Activities(DayArgs),
    /// Sleep logs for a day
    Sleep(DayArgs),
    /// Paired trackers and scales
    Devices(JsonArgs),
    /// Remaining API quota for this user and client
    RateLimit(JsonArgs),
    /// Daily time series for a resource
    TimeSeries(TimeSeriesArgs),
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Authorize with Fitbit and store the token for the profile
    Login(LoginArgs),
    /// Forget the stored token for the profile
    Logout,
    /// Show whether a token is stored and when it expires
    Status,
}

#[derive(Args, Debug)]
struct LoginArgs {
    /// Use manual copy/paste flow instead of a loopback listener
    #[arg(long)]
    manual: bool,
    /// Print the authorization URL without opening a browser
    #[arg(long = "no-browser")]
    no_browser: bool,
}

#[derive(Args, Debug)]
struct JsonArgs {
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DayArgs {
    /// Day to fetch (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct TimeSeriesArgs {
    /// Resource name, e.g. steps, caloriesIn, tracker_distance, minutesAsleep, weight
    resource: TimeSeriesResource,
    /// Base date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Period counted back from the base date (1d, 7d, 30d, 1w, 1m, 3m, 6m, 1y, max)
    #[arg(long, default_value = "7d", conflicts_with = "end_date")]
    period: Period,
    /// End date for an explicit range instead of a period
    #[arg(long = "end-date")]
    end_date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.debug);

    match cli.command {
        Commands::Auth(cmd) => match cmd {
            AuthCommand::Login(args) => auth_login(&cli.global, args).await?,
            AuthCommand::Logout => auth_logout(&cli.global)?,
            AuthCommand::Status => auth_status(&cli.global)?,
        },
        Commands::Profile(args) => {
            with_client(&cli.global, move |client| async move {
                let profile = client.profile().get().await?;
                if args.json {
                    print_json(&profile)?;
                } else {
                    render_profile(&profile);
                }
                Ok(())
            })
            .await?
        }
        Commands::Activities(args) => {
            let date = args.date.unwrap_or_else(today);
            with_client(&cli.global, move |client| async move {
                print_json(&client.activities().on_date(date).await?)
            })
            .await?
        }
        Commands::Sleep(args) => {
            let date = args.date.unwrap_or_else(today);
            with_client(&cli.global, move |client| async move {
                print_json(&client.sleep().on_date(date).await?)
            })
            .await?
        }
        Commands::Devices(args) => {
            with_client(&cli.global, move |client| async move {
                let devices = client.account().devices().await?;
                if args.json {
                    print_json(&devices)?;
                } else {
                    render_devices(&devices);
                }
                Ok(())
            })
            .await?
        }
        Commands::RateLimit(args) => {
            with_client(&cli.global, move |client| async move {
                let status = client.account().rate_limit().await?;
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&status)?);
                } else {
                    println!(
                        "Viewer: {}/{} remaining (resets {})",
                        status.viewer, status.viewer_quota, status.viewer_reset
                    );
                    println!(
                        "Client: {}/{} remaining (resets {})",
                        status.client, status.client_quota, status.client_reset
                    );
                }
                Ok(())
            })
            .await?
        }
        Commands::TimeSeries(args) => {
            let base_date = args.date.unwrap_or_else(today);
            let range = match args.end_date {
                Some(end) => TimeSeriesRange::EndDate(end),
                None => TimeSeriesRange::Period(args.period),
            };
            with_client(&cli.global, move |client| async move {
                print_json(
                    &client
                        .time_series()
                        .get(args.resource, base_date, range)
                        .await?,
                )
            })
            .await?
        }
    }
    Ok(())
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("fitbit_core=debug,fitbit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn auth_login(global: &GlobalArgs, args: LoginArgs) -> Result<()> {
    let store = FileCredentialStore::with_default_locator()
        .context("unable to initialise credential store")?;
    let client = build_client(global)?;
    let flow = client.auth_flow();
    let open_browser = !args.no_browser && browser_available();

    let token = if args.manual {
        run_manual_flow(flow, open_browser, print_authorization_url, prompt_for_code).await
    } else {
        match run_loopback_flow(flow, open_browser, print_authorization_url).await {
            Ok(token) => Ok(token),
            Err(FitbitError::BrowserLaunch(reason)) => {
                eprintln!(
                    "Failed to launch browser ({reason}); falling back to manual copy/paste flow."
                );
                run_manual_flow(flow, false, print_authorization_url, prompt_for_code).await
            }
            Err(FitbitError::Io(err)) => {
                eprintln!(
                    "Unable to listen on the redirect URI ({err}); using manual copy/paste flow."
                );
                run_manual_flow(flow, false, print_authorization_url, prompt_for_code).await
            }
            Err(other) => Err(other),
        }
    }
    .context("authorization failed")?;

    store
        .save(&global.profile, &token.to_serialized()?)
        .context("failed to store token")?;
    client.replace_token(token.clone()).await;

    println!(
        "Login succeeded. Token stored for profile '{}'.",
        global.profile
    );
    match client.profile().resource_owner().await {
        Ok(user) => println!("Logged in as {} ({})", user.display_name, user.encoded_id),
        Err(err) => eprintln!("Login succeeded but profile lookup failed: {err}"),
    }
    println!("Token expires at {} (UTC).", token.expires_at);
    Ok(())
}

fn auth_logout(global: &GlobalArgs) -> Result<()> {
    let store = FileCredentialStore::with_default_locator()
        .context("unable to initialise credential store")?;
    store
        .delete(&global.profile)
        .context("failed to remove stored token")?;
    println!("Deleted token for profile '{}'.", global.profile);
    Ok(())
}

fn auth_status(global: &GlobalArgs) -> Result<()> {
    let store = FileCredentialStore::with_default_locator()
        .context("unable to initialise credential store")?;
    let Some(raw) = store.load(&global.profile)? else {
        println!("No token stored for profile '{}'.", global.profile);
        return Ok(());
    };
    let token = Token::from_serialized(&raw).context("stored token is malformed")?;
    if let Some(user_id) = &token.user_id {
        println!("User: {user_id}");
    }
    if !token.scope.is_empty() {
        println!("Scopes: {}", token.scope.join(" "));
    }
    if token.is_expired() {
        println!(
            "Token expired at {} (UTC); it will be refreshed on next use.",
            token.expires_at
        );
    } else {
        let remaining = token.expires_at - Utc::now();
        println!(
            "Token valid until {} (UTC), {} minutes left.",
            token.expires_at,
            remaining.num_minutes()
        );
    }
    Ok(())
}

/// Load the profile's token, run `action`, then persist the token in case it was refreshed.
async fn with_client<F, Fut>(global: &GlobalArgs, action: F) -> Result<()>
where
    F: FnOnce(std::sync::Arc<FitbitClient>) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let store = FileCredentialStore::with_default_locator()
        .context("unable to initialise credential store")?;
    let raw = store.load(&global.profile)?.with_context(|| {
        format!(
            "no token stored for profile '{}'; run `fitbit auth login` first",
            global.profile
        )
    })?;

    let client = std::sync::Arc::new(build_client(global)?);
    client
        .set_token(&raw)
        .await
        .context("stored token is malformed")?;

    let result = action(client.clone()).await;

    if let Some(current) = client.tokens().current().await {
        let serialized = current.to_serialized()?;
        if serialized != raw {
            debug!(profile = %global.profile, "persisting refreshed token");
            store
                .save(&global.profile, &serialized)
                .context("failed to store refreshed token")?;
        }
    }
    result
}

fn build_client(global: &GlobalArgs) -> Result<FitbitClient> {
    let options = ClientOptions {
        auto_request: false,
        auto_refresh: true,
    };
    FitbitClient::with_options(build_oauth_config(global)?, options)
        .context("failed to build Fitbit client")
}

fn build_oauth_config(global: &GlobalArgs) -> Result<OAuthConfig> {
    let client_id = setting(&global.client_id, "FITBIT_CLIENT_ID")
        .context("missing client id: pass --client-id or set FITBIT_CLIENT_ID")?;
    let client_secret = setting(&global.client_secret, "FITBIT_CLIENT_SECRET")
        .context("missing client secret: pass --client-secret or set FITBIT_CLIENT_SECRET")?;
    let redirect = setting(&global.redirect_uri, "FITBIT_REDIRECT_URI")
        .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_owned());
    let redirect_uri = Url::parse(&redirect).context("invalid redirect URI")?;

    let mut config = OAuthConfig::new(client_id, client_secret, redirect_uri);
    if let Ok(scopes) = env::var("FITBIT_SCOPES") {
        config = config.with_scopes(scopes.split_whitespace().map(str::to_owned));
    }
    Ok(config)
}

fn setting(flag: &Option<String>, var: &str) -> Option<String> {
    flag.clone()
        .or_else(|| env::var(var).ok())
        .filter(|value| !value.trim().is_empty())
}

fn browser_available() -> bool {
    if env::var_os("FITBIT_RS_NO_BROWSER").is_some() {
        return false;
    }

    if env::var_os("SSH_CONNECTION").is_some() && env::var_os("DISPLAY").is_none() {
        return false;
    }

    if env::var_os("DISPLAY").is_some() || env::var_os("WAYLAND_DISPLAY").is_some() {
        return true;
    }

    cfg!(target_os = "windows") || cfg!(target_os = "macos")
}

async fn prompt_for_code() -> Result<String, FitbitError> {
    task::spawn_blocking(|| {
        use std::io::{self, Write};
        print!("Paste the redirect URL or authorization code: ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok::<_, FitbitError>(input.trim().to_owned())
    })
    .await
    .map_err(|_| FitbitError::ListenerClosed)?
}

fn print_authorization_url(url: &Url) -> Result<(), FitbitError> {
    println!("\nAuthorize the application by visiting:\n  {}\n", url);
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_profile(profile: &Value) {
    let user = &profile["user"];
    let field = |key: &str| user[key].as_str().unwrap_or("-").to_owned();
    println!("{} ({})", field("displayName"), field("encodedId"));
    println!("  Full name:    {}", field("fullName"));
    println!("  Member since: {}", field("memberSince"));
    println!("  Timezone:     {}", field("timezone"));
    if let Some(steps) = user["averageDailySteps"].as_u64() {
        println!("  Avg steps:    {steps}");
    }
}

fn render_devices(devices: &Value) {
    let Some(list) = devices.as_array().filter(|list| !list.is_empty()) else {
        println!("No devices paired.");
        return;
    };
    for device in list {
        println!(
            "{:<16} {:<8} battery {:<8} last sync {}",
            device["deviceVersion"].as_str().unwrap_or("-"),
            device["type"].as_str().unwrap_or("-"),
            device["battery"].as_str().unwrap_or("-"),
            device["lastSyncTime"].as_str().unwrap_or("-"),
        );
    }
}
