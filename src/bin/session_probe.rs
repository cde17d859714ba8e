use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use sanka_client::{AppConfig, AppState, init_logging};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{info, warn};

#[derive(Debug, Clone)]
struct CliOptions {
    email: Option<String>,
    password: Option<String>,
    watch_seconds: u64,
    output: Option<PathBuf>,
    pretty: bool,
}

#[derive(Debug, serde::Serialize)]
struct IdentitySummary {
    id: String,
    name: String,
    role: String,
}

#[derive(Debug, serde::Serialize)]
struct ProbeReport {
    generated_at: DateTime<Utc>,
    gateway_url: String,
    authenticated: bool,
    hydrated: bool,
    identity: Option<IdentitySummary>,
    activity_count: usize,
    application_count: usize,
    attendance_count: usize,
    notification_count: usize,
    unread_notifications: usize,
    watched_seconds: u64,
}

fn usage() -> &'static str {
    "Usage: session_probe [--email <email> --password <password>] [--watch-seconds <n>] [--output <path>] [--pretty]"
}

fn parse_args<I>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = String>,
{
    let mut email: Option<String> = None;
    let mut password: Option<String> = None;
    let mut watch_seconds = 0u64;
    let mut output: Option<PathBuf> = None;
    let mut pretty = false;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--email" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--email requires a value\n{}", usage()))?;
                email = Some(value);
            }
            "--password" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--password requires a value\n{}", usage()))?;
                password = Some(value);
            }
            "--watch-seconds" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!("--watch-seconds requires a value\n{}", usage())
                })?;
                watch_seconds = value
                    .parse()
                    .with_context(|| format!("Invalid watch seconds '{value}'"))?;
            }
            "-o" | "--output" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--output requires a path\n{}", usage()))?;
                output = Some(PathBuf::from(path));
            }
            "--pretty" => {
                pretty = true;
            }
            "-h" | "--help" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other => {
                bail!("Unknown argument: {other}\n{}", usage());
            }
        }
    }

    if email.is_some() != password.is_some() {
        bail!("--email and --password must be given together\n{}", usage());
    }

    Ok(CliOptions {
        email,
        password,
        watch_seconds,
        output,
        pretty,
    })
}

fn write_output(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))
}

fn emit_payload(target: Option<&Path>, payload: &str) -> Result<()> {
    if let Some(path) = target {
        write_output(path, payload)?;
        println!("Report written to {}", path.display());
    } else {
        println!("{payload}");
    }
    Ok(())
}

async fn collect_report(state: &AppState, watched_seconds: u64) -> ProbeReport {
    let status = state.session_service.session_status().await;
    ProbeReport {
        generated_at: Utc::now(),
        gateway_url: state.config.gateway.base_url.clone(),
        authenticated: status.is_authenticated,
        hydrated: status.hydrated,
        identity: status.current_user.map(|user| IdentitySummary {
            id: user.id,
            name: user.name,
            role: user.role.as_str().to_string(),
        }),
        activity_count: state.data_service.activities().await.len(),
        application_count: state.data_service.applications().await.len(),
        attendance_count: state.data_service.attendance().await.len(),
        notification_count: state.data_service.notifications().await.len(),
        unread_notifications: state.data_service.unread_notification_count().await,
        watched_seconds,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args: Vec<String> = env::args().skip(1).collect();
    let options = parse_args(args)?;

    let config = AppConfig::from_env();
    config.validate().map_err(|err| anyhow::anyhow!(err))?;
    let state = AppState::new(config)?;

    info!(gateway = %state.config.gateway.base_url, "Starting session probe");
    state.bootstrap().await;

    if let Some(email) = &options.email {
        let password = options.password.as_deref().unwrap_or_default();
        match state.session_service.login(email, password).await {
            Ok(user) => {
                info!(user_id = %user.id, role = %user.role.as_str(), "Login succeeded");
                state.data_service.refresh_data().await;
            }
            Err(err) => {
                warn!(error = %err, "Login failed");
            }
        }
    }

    if options.watch_seconds > 0 {
        info!(
            seconds = options.watch_seconds,
            "Watching for notification updates"
        );
        tokio::time::sleep(Duration::from_secs(options.watch_seconds)).await;
    }

    let report = collect_report(&state, options.watch_seconds).await;
    state.shutdown().await;

    let payload = if options.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    emit_payload(options.output.as_deref(), &payload)
}
