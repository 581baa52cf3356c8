//! CLI command handlers.
//!
//! Each command is one request to the background worker. `serve` bridges the
//! same message protocol over stdin/stdout for external callers.

use std::time::Duration;

use color_eyre::eyre::{bail, eyre};
use color_eyre::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};

use crate::cli::args::Commands;
use crate::config::AppConfig;
use crate::constants;
use crate::core::manager::ToggleStatus;
use crate::core::router::{self, ConnectionReport, Request, Response};
use crate::core::WorkerHandle;
use crate::state::{ApplicationState, ConnectionStatus, PortInput, ProfileDraft};
use crate::utils;

/// Runs a CLI command to completion.
///
/// # Errors
///
/// Returns the worker's error message for failed requests, which makes the
/// process exit non-zero.
pub async fn handle_command(
    command: &Commands,
    worker: &WorkerHandle,
    config: &AppConfig,
) -> Result<()> {
    match command {
        Commands::List => handle_list(worker).await,
        Commands::Status => {
            let state = fetch_state(worker).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
        Commands::Add {
            name,
            host,
            port,
            username,
            password,
        } => {
            let draft = ProfileDraft {
                id: None,
                name: name.clone(),
                host: host.clone(),
                port: PortInput::Text(port.clone()),
                username: username.clone(),
                password: password.clone(),
            };
            let id = save(worker, draft).await?;
            println!("✅ Saved profile '{name}' ({id})");
            Ok(())
        }
        Commands::Edit {
            id,
            name,
            host,
            port,
            username,
            password,
        } => {
            let state = fetch_state(worker).await?;
            let profile = state
                .profile(id)
                .ok_or_else(|| eyre!(constants::MSG_PROFILE_NOT_FOUND))?;
            let mut draft = ProfileDraft::from(profile);
            if let Some(name) = name {
                draft.name.clone_from(name);
            }
            if let Some(host) = host {
                draft.host.clone_from(host);
            }
            if let Some(port) = port {
                draft.port = PortInput::Text(port.clone());
            }
            if username.is_some() {
                draft.username.clone_from(username);
            }
            if password.is_some() {
                draft.password.clone_from(password);
            }
            save(worker, draft).await?;
            println!("✅ Updated profile {id}");
            Ok(())
        }
        Commands::Delete { id } => {
            let response = worker
                .request(Request::DeleteProfile {
                    profile_id: id.clone(),
                })
                .await;
            check(&response)?;
            println!("🗑  Deleted profile {id}");
            Ok(())
        }
        Commands::Toggle { id, wait } => handle_toggle(worker, config, id, *wait).await,
        Commands::Test => handle_test(worker).await,
        Commands::Serve => serve(worker).await,
    }
}

fn check(response: &Response) -> Result<()> {
    match response.error_message() {
        Some(message) => bail!("{message}"),
        None => Ok(()),
    }
}

async fn fetch_state(worker: &WorkerHandle) -> Result<ApplicationState> {
    match worker.request(Request::GetProxyData).await {
        Response::State(state) => Ok(state),
        other => {
            check(&other)?;
            bail!("unexpected response to GET_PROXY_DATA")
        }
    }
}

async fn save(worker: &WorkerHandle, profile: ProfileDraft) -> Result<String> {
    match worker.request(Request::SaveProfile { profile }).await {
        Response::Saved { profile_id, .. } => Ok(profile_id),
        other => {
            check(&other)?;
            bail!("unexpected response to SAVE_PROFILE")
        }
    }
}

async fn handle_list(worker: &WorkerHandle) -> Result<()> {
    let state = fetch_state(worker).await?;
    if state.profiles.is_empty() {
        println!("No profiles yet. Add one with `proxyflow add`.");
        return Ok(());
    }

    for profile in &state.profiles {
        let marker = if state.is_active(&profile.id) { "●" } else { " " };
        println!(
            "{marker} {:<14} {:<20} {}",
            profile.id,
            utils::truncate(&profile.name, 20),
            profile.endpoint_summary()
        );
    }
    println!();
    println!(
        "Status: {} ({})",
        state.connection_status.label(),
        utils::format_ping(state.last_ping_ms)
    );
    Ok(())
}

async fn handle_toggle(
    worker: &WorkerHandle,
    config: &AppConfig,
    id: &str,
    wait: bool,
) -> Result<()> {
    // Subscribe first so the probe result cannot slip past.
    let mut updates = worker.subscribe();
    let response = worker
        .request(Request::ToggleProxy {
            profile_id: id.to_string(),
        })
        .await;
    check(&response)?;

    match response {
        Response::Toggled {
            status: ToggleStatus::Disabled,
        } => {
            println!("⏹  Proxy disabled");
            Ok(())
        }
        _ if !wait => {
            println!("▶  Proxy enabled (checking connectivity in the background)");
            Ok(())
        }
        _ => {
            let budget = Duration::from_millis(
                config.activation_probe_delay_ms + config.probe_timeout_ms + 1000,
            );
            let settled = tokio::time::timeout(budget, wait_for_settle(&mut updates))
                .await
                .map_err(|_| eyre!("Timed out waiting for the connectivity check"))??;
            match settled.connection_status {
                ConnectionStatus::Connected => {
                    println!(
                        "✅ {} ({})",
                        settled.connection_status.label(),
                        utils::format_ping(settled.last_ping_ms)
                    );
                    Ok(())
                }
                status => bail!("{}", status.label()),
            }
        }
    }
}

async fn wait_for_settle(
    updates: &mut broadcast::Receiver<ApplicationState>,
) -> Result<ApplicationState> {
    loop {
        match updates.recv().await {
            Ok(state) if state.connection_status != ConnectionStatus::Connecting => {
                return Ok(state)
            }
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => {
                bail!(constants::MSG_WORKER_UNAVAILABLE)
            }
        }
    }
}

async fn handle_test(worker: &WorkerHandle) -> Result<()> {
    match worker.request(Request::TestConnection).await {
        Response::Connection(ConnectionReport::Connected { ping }) => {
            println!("✅ Reachable ({ping} ms)");
            Ok(())
        }
        Response::Connection(ConnectionReport::Error { error }) => {
            bail!("Unreachable: {error}")
        }
        other => {
            check(&other)?;
            bail!("unexpected response to TEST_CONNECTION")
        }
    }
}

/// Newline-delimited JSON bridge. Returns on EOF.
async fn serve(worker: &WorkerHandle) -> Result<()> {
    log::info!("[bridge] Serving JSON requests on stdio");
    serve_io(worker, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    log::info!("[bridge] stdin closed, shutting down");
    Ok(())
}

/// Answers JSON request lines from `input` on `output` until `input` ends.
///
/// Requests reach the worker in line order; replies are written as they
/// complete, interleaved with state broadcasts.
async fn serve_io<R, W>(worker: &WorkerHandle, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (lines_tx, mut lines_rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(line) = lines_rx.recv().await {
            let mut bytes = line.into_bytes();
            bytes.push(b'\n');
            if output.write_all(&bytes).await.is_err() || output.flush().await.is_err() {
                break;
            }
        }
    });

    let mut updates = worker.subscribe();
    let broadcast_tx = lines_tx.clone();
    let broadcaster = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(state) => {
                    if broadcast_tx.send(router::encode_broadcast(state)).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("[bridge] Skipped {skipped} state update(s)");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let router::Envelope { id, request } = router::decode(&line);
        match request {
            Ok(request) => {
                let pending = worker.submit(request).await;
                let reply_tx = lines_tx.clone();
                tokio::spawn(async move {
                    let response = pending.response().await;
                    let _ = reply_tx.send(router::encode(id, &response));
                });
            }
            Err(reason) => {
                log::warn!("[bridge] Rejected request: {reason}");
                let _ = lines_tx.send(router::encode(id, &Response::error(reason)));
            }
        }
    }

    broadcaster.abort();
    drop(lines_tx);
    let _ = writer.await;
    Ok(())
}
