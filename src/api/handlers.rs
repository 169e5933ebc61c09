//! Request handlers for the dashboard REST surface.
//!
//! Handlers that change state run the control plane call on a spawned task, so a
//! client hanging up mid-request cannot cancel a connection transition halfway.

use super::error::ApiError;
use crate::{
    bot::BotIdentity,
    core::{
        ControlPlane,
        commands::{CommandAction, CommandOutcome},
        config_store::{ConfigUpdate, ConfigView},
        connection::{ConnectionPhase, ConnectionState},
    },
    entities::{LogEntryModel, SlashCommandModel},
    errors::Result,
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

const ACK: Ack = Ack { success: true };

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub bot: BotIdentity,
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CommandResponse {
    Command { command: SlashCommandModel },
    Registered { count: usize },
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: ConnectionPhase,
    pub bot: Option<BotIdentity>,
}

/// Runs `task` to completion on its own task, independent of the request.
async fn detached<T, F>(task: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("request task failed: {e}"),
        )),
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn get_config(
    State(plane): State<ControlPlane>,
) -> std::result::Result<Json<ConfigView>, ApiError> {
    Ok(Json(plane.config.get().await?))
}

pub async fn update_config(
    State(plane): State<ControlPlane>,
    payload: std::result::Result<Json<ConfigUpdate>, JsonRejection>,
) -> std::result::Result<Json<ConfigView>, ApiError> {
    let Json(update) = payload?;
    debug!(?update, "Config update requested");
    let view = detached(async move { plane.config.update(update).await }).await?;
    Ok(Json(view))
}

pub async fn connect(
    State(plane): State<ControlPlane>,
) -> std::result::Result<Json<ConnectResponse>, ApiError> {
    let bot = detached(async move { plane.connection.connect().await }).await?;
    Ok(Json(ConnectResponse { bot }))
}

pub async fn disconnect(
    State(plane): State<ControlPlane>,
) -> std::result::Result<Json<Ack>, ApiError> {
    detached(async move { plane.connection.disconnect().await }).await?;
    Ok(Json(ACK))
}

pub async fn send_message(
    State(plane): State<ControlPlane>,
    payload: std::result::Result<Json<SendRequest>, JsonRejection>,
) -> std::result::Result<Json<Ack>, ApiError> {
    let Json(request) = payload?;
    detached(async move { plane.dispatcher.send(&request.message).await }).await?;
    Ok(Json(ACK))
}

pub async fn list_commands(
    State(plane): State<ControlPlane>,
) -> std::result::Result<Json<Vec<SlashCommandModel>>, ApiError> {
    Ok(Json(plane.commands.list().await?))
}

pub async fn command_action(
    State(plane): State<ControlPlane>,
    payload: std::result::Result<Json<CommandAction>, JsonRejection>,
) -> std::result::Result<Json<CommandResponse>, ApiError> {
    let Json(action) = payload?;
    let outcome = detached(async move { plane.commands.apply(action).await }).await?;
    Ok(Json(match outcome {
        CommandOutcome::Added(command) | CommandOutcome::Toggled(command) => {
            CommandResponse::Command { command }
        }
        CommandOutcome::Registered { count } => CommandResponse::Registered { count },
    }))
}

pub async fn list_logs(
    State(plane): State<ControlPlane>,
) -> std::result::Result<Json<Vec<LogEntryModel>>, ApiError> {
    Ok(Json(plane.log.list().await?))
}

pub async fn status(State(plane): State<ControlPlane>) -> Json<StatusResponse> {
    let state = plane.connection.state().await;
    let phase = state.phase();
    let bot = match state {
        ConnectionState::Connected(session) => Some(session.identity),
        _ => None,
    };
    Json(StatusResponse { state: phase, bot })
}
