use axum::Json;
use axum::extract::State;

use crate::api::models::*;
use crate::error::VacuumError;
use crate::processing::Verdict;
use crate::service::{AppContext, DeviceState, SessionRunner, acquire_pressure};

fn status_response(state: &DeviceState) -> SessionStatusResponse {
    SessionStatusResponse {
        status: state.session_status.clone(),
        time_mode: state.time_mode().as_u8(),
        duration_units: state.engine.session().duration_units,
        boundaries: state.engine.boundaries(),
        verdict: state.latest_verdict.clone(),
        last_update: state.last_update,
    }
}

/// POST /session/start - Start a timed leak test in the background
pub async fn start_session(
    State(ctx): State<AppContext>,
) -> Result<Json<SessionStatusResponse>, VacuumError> {
    let runner = SessionRunner::begin(&ctx).await?;
    tokio::spawn(async move {
        let status = runner.run().await;
        tracing::info!("Session runner exited: {:?}", status);
    });

    let state = ctx.state.read().await;
    Ok(Json(status_response(&state)))
}

/// POST /session/stop - Halt the running test
pub async fn stop_session(State(ctx): State<AppContext>) -> Json<SessionStatusResponse> {
    if !SessionRunner::halt(&ctx, "Stopped by operator").await {
        tracing::debug!("Stop requested with no running session");
    }

    let state = ctx.state.read().await;
    Json(status_response(&state))
}

/// GET /session/status - Current session state and latest verdict
pub async fn get_status(State(ctx): State<AppContext>) -> Json<SessionStatusResponse> {
    let state = ctx.state.read().await;
    Json(status_response(&state))
}

/// POST /session/measure - Caller-driven acquisition and evaluation for one counter
///
/// The caller owns the cadence and the counter. An acquisition failure is
/// reported as `ok: false` and leaves the session untouched.
pub async fn measure_decide(
    State(ctx): State<AppContext>,
    Json(request): Json<MeasureDecideRequest>,
) -> Result<Json<Verdict>, VacuumError> {
    let (channel, calibration) = {
        let state = ctx.state.read().await;
        if state.session_status.is_running() {
            return Err(VacuumError::SessionRunning);
        }
        (state.channel, state.calibration.clone())
    };

    let sample = match acquire_pressure(&ctx.source, &calibration, channel).await {
        Ok((_, pressure)) => Some(pressure),
        Err(e) => {
            tracing::warn!("Measurement for counter {} failed: {}", request.counter, e);
            None
        }
    };

    let mut state = ctx.state.write().await;
    if state.session_status.is_running() {
        return Err(VacuumError::SessionRunning);
    }

    let verdict = state.engine.evaluate(request.counter, sample);
    state.record_verdict(verdict.clone());

    Ok(Json(verdict))
}
