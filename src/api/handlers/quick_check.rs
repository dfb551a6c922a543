use axum::Json;
use axum::extract::State;

use crate::error::VacuumError;
use crate::processing::QuickCheckStatus;
use crate::service::{AppContext, acquire_pressure};

/// POST /quick_check/start - Reset the quick-check counters
pub async fn start(State(ctx): State<AppContext>) -> Json<QuickCheckStatus> {
    let mut state = ctx.state.write().await;
    state.quick_check.start();

    tracing::info!("Quick check started");

    Json(state.quick_check.status())
}

/// POST /quick_check/step - Take one reading and compare it against the target
pub async fn step(State(ctx): State<AppContext>) -> Result<Json<QuickCheckStatus>, VacuumError> {
    let (channel, calibration) = {
        let state = ctx.state.read().await;
        (state.channel, state.calibration.clone())
    };

    let (_, pressure) = acquire_pressure(&ctx.source, &calibration, channel).await?;

    let mut state = ctx.state.write().await;
    let status = state.quick_check.record(pressure);

    tracing::info!(
        "{} quick check: {:.2} kPa, elapsed {}, {}",
        channel,
        pressure,
        status.elapsed_steps,
        if status.last_pass { "PASS" } else { "FAIL" }
    );

    Ok(Json(status))
}

/// GET /quick_check - Latest quick-check result
pub async fn get_status(State(ctx): State<AppContext>) -> Json<QuickCheckStatus> {
    let state = ctx.state.read().await;
    Json(state.quick_check.status())
}
