use axum::Json;
use axum::extract::State;

use crate::api::models::*;
use crate::data_source::serial::{SerialPressureSource, describe_port_type};
use crate::error::VacuumError;
use crate::protocol::{Channel, TimeMode};
use crate::service::{AppContext, SessionRunner, acquire_pressure};

/// GET /device/info - Return device capabilities
pub async fn get_device_info() -> Json<DeviceInfoResponse> {
    Json(DeviceInfoResponse {
        device_type: "vacuum_leak_tester".to_string(),
        name: "Vacuum Leak Tester".to_string(),
        capabilities: DeviceCapabilities {
            channels: vec![Channel::Vac1.as_u8(), Channel::Vac2.as_u8()],
            time_modes: TimeMode::ALL
                .iter()
                .map(|mode| TimeModeInfo {
                    mode: mode.as_u8(),
                    duration_units: mode.duration_units(),
                })
                .collect(),
            has_quick_check: true,
        },
    })
}

/// GET /ports - List serial ports
pub async fn list_ports() -> Result<Json<PortsResponse>, VacuumError> {
    let ports = SerialPressureSource::list_available_ports()?
        .into_iter()
        .map(|info| PortInfo {
            port_type: describe_port_type(&info.port_type),
            name: info.port_name,
        })
        .collect();

    Ok(Json(PortsResponse { ports }))
}

/// POST /connect - Open the pressure source, optionally on a specific port
pub async fn connect(
    State(ctx): State<AppContext>,
    body: Option<Json<ConnectRequest>>,
) -> Result<Json<ConnectionResponse>, VacuumError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let mut source = ctx.source.lock().await;
    source.connect(request.port).await?;

    tracing::info!("Connected to {}", source.name());

    Ok(Json(ConnectionResponse {
        connected: source.is_connected(),
        source: source.name().to_string(),
    }))
}

/// POST /disconnect - Close the pressure source, halting any running session
pub async fn disconnect(
    State(ctx): State<AppContext>,
) -> Result<Json<ConnectionResponse>, VacuumError> {
    SessionRunner::halt(&ctx, "Device disconnected").await;

    let mut source = ctx.source.lock().await;
    source.disconnect().await?;

    Ok(Json(ConnectionResponse {
        connected: source.is_connected(),
        source: source.name().to_string(),
    }))
}

/// GET /connection - Connection status
pub async fn get_connection(State(ctx): State<AppContext>) -> Json<ConnectionResponse> {
    let source = ctx.source.lock().await;

    Json(ConnectionResponse {
        connected: source.is_connected(),
        source: source.name().to_string(),
    })
}

/// GET /config/time_mode
pub async fn get_time_mode(State(ctx): State<AppContext>) -> Json<TimeModeBody> {
    let state = ctx.state.read().await;

    Json(TimeModeBody {
        time_mode: state.time_mode().as_u8(),
    })
}

/// POST /config/time_mode - Rejected while a session is running
pub async fn set_time_mode(
    State(ctx): State<AppContext>,
    Json(request): Json<TimeModeBody>,
) -> Result<Json<TimeModeBody>, VacuumError> {
    let time_mode = TimeMode::try_from(request.time_mode)?;

    let mut state = ctx.state.write().await;
    if state.session_status.is_running() {
        return Err(VacuumError::SessionRunning);
    }
    state.set_time_mode(time_mode);

    Ok(Json(TimeModeBody {
        time_mode: time_mode.as_u8(),
    }))
}

/// GET /config/pressure
pub async fn get_pressure(State(ctx): State<AppContext>) -> Json<PressureBody> {
    let state = ctx.state.read().await;

    Json(PressureBody {
        pressure_kpa: state.pressure_target(),
    })
}

/// POST /config/pressure
pub async fn set_pressure(
    State(ctx): State<AppContext>,
    Json(request): Json<PressureBody>,
) -> Result<Json<PressureBody>, VacuumError> {
    if !request.pressure_kpa.is_finite() {
        return Err(VacuumError::Config("pressure must be a finite number".into()));
    }

    let mut state = ctx.state.write().await;
    state.set_pressure_target(request.pressure_kpa);

    Ok(Json(PressureBody {
        pressure_kpa: state.pressure_target(),
    }))
}

/// POST /measure/once - Single raw acquisition and conversion, no decision
pub async fn measure_once(
    State(ctx): State<AppContext>,
) -> Result<Json<MeasureOnceResponse>, VacuumError> {
    let (channel, calibration) = {
        let state = ctx.state.read().await;
        (state.channel, state.calibration.clone())
    };

    let (raw, pressure) = acquire_pressure(&ctx.source, &calibration, channel).await?;

    tracing::info!("{} measure: raw={} pressure={:.2} kPa", channel, raw, pressure);

    Ok(Json(MeasureOnceResponse {
        channel,
        raw,
        pressure,
    }))
}
