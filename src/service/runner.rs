use tokio::time::{MissedTickBehavior, interval};

use crate::error::VacuumError;
use crate::processing::CalibrationTable;
use crate::protocol::{Channel, RawCode};
use crate::service::state::{AppContext, DeviceState, SessionStatus, SharedSource};

/// Acquire one raw code and convert it to kPa
pub async fn acquire_pressure(
    source: &SharedSource,
    calibration: &CalibrationTable,
    channel: Channel,
) -> Result<(RawCode, f64), VacuumError> {
    let raw = {
        let mut source = source.lock().await;
        source.measure_once(channel).await?
    };

    Ok((raw, calibration.convert(i32::from(raw))))
}

/// Background loop driving the decision engine at the sampling cadence
///
/// A failed acquisition is retried with the same counter on the next tick.
/// Each runner is bound to the session id it was started with and exits as
/// soon as another session takes over.
pub struct SessionRunner {
    ctx: AppContext,
    session_id: u64,
}

impl SessionRunner {
    /// Reset the engine, mark a new session as running and return its runner
    pub async fn begin(ctx: &AppContext) -> Result<Self, VacuumError> {
        if !ctx.source.lock().await.is_connected() {
            return Err(VacuumError::NotConnected);
        }

        let mut state = ctx.state.write().await;
        if state.session_status.is_running() {
            return Err(VacuumError::SessionRunning);
        }

        state.session_id += 1;
        state.engine.start();
        state.session_status = SessionStatus::Running;
        state.latest_verdict = None;

        Ok(Self {
            ctx: ctx.clone(),
            session_id: state.session_id,
        })
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Status to return when this runner no longer drives the engine
    fn released(&self, state: &DeviceState) -> Option<SessionStatus> {
        if state.session_id != self.session_id {
            tracing::info!("Session {} superseded by {}", self.session_id, state.session_id);
            return Some(SessionStatus::Aborted {
                reason: format!("Superseded by session {}", state.session_id),
            });
        }
        if !state.session_status.is_running() {
            return Some(state.session_status.clone());
        }
        None
    }

    /// Ask a running session to stop. Returns false when nothing was running.
    pub async fn halt(ctx: &AppContext, reason: &str) -> bool {
        let mut state = ctx.state.write().await;
        if !state.session_status.is_running() {
            return false;
        }

        tracing::info!("Session halted: {}", reason);
        state.session_status = SessionStatus::Aborted {
            reason: reason.to_string(),
        };
        true
    }

    /// Run until the engine says stop, the session is halted, or acquisition keeps failing
    pub async fn run(self) -> SessionStatus {
        let (channel, calibration, settings) = {
            let state = self.ctx.state.read().await;
            (state.channel, state.calibration.clone(), state.runner)
        };

        let mut ticker = interval(settings.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut counter: u32 = 1;
        let mut failures: u32 = 0;

        tracing::info!(
            "Session runner started on {} every {:?}",
            channel,
            settings.sample_interval
        );

        loop {
            ticker.tick().await;

            {
                let state = self.ctx.state.read().await;
                if let Some(status) = self.released(&state) {
                    return status;
                }
            }

            let sample = acquire_pressure(&self.ctx.source, &calibration, channel).await;

            let mut state = self.ctx.state.write().await;
            // Halted or restarted while we were waiting on the device
            if let Some(status) = self.released(&state) {
                return status;
            }

            let verdict = state
                .engine
                .evaluate(counter, sample.as_ref().ok().map(|(_, kpa)| *kpa));
            state.record_verdict(verdict.clone());

            if let Err(e) = sample {
                failures += 1;
                tracing::warn!(
                    "Acquisition failed at counter {} ({}/{}): {}",
                    counter,
                    failures,
                    settings.max_acquisition_failures,
                    e
                );

                if failures >= settings.max_acquisition_failures {
                    state.session_status = SessionStatus::Aborted {
                        reason: format!("Acquisition failed {} times: {}", failures, e),
                    };
                    tracing::error!("Session aborted at counter {}", counter);
                    return state.session_status.clone();
                }
                continue;
            }

            failures = 0;
            counter += 1;

            if verdict.stop {
                state.session_status = SessionStatus::Finished {
                    passed: verdict.pass,
                };
                tracing::info!(
                    "Session finished at counter {}: {} (start={:.2}, stop={:.2}, diff={:.2})",
                    verdict.counter,
                    if verdict.pass { "PASS" } else { "FAIL" },
                    verdict.start_pressure,
                    verdict.stop_pressure,
                    verdict.diff_pressure
                );
                return state.session_status.clone();
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::data_source::PressureSource;
    use crate::data_source::playback::PlaybackPressureSource;
    use crate::processing::Phase;

    /// Raw code that converts to exactly 65 kPa
    pub const CODE_65_KPA: RawCode = 95;
    /// Raw code that converts to 55 kPa
    pub const CODE_55_KPA: RawCode = 115;

    /// Scripted source: yields queued results, then repeats the fallback code
    pub struct ScriptedSource {
        pub script: VecDeque<Option<RawCode>>,
        pub fallback: RawCode,
        pub connected: bool,
    }

    impl ScriptedSource {
        pub fn new(script: Vec<Option<RawCode>>, fallback: RawCode) -> Self {
            Self {
                script: script.into(),
                fallback,
                connected: true,
            }
        }
    }

    #[async_trait]
    impl PressureSource for ScriptedSource {
        async fn connect(&mut self, _target: Option<String>) -> Result<(), VacuumError> {
            self.connected = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<(), VacuumError> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn measure_once(&mut self, channel: Channel) -> Result<RawCode, VacuumError> {
            if !self.connected {
                return Err(VacuumError::NotConnected);
            }
            match self.script.pop_front() {
                Some(Some(raw)) => Ok(raw),
                Some(None) => Err(VacuumError::NoResponse(channel)),
                None => Ok(self.fallback),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    pub fn fast_context(source: ScriptedSource) -> AppContext {
        let mut state = DeviceState::default();
        state.runner.sample_interval = Duration::from_millis(1);
        AppContext::new(state, Box::new(source))
    }

    #[tokio::test]
    async fn test_acquire_pressure_converts() {
        let ctx = fast_context(ScriptedSource::new(vec![Some(48)], CODE_65_KPA));
        let calibration = CalibrationTable::default();

        let (raw, kpa) = acquire_pressure(&ctx.source, &calibration, Channel::Vac1)
            .await
            .unwrap();

        assert_eq!(raw, 48);
        assert_eq!(kpa, 80.0);
    }

    #[tokio::test]
    async fn test_session_passes_on_timeout() {
        let ctx = fast_context(ScriptedSource::new(vec![], CODE_65_KPA));

        let status = SessionRunner::begin(&ctx).await.unwrap().run().await;

        assert_eq!(status, SessionStatus::Finished { passed: true });

        let state = ctx.state.read().await;
        let verdict = state.latest_verdict.clone().unwrap();
        // Instant mode: first sample after calibration is already a timeout
        assert_eq!(verdict.counter, 20);
        assert_eq!(verdict.phase, Phase::Timeout);
        assert!(verdict.stop);
    }

    #[tokio::test]
    async fn test_session_fails_on_leak() {
        let mut script = vec![Some(CODE_65_KPA); 19];
        script.push(Some(CODE_55_KPA));
        let ctx = fast_context(ScriptedSource::new(script, CODE_65_KPA));
        ctx.state
            .write()
            .await
            .set_time_mode(crate::protocol::TimeMode::Quick);

        let status = SessionRunner::begin(&ctx).await.unwrap().run().await;

        assert_eq!(status, SessionStatus::Finished { passed: false });
        let state = ctx.state.read().await;
        let verdict = state.latest_verdict.clone().unwrap();
        assert_eq!(verdict.counter, 20);
        assert_eq!(verdict.phase, Phase::ActiveTest);
    }

    #[tokio::test]
    async fn test_failed_acquisition_retries_same_counter() {
        // Failure in the middle of calibration must not shift the phases
        let mut script = vec![Some(CODE_65_KPA); 16];
        script.push(None);
        let ctx = fast_context(ScriptedSource::new(script, CODE_65_KPA));

        let status = SessionRunner::begin(&ctx).await.unwrap().run().await;

        assert_eq!(status, SessionStatus::Finished { passed: true });
        let state = ctx.state.read().await;
        assert_eq!(state.latest_verdict.as_ref().unwrap().counter, 20);
    }

    #[tokio::test]
    async fn test_session_aborts_after_repeated_failures() {
        let ctx = fast_context(ScriptedSource::new(
            vec![Some(CODE_65_KPA), None, None, None],
            CODE_65_KPA,
        ));

        let status = SessionRunner::begin(&ctx).await.unwrap().run().await;

        assert!(matches!(status, SessionStatus::Aborted { .. }));
        let state = ctx.state.read().await;
        let verdict = state.latest_verdict.clone().unwrap();
        assert!(!verdict.ok);
        assert_eq!(state.engine.session().sample_counter, 1);
    }

    #[tokio::test]
    async fn test_begin_rejects_second_session() {
        let ctx = fast_context(ScriptedSource::new(vec![], CODE_65_KPA));

        SessionRunner::begin(&ctx).await.unwrap();
        assert!(matches!(
            SessionRunner::begin(&ctx).await,
            Err(VacuumError::SessionRunning)
        ));
    }

    #[tokio::test]
    async fn test_begin_requires_connection() {
        let mut source = ScriptedSource::new(vec![], CODE_65_KPA);
        source.connected = false;
        let ctx = fast_context(source);

        assert!(matches!(
            SessionRunner::begin(&ctx).await,
            Err(VacuumError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_halt_stops_runner() {
        let ctx = fast_context(ScriptedSource::new(vec![], CODE_65_KPA));
        ctx.state
            .write()
            .await
            .set_time_mode(crate::protocol::TimeMode::Long);

        let runner = SessionRunner::begin(&ctx).await.unwrap();
        let handle = tokio::spawn(runner.run());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(SessionRunner::halt(&ctx, "operator").await);

        let status = handle.await.unwrap();
        assert_eq!(status, SessionStatus::Aborted {
            reason: "operator".to_string()
        });
        assert!(!SessionRunner::halt(&ctx, "again").await);
    }

    #[tokio::test]
    async fn test_restart_after_halt_retires_old_runner() {
        let ctx = fast_context(ScriptedSource::new(vec![], CODE_65_KPA));
        {
            let mut state = ctx.state.write().await;
            state.set_time_mode(crate::protocol::TimeMode::Long);
            state.runner.sample_interval = Duration::from_millis(20);
        }

        let first = SessionRunner::begin(&ctx).await.unwrap();
        let first_id = first.session_id();
        let first_handle = tokio::spawn(first.run());
        tokio::time::sleep(Duration::from_millis(70)).await;

        // Restart before the first runner's next tick
        assert!(SessionRunner::halt(&ctx, "operator").await);
        let second = SessionRunner::begin(&ctx).await.unwrap();
        assert_eq!(second.session_id(), first_id + 1);
        let second_handle = tokio::spawn(second.run());

        let first_status = tokio::time::timeout(Duration::from_millis(200), first_handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(first_status, SessionStatus::Aborted { .. }));

        let mut counters = Vec::new();
        for _ in 0..15 {
            counters.push(ctx.state.read().await.engine.session().sample_counter);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(
            counters.windows(2).all(|pair| pair[0] <= pair[1]),
            "counters went backwards: {:?}",
            counters
        );
        assert!(counters.last().unwrap() > counters.first().unwrap());

        assert!(SessionRunner::halt(&ctx, "done").await);
        second_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_bench_log_replays_to_pass() {
        let log = std::path::PathBuf::from(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/demos/bench_pass.log"
        ));
        let mut source = PlaybackPressureSource::new(log, false);
        source.connect(None).await.unwrap();

        let mut state = DeviceState::default();
        state.runner.sample_interval = Duration::from_millis(1);
        let ctx = AppContext::new(state, Box::new(source));

        let status = SessionRunner::begin(&ctx).await.unwrap().run().await;

        assert_eq!(status, SessionStatus::Finished { passed: true });
        let state = ctx.state.read().await;
        let verdict = state.latest_verdict.clone().unwrap();
        // The recorded TIMEOUT during calibration is retried, not counted
        assert_eq!(verdict.counter, 20);
        assert_eq!(verdict.phase, Phase::Timeout);
        assert_eq!(verdict.offset_pressure, 0.0);
        assert!(verdict.diff_pressure.abs() <= 1.0);
    }
}
