//! The shake monitor: a two-state polling machine.
//!
//! ```text
//!            no shake                         cooldown elapsed
//!   Polling ---------> Polling      Cooldown -----------------> Polling
//!   Polling ---------> Cooldown
//!            shake (lock once)
//! ```
//!
//! While in `Cooldown` nothing is sampled or evaluated; the monitor is fully blocked
//! for the cooldown duration, then re-reads the scale and takes a fresh baseline.

use std::convert::Infallible;
use std::time::Duration;

use tracing::info;

use crate::clock::Sleeper;
use crate::config::MonitorConfig;
use crate::detector::{check_shake, ShakeEvent};
use crate::error::GyroLockResult;
use crate::lock::{LockTarget, SessionLocker};
use crate::sensor::{Accelerometer, SensorReading, SensorSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Polling,
    Cooldown,
}

/// Next state given the current one and whether the last evaluation saw a shake.
pub fn transition(state: MonitorState, shake_detected: bool) -> MonitorState {
    match (state, shake_detected) {
        (MonitorState::Polling, true) => MonitorState::Cooldown,
        (MonitorState::Polling, false) => MonitorState::Polling,
        (MonitorState::Cooldown, _) => MonitorState::Polling,
    }
}

/// What one [`ShakeMonitor::step`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// State the monitor is in after the step.
    pub state: MonitorState,
    /// Set when this step evaluated a shake. Always `None` for a cooldown step.
    pub shake: Option<ShakeEvent>,
}

pub struct ShakeMonitor<S, L, C> {
    accel: Accelerometer<S>,
    locker: L,
    sleeper: C,
    target: LockTarget,
    sensitivity: u32,
    debug: bool,
    poll_interval: Duration,
    cooldown: Duration,
    state: MonitorState,
    previous: SensorReading,
}

impl<S, L, C> ShakeMonitor<S, L, C>
where
    S: SensorSource,
    L: SessionLocker,
    C: Sleeper,
{
    /// Build the monitor and prime the baseline with a first sample.
    pub fn new(
        config: &MonitorConfig,
        mut accel: Accelerometer<S>,
        locker: L,
        mut sleeper: C,
        target: LockTarget,
    ) -> GyroLockResult<Self> {
        let previous = accel.sample(&mut sleeper)?;
        Ok(Self {
            accel,
            locker,
            sleeper,
            target,
            sensitivity: config.sensitivity,
            debug: config.debug,
            poll_interval: config.poll_interval,
            cooldown: config.cooldown,
            state: MonitorState::Polling,
            previous,
        })
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn previous(&self) -> &SensorReading {
        &self.previous
    }

    pub fn locker(&self) -> &L {
        &self.locker
    }

    pub fn sleeper(&self) -> &C {
        &self.sleeper
    }

    /// Run one cycle of the current state.
    pub fn step(&mut self) -> GyroLockResult<StepOutcome> {
        match self.state {
            MonitorState::Polling => self.poll(),
            MonitorState::Cooldown => self.cool_down(),
        }
    }

    /// Step forever. Only an environment error ends the loop.
    pub fn run(&mut self) -> GyroLockResult<Infallible> {
        loop {
            self.step()?;
        }
    }

    fn poll(&mut self) -> GyroLockResult<StepOutcome> {
        let current = self.accel.sample(&mut self.sleeper)?;
        let shake = check_shake(self.sensitivity, &current, &self.previous);
        if shake.is_some() {
            self.trigger_lock()?;
        }
        self.previous = current;
        self.state = transition(self.state, shake.is_some());
        if self.state == MonitorState::Polling {
            self.sleeper.sleep(self.poll_interval);
        }
        Ok(StepOutcome {
            state: self.state,
            shake,
        })
    }

    fn cool_down(&mut self) -> GyroLockResult<StepOutcome> {
        info!(cooldown_secs = self.cooldown.as_secs_f64(), "cooldown started");
        self.sleeper.sleep(self.cooldown);
        self.accel.recalibrate()?;
        self.previous = self.accel.sample(&mut self.sleeper)?;
        self.state = transition(self.state, false);
        info!("cooldown over, polling resumed");
        self.sleeper.sleep(self.poll_interval);
        Ok(StepOutcome {
            state: self.state,
            shake: None,
        })
    }

    fn trigger_lock(&mut self) -> GyroLockResult<()> {
        self.locker.connect()?;
        if self.debug {
            info!(lock_target = ?self.target, "GyroLock would lock sessions !");
            return Ok(());
        }
        self.locker.lock(&self.target)
    }
}
