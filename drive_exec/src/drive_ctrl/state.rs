//! Drive control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use serde::Serialize;

// Internal
use super::*;
use crate::{
    pid::{GainVector, PidController},
    speed_model,
    twiddle::{TrialRecord, Twiddle},
};
use comms_if::sim::{SimCommand, TelemetryRecord};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    maths::deg2rad,
    module::State,
    session::Session,
    time::{Clock, MonotonicClock},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Session archive path of the trial records.
pub const TRIALS_ARCHIVE_PATH: &str = "twiddle/trials.csv";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive control state.
///
/// Holds every piece of mutable control state, events are processed one at a
/// time through [`DriveCtrl::process`] (or [`on_telemetry`]).
pub struct DriveCtrl<C: Clock = MonotonicClock> {
    params: Params,

    /// Source of time for the interval between telemetry records
    clock: C,

    /// Time of the previous telemetry record, `None` at connection start
    prev_time_s: Option<f64>,

    steer_pid: PidController,

    throttle_pid: PidController,

    twiddle: Twiddle,

    report: StatusReport,

    /// Trial finished on this event, waiting to be archived
    pending_trial: Option<TrialRecord>,
    arch_trials: Option<Archiver>,
}

/// The status report of the processing of one event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct StatusReport {
    /// Cross track error of the record
    pub cte: f64,

    /// Steering angle reported by the simulator.
    ///
    /// Units: radians
    pub steering_angle_rad: f64,

    /// Time since the previous record, zero for the first record of a
    /// connection.
    ///
    /// Units: seconds
    pub dt_s: f64,

    /// Target speed from the speed model.
    ///
    /// Units: miles per hour
    pub target_speed: f64,

    /// Steering demand sent
    pub steer_dem: f64,

    /// Throttle demand sent
    pub throttle_dem: f64,

    /// Events processed in the current trial
    pub trial_step: u64,

    /// Cost accumulated in the current trial
    pub accumulated_cost: f64,

    /// True if this event caused the trial to be pruned
    pub pruned: bool,

    /// True if the vehicle is off the track
    pub off_track: bool,

    /// The trial which ended on this event, if any
    pub trial: Option<TrialRecord>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C: Clock + Default> Default for DriveCtrl<C> {
    fn default() -> Self {
        Self::new(Params::default(), C::default())
    }
}

impl<C: Clock> State for DriveCtrl<C> {
    type InitData = Params;
    type InitError = DriveCtrlError;

    type InputData = Option<TelemetryRecord>;
    type OutputData = SimCommand;
    type StatusReport = StatusReport;
    type ProcError = DriveCtrlError;

    /// Initialise the DriveCtrl module.
    ///
    /// Expected init data is the already loaded parameters.
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        init_data.validate()?;

        self.configure(init_data);

        // Trials are only archived when there are trials to archive
        if self.params.twiddle.enabled {
            self.arch_trials = Some(
                Archiver::from_path(session, TRIALS_ARCHIVE_PATH)
                    .map_err(DriveCtrlError::ArchiveError)?,
            );
        }

        Ok(())
    }

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        Ok(self.process(input_data.as_ref()))
    }
}

impl<C: Clock> Archived for DriveCtrl<C> {
    fn write(&mut self) -> Result<(), ArchiveError> {
        if let (Some(arch), Some(trial)) = (self.arch_trials.as_mut(), self.pending_trial.take()) {
            arch.serialise(trial)?;
        }

        Ok(())
    }
}

impl<C: Clock> DriveCtrl<C> {
    /// Create a new controller.
    ///
    /// The parameters are expected to have been validated. If tuning is
    /// enabled the first perturbation is applied to the steering gains
    /// immediately.
    pub fn new(params: Params, clock: C) -> Self {
        let mut drive_ctrl = Self {
            params: params.clone(),
            clock,
            prev_time_s: None,
            steer_pid: PidController::default(),
            throttle_pid: PidController::default(),
            twiddle: Twiddle::new(params.steer_gains, &params.twiddle),
            report: StatusReport::default(),
            pending_trial: None,
            arch_trials: None,
        };
        drive_ctrl.configure(params);
        drive_ctrl
    }

    /// Process one telemetry event.
    ///
    /// `None` means the simulator sent no telemetry data, which is answered
    /// with a manual command. Otherwise the reply is a steer command, or a
    /// reset command if the current trial has finished.
    pub fn process(&mut self, record: Option<&TelemetryRecord>) -> (SimCommand, StatusReport) {
        self.report = StatusReport::default();

        let record = match record {
            Some(r) => r,
            None => {
                trace!("No telemetry data, manual driving");
                return (SimCommand::Manual, self.report);
            }
        };

        let dt_s = self.tick();

        self.report.cte = record.cte;
        self.report.steering_angle_rad = deg2rad(record.steering_angle);
        self.report.dt_s = dt_s;

        // The throttle controller runs on every record, even if its output
        // isn't used
        let target_speed = speed_model::target_speed(record.cte, dt_s);
        self.throttle_pid.update_error(target_speed - record.speed);
        self.report.target_speed = target_speed;

        if self.params.twiddle.enabled && self.twiddle.is_trial_complete() {
            self.report.trial = Some(self.end_trial());
            return (SimCommand::Reset, self.report);
        }

        // Steering opposes the cross track error
        self.steer_pid.update_error(record.cte);
        let steer_dem = -self.steer_pid.total_error();

        if self.params.twiddle.enabled {
            let outcome = self.twiddle.accumulate(record.cte);
            self.report.pruned = outcome.pruned;
            self.report.off_track = outcome.off_track;
        }

        let throttle_dem = self.throttle_dem();

        self.report.steer_dem = steer_dem;
        self.report.throttle_dem = throttle_dem;
        self.report.trial_step = self.twiddle.trial().step_count;
        self.report.accumulated_cost = self.twiddle.trial().accumulated_cost;

        trace!(
            "cte: {:.4}, dt: {:.4} s, target: {:.2}, steer: {:.4}, throttle: {:.4}",
            record.cte,
            dt_s,
            target_speed,
            steer_dem,
            throttle_dem
        );

        (
            SimCommand::Steer {
                steering_angle: steer_dem,
                throttle: throttle_dem,
            },
            self.report,
        )
    }

    /// Prepare for a new simulator connection.
    ///
    /// The current trial is restarted from scratch and all controller error
    /// terms and the time baseline are cleared. The gain search itself
    /// carries on where it was.
    pub fn on_connect(&mut self) {
        self.prev_time_s = None;
        self.steer_pid.reset_errors();
        self.throttle_pid.reset_errors();

        if self.params.twiddle.enabled {
            self.twiddle.restart_trial();
        }
    }

    /// The steering gains currently in use.
    pub fn steer_gains(&self) -> GainVector {
        self.steer_pid.gains()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn twiddle(&self) -> &Twiddle {
        &self.twiddle
    }

    pub fn steer_pid(&self) -> &PidController {
        &self.steer_pid
    }

    pub fn throttle_pid(&self) -> &PidController {
        &self.throttle_pid
    }

    /// Rebuild the controllers and the tuner from the given parameters.
    fn configure(&mut self, params: Params) {
        self.twiddle = Twiddle::new(params.steer_gains, &params.twiddle);
        if params.twiddle.enabled {
            self.twiddle.start();
        }

        self.steer_pid = PidController::from_gains(self.twiddle.gains());
        self.throttle_pid = PidController::from_gains(&params.throttle_gains);
        self.prev_time_s = None;
        self.params = params;
    }

    /// Read the clock, returning the time since the previous record.
    fn tick(&mut self) -> f64 {
        let now_s = self.clock.now_s();
        let dt_s = match self.prev_time_s {
            Some(t0) => now_s - t0,
            None => 0.0,
        };
        self.prev_time_s = Some(now_s);
        dt_s
    }

    /// The throttle to apply, either the tuner's or the throttle controller's.
    fn throttle_dem(&self) -> f64 {
        if self.params.twiddle.enabled {
            self.twiddle.throttle()
        } else {
            self.throttle_pid.total_error()
        }
    }

    /// Finish the current trial and load the next candidate gains into the
    /// steering controller.
    fn end_trial(&mut self) -> TrialRecord {
        let trial = self.twiddle.end_trial();

        // Clears the error terms along with the new gains
        self.steer_pid = PidController::from_gains(self.twiddle.gains());

        info!(
            "Trial {} {} (cost {:.6}, lap {}), Kp: {} Ki: {} Kd: {} Best: {} Throttle: {:.4}",
            trial.trial,
            if trial.improved { "improved" } else { "failed" },
            trial.trial_cost,
            if trial.track_completed { "completed" } else { "not completed" },
            trial.k_p,
            trial.k_i,
            trial.k_d,
            trial.best_cost,
            trial.throttle
        );

        self.pending_trial = Some(trial);
        if let Err(e) = self.write() {
            warn!("Could not archive trial {}: {}", trial.trial, e);
        }

        trial
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Process one telemetry event and return the command to send.
///
/// Shorthand for [`DriveCtrl::process`] discarding the status report.
pub fn on_telemetry<C: Clock>(
    drive_ctrl: &mut DriveCtrl<C>,
    record: Option<&TelemetryRecord>,
) -> SimCommand {
    drive_ctrl.process(record).0
}
