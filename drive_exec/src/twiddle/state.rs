//! Twiddle tuner state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;

// Internal
use super::*;
use crate::pid::GainVector;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The coordinate ascent tuner.
///
/// Owns the gain vector being tuned and the per-gain deltas. Both are only
/// modified at trial boundaries, in `start` and `end_trial`.
#[derive(Debug, Clone)]
pub struct Twiddle {
    gains: GainVector,

    /// Gains scored by the most recent improving trial, the initial gains
    /// before any trial improved.
    best_gains: GainVector,

    /// Cost of the trial that scored `best_gains`, kept when the lap bonus
    /// clears the best cost.
    best_gains_cost: f64,

    deltas: [f64; NUM_GAINS],

    trial: TrialState,

    /// Throttle applied while tuning, boosted when a lap is completed.
    throttle: f64,

    cost_exponent: i32,

    off_track_cte: f64,

    /// Number of completed trials.
    num_trials: u64,
}

/// State of the current trial and of the search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialState {
    /// Events processed in this trial, never more than `step_budget`.
    pub step_count: u64,

    /// Length of a trial in events.
    pub step_budget: u64,

    /// Cost accumulated over this trial.
    pub accumulated_cost: f64,

    /// Lowest cost seen so far, `INFINITY` when nothing is known.
    pub best_cost: f64,

    /// Index of the gain being perturbed.
    pub active_index: usize,

    /// Direction of the current perturbation.
    pub direction: Direction,

    /// False once the trial was pruned or the vehicle left the track.
    pub track_completed: bool,
}

/// What happened while accumulating one event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepOutcome {
    /// Cost added by this event.
    pub cost: f64,

    /// The trial cost passed the best cost and the trial was cut short.
    pub pruned: bool,

    /// The vehicle is further than the off track limit from the path.
    pub off_track: bool,
}

/// Summary of a finished trial, suitable for logging and archiving.
///
/// Gains, deltas, index and direction describe the search after the
/// boundary, i.e. the candidate for the next trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialRecord {
    /// Trial number, starting at 1.
    pub trial: u64,

    /// Cost of the finished trial.
    pub trial_cost: f64,

    /// Whether the trial improved on the best cost.
    pub improved: bool,

    /// Whether the trial ran its full length without leaving the track.
    pub track_completed: bool,

    /// Best cost after the boundary.
    pub best_cost: f64,

    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,

    pub delta_p: f64,
    pub delta_i: f64,
    pub delta_d: f64,

    pub active_index: usize,

    /// `1` or `-1`.
    pub direction: i8,

    pub throttle: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Twiddle {
    /// Create a new tuner starting from the given gains.
    ///
    /// No perturbation is applied until `start` is called.
    pub fn new(gains: GainVector, params: &Params) -> Self {
        Self {
            gains,
            best_gains: gains,
            best_gains_cost: std::f64::INFINITY,
            deltas: params.deltas,
            trial: TrialState {
                step_count: 0,
                step_budget: params.step_budget,
                accumulated_cost: 0.0,
                best_cost: std::f64::INFINITY,
                active_index: 0,
                direction: Direction::Increase,
                track_completed: true,
            },
            throttle: params.initial_throttle,
            cost_exponent: params.cost_exponent,
            off_track_cte: params.off_track_cte,
            num_trials: 0,
        }
    }

    /// Apply the first perturbation and begin the first trial.
    ///
    /// The first trial therefore scores `gains + delta[0]` rather than the
    /// unperturbed gains.
    pub fn start(&mut self) {
        self.apply_perturbation();
        self.restart_trial();
    }

    /// Clear the per-trial state (step count, cost, completion flag) without
    /// touching the search.
    pub fn restart_trial(&mut self) {
        self.trial.step_count = 0;
        self.trial.accumulated_cost = 0.0;
        self.trial.track_completed = true;
    }

    /// True once the trial has used its step budget, either normally or
    /// because it was pruned.
    pub fn is_trial_complete(&self) -> bool {
        self.trial.step_count >= self.trial.step_budget
    }

    /// Accumulate the cost of one telemetry event into the current trial.
    ///
    /// Does nothing if the trial is already complete.
    pub fn accumulate(&mut self, cte: f64) -> StepOutcome {
        if self.is_trial_complete() {
            return StepOutcome::default();
        }

        let mut outcome = StepOutcome {
            cost: cte.abs().powi(self.cost_exponent),
            ..Default::default()
        };

        self.trial.accumulated_cost += outcome.cost;
        self.trial.step_count += 1;

        // Once the best cost is exceeded this candidate can't win, so the
        // rest of the trial is skipped
        if self.trial.accumulated_cost > self.trial.best_cost {
            debug!(
                "Trial pruned at step {} (cost {} > best {})",
                self.trial.step_count, self.trial.accumulated_cost, self.trial.best_cost
            );
            self.trial.step_count = self.trial.step_budget;
            self.trial.track_completed = false;
            outcome.pruned = true;
        }

        if cte.abs() > self.off_track_cte {
            self.trial.track_completed = false;
            outcome.off_track = true;
        }

        outcome
    }

    /// Score the finished trial, move the search on, and apply the next
    /// candidate. The trial state is reset ready for the next trial.
    pub fn end_trial(&mut self) -> TrialRecord {
        let trial_cost = self.trial.accumulated_cost;
        let track_completed = self.trial.track_completed;
        let improved = trial_cost < self.trial.best_cost;
        let i = self.trial.active_index;

        if improved {
            self.deltas[i] *= DELTA_GROWTH;
            self.trial.best_cost = trial_cost;
            self.best_gains = self.gains;
            self.best_gains_cost = trial_cost;
            self.advance_index();

            // A full lap means the gains cope with this throttle, so go
            // faster and forget the cost measured at the old speed
            if track_completed {
                self.throttle *= THROTTLE_BOOST;
                self.trial.best_cost = std::f64::INFINITY;
            }
        } else {
            // Undo the failed perturbation
            self.gains[i] -= self.trial.direction.sign() * self.deltas[i];

            match self.trial.direction {
                Direction::Increase => self.trial.direction = Direction::Decrease,
                Direction::Decrease => {
                    self.deltas[i] *= DELTA_SHRINK;
                    self.advance_index();
                }
            }
        }

        self.apply_perturbation();
        self.restart_trial();
        self.num_trials += 1;

        TrialRecord {
            trial: self.num_trials,
            trial_cost,
            improved,
            track_completed,
            best_cost: self.trial.best_cost,
            k_p: self.gains[0],
            k_i: self.gains[1],
            k_d: self.gains[2],
            delta_p: self.deltas[0],
            delta_i: self.deltas[1],
            delta_d: self.deltas[2],
            active_index: self.trial.active_index,
            direction: self.trial.direction.sign() as i8,
            throttle: self.throttle,
        }
    }

    pub fn gains(&self) -> &GainVector {
        &self.gains
    }

    pub fn best_gains(&self) -> &GainVector {
        &self.best_gains
    }

    pub fn best_gains_cost(&self) -> f64 {
        self.best_gains_cost
    }

    pub fn deltas(&self) -> &[f64; NUM_GAINS] {
        &self.deltas
    }

    pub fn trial(&self) -> &TrialState {
        &self.trial
    }

    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    pub fn best_cost(&self) -> f64 {
        self.trial.best_cost
    }

    pub fn num_trials(&self) -> u64 {
        self.num_trials
    }

    /// Move to the next gain, starting in the increasing direction.
    fn advance_index(&mut self) {
        self.trial.active_index = (self.trial.active_index + 1) % NUM_GAINS;
        self.trial.direction = Direction::Increase;
    }

    fn apply_perturbation(&mut self) {
        let i = self.trial.active_index;
        self.gains[i] += self.trial.direction.sign() * self.deltas[i];
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params(deltas: [f64; NUM_GAINS], step_budget: u64) -> Params {
        Params {
            enabled: true,
            deltas,
            step_budget,
            cost_exponent: 2,
            initial_throttle: 0.3,
            off_track_cte: 3.5,
        }
    }

    /// Run one full trial with a constant cte.
    fn run_trial(tw: &mut Twiddle, cte: f64) -> TrialRecord {
        while !tw.is_trial_complete() {
            tw.accumulate(cte);
        }
        tw.end_trial()
    }

    #[test]
    fn test_start_applies_first_perturbation() {
        let mut tw = Twiddle::new([0.0, 0.0, 0.0], &params([1.0, 0.0, 0.0], 5));
        assert_eq!(tw.gains(), &[0.0, 0.0, 0.0]);

        tw.start();

        assert_eq!(tw.gains(), &[1.0, 0.0, 0.0]);
        assert_eq!(tw.trial().step_count, 0);
        assert_eq!(tw.best_cost(), std::f64::INFINITY);
    }

    #[test]
    fn test_first_boundary() {
        let mut tw = Twiddle::new([0.0, 0.0, 0.0], &params([1.0, 0.0, 0.0], 1));
        tw.start();

        // A single off track event, cost 16, so no lap bonus
        tw.accumulate(4.0);
        assert!(tw.is_trial_complete());
        assert!(!tw.trial().track_completed);

        let rec = tw.end_trial();

        assert!(rec.improved);
        assert_eq!(rec.trial, 1);
        assert_eq!(rec.trial_cost, 16.0);
        assert_eq!(tw.best_cost(), 16.0);
        assert_eq!(tw.gains(), &[1.0, 0.0, 0.0]);
        assert!((tw.deltas()[0] - 1.1).abs() < 1e-12);
        assert_eq!(tw.trial().active_index, 1);
        assert_eq!(tw.trial().direction, Direction::Increase);
        assert_eq!(tw.throttle(), 0.3);

        // Trial state is reset
        assert_eq!(tw.trial().step_count, 0);
        assert_eq!(tw.trial().accumulated_cost, 0.0);
        assert!(tw.trial().track_completed);
    }

    #[test]
    fn test_completed_lap_boosts_throttle() {
        let mut tw = Twiddle::new([0.0, 0.0, 0.0], &params([1.0, 1.0, 1.0], 4));
        tw.start();

        let rec = run_trial(&mut tw, 0.5);

        assert!(rec.improved);
        assert!(rec.track_completed);
        assert_eq!(rec.trial_cost, 1.0);
        assert!((tw.throttle() - 0.33).abs() < 1e-12);
        assert_eq!(tw.best_cost(), std::f64::INFINITY);
        assert_eq!(rec.best_cost, std::f64::INFINITY);

        // The winning cost stays with the winning gains
        assert_eq!(tw.best_gains(), &[1.0, 0.0, 0.0]);
        assert_eq!(tw.best_gains_cost(), 1.0);
    }

    #[test]
    fn test_failure_flips_then_shrinks() {
        let mut tw = Twiddle::new([1.0, 1.0, 1.0], &params([0.5, 0.25, 0.125], 2));
        tw.start();
        assert_eq!(tw.gains(), &[1.5, 1.0, 1.0]);

        // Establish a best cost of 2 * 16 = 32 (off track so no bonus)
        let rec = run_trial(&mut tw, 4.0);
        assert!(rec.improved);
        assert_eq!(tw.best_cost(), 32.0);
        assert_eq!(tw.gains(), &[1.5, 1.25, 1.0]);
        assert_eq!(tw.best_gains(), &[1.5, 1.0, 1.0]);
        assert_eq!(tw.trial().active_index, 1);

        // Worse trial: undo and try decreasing k_i
        let rec = run_trial(&mut tw, 5.0);
        assert!(!rec.improved);
        assert_eq!(tw.trial().direction, Direction::Decrease);
        assert_eq!(tw.gains(), &[1.5, 0.75, 1.0]);
        assert_eq!(tw.deltas()[1], 0.25);
        assert_eq!(tw.best_cost(), 32.0);

        // Worse again: undo, shrink and move to k_d
        let rec = run_trial(&mut tw, 5.0);
        assert!(!rec.improved);
        assert_eq!(tw.trial().active_index, 2);
        assert_eq!(tw.trial().direction, Direction::Increase);
        assert!((tw.deltas()[1] - 0.225).abs() < 1e-12);
        assert_eq!(tw.gains(), &[1.5, 1.0, 1.125]);
        assert_eq!(rec.direction, 1);
        assert_eq!(tw.num_trials(), 3);
        assert_eq!(tw.best_gains(), &[1.5, 1.0, 1.0]);
    }

    #[test]
    fn test_pruning() {
        let mut tw = Twiddle::new([0.0, 0.0, 0.0], &params([0.1, 0.1, 0.1], 100));
        tw.start();

        // Best cost of 100 * 4^2 = 1600
        run_trial(&mut tw, 4.0);
        assert_eq!(tw.best_cost(), 1600.0);

        // 10^2 per step, exceeds 1600 after 17 steps
        let mut pruned_at = None;
        for i in 1..=100 {
            let outcome = tw.accumulate(10.0);
            if outcome.pruned {
                pruned_at = Some(i);
                break;
            }
        }

        assert_eq!(pruned_at, Some(17));
        assert!(tw.is_trial_complete());
        assert_eq!(tw.trial().step_count, tw.trial().step_budget);
        assert!(!tw.trial().track_completed);

        // Nothing more is accumulated once complete
        let cost = tw.trial().accumulated_cost;
        assert_eq!(tw.accumulate(1.0), StepOutcome::default());
        assert_eq!(tw.trial().accumulated_cost, cost);
    }

    #[test]
    fn test_off_track_without_pruning() {
        let mut tw = Twiddle::new([0.0, 0.0, 0.0], &params([0.1, 0.1, 0.1], 10));
        tw.start();

        let outcome = tw.accumulate(-3.6);

        assert!(outcome.off_track);
        assert!(!outcome.pruned);
        assert!(!tw.trial().track_completed);
        assert_eq!(tw.trial().step_count, 1);
    }

    #[test]
    fn test_high_cost_exponent() {
        let mut p = params([0.1, 0.1, 0.1], 10);
        p.cost_exponent = 8;
        let mut tw = Twiddle::new([0.0, 0.0, 0.0], &p);
        tw.start();

        let outcome = tw.accumulate(-2.0);

        assert_eq!(outcome.cost, 256.0);
    }

    #[test]
    fn test_odd_cost_exponent_never_negative() {
        let mut p = params([0.1, 0.1, 0.1], 4);
        p.cost_exponent = 3;
        p.off_track_cte = 0.5;
        let mut tw = Twiddle::new([0.0, 0.0, 0.0], &p);
        tw.start();

        // Drifting left costs the same as drifting right
        assert_eq!(tw.accumulate(-2.0).cost, 8.0);
        assert_eq!(tw.accumulate(2.0).cost, 8.0);

        let rec = run_trial(&mut tw, -1.0);
        assert_eq!(rec.trial_cost, 18.0);
        assert!(rec.improved);
        assert_eq!(tw.best_cost(), 18.0);

        // A trial far to the left can't undercut it
        let rec = run_trial(&mut tw, -3.0);
        assert!(!rec.improved);
        assert_eq!(rec.trial_cost, 27.0);
        assert_eq!(tw.best_cost(), 18.0);
    }

    #[test]
    fn test_best_cost_never_increases() {
        let mut tw = Twiddle::new([0.2, 0.0, 3.0], &params([0.05, 0.001, 0.5], 3));
        tw.start();

        let ctes = [3.6, 3.7, 3.8, 3.55, 4.0, 3.9, 3.65, 3.75, 5.0, 3.51];
        let mut prev_best = tw.best_cost();

        for cte in ctes.iter() {
            let rec = run_trial(&mut tw, *cte);

            // Every trial is off track so no bonus reset can occur
            assert!(!rec.track_completed);
            assert!(tw.best_cost() <= prev_best);
            prev_best = tw.best_cost();

            assert!(tw.trial().step_count <= tw.trial().step_budget);
        }
    }
}
