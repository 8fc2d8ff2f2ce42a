//! Main drive executable entry point.
//!
//! # Architecture
//!
//! The executable is event driven rather than cyclic:
//!
//!     - Initialise session, logging, and parameters
//!     - Initialise DriveCtrl
//!     - Serve the simulator:
//!         - Wait for a connection
//!         - For each telemetry event:
//!             - Steering and throttle control
//!             - Twiddle cost accumulation and trial boundaries
//!             - Send the resulting command
//!
//! # Modules
//!
//! All modules (e.g. `drive_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::info;
use structopt::StructOpt;

// Internal
use drive_lib::{
    drive_ctrl::{self, DriveCtrl},
    sim_server::{self, SimServer},
};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
    time::MonotonicClock,
};

// ---------------------------------------------------------------------------
// STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options
#[derive(Debug, StructOpt)]
#[structopt(
    name = "drive_exec",
    about = "Drives the simulator with PID control and tunes the steering gains online"
)]
struct Opts {
    /// DriveCtrl parameter file, relative to the params directory
    #[structopt(long, default_value = "drive_ctrl.toml")]
    drive_params: String,

    /// SimServer parameter file, relative to the params directory
    #[structopt(long, default_value = "sim_server.toml")]
    server_params: String,

    /// Enable twiddle tuning regardless of the parameter file
    #[structopt(long)]
    twiddle: bool,

    /// Minimum log level, one of `info`, `debug` or `trace`
    #[structopt(long, default_value = "debug")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(opts.log_level, &session).wrap_err("Failed to initialise logging")?;

    info!("Twiddle Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut drive_params = drive_ctrl::Params::load(&opts.drive_params)
        .wrap_err("Could not load DriveCtrl params")?;
    if opts.twiddle {
        drive_params.twiddle.enabled = true;
    }

    let server_params: sim_server::Params = util::params::load(&opts.server_params)
        .wrap_err("Could not load SimServer params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    let mut drive_ctrl: DriveCtrl<MonotonicClock> = DriveCtrl::default();
    drive_ctrl
        .init(drive_params, &session)
        .wrap_err("Failed to initialise DriveCtrl")?;

    let gains = drive_ctrl.steer_gains();
    info!(
        "DriveCtrl init complete (twiddle {}), Kp: {} Ki: {} Kd: {}",
        if drive_ctrl.params().twiddle.enabled { "enabled" } else { "disabled" },
        gains[0],
        gains[1],
        gains[2]
    );

    // ---- SERVE ----

    let server = SimServer::new(&server_params).wrap_err("Failed to initialise SimServer")?;
    info!(
        "Listening for the simulator on {}",
        server.local_addr().wrap_err("SimServer has no local address")?
    );

    // Best gains are saved into the session after every improving trial, the
    // process is normally stopped with the server still running
    let result = server.serve(&mut drive_ctrl, Some(&session));

    // ---- SHUTDOWN ----

    session.exit();

    info!("End of execution");

    result.wrap_err("SimServer stopped")
}
