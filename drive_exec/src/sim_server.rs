//! # Simulation Server
//!
//! The simulator connects to the drive software as a WebSocket client and
//! streams telemetry events, each of which is answered with exactly one
//! command. The server handles one connection at a time and processes every
//! event to completion before reading the next, so the drive controller is
//! only ever touched from the server's thread.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::net::{SocketAddr, TcpListener, TcpStream};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tungstenite::{error::ProtocolError, Message, WebSocket};

use crate::{
    drive_ctrl::{DriveCtrl, StatusReport},
    pid::GainVector,
};
use comms_if::sim::{decode_frame, SimCodecError, SimCommand, SimEvent};
use util::{session::Session, time::Clock};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Session relative path the best gains are saved to.
pub const BEST_GAINS_PATH: &str = "best_gains.json";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Simulation server
pub struct SimServer {
    listener: TcpListener,
}

/// Parameters for the simulation server
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Address to listen for the simulator on
    pub bind_addr: String,
}

/// The best gains found by the tuner, saved into the session.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BestGains {
    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,
    pub best_cost: f64,
    pub trial: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimServerError {
    #[error("Could not bind to {0}: {1}")]
    BindError(String, std::io::Error),

    #[error("Could not accept a connection: {0}")]
    AcceptError(std::io::Error),

    #[error("WebSocket handshake with {0} failed: {1}")]
    HandshakeError(SocketAddr, String),

    #[error("Could not recieve a message from the simulator: {0}")]
    RecvError(tungstenite::Error),

    #[error("Could not send the command to the simulator: {0}")]
    SendError(tungstenite::Error),

    #[error("Could not encode the command: {0}")]
    EncodeError(SimCodecError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            bind_addr: String::from("0.0.0.0:4567"),
        }
    }
}

impl SimServer {
    /// Create a new server listening on the configured address.
    pub fn new(params: &Params) -> Result<Self, SimServerError> {
        let listener = TcpListener::bind(&params.bind_addr)
            .map_err(|e| SimServerError::BindError(params.bind_addr.clone(), e))?;

        Ok(Self { listener })
    }

    /// The address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr, SimServerError> {
        self.listener
            .local_addr()
            .map_err(SimServerError::AcceptError)
    }

    /// Serve simulator connections one after another.
    ///
    /// Only returns if a connection can no longer be accepted. Errors on a
    /// single connection are logged and the server waits for the next one.
    /// With a session, the best gains are saved after each improving trial.
    pub fn serve<C: Clock>(
        &self,
        drive_ctrl: &mut DriveCtrl<C>,
        session: Option<&Session>,
    ) -> Result<(), SimServerError> {
        loop {
            match self.serve_connection(drive_ctrl, session) {
                Ok(()) => info!("Disconnected"),
                Err(e @ SimServerError::AcceptError(_)) => return Err(e),
                Err(e) => warn!("Connection ended with an error: {}", e),
            }
        }
    }

    /// Accept a single connection and serve it until the simulator
    /// disconnects.
    pub fn serve_connection<C: Clock>(
        &self,
        drive_ctrl: &mut DriveCtrl<C>,
        session: Option<&Session>,
    ) -> Result<(), SimServerError> {
        let (stream, peer) = self
            .listener
            .accept()
            .map_err(SimServerError::AcceptError)?;

        let mut ws = tungstenite::accept(stream)
            .map_err(|e| SimServerError::HandshakeError(peer, e.to_string()))?;

        info!("Connected to simulator at {}", peer);

        drive_ctrl.on_connect();

        loop {
            let msg = match ws.read() {
                Ok(m) => m,
                Err(tungstenite::Error::ConnectionClosed)
                | Err(tungstenite::Error::AlreadyClosed)
                | Err(tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)) => {
                    return Ok(())
                }
                Err(e) => return Err(SimServerError::RecvError(e)),
            };

            match msg {
                Message::Text(text) => match handle_frame(drive_ctrl, &text) {
                    Ok(Some((cmd, report))) => {
                        send_command(&mut ws, &cmd)?;
                        save_best_gains(drive_ctrl, &report, session);
                    }
                    Ok(None) => (),
                    Err(e) => warn!("Could not decode frame from the simulator: {}", e),
                },
                Message::Close(frame) => debug!("Simulator closed the connection: {:?}", frame),
                _ => (),
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decode a text frame and, if it is a telemetry event, run it through the
/// drive controller.
///
/// Returns `Ok(None)` for frames that need no reply. A malformed telemetry
/// payload is returned as an error and the controller is not run.
pub fn handle_frame<C: Clock>(
    drive_ctrl: &mut DriveCtrl<C>,
    frame: &str,
) -> Result<Option<(SimCommand, StatusReport)>, SimCodecError> {
    match decode_frame(frame)? {
        Some(SimEvent::Telemetry(record)) => Ok(Some(drive_ctrl.process(Some(&record)))),
        Some(SimEvent::Manual) => Ok(Some(drive_ctrl.process(None))),
        Some(SimEvent::Other(name)) => {
            debug!("Ignoring \"{}\" event", name);
            Ok(None)
        }
        None => Ok(None),
    }
}

fn send_command(ws: &mut WebSocket<TcpStream>, cmd: &SimCommand) -> Result<(), SimServerError> {
    let frame = cmd.to_frame().map_err(SimServerError::EncodeError)?;

    ws.send(Message::Text(frame))
        .map_err(SimServerError::SendError)
}

/// Save the best gains into the session if the event ended an improving
/// trial.
fn save_best_gains<C: Clock>(
    drive_ctrl: &DriveCtrl<C>,
    report: &StatusReport,
    session: Option<&Session>,
) {
    if let (Some(session), Some(trial)) = (session, report.trial) {
        if trial.improved {
            session.save(BEST_GAINS_PATH, best_gains(drive_ctrl, trial.trial));
        }
    }
}

/// The best gains found so far by the controller's tuner.
pub fn best_gains<C: Clock>(drive_ctrl: &DriveCtrl<C>, trial: u64) -> BestGains {
    let gains: &GainVector = drive_ctrl.twiddle().best_gains();

    BestGains {
        k_p: gains[0],
        k_i: gains[1],
        k_d: gains[2],
        best_cost: drive_ctrl.twiddle().best_gains_cost(),
        trial,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive_ctrl;
    use std::thread;
    use util::time::MockClock;

    const TELEMETRY: &str =
        r#"42["telemetry",{"cte":"0.5","speed":"10.0","steering_angle":"0.0","throttle":"0.0"}]"#;

    #[test]
    fn test_handle_frame() {
        let mut dc = DriveCtrl::new(drive_ctrl::Params::default(), MockClock::new());

        let (cmd, report) = handle_frame(&mut dc, TELEMETRY).unwrap().unwrap();
        assert!(matches!(cmd, SimCommand::Steer { .. }));
        assert_eq!(report.cte, 0.5);

        let (cmd, _) = handle_frame(&mut dc, r#"42["telemetry",null]"#)
            .unwrap()
            .unwrap();
        assert_eq!(cmd, SimCommand::Manual);

        assert!(handle_frame(&mut dc, r#"42["hello",{}]"#).unwrap().is_none());
        assert!(handle_frame(&mut dc, "3ping").unwrap().is_none());

        // Malformed telemetry never reaches the controller
        let p_error = dc.steer_pid().p_error();
        assert!(handle_frame(
            &mut dc,
            r#"42["telemetry",{"cte":"?","speed":"1","steering_angle":"0"}]"#
        )
        .is_err());
        assert_eq!(dc.steer_pid().p_error(), p_error);
    }

    #[test]
    fn test_serve_connection() {
        let server = SimServer::new(&Params {
            bind_addr: "127.0.0.1:0".into(),
        })
        .unwrap();
        let addr = server.local_addr().unwrap();

        let client = thread::spawn(move || {
            let (mut socket, _) = tungstenite::connect(format!("ws://{}", addr)).unwrap();
            let mut replies = Vec::new();

            let mut exchange = |socket: &mut WebSocket<_>, frame: &str, reply: bool| {
                socket.send(Message::Text(frame.into())).unwrap();
                if reply {
                    match socket.read().unwrap() {
                        Message::Text(t) => replies.push(t),
                        m => panic!("Expected a text reply, got {:?}", m),
                    }
                }
            };

            exchange(&mut socket, TELEMETRY, true);
            exchange(&mut socket, r#"42["telemetry",null]"#, true);
            exchange(&mut socket, "2", false);
            exchange(
                &mut socket,
                r#"42["telemetry",{"cte":"bad","speed":"1","steering_angle":"0"}]"#,
                false,
            );
            exchange(&mut socket, TELEMETRY, true);

            socket.close(None).unwrap();
            while socket.read().is_ok() {}

            replies
        });

        let mut dc = DriveCtrl::new(drive_ctrl::Params::default(), MockClock::new());
        server.serve_connection(&mut dc, None).unwrap();

        let replies = client.join().unwrap();

        assert_eq!(replies.len(), 3);
        assert!(replies[0].starts_with(r#"42["steer",{"steering_angle":"#));
        assert_eq!(replies[1], r#"42["manual",{}]"#);
        assert!(replies[2].starts_with(r#"42["steer","#));
    }

    #[test]
    fn test_best_gains() {
        let mut params = drive_ctrl::Params::default();
        params.steer_gains = [1.0, 2.0, 3.0];
        params.twiddle.enabled = true;

        let dc = DriveCtrl::new(params, MockClock::new());
        let best = best_gains(&dc, 0);

        assert_eq!([best.k_p, best.k_i, best.k_d], [1.0, 2.0, 3.0]);
        assert_eq!(best.best_cost, std::f64::INFINITY);
    }

    #[test]
    fn test_best_gains_after_completed_lap() {
        let mut params = drive_ctrl::Params::default();
        params.twiddle.enabled = true;
        params.twiddle.step_budget = 2;
        let mut dc = DriveCtrl::new(params, MockClock::new());
        let scored = dc.steer_gains();

        handle_frame(&mut dc, TELEMETRY).unwrap();
        handle_frame(&mut dc, TELEMETRY).unwrap();
        let (cmd, report) = handle_frame(&mut dc, TELEMETRY).unwrap().unwrap();
        assert_eq!(cmd, SimCommand::Reset);

        let trial = report.trial.unwrap();
        assert!(trial.improved);
        assert!(trial.track_completed);
        assert_eq!(dc.twiddle().best_cost(), std::f64::INFINITY);

        // The lap bonus clears the search cost, not the saved one
        let best = best_gains(&dc, trial.trial);
        assert_eq!([best.k_p, best.k_i, best.k_d], scored);
        assert_eq!(best.best_cost, 0.5);
        assert_eq!(best.trial, 1);
    }
}
