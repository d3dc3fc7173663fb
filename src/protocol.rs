//! Messages exchanged with the simulation server.
//!
//! Every message is an event name plus a JSON payload. Inbound payloads are
//! decoded and validated here, so the scene only ever sees well-formed data.
//! A payload that fails to decode is rejected as a whole.

use crate::environment::{Environment, EnvironmentError};
use crate::hazard::Hazard;
use crate::math::Point2d;
use crate::pedestrian::Pedestrian;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A failure at the protocol boundary.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown event {0:?}")]
    UnknownEvent(String),
    #[error("malformed {event} payload: {source}")]
    Malformed {
        event: &'static str,
        source: serde_json::Error,
    },
    #[error("invalid environment in {event}: {source}")]
    InvalidEnvironment {
        event: &'static str,
        source: EnvironmentError,
    },
    #[error("{event} reported failure: {message}")]
    Rejected {
        event: &'static str,
        message: String,
    },
    #[error("cannot encode {event}: {source}")]
    Encode {
        event: &'static str,
        source: serde_json::Error,
    },
}

/// Running totals reported by the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationStats {
    pub active: u64,
    pub spawned: u64,
    pub exited: u64,
    /// Sum of the panic levels of all active pedestrians.
    pub total_panic: f64,
}

impl SimulationStats {
    pub fn average_panic(&self) -> f64 {
        if self.active > 0 {
            self.total_panic / self.active as f64
        } else {
            0.0
        }
    }
}

/// Descriptive data of a preset scenario.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioMeta {
    pub name: String,
    pub name_en: Option<String>,
    pub description: String,
    pub description_en: Option<String>,
    pub recommended_pedestrians: Option<u32>,
}

impl ScenarioMeta {
    /// The English name if there is one.
    pub fn display_name(&self) -> &str {
        self.name_en.as_deref().unwrap_or(&self.name)
    }

    pub fn display_description(&self) -> &str {
        self.description_en.as_deref().unwrap_or(&self.description)
    }
}

/// One simulation step as broadcast by the server.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SimulationUpdate {
    /// Simulation time in s.
    pub time: f64,
    #[serde(default)]
    pub pedestrians: Vec<Pedestrian>,
    #[serde(default)]
    pub stats: SimulationStats,
    /// Active hazards, found under `environment.hazards`.
    #[serde(default, rename = "environment", deserialize_with = "hazards_of_environment")]
    pub hazards: Vec<Hazard>,
}

fn hazards_of_environment<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Hazard>, D::Error> {
    #[derive(Deserialize)]
    struct Partial {
        #[serde(default)]
        hazards: Vec<Hazard>,
    }
    let partial = Option::<Partial>::deserialize(deserializer)?;
    Ok(partial.map(|p| p.hazards).unwrap_or_default())
}

/// Which request a server error answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorSource {
    Simulation,
    Scenario,
    Event,
    Export,
}

/// A decoded inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    Connected,
    Disconnected,
    EnvironmentCreated(Environment),
    ScenarioLoaded {
        environment: Environment,
        scenario: ScenarioMeta,
    },
    SimulationUpdate(SimulationUpdate),
    SimulationStarted,
    SimulationStopped {
        reason: String,
        stats: Option<SimulationStats>,
    },
    SimulationReset,
    EventAdded {
        kind: String,
        trigger_time: f64,
    },
    ExportComplete {
        filepath: String,
    },
    ServerError {
        source: ErrorSource,
        message: String,
    },
}

#[derive(Deserialize)]
struct Status {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct Message {
    message: String,
}

fn to_value<T: Serialize>(event: &'static str, value: &T) -> Result<Value, ProtocolError> {
    serde_json::to_value(value).map_err(|source| ProtocolError::Encode { event, source })
}

fn parse<T: DeserializeOwned>(event: &'static str, data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|source| ProtocolError::Malformed { event, source })
}

/// Fails if a status-carrying payload does not report success.
fn check_status(event: &'static str, data: &Value) -> Result<(), ProtocolError> {
    let status: Status = parse(event, data.clone())?;
    match status.status.as_deref() {
        None | Some("success") => Ok(()),
        Some(other) => Err(ProtocolError::Rejected {
            event,
            message: status.message.unwrap_or_else(|| other.to_string()),
        }),
    }
}

fn parse_environment(event: &'static str, data: Value) -> Result<Environment, ProtocolError> {
    let env: Environment = parse(event, data)?;
    env.validate()
        .map_err(|source| ProtocolError::InvalidEnvironment { event, source })?;
    Ok(env)
}

impl Inbound {
    /// Decodes an inbound message from its event name and payload.
    pub fn decode(event: &str, data: Value) -> Result<Self, ProtocolError> {
        let inbound = match event {
            "connect" => Inbound::Connected,
            "disconnect" => Inbound::Disconnected,
            "environment_created" => {
                const EVENT: &str = "environment_created";
                check_status(EVENT, &data)?;
                #[derive(Deserialize)]
                struct Payload {
                    environment: Value,
                }
                let payload: Payload = parse(EVENT, data)?;
                Inbound::EnvironmentCreated(parse_environment(EVENT, payload.environment)?)
            }
            "scenario_loaded" => {
                const EVENT: &str = "scenario_loaded";
                check_status(EVENT, &data)?;
                #[derive(Deserialize)]
                struct Payload {
                    environment: Value,
                    #[serde(default)]
                    scenario: ScenarioMeta,
                }
                let payload: Payload = parse(EVENT, data)?;
                Inbound::ScenarioLoaded {
                    environment: parse_environment(EVENT, payload.environment)?,
                    scenario: payload.scenario,
                }
            }
            "simulation_update" => {
                let update: SimulationUpdate = parse("simulation_update", data)?;
                if !update.time.is_finite() {
                    return Err(ProtocolError::Rejected {
                        event: "simulation_update",
                        message: format!("non-finite time {}", update.time),
                    });
                }
                Inbound::SimulationUpdate(update)
            }
            "simulation_started" => Inbound::SimulationStarted,
            "simulation_stopped" => {
                #[derive(Deserialize)]
                struct Payload {
                    #[serde(default)]
                    reason: String,
                    #[serde(default)]
                    stats: Option<SimulationStats>,
                }
                let payload: Payload = parse("simulation_stopped", data)?;
                Inbound::SimulationStopped {
                    reason: payload.reason,
                    stats: payload.stats,
                }
            }
            "simulation_reset" => Inbound::SimulationReset,
            "event_added" => {
                #[derive(Deserialize)]
                struct Payload {
                    #[serde(rename = "type")]
                    kind: String,
                    trigger_time: f64,
                }
                let payload: Payload = parse("event_added", data)?;
                Inbound::EventAdded {
                    kind: payload.kind,
                    trigger_time: payload.trigger_time,
                }
            }
            "export_complete" => {
                #[derive(Deserialize)]
                struct Payload {
                    filepath: String,
                }
                let payload: Payload = parse("export_complete", data)?;
                Inbound::ExportComplete {
                    filepath: payload.filepath,
                }
            }
            "simulation_error" | "scenario_error" | "event_error" | "export_error" => {
                let (event, source) = match event {
                    "simulation_error" => ("simulation_error", ErrorSource::Simulation),
                    "scenario_error" => ("scenario_error", ErrorSource::Scenario),
                    "event_error" => ("event_error", ErrorSource::Event),
                    _ => ("export_error", ErrorSource::Export),
                };
                let payload: Message = parse(event, data)?;
                Inbound::ServerError {
                    source,
                    message: payload.message,
                }
            }
            other => return Err(ProtocolError::UnknownEvent(other.to_string())),
        };
        Ok(inbound)
    }
}

/// How pedestrians pick an exit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitMode {
    #[default]
    Random,
    Nearest,
}

/// Parameters of a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    /// Whether the server records frames for export.
    pub record: bool,
    pub num_pedestrians: u32,
    pub initial_pedestrians: u32,
    /// Simulation speed multiplier.
    pub speed: f64,
    /// Overrides the flow rate of every entrance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_rate: Option<f64>,
    pub exit_mode: ExitMode,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            record: false,
            num_pedestrians: 100,
            initial_pedestrians: 0,
            speed: 1.0,
            flow_rate: None,
            exit_mode: ExitMode::Random,
        }
    }
}

/// A scheduled event.
#[derive(Clone, Debug, PartialEq)]
pub enum EventRequest {
    Fire { position: Point2d, radius: f64 },
    Shooting { position: Point2d, radius: f64 },
    EntranceBlocked { entrance_idx: usize },
    EntranceOpened { entrance_idx: usize },
    ExitBlocked { exit_idx: usize },
    ExitOpened { exit_idx: usize },
}

impl EventRequest {
    /// The event type name.
    pub fn kind(&self) -> &'static str {
        match self {
            EventRequest::Fire { .. } => "fire",
            EventRequest::Shooting { .. } => "shooting",
            EventRequest::EntranceBlocked { .. } => "entrance_blocked",
            EventRequest::EntranceOpened { .. } => "entrance_opened",
            EventRequest::ExitBlocked { .. } => "exit_blocked",
            EventRequest::ExitOpened { .. } => "exit_opened",
        }
    }
}

/// An outbound request.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    CreateEnvironment(Environment),
    LoadScenario {
        scenario_id: String,
    },
    StartSimulation(RunParams),
    StopSimulation,
    ResetSimulation,
    AddEvent {
        event: EventRequest,
        /// Simulation time to trigger at; the server picks one if absent.
        trigger_time: Option<f64>,
    },
    ExportUnity {
        filename: Option<String>,
    },
}

impl Outbound {
    pub fn name(&self) -> &'static str {
        match self {
            Outbound::CreateEnvironment(_) => "create_environment",
            Outbound::LoadScenario { .. } => "load_scenario",
            Outbound::StartSimulation(_) => "start_simulation",
            Outbound::StopSimulation => "stop_simulation",
            Outbound::ResetSimulation => "reset_simulation",
            Outbound::AddEvent { .. } => "add_event",
            Outbound::ExportUnity { .. } => "export_unity",
        }
    }

    /// Encodes the request as an event name and JSON payload.
    pub fn encode(&self) -> Result<(&'static str, Value), ProtocolError> {
        let event = self.name();
        let data = match self {
            Outbound::CreateEnvironment(env) => to_value(event, env)?,
            Outbound::LoadScenario { scenario_id } => json!({ "scenario_id": scenario_id }),
            Outbound::StartSimulation(params) => to_value(event, params)?,
            Outbound::StopSimulation | Outbound::ResetSimulation => json!({}),
            Outbound::AddEvent {
                event: request,
                trigger_time,
            } => {
                let mut data = json!({ "type": request.kind() });
                match *request {
                    EventRequest::Fire { position, radius }
                    | EventRequest::Shooting { position, radius } => {
                        data["position"] = json!([position.x, position.y]);
                        data["radius"] = json!(radius);
                    }
                    EventRequest::EntranceBlocked { entrance_idx }
                    | EventRequest::EntranceOpened { entrance_idx } => {
                        data["entrance_idx"] = json!(entrance_idx);
                    }
                    EventRequest::ExitBlocked { exit_idx } | EventRequest::ExitOpened { exit_idx } => {
                        data["exit_idx"] = json!(exit_idx);
                    }
                }
                if let Some(t) = trigger_time {
                    data["trigger_time"] = json!(t);
                }
                data
            }
            Outbound::ExportUnity { filename } => match filename {
                Some(name) => json!({ "filename": name }),
                None => json!({}),
            },
        };
        Ok((event, data))
    }
}
