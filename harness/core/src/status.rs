use std::{collections::BTreeMap, fmt};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("failed to parse status document: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
    },
}

/// State reported by a machine or unit agent in `stack status`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Ord, PartialEq, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    #[default]
    Pending,
    Started,
    Stopped,
    Down,
    Error,
    #[serde(other)]
    Unknown,
}

impl AgentState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Down => "down",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of `stack status --format yaml` for one environment.
///
/// Only the agent-state surface the harness waits on is modelled; the rest
/// of the document is ignored. Older CLI versions emit `services` instead
/// of `applications`, both spellings are accepted.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub machines: BTreeMap<String, MachineStatus>,
    #[serde(default, alias = "services")]
    pub applications: BTreeMap<String, ApplicationStatus>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MachineStatus {
    #[serde(default, rename = "agent-state")]
    pub agent_state: AgentState,
    #[serde(default, rename = "agent-state-info")]
    pub agent_state_info: Option<String>,
    #[serde(default, rename = "dns-name")]
    pub dns_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ApplicationStatus {
    #[serde(default)]
    pub units: BTreeMap<String, UnitStatus>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UnitStatus {
    #[serde(default, rename = "agent-state")]
    pub agent_state: AgentState,
    #[serde(default, rename = "agent-state-info")]
    pub agent_state_info: Option<String>,
    #[serde(default)]
    pub machine: Option<String>,
}

impl Status {
    pub fn from_yaml(raw: &str) -> Result<Self, StatusError> {
        serde_yaml::from_str(raw).map_err(|source| StatusError::Parse { source })
    }

    /// Every agent in the snapshot: machine ids followed by unit names.
    fn agents(&self) -> impl Iterator<Item = (&str, AgentState, Option<&str>)> {
        let machines = self.machines.iter().map(|(id, machine)| {
            (
                id.as_str(),
                machine.agent_state,
                machine.agent_state_info.as_deref(),
            )
        });
        let units = self
            .applications
            .values()
            .flat_map(|application| application.units.iter())
            .map(|(name, unit)| {
                (
                    name.as_str(),
                    unit.agent_state,
                    unit.agent_state_info.as_deref(),
                )
            });
        machines.chain(units)
    }

    /// Map from agent state to the agents currently reporting it.
    #[must_use]
    pub fn agent_states(&self) -> BTreeMap<AgentState, Vec<String>> {
        let mut states: BTreeMap<AgentState, Vec<String>> = BTreeMap::new();
        for (name, state, _) in self.agents() {
            states.entry(state).or_default().push(name.to_owned());
        }
        states
    }

    /// True when every machine and unit agent reports `started`.
    #[must_use]
    pub fn all_started(&self) -> bool {
        self.agents()
            .all(|(_, state, _)| state == AgentState::Started)
    }

    /// Agents stuck in the error state, with their state info when present.
    #[must_use]
    pub fn errored_agents(&self) -> Vec<String> {
        self.agents()
            .filter(|(_, state, _)| *state == AgentState::Error)
            .map(|(name, _, info)| match info {
                Some(info) => format!("{name} ({info})"),
                None => name.to_owned(),
            })
            .collect()
    }

    /// One-line summary of who is in which state, for timeout diagnostics.
    #[must_use]
    pub fn agent_state_summary(&self) -> String {
        if self.machines.is_empty() && self.applications.is_empty() {
            return "no agents reported".to_owned();
        }
        self.agent_states()
            .iter()
            .map(|(state, agents)| format!("{state}: {}", agents.join(", ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
