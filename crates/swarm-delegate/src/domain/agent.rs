//! Registered agents and their backend kinds.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An inference backend type an agent can execute on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process or on-host runtime.
    Local,
    /// Remote inference service.
    Remote,
    Named(String),
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::Remote => write!(f, "remote"),
            BackendKind::Named(name) => write!(f, "{name}"),
        }
    }
}

/// A swarm member that can receive delegated tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub capabilities: BTreeSet<String>,
    /// Tasks currently assigned. Mutated by the owning orchestrator.
    #[serde(default)]
    pub workload: u32,
    pub capacity: u32,
    #[serde(default)]
    pub is_local: bool,
    /// Backend kinds in preference order; the first is the primary.
    #[serde(default)]
    pub backends: Vec<BackendKind>,
}

impl Agent {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capabilities: BTreeSet::new(),
            workload: 0,
            capacity: 1,
            is_local: false,
            backends: Vec::new(),
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_workload(mut self, workload: u32) -> Self {
        self.workload = workload;
        self
    }

    pub fn local(mut self) -> Self {
        self.is_local = true;
        self
    }

    pub fn with_backend(mut self, kind: BackendKind) -> Self {
        if !self.backends.contains(&kind) {
            self.backends.push(kind);
        }
        self
    }

    /// Remaining capacity; zero when the agent is saturated.
    pub fn headroom(&self) -> u32 {
        self.capacity.saturating_sub(self.workload)
    }

    /// Voting weight: half the capability count, never below 1.
    pub fn voting_weight(&self) -> f64 {
        (self.capabilities.len() as f64 / 2.0).max(1.0)
    }
}
