use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! key_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

key_newtype!(ProbeId);

/// The probe endpoints exposed by the diagnostics server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    Ping,
    Traceroute,
    Speedtest,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 3] = [ProbeKind::Ping, ProbeKind::Traceroute, ProbeKind::Speedtest];

    pub fn id(self) -> ProbeId {
        ProbeId::new(match self {
            ProbeKind::Ping => "ping",
            ProbeKind::Traceroute => "traceroute",
            ProbeKind::Speedtest => "speedtest",
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            ProbeKind::Ping => "Ping",
            ProbeKind::Traceroute => "Traceroute",
            ProbeKind::Speedtest => "Speedtest",
        }
    }

    /// Whether the endpoint takes the probed address as a path segment.
    pub fn needs_target(self) -> bool {
        !matches!(self, ProbeKind::Speedtest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_id_serializes_as_plain_string() {
        let id = ProbeKind::Traceroute.id();
        assert_eq!(serde_json::to_string(&id).expect("json"), "\"traceroute\"");
        assert_eq!(id.to_string(), "traceroute");
    }

    #[test]
    fn only_speedtest_runs_without_target() {
        let targetless: Vec<_> = ProbeKind::ALL
            .into_iter()
            .filter(|kind| !kind.needs_target())
            .collect();
        assert_eq!(targetless, vec![ProbeKind::Speedtest]);
    }
}
