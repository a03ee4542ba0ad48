use crate::HealthResponse;
use std::fmt;

pub const HEALTH_TIMEOUT_MS: u32 = 3_000;
pub const HEALTH_POLL_INTERVAL_MS: u32 = 30_000;

/// One endpoint tried by the connectivity check, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub path: &'static str,
    pub name: &'static str,
    /// `/health` must also report `status: "OK"`; the others only need a 2xx.
    pub requires_ok_status: bool,
}

pub const PROBES: [Probe; 3] = [
    Probe {
        path: "/health",
        name: "Health",
        requires_ok_status: true,
    },
    Probe {
        path: "/",
        name: "Root",
        requires_ok_status: false,
    },
    Probe {
        path: "/api/objects",
        name: "Objects API",
        requires_ok_status: false,
    },
];

impl Probe {
    /// `body` is `None` when the body could not be read as a health response.
    pub fn accepts(&self, success_status: bool, body: Option<&HealthResponse>) -> bool {
        if !success_status {
            return false;
        }
        !self.requires_ok_status || body.map_or(false, |body| body.status == "OK")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiStatus {
    Checking,
    Online(String),
    Offline(String),
}

impl Default for ApiStatus {
    fn default() -> Self {
        ApiStatus::Checking
    }
}

impl ApiStatus {
    /// Status after running the probes; `reached` is the first probe that
    /// accepted, if any.
    pub fn from_probe(reached: Option<&Probe>) -> Self {
        match reached {
            Some(probe) => ApiStatus::Online(format!("Connected via {}", probe.name)),
            None => ApiStatus::Offline("API unreachable".to_string()),
        }
    }

    pub fn is_checking(&self) -> bool {
        matches!(self, ApiStatus::Checking)
    }

    pub fn is_online(&self) -> bool {
        matches!(self, ApiStatus::Online(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ApiStatus::Checking => None,
            ApiStatus::Online(message) | ApiStatus::Offline(message) => Some(message),
        }
    }
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiStatus::Checking => write!(f, "Checking..."),
            ApiStatus::Online(_) => write!(f, "API online"),
            ApiStatus::Offline(_) => write!(f, "API offline"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(status: &str) -> HealthResponse {
        HealthResponse {
            status: status.to_string(),
        }
    }

    #[test]
    fn health_probe_requires_ok_status() {
        let health = &PROBES[0];
        assert!(health.accepts(true, Some(&body("OK"))));
        assert!(!health.accepts(true, Some(&body("DEGRADED"))));
        assert!(!health.accepts(true, None));
        assert!(!health.accepts(false, Some(&body("OK"))));
    }

    #[test]
    fn fallback_probes_only_need_success() {
        assert!(PROBES[1].accepts(true, None));
        assert!(PROBES[2].accepts(true, Some(&body("whatever"))));
        assert!(!PROBES[2].accepts(false, None));
    }

    #[test]
    fn status_names_reached_probe() {
        let status = ApiStatus::from_probe(Some(&PROBES[2]));
        assert!(status.is_online());
        assert_eq!(status.message(), Some("Connected via Objects API"));

        let status = ApiStatus::from_probe(None);
        assert_eq!(status, ApiStatus::Offline("API unreachable".to_string()));
        assert_eq!(status.to_string(), "API offline");
    }

    #[test]
    fn starts_checking() {
        assert!(ApiStatus::default().is_checking());
        assert_eq!(ApiStatus::default().message(), None);
    }
}
