//! Aggregate health status.
//!
//! # States
//! - Up: at least one server of the pool is healthy
//! - Down: no server of the pool is healthy
//!
//! # Design Decisions
//! - Only Up/Down transitions of a whole pool are reported to parents;
//!   single servers flapping while others stay healthy are not

use std::fmt;

/// Health status of a server or pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Up,
    Down,
}

impl HealthStatus {
    pub fn is_up(self) -> bool {
        self == HealthStatus::Up
    }
}

impl From<bool> for HealthStatus {
    fn from(healthy: bool) -> Self {
        if healthy {
            HealthStatus::Up
        } else {
            HealthStatus::Down
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Up => f.write_str("UP"),
            HealthStatus::Down => f.write_str("DOWN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_bool() {
        assert_eq!(HealthStatus::from(true), HealthStatus::Up);
        assert_eq!(HealthStatus::from(false), HealthStatus::Down);
        assert!(HealthStatus::Up.is_up());
        assert_eq!(HealthStatus::Down.to_string(), "DOWN");
    }
}
