//! Closed set of machine control commands

use std::fmt;
use std::str::FromStr;

use super::{Server, NETWORK_DISCONNECTED, POWER_OFF, POWER_RUNNING};
use crate::domain::DomainError;

/// Power and network commands an operator may issue against a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCommand {
    StartPower,
    StopPower,
    StopPowerForce,
    StartNetwork,
    StopNetwork,
}

/// Expected post-condition of a successful command, applied to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEffect {
    Power(String),
    Network(String),
}

impl ControlCommand {
    pub const ALL: [ControlCommand; 5] = [
        Self::StartPower,
        Self::StopPower,
        Self::StopPowerForce,
        Self::StartNetwork,
        Self::StopNetwork,
    ];

    /// Wire name used in request bodies and notifications.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartPower => "start_power",
            Self::StopPower => "stop_power",
            Self::StopPowerForce => "stop_power_force",
            Self::StartNetwork => "start_network",
            Self::StopNetwork => "stop_network",
        }
    }

    /// PowerShell instruction scoped to the machine and its host.
    pub fn instruction(&self, server: &Server, switch_name: &str) -> String {
        let name = quote(&server.name);
        let hv = quote(&server.hv);
        match self {
            Self::StartPower => format!("Start-VM -Name {} -ComputerName {}", name, hv),
            Self::StopPower => format!("Stop-VM -Name {} -ComputerName {}", name, hv),
            Self::StopPowerForce => {
                format!("Stop-VM -Name {} -Force -ComputerName {}", name, hv)
            }
            Self::StartNetwork => format!(
                "Connect-VMNetworkAdapter -VMName {} -SwitchName {} -ComputerName {}",
                name,
                quote(switch_name),
                hv
            ),
            Self::StopNetwork => {
                format!("Disconnect-VMNetworkAdapter -VMName {} -ComputerName {}", name, hv)
            }
        }
    }

    pub fn effect(&self, switch_name: &str) -> CacheEffect {
        match self {
            Self::StartPower => CacheEffect::Power(POWER_RUNNING.to_string()),
            Self::StopPower | Self::StopPowerForce => CacheEffect::Power(POWER_OFF.to_string()),
            Self::StartNetwork => CacheEffect::Network(switch_name.to_string()),
            Self::StopNetwork => CacheEffect::Network(NETWORK_DISCONNECTED.to_string()),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlCommand {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| DomainError::Validation(format!("unknown command '{}'", s)))
    }
}

/// Single-quote a PowerShell argument, doubling embedded quotes.
pub fn quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> Server {
        Server {
            name: "web01".into(),
            hv: "hv-a".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_known_commands() {
        for cmd in ControlCommand::ALL {
            assert_eq!(cmd.as_str().parse::<ControlCommand>().unwrap(), cmd);
        }
    }

    #[test]
    fn test_unknown_command_is_validation_error() {
        let err = "reboot".parse::<ControlCommand>().unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_instructions() {
        let s = server();
        assert_eq!(
            ControlCommand::StopPowerForce.instruction(&s, "LAN"),
            "Stop-VM -Name 'web01' -Force -ComputerName 'hv-a'"
        );
        assert_eq!(
            ControlCommand::StartNetwork.instruction(&s, "DMZ - Virtual Switch"),
            "Connect-VMNetworkAdapter -VMName 'web01' -SwitchName 'DMZ - Virtual Switch' -ComputerName 'hv-a'"
        );
    }

    #[test]
    fn test_quote_escapes_single_quotes() {
        assert_eq!(quote("o'brien; Remove-Item"), "'o''brien; Remove-Item'");
    }

    #[test]
    fn test_effects() {
        assert_eq!(
            ControlCommand::StopPower.effect("sw"),
            CacheEffect::Power(POWER_OFF.into())
        );
        assert_eq!(
            ControlCommand::StartNetwork.effect("sw"),
            CacheEffect::Network("sw".into())
        );
        assert_eq!(
            ControlCommand::StopNetwork.effect("sw"),
            CacheEffect::Network(String::new())
        );
    }
}
