//! Port enumeration with sentinel filtering

use std::sync::Arc;

use tracing::debug;

use super::{NO_PORT, PortBackend};
use crate::{Result, SimulatorError};

/// Lists connectable ports.
///
/// The [`NO_PORT`] sentinel and every reserved identifier are removed from
/// scan results and refused as connection targets.
#[derive(Clone)]
pub struct PortScanner {
    backend: Arc<dyn PortBackend>,
    reserved: Vec<String>,
}

impl PortScanner {
    pub fn new(backend: Arc<dyn PortBackend>, reserved: Vec<String>) -> Self {
        Self { backend, reserved }
    }

    /// Sorted, de-duplicated list of connectable port identifiers.
    pub fn scan(&self) -> Result<Vec<String>> {
        let ports = self.backend.available_ports()?;
        let found = ports.len();
        let ports = filter_ports(ports, &self.reserved);
        debug!(found, connectable = ports.len(), "Port scan complete");
        Ok(ports)
    }

    /// Whether `port` may be offered as a connection target.
    pub fn is_connectable(&self, port: &str) -> bool {
        !port.is_empty() && port != NO_PORT && !self.reserved.iter().any(|r| r == port)
    }

    /// Reject the sentinel and reserved ports.
    pub fn check_target(&self, port: &str) -> Result<()> {
        if self.is_connectable(port) {
            Ok(())
        } else {
            Err(SimulatorError::ReservedPort { port: port.to_string() })
        }
    }

    pub fn backend(&self) -> &Arc<dyn PortBackend> {
        &self.backend
    }
}

impl std::fmt::Debug for PortScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortScanner").field("reserved", &self.reserved).finish_non_exhaustive()
    }
}

/// Drop the sentinel, reserved and empty identifiers; sort and de-duplicate.
pub fn filter_ports(ports: Vec<String>, reserved: &[String]) -> Vec<String> {
    let mut ports: Vec<String> = ports
        .into_iter()
        .filter(|p| !p.is_empty() && p != NO_PORT && !reserved.contains(p))
        .collect();
    ports.sort();
    ports.dedup();
    ports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedBackend;
    use proptest::prelude::*;

    fn reserved() -> Vec<String> {
        vec!["COM1".to_string()]
    }

    #[test]
    fn scan_filters_sentinel_and_reserved() {
        let backend = ScriptedBackend::with_ports(["COM4", "None", "COM1", "COM3", "COM4"]);
        let scanner = PortScanner::new(Arc::new(backend), reserved());

        assert_eq!(scanner.scan().unwrap(), vec!["COM3".to_string(), "COM4".to_string()]);
    }

    #[test]
    fn sentinel_is_never_a_target() {
        let scanner = PortScanner::new(Arc::new(ScriptedBackend::default()), reserved());
        assert!(!scanner.is_connectable(NO_PORT));
        assert!(!scanner.is_connectable("COM1"));
        assert!(!scanner.is_connectable(""));
        assert!(scanner.is_connectable("/dev/ttyUSB0"));
        assert!(matches!(
            scanner.check_target("None"),
            Err(SimulatorError::ReservedPort { .. })
        ));
    }

    proptest! {
        #[test]
        fn filtered_output_never_contains_sentinel(
            ports in prop::collection::vec(prop_oneof![
                Just("None".to_string()),
                Just("COM1".to_string()),
                "[A-Za-z0-9/]{1,12}",
            ], 0..20),
        ) {
            let filtered = filter_ports(ports, &reserved());
            prop_assert!(!filtered.iter().any(|p| p == NO_PORT || p == "COM1"));
            prop_assert!(filtered.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
