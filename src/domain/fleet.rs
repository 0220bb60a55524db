//! The fixed service table deployed on the host

use std::path::Path;

use crate::domain::{RestartPolicy, ServiceDefinition, ServiceRole};

struct FleetEntry {
    name: &'static str,
    role: ServiceRole,
    unit: &'static str,
    timer: Option<&'static str>,
    policy: RestartPolicy,
}

const RESTART: RestartPolicy = RestartPolicy {
    skip_if_active: false,
    enable: false,
    verify_active: false,
};

/// Deployment order. The cache row is only deployed when enabled in settings.
const FLEET: &[FleetEntry] = &[
    FleetEntry {
        name: "drones-redis",
        role: ServiceRole::Cache,
        unit: "drones-redis.service",
        timer: None,
        policy: RestartPolicy {
            skip_if_active: true,
            enable: true,
            verify_active: false,
        },
    },
    FleetEntry {
        name: "drones",
        role: ServiceRole::Primary,
        unit: "drones.service",
        timer: None,
        policy: RestartPolicy {
            verify_active: true,
            ..RESTART
        },
    },
    FleetEntry {
        name: "drones-statistics",
        role: ServiceRole::Companion,
        unit: "drones-statistics.service",
        timer: Some("drones-statistics.timer"),
        policy: RESTART,
    },
    FleetEntry {
        name: "drones-reports",
        role: ServiceRole::Companion,
        unit: "drones-reports.service",
        timer: Some("drones-reports.timer"),
        policy: RESTART,
    },
    FleetEntry {
        name: "drones-journal-rules",
        role: ServiceRole::Companion,
        unit: "drones-journal-rules.service",
        timer: Some("drones-journal-rules.timer"),
        policy: RESTART,
    },
];

/// Build the service definitions for a run, in deployment order.
pub fn fleet(source_dir: &Path, install_dir: &Path, include_cache: bool) -> Vec<ServiceDefinition> {
    FLEET
        .iter()
        .filter(|entry| include_cache || entry.role != ServiceRole::Cache)
        .map(|entry| ServiceDefinition {
            name: entry.name.to_string(),
            role: entry.role,
            unit_name: entry.unit.to_string(),
            timer_name: entry.timer.map(str::to_string),
            source_dir: source_dir.to_path_buf(),
            install_dir: install_dir.to_path_buf(),
            policy: entry.policy,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_cache_enabled_when_building_fleet_then_cache_comes_first() {
        let services = fleet(Path::new("/src"), Path::new("/units"), true);

        let names: Vec<_> = services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "drones-redis",
                "drones",
                "drones-statistics",
                "drones-reports",
                "drones-journal-rules"
            ]
        );
        assert!(services[0].policy.skip_if_active);
        assert!(services[1].policy.verify_active);
    }

    #[test]
    fn given_cache_disabled_when_building_fleet_then_cache_is_omitted() {
        let services = fleet(Path::new("/src"), Path::new("/units"), false);

        assert!(services.iter().all(|s| s.role != ServiceRole::Cache));
        assert_eq!(services[0].role, ServiceRole::Primary);
    }

    #[test]
    fn given_fleet_when_inspecting_companions_then_all_restart_through_timers() {
        let services = fleet(Path::new("/src"), Path::new("/units"), true);

        for service in services.iter().filter(|s| s.role == ServiceRole::Companion) {
            assert!(service.restart_target().ends_with(".timer"));
            assert!(!service.policy.skip_if_active);
        }
    }
}
