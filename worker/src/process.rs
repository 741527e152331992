use crate::{config::Deployments, ethereum::Address};

/// Randomness mode, fixed at startup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatingMode {
    /// Every contract draws randomness from mock fulfillments
    MockVrf,
    /// Gameplay carries ECVRF proofs in its loop progression
    AutoLoopVrf,
}

impl OperatingMode {
    /// Mode from the `USE_AUTOLOOP_VRF` flag
    pub fn from_flag(use_autoloop_vrf: bool) -> Self {
        if use_autoloop_vrf {
            OperatingMode::AutoLoopVrf
        } else {
            OperatingMode::MockVrf
        }
    }
}

impl core::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OperatingMode::MockVrf => write!(f, "Mock VRF (all contracts)"),
            OperatingMode::AutoLoopVrf => write!(f, "AutoLoop VRF (Gameplay)"),
        }
    }
}

/// What the worker does with a target contract
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProcessKind {
    /// Fulfill pending mock randomness requests
    MockVrf,
    /// Progress the loop with the payload it asked for
    StandardLoop,
    /// Progress the loop with a VRF envelope around its payload
    VrfLoop,
}

impl ProcessKind {
    /// Evaluation order inside a tick
    pub fn order(&self) -> u8 {
        match self {
            ProcessKind::MockVrf => 0,
            ProcessKind::StandardLoop => 1,
            ProcessKind::VrfLoop => 2,
        }
    }
}

/// A target contract managed by the worker
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerProcess {
    /// Label used in logs
    pub label: &'static str,
    /// Contract address
    pub address: Address,
    /// Action performed on the contract
    pub kind: ProcessKind,
}

impl WorkerProcess {
    /// Create a new process
    pub fn new(label: &'static str, address: Address, kind: ProcessKind) -> Self {
        Self {
            label,
            address,
            kind,
        }
    }
}

/// Processes managed in the given mode, in evaluation order.
///
/// In VRF mode the Queue is not polled, its randomness arrives with the
/// Gameplay envelopes.
pub fn processes_for_mode(deployments: &Deployments, mode: OperatingMode) -> Vec<WorkerProcess> {
    let mut processes = vec![WorkerProcess::new(
        "GameSetup",
        deployments.game_setup,
        ProcessKind::MockVrf,
    )];
    if mode == OperatingMode::MockVrf {
        processes.push(WorkerProcess::new(
            "Queue",
            deployments.game_queue,
            ProcessKind::MockVrf,
        ));
    }
    processes.push(WorkerProcess::new(
        "Controller",
        deployments.hexploration_controller,
        ProcessKind::StandardLoop,
    ));
    processes.push(WorkerProcess::new(
        "Gameplay",
        deployments.gameplay,
        match mode {
            OperatingMode::MockVrf => ProcessKind::StandardLoop,
            OperatingMode::AutoLoopVrf => ProcessKind::VrfLoop,
        },
    ));
    sort_processes(&mut processes);
    processes
}

/// Stable sort by kind, order within a kind is kept
pub fn sort_processes(processes: &mut [WorkerProcess]) {
    processes.sort_by_key(|p| p.kind.order());
}

#[cfg(test)]
mod tests {
    use super::{processes_for_mode, sort_processes, OperatingMode, ProcessKind, WorkerProcess};
    use crate::config::Deployments;

    fn deployments() -> Deployments {
        Deployments {
            game_setup: [1; 20],
            game_queue: [2; 20],
            hexploration_controller: [3; 20],
            gameplay: [4; 20],
        }
    }

    #[test]
    fn mock_mode_manages_four_contracts() {
        let processes = processes_for_mode(&deployments(), OperatingMode::MockVrf);
        let summary: Vec<(&str, ProcessKind)> =
            processes.iter().map(|p| (p.label, p.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("GameSetup", ProcessKind::MockVrf),
                ("Queue", ProcessKind::MockVrf),
                ("Controller", ProcessKind::StandardLoop),
                ("Gameplay", ProcessKind::StandardLoop),
            ]
        );
    }

    #[test]
    fn vrf_mode_skips_queue() {
        let processes = processes_for_mode(&deployments(), OperatingMode::AutoLoopVrf);
        let summary: Vec<(&str, ProcessKind)> =
            processes.iter().map(|p| (p.label, p.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("GameSetup", ProcessKind::MockVrf),
                ("Controller", ProcessKind::StandardLoop),
                ("Gameplay", ProcessKind::VrfLoop),
            ]
        );
        assert_eq!(processes[2].address, [4; 20]);
    }

    #[test]
    fn sort_is_stable_within_kind() {
        let mut processes = vec![
            WorkerProcess::new("b", [2; 20], ProcessKind::VrfLoop),
            WorkerProcess::new("c", [3; 20], ProcessKind::StandardLoop),
            WorkerProcess::new("a", [1; 20], ProcessKind::MockVrf),
            WorkerProcess::new("d", [4; 20], ProcessKind::StandardLoop),
        ];
        sort_processes(&mut processes);
        let labels: Vec<&str> = processes.iter().map(|p| p.label).collect();
        assert_eq!(labels, vec!["a", "c", "d", "b"]);
    }
}
