//! Integration test: independent machines on separate threads.

use std::thread;

use evo_twin::orchestrator::{Collaborators, MachineSimulator, SimulationHub};
use evo_twin_common::prelude::*;

fn program(machine_id: &str) -> Vec<MoveCommand> {
    match machine_id {
        "mill" => vec![
            MoveCommand::joints([("X", 120.0), ("Y", -40.0)]).with_feed(4000.0),
            MoveCommand::joints([("Z", -80.0)]),
            MoveCommand::joints([("X", -600.0)]),
        ],
        "trunnion" => vec![
            MoveCommand::pose(Pose::target([10.0, 20.0, -30.0], [0.0, 0.5, -0.8])),
            MoveCommand::joints([("A", 150.0)]),
        ],
        _ => vec![MoveCommand::joints([("X", 150.0), ("C", 90.0)]).with_feed(2000.0)],
    }
}

fn hub() -> SimulationHub {
    let mut hub = SimulationHub::with_templates(TwinConfig::default()).unwrap();
    for (id, model) in [("mill", "cartesian"), ("trunnion", "trunnion_ac"), ("lathe", "lathe")] {
        hub.add_machine(id, model, Collaborators::default()).unwrap();
    }
    hub
}

fn run(sim: &mut MachineSimulator) -> Vec<StepResult> {
    let id = sim.machine_id().to_string();
    program(&id).iter().map(|cmd| sim.execute_move(cmd)).collect()
}

#[test]
fn parallel_machines_match_sequential_runs() {
    let mut sequential = hub();
    let mut expected = Vec::new();
    for id in ["lathe", "mill", "trunnion"] {
        let sim = sequential.machine_mut(id).unwrap();
        expected.push((id.to_string(), run(sim), sim.state().clone()));
    }

    let machines = hub().into_machines();
    let handles: Vec<_> = machines
        .into_iter()
        .map(|(id, mut sim)| {
            thread::spawn(move || {
                let results = run(&mut sim);
                (id, results, sim.state().clone())
            })
        })
        .collect();

    let mut actual: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    actual.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(actual, expected);
}

#[test]
fn machines_do_not_share_state() {
    let mut hub = hub();
    hub.execute_move("mill", &MoveCommand::joints([("X", 250.0)]))
        .unwrap();

    assert_eq!(hub.machine("mill").unwrap().state().joints[0], 250.0);
    assert_eq!(hub.machine("trunnion").unwrap().state().joints[0], 0.0);
    assert_eq!(hub.machine("trunnion").unwrap().state().move_count, 0);
    assert_eq!(
        hub.get_profile("mill", "X").unwrap().observation_count,
        0,
        "one observation is not yet trusted"
    );
}
