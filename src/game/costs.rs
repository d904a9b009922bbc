//! Build and upgrade pricing plus the cross-machine gating rules.
//!
//! Everything here is a pure function of the user's existing machines.

use crate::error::GameError;
use crate::game::ledger::Cost;
use crate::game::machines::{count_of_type, machine_def, of_type, rank_of, Machine, MachineType};

/// Level catLair and reactor must reach before they unlock later content.
const GATE_LEVEL: u32 = 3;

/// Price of building another `kind` when `existing` are already placed, or
/// `None` once the instance cap is reached.
pub fn build_cost(kind: MachineType, existing: usize) -> Option<Cost> {
    let def = machine_def(kind);
    if existing >= def.max_instances() {
        return None;
    }
    def.build_costs.get(existing).copied()
}

/// Table price of taking a machine from `current_level` to the next one.
///
/// `None` when the type has no further level. Gating is not applied here;
/// see [`upgrade_cost`].
pub fn upgrade_price(kind: MachineType, current_level: u32, is_second_instance: bool) -> Option<Cost> {
    let def = machine_def(kind);
    let next_level = current_level + 1;
    if next_level > def.max_level {
        return None;
    }
    let mut factor = 2f64.powi(next_level as i32 - 1);
    if is_second_instance {
        factor *= def.second_instance_multiplier;
    }
    Some(def.base_unit_cost().scaled(factor))
}

/// Upgrade price for `machine`, including amplifier gating.
pub fn upgrade_cost(machines: &[Machine], machine: &Machine) -> Result<Cost, GameError> {
    let is_second = rank_of(machines, machine) == Some(1);
    let cost = upgrade_price(machine.kind, machine.level, is_second).ok_or(GameError::MaxLevel)?;
    if machine.kind == MachineType::Amplifier && !amplifier_gate_met(machines, machine.level + 1) {
        return Err(GameError::GatingNotMet);
    }
    Ok(cost)
}

/// Whether an amplifier may move up to `next_level`.
///
/// Level 4 needs the first catLair and first reactor at level 3; level 5
/// needs both instances of each at level 3. Other levels are open.
pub fn amplifier_gate_met(machines: &[Machine], next_level: u32) -> bool {
    match next_level {
        4 => {
            first_n_at_gate(machines, MachineType::CatLair, 1)
                && first_n_at_gate(machines, MachineType::Reactor, 1)
        }
        5 => {
            first_n_at_gate(machines, MachineType::CatLair, 2)
                && first_n_at_gate(machines, MachineType::Reactor, 2)
        }
        _ => true,
    }
}

fn first_n_at_gate(machines: &[Machine], kind: MachineType, n: usize) -> bool {
    let levels: Vec<u32> = of_type(machines, kind).take(n).map(|m| m.level).collect();
    levels.len() == n && levels.iter().all(|&level| level >= GATE_LEVEL)
}

/// Whether the incubator may be built: at least one catLair and one reactor,
/// every one of them at level 3, and an amplifier at level 5.
pub fn incubator_unlocked(machines: &[Machine]) -> bool {
    let all_maxed = |kind: MachineType| {
        count_of_type(machines, kind) > 0 && of_type(machines, kind).all(|m| m.level == GATE_LEVEL)
    };
    let amplifier_maxed = of_type(machines, MachineType::Amplifier)
        .any(|m| m.level == machine_def(MachineType::Amplifier).max_level);

    all_maxed(MachineType::CatLair) && all_maxed(MachineType::Reactor) && amplifier_maxed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(id: u64, kind: MachineType, level: u32) -> Machine {
        let mut m = Machine::new(id, kind, 0, 0);
        m.level = level;
        m
    }

    #[test]
    fn build_cost_table() {
        assert_eq!(build_cost(MachineType::CatLair, 0), Some(Cost::new(10.0, 0.0, 0.0)));
        assert_eq!(build_cost(MachineType::CatLair, 1), Some(Cost::new(40.0, 0.0, 0.0)));
        assert_eq!(build_cost(MachineType::CatLair, 2), None);
        assert_eq!(build_cost(MachineType::Reactor, 0), Some(Cost::new(10.0, 10.0, 0.0)));
        assert_eq!(build_cost(MachineType::Reactor, 1), Some(Cost::new(40.0, 40.0, 0.0)));
        assert_eq!(build_cost(MachineType::Reactor, 2), None);
        assert_eq!(build_cost(MachineType::Amplifier, 0), Some(Cost::new(10.0, 10.0, 10.0)));
        assert_eq!(build_cost(MachineType::Amplifier, 1), None);
        assert_eq!(
            build_cost(MachineType::Incubator, 0),
            Some(Cost::new(320.0, 320.0, 320.0))
        );
        assert_eq!(build_cost(MachineType::Incubator, 1), None);
    }

    #[test]
    fn second_cat_lair_upgrade_is_quadrupled() {
        let machines = vec![
            machine(1, MachineType::CatLair, 2),
            machine(2, MachineType::CatLair, 2),
        ];
        assert_eq!(
            upgrade_cost(&machines, &machines[0]),
            Ok(Cost::new(40.0, 0.0, 0.0))
        );
        assert_eq!(
            upgrade_cost(&machines, &machines[1]),
            Ok(Cost::new(160.0, 0.0, 0.0))
        );
    }

    #[test]
    fn second_reactor_upgrade_is_quadrupled() {
        let machines = vec![
            machine(1, MachineType::Reactor, 1),
            machine(3, MachineType::Reactor, 1),
        ];
        assert_eq!(
            upgrade_cost(&machines, &machines[1]),
            Ok(Cost::new(80.0, 80.0, 0.0))
        );
    }

    #[test]
    fn level_caps() {
        assert_eq!(upgrade_price(MachineType::CatLair, 3, false), None);
        assert_eq!(upgrade_price(MachineType::Reactor, 3, true), None);
        assert_eq!(upgrade_price(MachineType::Amplifier, 5, false), None);
        assert_eq!(upgrade_price(MachineType::Incubator, 1, false), None);

        let machines = vec![machine(1, MachineType::Incubator, 1)];
        assert_eq!(upgrade_cost(&machines, &machines[0]), Err(GameError::MaxLevel));
    }

    #[test]
    fn amplifier_level_four_is_gated_on_first_lair_and_reactor() {
        let mut machines = vec![
            machine(1, MachineType::CatLair, 3),
            machine(2, MachineType::Reactor, 2),
            machine(3, MachineType::Amplifier, 3),
        ];
        assert_eq!(upgrade_cost(&machines, &machines[2]), Err(GameError::GatingNotMet));

        machines[1].level = 3;
        assert_eq!(
            upgrade_cost(&machines, &machines[2]),
            Ok(Cost::new(80.0, 80.0, 80.0))
        );
    }

    #[test]
    fn amplifier_level_five_needs_both_instances() {
        let mut machines = vec![
            machine(1, MachineType::CatLair, 3),
            machine(2, MachineType::Reactor, 3),
            machine(3, MachineType::Amplifier, 4),
        ];
        assert!(!amplifier_gate_met(&machines, 5));

        machines.push(machine(4, MachineType::CatLair, 3));
        machines.push(machine(5, MachineType::Reactor, 2));
        assert!(!amplifier_gate_met(&machines, 5));

        machines[4].level = 3;
        assert!(amplifier_gate_met(&machines, 5));
        assert_eq!(
            upgrade_cost(&machines, &machines[2]),
            Ok(Cost::new(160.0, 160.0, 160.0))
        );
    }

    #[test]
    fn early_amplifier_levels_are_ungated() {
        assert!(amplifier_gate_met(&[], 2));
        assert!(amplifier_gate_met(&[], 3));
    }

    #[test]
    fn incubator_requires_everything_maxed() {
        let mut machines = vec![
            machine(1, MachineType::CatLair, 3),
            machine(2, MachineType::Reactor, 3),
            machine(3, MachineType::Amplifier, 5),
        ];
        assert!(incubator_unlocked(&machines));

        machines.push(machine(4, MachineType::CatLair, 2));
        assert!(!incubator_unlocked(&machines));

        machines[3].level = 3;
        machines[2].level = 4;
        assert!(!incubator_unlocked(&machines));
    }

    #[test]
    fn incubator_locked_without_reactor() {
        let machines = vec![
            machine(1, MachineType::CatLair, 3),
            machine(3, MachineType::Amplifier, 5),
        ];
        assert!(!incubator_unlocked(&machines));
    }
}
