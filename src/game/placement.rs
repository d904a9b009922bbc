use crate::error::GameError;
use crate::game::machines::Machine;

/// Side length of the square footprint every machine occupies.
pub const MACHINE_SIZE: i64 = 128;
pub const MAP_WIDTH: i64 = 800;
pub const MAP_HEIGHT: i64 = 600;

/// Checks that a footprint anchored at `(x, y)` lies fully inside the map.
pub fn check_bounds(x: i64, y: i64) -> Result<(), GameError> {
    let max_x = MAP_WIDTH - MACHINE_SIZE;
    let max_y = MAP_HEIGHT - MACHINE_SIZE;
    if !(0..=max_x).contains(&x) || !(0..=max_y).contains(&y) {
        return Err(GameError::OutOfBounds);
    }
    Ok(())
}

fn footprints_overlap(m: &Machine, x: i64, y: i64) -> bool {
    (m.x - x).abs() < MACHINE_SIZE && (m.y - y).abs() < MACHINE_SIZE
}

/// Checks a footprint at `(x, y)` against every machine except `ignore`
/// (the machine being moved, if any).
pub fn check_overlap(machines: &[Machine], x: i64, y: i64, ignore: Option<u64>) -> Result<(), GameError> {
    let blocked = machines
        .iter()
        .filter(|m| Some(m.id) != ignore)
        .any(|m| footprints_overlap(m, x, y));
    if blocked {
        return Err(GameError::Overlap);
    }
    Ok(())
}

/// Full placement validation: bounds first, then overlap.
pub fn validate_placement(
    machines: &[Machine],
    x: i64,
    y: i64,
    ignore: Option<u64>,
) -> Result<(), GameError> {
    check_bounds(x, y)?;
    check_overlap(machines, x, y, ignore)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::machines::MachineType;

    #[test]
    fn bounds_are_inclusive_of_last_fitting_cell() {
        assert!(check_bounds(0, 0).is_ok());
        assert!(check_bounds(672, 472).is_ok());
        assert_eq!(check_bounds(673, 0), Err(GameError::OutOfBounds));
        assert_eq!(check_bounds(0, 473), Err(GameError::OutOfBounds));
        assert_eq!(check_bounds(-1, 10), Err(GameError::OutOfBounds));
    }

    #[test]
    fn overlap_requires_both_axes_close() {
        let machines = vec![Machine::new(1, MachineType::CatLair, 100, 100)];
        assert_eq!(check_overlap(&machines, 227, 227, None), Err(GameError::Overlap));
        assert!(check_overlap(&machines, 228, 100, None).is_ok());
        assert!(check_overlap(&machines, 100, 228, None).is_ok());
        assert!(check_overlap(&machines, 227, 300, None).is_ok());
    }

    #[test]
    fn moved_machine_ignores_itself() {
        let machines = vec![Machine::new(1, MachineType::CatLair, 100, 100)];
        assert!(check_overlap(&machines, 110, 110, Some(1)).is_ok());
    }

    #[test]
    fn bounds_checked_before_overlap() {
        let machines = vec![Machine::new(1, MachineType::CatLair, 672, 0)];
        assert_eq!(
            validate_placement(&machines, 700, 0, None),
            Err(GameError::OutOfBounds)
        );
    }
}
