use studybot_common::OperatorId;

use crate::{BindingTable, OperatorDirectory};

/// Pick the operator with the strictly lowest load among those under their cap.
///
/// Ties go to the operator listed first in the directory, so the same
/// snapshot always yields the same answer. `None` when everyone is full.
pub fn route(directory: &OperatorDirectory, bindings: &BindingTable) -> Option<OperatorId> {
    let mut best: Option<(OperatorId, usize)> = None;
    for op in directory.operators() {
        let load = bindings.load(op);
        if load >= directory.capacity(op) {
            continue;
        }
        if best.is_none_or(|(_, best_load)| load < best_load) {
            best = Some((op, load));
        }
    }
    best.map(|(op, _)| op)
}

#[cfg(test)]
mod tests {
    use {chrono::Utc, rstest::rstest, studybot_common::UserId};

    use super::*;

    fn table_with(loads: &[(i64, usize)]) -> BindingTable {
        let mut table = BindingTable::new();
        let mut next_user = 1;
        for &(op, load) in loads {
            for _ in 0..load {
                table
                    .bind(UserId(next_user), OperatorId(op), usize::MAX, Utc::now())
                    .unwrap();
                next_user += 1;
            }
        }
        table
    }

    #[rstest]
    // O1 load 0 cap 2, O2 load 1 cap 2 -> O1
    #[case(&[(1, 2), (2, 2)], &[(1, 0), (2, 1)], Some(1))]
    #[case(&[(1, 2), (2, 2)], &[(1, 1), (2, 0)], Some(2))]
    // tie -> first in directory order
    #[case(&[(2, 3), (1, 3)], &[(1, 1), (2, 1)], Some(2))]
    // the least loaded is full, next best wins
    #[case(&[(1, 0), (2, 3)], &[(2, 2)], Some(2))]
    #[case(&[(1, 1), (2, 1)], &[(1, 1), (2, 1)], None)]
    #[case(&[], &[], None)]
    fn picks_least_loaded_under_cap(
        #[case] caps: &[(i64, usize)],
        #[case] loads: &[(i64, usize)],
        #[case] expected: Option<i64>,
    ) {
        let dir = OperatorDirectory::new(caps.iter().map(|&(op, cap)| (OperatorId(op), cap)));
        let table = table_with(loads);
        assert_eq!(route(&dir, &table), expected.map(OperatorId));
    }

    #[test]
    fn deterministic_for_unchanged_state() {
        let dir = OperatorDirectory::new([(OperatorId(1), 2), (OperatorId(2), 2), (OperatorId(3), 2)]);
        let table = table_with(&[(1, 1), (2, 0), (3, 0)]);
        let first = route(&dir, &table);
        assert_eq!(first, Some(OperatorId(2)));
        assert_eq!(route(&dir, &table), first);
    }
}
