//! Property-based invariant tests for slot placement.
//!
//! 1. Stability: appending items never moves items placed earlier.
//! 2. No double occupancy without override.
//! 3. Per-page count never exceeds the effective capacity.
//! 4. Template placement only uses fill cells.
//! 5. `next(); previous()` round-trips the page and the assignments.
//! 6. `is_first`/`is_last` agree with the page count.

use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;
use slotpage_layout::{
    CellRef, Direction, FixedScope, GridSize, PaginationState, PlacementConstraint, Template,
};

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Setup {
    grid: GridSize,
    per_page: usize,
    constraint: PlacementConstraint,
}

fn setup_strategy() -> impl Strategy<Value = Setup> {
    (
        2usize..=9,
        1usize..=4,
        any::<bool>(),
        proptest::collection::btree_set(0usize..36, 0..4),
        any::<u8>(),
    )
        .prop_map(|(width, rows, vertical, reserved, per_page_seed)| {
            let grid = GridSize::new(width, rows);
            let capacity = grid.capacity();
            let reserved: Vec<_> = reserved.into_iter().filter(|c| *c < capacity).collect();
            let per_page = 1 + (per_page_seed as usize % capacity);
            let direction = if vertical {
                Direction::Vertical
            } else {
                Direction::Horizontal
            };
            let constraint = PlacementConstraint::builder()
                .direction(direction)
                .reserve(reserved)
                .build()
                .expect("no start/end set");
            Setup {
                grid,
                per_page,
                constraint,
            }
        })
}

fn template_setup_strategy() -> impl Strategy<Value = Setup> {
    (
        2usize..=6,
        1usize..=4,
        proptest::collection::vec(proptest::collection::vec(any::<bool>(), 6), 1..4),
    )
        .prop_filter_map("template needs a fill cell", |(width, rows, pattern)| {
            let template_rows: Vec<String> = pattern
                .iter()
                .map(|row| row[..width].iter().map(|f| if *f { 'X' } else { '.' }).collect())
                .collect();
            let template = Template::new(&template_rows, 'X').ok()?;
            let grid = GridSize::new(width, rows);
            template.validate_for(grid).ok()?;
            let constraint = PlacementConstraint::builder()
                .template(template)
                .build()
                .ok()?;
            Some(Setup {
                grid,
                per_page: grid.capacity(),
                constraint,
            })
        })
}

fn build(setup: &Setup) -> PaginationState<usize> {
    PaginationState::new(setup.grid, setup.per_page, setup.constraint.clone())
        .expect("valid setup")
}

fn snapshot(state: &PaginationState<usize>) -> BTreeMap<u64, CellRef> {
    state
        .assignments()
        .map(|a| (a.item.get(), a.at))
        .collect()
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Stability
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn appends_never_move_placed_items(setup in setup_strategy(), n in 0usize..30, m in 1usize..30) {
        let mut state = build(&setup);
        state.extend(0..n);
        state.place();
        let before = snapshot(&state);
        state.extend(n..n + m);
        state.place();
        let after = snapshot(&state);
        for (id, at) in &before {
            prop_assert_eq!(after.get(id), Some(at), "item {} moved", id);
        }
    }
}

proptest! {
    #[test]
    fn fixed_items_added_later_only_move_evicted_items(
        setup in setup_strategy(),
        n in 1usize..20,
        cell_seed in any::<usize>(),
    ) {
        let mut state = build(&setup);
        state.extend(0..n);
        state.place();
        let before = snapshot(&state);
        let at = CellRef::new(0, cell_seed % setup.grid.capacity());
        state.set_fixed(at, usize::MAX, FixedScope::Page).unwrap();
        state.place();
        let after = snapshot(&state);
        for (id, old) in &before {
            if *old != at {
                prop_assert_eq!(after.get(id), Some(old));
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. No double occupancy
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn resolved_cells_are_unique_and_avoid_fixed(
        setup in setup_strategy(),
        n in 0usize..40,
        fixed in proptest::collection::vec((0u32..3, any::<usize>()), 0..5),
    ) {
        let mut state = build(&setup);
        let capacity = setup.grid.capacity();
        let mut fixed_cells = HashSet::new();
        for (page, seed) in fixed {
            let at = CellRef::new(page, seed % capacity);
            state.set_fixed(at, usize::MAX, FixedScope::Page).unwrap();
            fixed_cells.insert(at);
        }
        state.extend(0..n);
        state.place();
        let mut seen = HashSet::new();
        for assignment in state.assignments() {
            prop_assert!(seen.insert(assignment.at), "double occupancy at {}", assignment.at);
            prop_assert!(!fixed_cells.contains(&assignment.at));
            prop_assert!(!setup.constraint.is_reserved(assignment.cell()));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Capacity respected
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn per_page_count_within_capacity(setup in setup_strategy(), n in 0usize..60) {
        let mut state = build(&setup);
        state.extend(0..n);
        state.place();
        let capacity = state.effective_capacity();
        for page in 0..state.last_page() {
            prop_assert!(state.page_items(page).len() <= capacity);
        }
    }
}

proptest! {
    #[test]
    fn template_per_page_count_within_capacity(setup in template_setup_strategy(), n in 0usize..40) {
        let mut state = build(&setup);
        state.extend(0..n);
        state.place();
        prop_assert_eq!(state.unassigned(), 0);
        let capacity = state.effective_capacity();
        for page in 0..state.last_page() {
            prop_assert!(state.page_items(page).len() <= capacity);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Template fill-only
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn template_uses_only_fill_cells(setup in template_setup_strategy(), n in 0usize..40) {
        let mut state = build(&setup);
        state.extend(0..n);
        state.place();
        let template = setup.constraint.template().expect("template setup");
        for assignment in state.assignments() {
            prop_assert!(template.is_fill(assignment.cell(), setup.grid.width));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Navigation round trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn next_previous_round_trip(setup in setup_strategy(), n in 0usize..60, start_seed in any::<u32>()) {
        let mut state = build(&setup);
        state.extend(0..n);
        state.place();
        let start = start_seed % state.last_page();
        state.goto(start).unwrap();
        if state.is_last() {
            state.previous();
        }
        let page = state.page();
        let before = snapshot(&state);
        state.next();
        state.previous();
        prop_assert_eq!(state.page(), page);
        prop_assert_eq!(snapshot(&state), before);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Boundary
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn first_and_last_agree_with_page_count(setup in setup_strategy(), n in 0usize..60) {
        let mut state = build(&setup);
        state.extend(0..n);
        state.place();
        let last = state.last_page();
        prop_assert!(last >= 1);
        for page in 0..last {
            state.goto(page).unwrap();
            prop_assert_eq!(state.is_first(), page == 0);
            prop_assert_eq!(state.is_last(), page == last - 1);
        }
        prop_assert!(state.goto(last).is_err());
    }
}
