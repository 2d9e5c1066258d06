// Pure Functions Module
// Ordering algorithms implemented as side-effect-free functions.
// They read sibling groups and return keys or plans; the reducer applies them.

pub mod move_plan;
pub mod sort_keys;

pub use move_plan::{plan_move, MovePlan, MoveRequest, SortUpdate, DEFAULT_BIG_STEP};
pub use sort_keys::{allocate_sort_key, FIRST_SORT_KEY};
