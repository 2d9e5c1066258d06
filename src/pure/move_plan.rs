// Sibling Group Move Algorithm - Pure Functions
// Computes the new parent and sort key for a page moving to a display
// position, plus the minimal set of neighbor keys that must be rewritten.
//
// Common case: the target gap has room and the page takes the midpoint, O(1).
// Otherwise only the contiguous run of followers without room is respaced by
// the big step, O(k). Pages before the insertion point are never touched.

use crate::contracts::Page;
use crate::types::{PageId, ParentId, SortKey};
use crate::validation::PageTreeError;

/// Spacing used when respacing keys, unless configured otherwise
pub const DEFAULT_BIG_STEP: SortKey = 1000;

/// Smallest difference between neighbors that still admits a key between them
const MIN_GAP: i128 = 2;

/// A sort key rewrite for a page other than the one moving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortUpdate {
    pub id: PageId,
    pub sort: SortKey,
}

/// Outcome of planning a move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub page: PageId,
    pub parent: ParentId,
    pub sort: SortKey,
    /// Neighbor rewrites, in display order
    pub updates: Vec<SortUpdate>,
}

impl MovePlan {
    /// True when the page keeps its parent and key and no neighbor changes
    pub fn is_noop(&self, page: &Page) -> bool {
        self.updates.is_empty() && self.parent == page.parent && self.sort == page.sort
    }

    /// True when neighbors had to be respaced
    pub fn rebalanced(&self) -> bool {
        !self.updates.is_empty()
    }
}

/// Everything the planner needs to know about one move
#[derive(Debug, Clone, Copy)]
pub struct MoveRequest<'a> {
    /// The page being moved
    pub page: &'a Page,
    /// Origin sibling group in display order; contains `page`
    pub origin: &'a [&'a Page],
    pub origin_index: usize,
    pub target_parent: ParentId,
    /// Target sibling group in display order; may be the origin group
    pub target: &'a [&'a Page],
    /// Display index in the target group once `page` has been taken out
    pub target_index: usize,
}

/// Plan a move without mutating anything
///
/// # Preconditions
/// - `origin[origin_index]` is the moving page
/// - `big_step >= 2`
///
/// # Postconditions
/// - Applying the plan keeps sort keys unique and ordered within the target group
/// - A move to the page's own position yields zero updates and unchanged key/parent
pub fn plan_move(request: &MoveRequest<'_>, big_step: SortKey) -> Result<MovePlan, PageTreeError> {
    let page = request.page;
    if big_step < 2 {
        return Err(PageTreeError::invalid_input(
            "big_step",
            format!("must be at least 2, got {big_step}"),
        ));
    }
    match request.origin.get(request.origin_index) {
        Some(found) if found.id == page.id => {}
        _ => {
            return Err(PageTreeError::invariant(
                "move origin must hold the moving page",
                format!(
                    "page {} is not at origin index {}",
                    page.id, request.origin_index
                ),
            ))
        }
    }

    // Target group as it looks once the moving page is taken out
    let view: Vec<&Page> = request
        .target
        .iter()
        .copied()
        .filter(|p| p.id != page.id)
        .collect();
    let index = request.target_index.min(view.len());

    let same_group = request.target_parent == page.parent;
    if same_group && request.origin_index == index {
        return Ok(MovePlan {
            page: page.id,
            parent: page.parent,
            sort: page.sort,
            updates: Vec::new(),
        });
    }

    let prev = index.checked_sub(1).and_then(|i| view.get(i));
    let next = view.get(index);

    let mut updates = Vec::new();
    let sort = match (prev, next) {
        (None, None) => big_step,
        (Some(prev), None) => step_up(prev.sort, big_step)?,
        (None, Some(next)) => step_down(next.sort, big_step)?,
        (Some(prev), Some(next)) if gap(prev.sort, next.sort) >= MIN_GAP => {
            midpoint(prev.sort, next.sort)
        }
        (Some(prev), Some(_)) => {
            let sort = step_up(prev.sort, big_step)?;
            let mut last = sort;
            for follower in &view[index..] {
                if gap(last, follower.sort) >= MIN_GAP {
                    break;
                }
                last = step_up(last, big_step)?;
                updates.push(SortUpdate {
                    id: follower.id,
                    sort: last,
                });
            }
            sort
        }
    };

    Ok(MovePlan {
        page: page.id,
        parent: request.target_parent,
        sort,
        updates,
    })
}

fn gap(low: SortKey, high: SortKey) -> i128 {
    i128::from(high) - i128::from(low)
}

/// Floor of the midpoint; strictly between the bounds when their gap is at least 2
fn midpoint(low: SortKey, high: SortKey) -> SortKey {
    let mid = (i128::from(low) + i128::from(high)).div_euclid(2);
    // Bounded by two i64 values, so it fits
    mid as SortKey
}

fn step_up(from: SortKey, big_step: SortKey) -> Result<SortKey, PageTreeError> {
    from.checked_add(big_step).ok_or_else(|| exhausted(from))
}

fn step_down(from: SortKey, big_step: SortKey) -> Result<SortKey, PageTreeError> {
    from.checked_sub(big_step).ok_or_else(|| exhausted(from))
}

fn exhausted(from: SortKey) -> PageTreeError {
    PageTreeError::invariant(
        "sort keys must be unique within a sibling group",
        format!("no room to respace from key {from}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::PageBuilder;
    use anyhow::Result;

    fn group(sorts: &[SortKey], parent: ParentId) -> Result<Vec<Page>> {
        sorts
            .iter()
            .enumerate()
            .map(|(i, sort)| {
                Ok(PageBuilder::new()
                    .name(format!("P{i}"))?
                    .sort(*sort)
                    .parent(parent)
                    .build())
            })
            .collect()
    }

    fn refs(pages: &[Page]) -> Vec<&Page> {
        pages.iter().collect()
    }

    #[test]
    fn test_own_position_is_noop() -> Result<()> {
        let pages = group(&[1, 2, 3], ParentId::Root)?;
        let view = refs(&pages);
        let plan = plan_move(
            &MoveRequest {
                page: &pages[1],
                origin: &view,
                origin_index: 1,
                target_parent: ParentId::Root,
                target: &view,
                target_index: 1,
            },
            DEFAULT_BIG_STEP,
        )?;
        assert!(plan.is_noop(&pages[1]));
        Ok(())
    }

    #[test]
    fn test_last_page_past_end_is_noop() -> Result<()> {
        let pages = group(&[1, 2, 3], ParentId::Root)?;
        let view = refs(&pages);
        let plan = plan_move(
            &MoveRequest {
                page: &pages[2],
                origin: &view,
                origin_index: 2,
                target_parent: ParentId::Root,
                target: &view,
                target_index: 9,
            },
            DEFAULT_BIG_STEP,
        )?;
        assert!(plan.is_noop(&pages[2]));
        assert_eq!(plan.sort, 3);
        Ok(())
    }

    #[test]
    fn test_midpoint_when_gap_has_room() -> Result<()> {
        let pages = group(&[1000, 2000, 3000], ParentId::Root)?;
        let view = refs(&pages);
        // Move the last page between the first two
        let plan = plan_move(
            &MoveRequest {
                page: &pages[2],
                origin: &view,
                origin_index: 2,
                target_parent: ParentId::Root,
                target: &view,
                target_index: 1,
            },
            DEFAULT_BIG_STEP,
        )?;
        assert_eq!(plan.sort, 1500);
        assert!(plan.updates.is_empty());
        Ok(())
    }

    #[test]
    fn test_exhausted_gap_respaces_only_followers() -> Result<()> {
        let target = group(&[1, 2, 3], ParentId::Root)?;
        let other = group(&[1], ParentId::Page(target[0].id))?;
        let origin = refs(&other);
        let view = refs(&target);
        let plan = plan_move(
            &MoveRequest {
                page: &other[0],
                origin: &origin,
                origin_index: 0,
                target_parent: ParentId::Root,
                target: &view,
                target_index: 1,
            },
            DEFAULT_BIG_STEP,
        )?;
        assert_eq!(plan.parent, ParentId::Root);
        assert_eq!(plan.sort, 1001);
        assert_eq!(
            plan.updates,
            vec![
                SortUpdate { id: target[1].id, sort: 2001 },
                SortUpdate { id: target[2].id, sort: 3001 },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_respacing_stops_at_first_roomy_follower() -> Result<()> {
        let target = group(&[1, 2, 3, 9000, 9001], ParentId::Root)?;
        let mover = group(&[50], ParentId::Page(target[0].id))?;
        let origin = refs(&mover);
        let view = refs(&target);
        let plan = plan_move(
            &MoveRequest {
                page: &mover[0],
                origin: &origin,
                origin_index: 0,
                target_parent: ParentId::Root,
                target: &view,
                target_index: 1,
            },
            DEFAULT_BIG_STEP,
        )?;
        assert_eq!(plan.updates.len(), 2);
        assert!(plan.updates.iter().all(|u| u.id != target[3].id));
        Ok(())
    }

    #[test]
    fn test_group_ends_and_empty_group() -> Result<()> {
        let target = group(&[10, 20], ParentId::Root)?;
        let mover = group(&[5], ParentId::Page(target[0].id))?;
        let origin = refs(&mover);
        let view = refs(&target);

        let at_end = plan_move(
            &MoveRequest {
                page: &mover[0],
                origin: &origin,
                origin_index: 0,
                target_parent: ParentId::Root,
                target: &view,
                target_index: 2,
            },
            DEFAULT_BIG_STEP,
        )?;
        assert_eq!(at_end.sort, 1020);
        assert!(at_end.updates.is_empty());

        let at_start = plan_move(
            &MoveRequest {
                page: &mover[0],
                origin: &origin,
                origin_index: 0,
                target_parent: ParentId::Root,
                target: &view,
                target_index: 0,
            },
            DEFAULT_BIG_STEP,
        )?;
        assert_eq!(at_start.sort, -990);

        let empty: Vec<&Page> = Vec::new();
        let into_empty = plan_move(
            &MoveRequest {
                page: &mover[0],
                origin: &origin,
                origin_index: 0,
                target_parent: ParentId::Page(target[1].id),
                target: &empty,
                target_index: 0,
            },
            DEFAULT_BIG_STEP,
        )?;
        assert_eq!(into_empty.sort, DEFAULT_BIG_STEP);
        assert_eq!(into_empty.parent, ParentId::Page(target[1].id));
        Ok(())
    }

    #[test]
    fn test_same_group_excludes_moving_page() -> Result<()> {
        let pages = group(&[1, 2, 3], ParentId::Root)?;
        let view = refs(&pages);
        // First page to the end: neighbors are 2 and 3, never itself
        let plan = plan_move(
            &MoveRequest {
                page: &pages[0],
                origin: &view,
                origin_index: 0,
                target_parent: ParentId::Root,
                target: &view,
                target_index: 2,
            },
            DEFAULT_BIG_STEP,
        )?;
        assert_eq!(plan.sort, 1003);
        assert!(plan.updates.is_empty());
        Ok(())
    }

    #[test]
    fn test_origin_mismatch_is_rejected() -> Result<()> {
        let pages = group(&[1, 2], ParentId::Root)?;
        let view = refs(&pages);
        let err = plan_move(
            &MoveRequest {
                page: &pages[0],
                origin: &view,
                origin_index: 1,
                target_parent: ParentId::Root,
                target: &view,
                target_index: 0,
            },
            DEFAULT_BIG_STEP,
        )
        .unwrap_err();
        assert!(err.is_invariant_violation());
        Ok(())
    }
}
