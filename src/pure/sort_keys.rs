// Sort Key Allocation - Pure Functions
// Initial sort keys for pages appended to a sibling group

use crate::types::SortKey;
use crate::validation::PageTreeError;

/// Key given to the first page of an empty sibling group
pub const FIRST_SORT_KEY: SortKey = 1;

/// Allocate a key that sorts after every existing key in the group
///
/// Returns `max + 1`, or [`FIRST_SORT_KEY`] when the group is empty.
/// The result is never already in use within the group.
pub fn allocate_sort_key<I>(existing: I) -> Result<SortKey, PageTreeError>
where
    I: IntoIterator<Item = SortKey>,
{
    match existing.into_iter().max() {
        None => Ok(FIRST_SORT_KEY),
        Some(max) => max.checked_add(1).ok_or_else(|| {
            PageTreeError::invariant(
                "sort keys must be unique within a sibling group",
                format!("no key left above {max}"),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_group_starts_at_one() {
        assert_eq!(allocate_sort_key(std::iter::empty()), Ok(1));
    }

    #[test]
    fn test_uses_maximum_not_last() {
        assert_eq!(allocate_sort_key([5, 1000, 3]), Ok(1001));
        assert_eq!(allocate_sort_key([-2000, -1000]), Ok(-999));
    }

    #[test]
    fn test_never_reuses_a_key() {
        let keys = [1, 2, 3];
        let next = allocate_sort_key(keys).unwrap();
        assert!(!keys.contains(&next));
    }

    #[test]
    fn test_exhausted_key_space_is_rejected() {
        let err = allocate_sort_key([SortKey::MAX]).unwrap_err();
        assert!(err.is_invariant_violation());
    }
}
