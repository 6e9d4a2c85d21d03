//! Edits on an ordered image collection.
//!
//! Insertion order is the only addressing scheme: users see 1-based
//! positions and removal renumbers everything after the removed entry.

use crate::{Error, Result};

/// Discard the collection and keep only `image`.
pub fn replace_all(images: &mut Vec<String>, image: String) {
    images.clear();
    images.push(image);
}

pub fn append(images: &mut Vec<String>, image: String) {
    images.push(image);
}

/// Remove the entry at 1-based `index`, returning it.
///
/// Out-of-range indices leave the collection untouched.
pub fn remove_at(images: &mut Vec<String>, index: i64) -> Result<String> {
    let len = images.len();
    let position = usize::try_from(index)
        .ok()
        .filter(|&i| (1..=len).contains(&i))
        .ok_or(Error::IndexOutOfRange { index, len })?;
    Ok(images.remove(position - 1))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn refs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn replace_all_yields_single_element() {
        let mut images = refs(&["a", "b", "c"]);
        replace_all(&mut images, "z".into());
        assert_eq!(images, refs(&["z"]));

        let mut empty = Vec::new();
        replace_all(&mut empty, "z".into());
        assert_eq!(empty, refs(&["z"]));
    }

    #[test]
    fn append_then_remove_first() {
        let mut images = refs(&["A"]);
        append(&mut images, "B".into());
        assert_eq!(images, refs(&["A", "B"]));

        let removed = remove_at(&mut images, 1).unwrap();
        assert_eq!(removed, "A");
        assert_eq!(images, refs(&["B"]));
    }

    #[test]
    fn remove_renumbers_following_entries() {
        let mut images = refs(&["a", "b", "c"]);
        remove_at(&mut images, 2).unwrap();
        assert_eq!(images, refs(&["a", "c"]));
        assert_eq!(remove_at(&mut images, 2).unwrap(), "c");
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(3)]
    #[case(i64::MAX)]
    fn out_of_range_leaves_collection(#[case] index: i64) {
        let mut images = refs(&["A", "B"]);
        let err = remove_at(&mut images, index).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { len: 2, .. }));
        assert_eq!(images, refs(&["A", "B"]));
    }

    #[test]
    fn remove_from_empty() {
        let mut images = Vec::new();
        assert!(matches!(
            remove_at(&mut images, 1),
            Err(Error::IndexOutOfRange { index: 1, len: 0 })
        ));
    }
}
