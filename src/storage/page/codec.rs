//! Node page codec.
//!
//! Encodes one [`Node`] into a [`Page`] and back. The layout is fixed and
//! shared with every other reader of the format.
//!
//! # Layout (512 bytes, little-endian)
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     degree   (int32)
//! 4       4     count    (int32, populated keys)
//! 8       248   keys     (int32 × 62)
//! 256     252   children (int32 × 63)
//! 508     1     is_leaf  (1 = leaf, 0 = internal)
//! 509     3     padding  (zero)
//! ```
//!
//! Slots past `count` (and every child slot of a leaf) are written as zero,
//! so the encoding depends only on the node, never on prior page contents.

use crate::common::config::{MAX_CHILDREN, MAX_KEYS};
use crate::common::{PageId, StorageError, StorageResult};
use crate::index::btree::{Key, Node};
use crate::storage::page::Page;

pub const OFFSET_DEGREE: usize = 0;
pub const OFFSET_COUNT: usize = 4;
pub const OFFSET_KEYS: usize = 8;
pub const OFFSET_CHILDREN: usize = OFFSET_KEYS + 4 * MAX_KEYS;
pub const OFFSET_IS_LEAF: usize = OFFSET_CHILDREN + 4 * MAX_CHILDREN;

/// Serialize a node into a fresh zeroed page.
pub fn encode(node: &Node) -> Page {
    let mut page = Page::new();

    page.write_word(OFFSET_DEGREE, (node.degree() as i32).to_le_bytes());
    page.write_word(OFFSET_COUNT, (node.len() as i32).to_le_bytes());

    for (slot, key) in node.keys().iter().enumerate() {
        page.write_word(OFFSET_KEYS + 4 * slot, key.to_le_bytes());
    }
    for (slot, child) in node.children().iter().enumerate() {
        page.write_word(OFFSET_CHILDREN + 4 * slot, child.to_le_bytes());
    }

    page.as_mut_slice()[OFFSET_IS_LEAF] = node.is_leaf() as u8;
    page
}

/// Deserialize a node.
///
/// # Errors
/// Returns `StorageError::CorruptPage` if the degree, count or leaf flag
/// cannot belong to a node this format describes. A page that was
/// allocated but never written (all zeros) fails on its degree.
pub fn decode(page: &Page) -> StorageResult<Node> {
    let degree = page.read_i32(OFFSET_DEGREE);
    let count = page.read_i32(OFFSET_COUNT);

    let degree = u32::try_from(degree)
        .map_err(|_| StorageError::corrupt_page(format!("negative degree {degree}")))?;
    let count = usize::try_from(count)
        .ok()
        .filter(|&n| n <= MAX_KEYS)
        .ok_or_else(|| StorageError::corrupt_page(format!("key count {count} out of range")))?;

    let is_leaf = match page.as_slice()[OFFSET_IS_LEAF] {
        0 => false,
        1 => true,
        other => {
            return Err(StorageError::corrupt_page(format!("leaf flag {other:#04x}")));
        }
    };

    let keys: Vec<Key> = (0..count)
        .map(|slot| page.read_i32(OFFSET_KEYS + 4 * slot))
        .collect();
    let children: Vec<PageId> = if is_leaf {
        Vec::new()
    } else {
        (0..=count)
            .map(|slot| PageId::from_le_bytes(page.read_word(OFFSET_CHILDREN + 4 * slot)))
            .collect()
    };

    Node::from_parts(degree, keys, children, is_leaf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::{MAX_DEGREE, MIN_DEGREE, NODE_LAYOUT_SIZE, PAGE_SIZE};
    use proptest::prelude::*;

    /// Leaf when `children` is empty.
    fn node(degree: u32, keys: &[Key], children: &[u32]) -> Node {
        let is_leaf = children.is_empty();
        let children = children.iter().map(|&c| PageId::new(c)).collect();
        Node::from_parts(degree, keys.to_vec(), children, is_leaf).unwrap()
    }

    #[test]
    fn test_offsets() {
        assert_eq!(OFFSET_CHILDREN, 256);
        assert_eq!(OFFSET_IS_LEAF, 508);
        assert_eq!(OFFSET_IS_LEAF + 1, NODE_LAYOUT_SIZE);
    }

    #[test]
    fn test_roundtrip_empty_leaf() {
        let original = Node::new(3, true).unwrap();
        assert_eq!(decode(&encode(&original)).unwrap(), original);
    }

    #[test]
    fn test_roundtrip_internal() {
        let original = node(3, &[-5, 10, 20], &[4, 1, 7, 2]);
        let decoded = decode(&encode(&original)).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.child(2), PageId::new(7));
    }

    #[test]
    fn test_roundtrip_widest_node() {
        let keys: Vec<Key> = (0..61).collect();
        let children: Vec<u32> = (100..162).collect();
        let original = node(31, &keys, &children);
        assert_eq!(decode(&encode(&original)).unwrap(), original);
    }

    /// Any node a tree can hold: sorted distinct keys within `2t - 1`, and
    /// `len + 1` non-negative child ids when internal.
    fn any_node() -> impl Strategy<Value = Node> {
        (MIN_DEGREE..=MAX_DEGREE, any::<bool>())
            .prop_flat_map(|(degree, is_leaf)| {
                let max_keys = 2 * degree as usize - 1;
                (
                    Just(degree),
                    Just(is_leaf),
                    prop::collection::btree_set(any::<Key>(), 0..=max_keys),
                )
            })
            .prop_flat_map(|(degree, is_leaf, keys)| {
                let children = if is_leaf { 0 } else { keys.len() + 1 };
                (
                    Just(degree),
                    Just(is_leaf),
                    Just(keys),
                    prop::collection::vec(0..i32::MAX as u32, children),
                )
            })
            .prop_map(|(degree, is_leaf, keys, children)| {
                let children = children.into_iter().map(PageId::new).collect();
                Node::from_parts(degree, keys.into_iter().collect(), children, is_leaf).unwrap()
            })
    }

    proptest! {
        #[test]
        fn prop_roundtrip_any_node(original in any_node()) {
            let page = encode(&original);
            prop_assert_eq!(decode(&page).unwrap(), original);
            prop_assert!(page.as_slice()[NODE_LAYOUT_SIZE..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_byte_layout() {
        let page = encode(&node(3, &[0x0403_0201], &[0x0C0B_0A09, 7]));
        let bytes = page.as_slice();

        assert_eq!(&bytes[0..4], &[3, 0, 0, 0]); // degree
        assert_eq!(&bytes[4..8], &[1, 0, 0, 0]); // count
        assert_eq!(&bytes[8..12], &[0x01, 0x02, 0x03, 0x04]); // keys[0], LSB first
        assert_eq!(&bytes[256..260], &[0x09, 0x0A, 0x0B, 0x0C]); // children[0]
        assert_eq!(&bytes[260..264], &[7, 0, 0, 0]); // children[1]
        assert_eq!(bytes[508], 0); // internal
        assert_eq!(bytes.len(), PAGE_SIZE);
    }

    #[test]
    fn test_unused_slots_are_zero() {
        let page = encode(&node(3, &[1, 2], &[]));
        let bytes = page.as_slice();

        assert!(bytes[16..OFFSET_IS_LEAF].iter().all(|&b| b == 0));
        assert_eq!(bytes[OFFSET_IS_LEAF], 1);
        assert!(bytes[OFFSET_IS_LEAF + 1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_decode_zeroed_page_is_corrupt() {
        let err = decode(&Page::new()).unwrap_err();
        assert!(matches!(err, StorageError::CorruptPage { .. }));
    }

    #[test]
    fn test_decode_rejects_bad_fields() {
        let mut page = encode(&node(3, &[1], &[]));
        page.write_word(OFFSET_COUNT, 63i32.to_le_bytes());
        assert!(decode(&page).is_err());

        let mut page = encode(&node(3, &[1], &[]));
        page.write_word(OFFSET_COUNT, (-1i32).to_le_bytes());
        assert!(decode(&page).is_err());

        let mut page = encode(&node(3, &[1], &[]));
        page.as_mut_slice()[OFFSET_IS_LEAF] = 2;
        assert!(decode(&page).is_err());

        // six keys cannot fit a degree-3 node
        let mut page = encode(&node(3, &[1], &[]));
        page.write_word(OFFSET_COUNT, 6i32.to_le_bytes());
        assert!(decode(&page).is_err());
    }
}
