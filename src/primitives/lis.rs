//! Longest increasing subsequence over a position mapping.
//!
//! Input is one entry per new position: the node's old position, or `None`
//! for a node that has no usable old position. The result marks the nodes
//! that are already in the right relative order and can stay where they are.

/// Positions (indices into `positions`) of one longest strictly increasing
/// subsequence of the `Some` entries, in ascending order.
///
/// O(n log n) patience sorting.
///
/// ```
/// use spark_dom::lis;
///
/// // old order a b c d e, new order e b c a d
/// let positions = [Some(4), Some(1), Some(2), Some(0), Some(3)];
/// assert_eq!(lis(&positions), vec![1, 2, 4]); // b c d stay
/// ```
pub fn lis(positions: &[Option<usize>]) -> Vec<usize> {
    // tails[k]: index of the smallest tail of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut predecessor: Vec<Option<usize>> = vec![None; positions.len()];

    for (index, position) in positions.iter().enumerate() {
        let Some(value) = *position else { continue };

        let slot = tails.partition_point(|&tail| positions[tail].is_some_and(|t| t < value));
        if slot > 0 {
            predecessor[index] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(index);
        } else {
            tails[slot] = index;
        }
    }

    let mut run = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(index) = cursor {
        run.push(index);
        cursor = predecessor[index];
    }
    run.reverse();
    run
}
