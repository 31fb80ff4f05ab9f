//! Dataspaces and the selections that region references carry.
//!
//! A [`Dataspace`] is a simple N-dimensional extent (rank 0 is a scalar)
//! paired with the currently active [`Selection`]. Selections are always
//! validated against the extent when they are installed, so a `Dataspace`
//! held by a caller never selects out-of-bounds elements.

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A rectangular block of elements: `count[i]` elements along axis `i`,
/// starting at `start[i]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hyperslab {
    pub start: Vec<u64>,
    pub count: Vec<u64>,
}

impl Hyperslab {
    pub fn new(start: Vec<u64>, count: Vec<u64>) -> Self {
        Self { start, count }
    }

    /// Number of elements in the block, saturating at `u64::MAX`.
    pub fn len(&self) -> u64 {
        saturating_product(&self.count)
    }

    /// Returns `true` if the block has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn overlaps(&self, other: &Hyperslab) -> bool {
        self.start
            .iter()
            .zip(&self.count)
            .zip(other.start.iter().zip(&other.count))
            .all(|((&s1, &c1), (&s2, &c2))| s1 < s2.saturating_add(c2) && s2 < s1.saturating_add(c1))
    }
}

/// The elements of a dataspace that are currently selected.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selection {
    /// Every element.
    All,
    /// No element.
    None,
    /// An explicit list of element coordinates, in selection order.
    Points(Vec<Vec<u64>>),
    /// A union of non-overlapping blocks.
    Hyperslabs(Vec<Hyperslab>),
}

/// An N-dimensional extent with an active selection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dataspace {
    dims: Vec<u64>,
    selection: Selection,
}

impl Dataspace {
    /// A rank-0 dataspace holding a single element.
    pub fn scalar() -> Self {
        Self {
            dims: Vec::new(),
            selection: Selection::All,
        }
    }

    /// A simple dataspace with the given extent and everything selected.
    pub fn simple(dims: Vec<u64>) -> Self {
        Self {
            dims,
            selection: Selection::All,
        }
    }

    /// Build a dataspace from an extent and a selection, validating the
    /// selection against the extent.
    pub fn with_selection(dims: Vec<u64>, selection: Selection) -> Result<Self, TypeError> {
        let space = Self { dims, selection };
        space.validate()?;
        Ok(space)
    }

    pub fn dims(&self) -> &[u64] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements in the extent, saturating at `u64::MAX`.
    pub fn num_elements(&self) -> u64 {
        saturating_product(&self.dims)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn select_all(&mut self) {
        self.selection = Selection::All;
    }

    pub fn select_none(&mut self) {
        self.selection = Selection::None;
    }

    /// Replace the selection with an explicit point list.
    pub fn select_points(&mut self, points: Vec<Vec<u64>>) -> Result<(), TypeError> {
        for point in &points {
            self.check_coord(point)?;
        }
        self.selection = Selection::Points(points);
        Ok(())
    }

    /// Replace the selection with a single block.
    pub fn select_hyperslab(&mut self, start: Vec<u64>, count: Vec<u64>) -> Result<(), TypeError> {
        let block = Hyperslab::new(start, count);
        self.check_block(&block)?;
        self.selection = Selection::Hyperslabs(vec![block]);
        Ok(())
    }

    /// Add a block to the current hyperslab selection.
    ///
    /// If the current selection is not a hyperslab union it is replaced.
    /// The new block must not overlap any block already selected.
    pub fn add_hyperslab(&mut self, start: Vec<u64>, count: Vec<u64>) -> Result<(), TypeError> {
        let block = Hyperslab::new(start, count);
        self.check_block(&block)?;
        match &mut self.selection {
            Selection::Hyperslabs(blocks) => {
                if blocks.iter().any(|b| b.overlaps(&block)) {
                    return Err(TypeError::OverlappingBlocks);
                }
                blocks.push(block);
            }
            other => *other = Selection::Hyperslabs(vec![block]),
        }
        Ok(())
    }

    /// Number of elements the selection covers, saturating at `u64::MAX`.
    pub fn selected_count(&self) -> u64 {
        match &self.selection {
            Selection::All => self.num_elements(),
            Selection::None => 0,
            Selection::Points(points) => points.len() as u64,
            Selection::Hyperslabs(blocks) => blocks
                .iter()
                .fold(0, |total, block| total.saturating_add(block.len())),
        }
    }

    /// Check that the selection lies inside the extent.
    pub fn validate(&self) -> Result<(), TypeError> {
        match &self.selection {
            Selection::All | Selection::None => Ok(()),
            Selection::Points(points) => points.iter().try_for_each(|p| self.check_coord(p)),
            Selection::Hyperslabs(blocks) => {
                for (i, block) in blocks.iter().enumerate() {
                    self.check_block(block)?;
                    if blocks[..i].iter().any(|b| b.overlaps(block)) {
                        return Err(TypeError::OverlappingBlocks);
                    }
                }
                Ok(())
            }
        }
    }

    /// Return a copy of this dataspace carrying the selection of `other`.
    ///
    /// Both dataspaces must describe the same extent.
    pub fn apply_selection(&self, other: &Dataspace) -> Result<Dataspace, TypeError> {
        if self.dims != other.dims {
            return Err(TypeError::ExtentMismatch {
                expected: self.dims.clone(),
                actual: other.dims.clone(),
            });
        }
        let space = Dataspace {
            dims: self.dims.clone(),
            selection: other.selection.clone(),
        };
        space.validate()?;
        Ok(space)
    }

    fn check_rank(&self, rank: usize) -> Result<(), TypeError> {
        if rank != self.dims.len() {
            return Err(TypeError::RankMismatch {
                expected: self.dims.len(),
                actual: rank,
            });
        }
        Ok(())
    }

    fn check_coord(&self, coord: &[u64]) -> Result<(), TypeError> {
        self.check_rank(coord.len())?;
        if coord.iter().zip(&self.dims).any(|(c, d)| c >= d) {
            return Err(TypeError::OutOfBounds {
                coord: coord.to_vec(),
                dims: self.dims.clone(),
            });
        }
        Ok(())
    }

    fn check_block(&self, block: &Hyperslab) -> Result<(), TypeError> {
        self.check_rank(block.start.len())?;
        self.check_rank(block.count.len())?;
        for (axis, ((&start, &count), &dim)) in
            block.start.iter().zip(&block.count).zip(&self.dims).enumerate()
        {
            if count == 0 {
                return Err(TypeError::EmptyBlock { axis });
            }
            match start.checked_add(count) {
                Some(end) if end <= dim => {}
                _ => {
                    return Err(TypeError::OutOfBounds {
                        coord: block.start.clone(),
                        dims: self.dims.clone(),
                    })
                }
            }
        }
        Ok(())
    }
}

fn saturating_product(values: &[u64]) -> u64 {
    values.iter().fold(1, |acc, &v| acc.saturating_mul(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_selects_everything() {
        let space = Dataspace::simple(vec![4, 5]);
        assert_eq!(space.rank(), 2);
        assert_eq!(space.num_elements(), 20);
        assert_eq!(space.selected_count(), 20);
    }

    #[test]
    fn scalar_has_one_element() {
        let space = Dataspace::scalar();
        assert_eq!(space.rank(), 0);
        assert_eq!(space.selected_count(), 1);
    }

    #[test]
    fn select_none_counts_zero() {
        let mut space = Dataspace::simple(vec![10]);
        space.select_none();
        assert_eq!(space.selected_count(), 0);
    }

    #[test]
    fn points_in_bounds() {
        let mut space = Dataspace::simple(vec![3, 3]);
        space.select_points(vec![vec![0, 0], vec![2, 1]]).unwrap();
        assert_eq!(space.selected_count(), 2);
    }

    #[test]
    fn point_out_of_bounds_rejected() {
        let mut space = Dataspace::simple(vec![3, 3]);
        let err = space.select_points(vec![vec![3, 0]]).unwrap_err();
        assert!(matches!(err, TypeError::OutOfBounds { .. }));
        assert_eq!(space.selection(), &Selection::All);
    }

    #[test]
    fn point_rank_mismatch_rejected() {
        let mut space = Dataspace::simple(vec![3, 3]);
        let err = space.select_points(vec![vec![1]]).unwrap_err();
        assert_eq!(err, TypeError::RankMismatch { expected: 2, actual: 1 });
    }

    #[test]
    fn hyperslab_counts_elements() {
        let mut space = Dataspace::simple(vec![10, 10]);
        space.select_hyperslab(vec![2, 2], vec![3, 4]).unwrap();
        assert_eq!(space.selected_count(), 12);
        space.add_hyperslab(vec![6, 0], vec![2, 2]).unwrap();
        assert_eq!(space.selected_count(), 16);
    }

    #[test]
    fn hyperslab_past_extent_rejected() {
        let mut space = Dataspace::simple(vec![10]);
        assert!(space.select_hyperslab(vec![8], vec![3]).is_err());
        assert!(space.select_hyperslab(vec![u64::MAX], vec![2]).is_err());
    }

    #[test]
    fn zero_count_block_rejected() {
        let mut space = Dataspace::simple(vec![10]);
        let err = space.select_hyperslab(vec![1], vec![0]).unwrap_err();
        assert_eq!(err, TypeError::EmptyBlock { axis: 0 });
    }

    #[test]
    fn overlapping_blocks_rejected() {
        let mut space = Dataspace::simple(vec![10, 10]);
        space.select_hyperslab(vec![0, 0], vec![5, 5]).unwrap();
        let err = space.add_hyperslab(vec![4, 4], vec![2, 2]).unwrap_err();
        assert_eq!(err, TypeError::OverlappingBlocks);
        // Touching edges do not overlap.
        space.add_hyperslab(vec![5, 0], vec![1, 5]).unwrap();
    }

    #[test]
    fn with_selection_validates() {
        let err = Dataspace::with_selection(vec![2], Selection::Points(vec![vec![2]])).unwrap_err();
        assert!(matches!(err, TypeError::OutOfBounds { .. }));
    }

    #[test]
    fn apply_selection_copies_onto_extent() {
        let base = Dataspace::simple(vec![8]);
        let mut sel = Dataspace::simple(vec![8]);
        sel.select_points(vec![vec![1], vec![5]]).unwrap();

        let applied = base.apply_selection(&sel).unwrap();
        assert_eq!(applied.dims(), &[8]);
        assert_eq!(applied.selected_count(), 2);
        // The base is untouched.
        assert_eq!(base.selection(), &Selection::All);
    }

    #[test]
    fn apply_selection_extent_mismatch() {
        let base = Dataspace::simple(vec![8]);
        let other = Dataspace::simple(vec![9]);
        let err = base.apply_selection(&other).unwrap_err();
        assert!(matches!(err, TypeError::ExtentMismatch { .. }));
    }

    #[test]
    fn huge_extents_saturate_instead_of_overflowing() {
        let mut space = Dataspace::simple(vec![1 << 33, 1 << 33]);
        assert_eq!(space.num_elements(), u64::MAX);
        assert_eq!(space.selected_count(), u64::MAX);

        space
            .select_hyperslab(vec![0, 0], vec![1 << 33, 1 << 33])
            .unwrap();
        space.add_hyperslab(vec![0, 0], vec![1, 1]).unwrap_err();
        assert_eq!(space.selected_count(), u64::MAX);
        assert_eq!(Hyperslab::new(vec![0, 0], vec![1 << 40, 0]).len(), 0);
    }
}
