//! Exact nearest-neighbour search over a flat vector list.

use crate::{Error, Result};

/// A search hit: position of the stored vector and its squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Insertion index of the matched vector.
    pub index: usize,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

/// Brute-force index ranking stored vectors by squared L2 distance.
///
/// Every query scans all vectors, which is fine for the few dozen sections
/// of a single guide.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    /// Creates an empty index for vectors of `dimensions` components.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
        }
    }

    /// Number of stored vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index holds no vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Appends a vector.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the vector has the wrong dimensionality.
    pub fn add(&mut self, vector: Vec<f32>) -> Result<()> {
        self.check_dimensions(&vector)?;
        self.vectors.push(vector);
        Ok(())
    }

    /// Returns up to `k` nearest vectors, closest first.
    ///
    /// Equal distances keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the query has the wrong dimensionality.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.check_dimensions(query)?;

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, v)| Neighbor {
                index,
                distance: squared_l2(v, query),
            })
            .collect();
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);
        Ok(neighbors)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() == self.dimensions {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )))
        }
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_orders_by_distance() {
        let mut index = FlatL2Index::new(2);
        index.add(vec![10.0, 10.0]).unwrap();
        index.add(vec![1.0, 0.0]).unwrap();
        index.add(vec![3.0, 0.0]).unwrap();

        let hits = index.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].index, 1);
        assert!((hits[0].distance - 1.0).abs() < f32::EPSILON);
        assert_eq!(hits[1].index, 2);
        assert!((hits[1].distance - 9.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_k_larger_than_index() {
        let mut index = FlatL2Index::new(1);
        index.add(vec![0.5]).unwrap();
        assert_eq!(index.search(&[0.0], 5).unwrap().len(), 1);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = FlatL2Index::new(1);
        index.add(vec![1.0]).unwrap();
        index.add(vec![-1.0]).unwrap();
        let hits = index.search(&[0.0], 2).unwrap();
        assert_eq!(hits[0].index, 0);
        assert_eq!(hits[1].index, 1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = FlatL2Index::new(3);
        assert!(index.add(vec![1.0]).is_err());
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 2.0], 1).is_err());
    }

    #[test]
    fn test_empty_index_search() {
        let index = FlatL2Index::new(2);
        assert!(index.search(&[0.0, 0.0], 3).unwrap().is_empty());
        assert_eq!(index.len(), 0);
    }
}
