/// Flat storage for a sequence of variable-length vectors
///
/// All vectors share one data buffer; an offset table locates each of them.
/// Construction is always two-phase: the size of every vector is fixed first,
/// storage is allocated once, and only then are the slices filled. Because the
/// slices handed to the fill phase are disjoint, they can be filled in parallel
/// without any locking.
use anyhow::{ensure, Result};
use rayon::prelude::*;
use std::ops::Index;

#[derive(Debug, Clone, PartialEq)]
pub struct VectorOfVectors<T> {
    /// offsets[i]..offsets[i + 1] is the range of vector i in `data`
    offsets: Vec<usize>,
    data: Vec<T>,
}

impl<T> Default for VectorOfVectors<T> {
    fn default() -> Self {
        VectorOfVectors {
            offsets: vec![0],
            data: Vec::new(),
        }
    }
}

impl<T> VectorOfVectors<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vectors
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of elements over all vectors
    pub fn total_size(&self) -> usize {
        self.data.len()
    }

    /// Number of elements in vector `i`
    pub fn size(&self, i: usize) -> usize {
        self.offsets[i + 1] - self.offsets[i]
    }

    pub fn get(&self, i: usize) -> Option<&[T]> {
        if i >= self.len() {
            return None;
        }
        Some(&self.data[self.offsets[i]..self.offsets[i + 1]])
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut [T]> {
        if i >= self.len() {
            return None;
        }
        let (begin, end) = (self.offsets[i], self.offsets[i + 1]);
        Some(&mut self.data[begin..end])
    }

    pub fn iter(&self) -> impl Iterator<Item = &[T]> + Clone + '_ {
        self.offsets
            .windows(2)
            .map(move |w| &self.data[w[0]..w[1]])
    }

    /// Build from already materialized vectors
    pub fn from_vecs(vecs: Vec<Vec<T>>) -> Self {
        let mut offsets = Vec::with_capacity(vecs.len() + 1);
        offsets.push(0);
        let mut total = 0;
        for v in &vecs {
            total += v.len();
            offsets.push(total);
        }
        let mut data = Vec::with_capacity(total);
        for v in vecs {
            data.extend(v);
        }
        VectorOfVectors { offsets, data }
    }

    /// Split the data buffer into one mutable slice per vector
    fn slices_mut(&mut self) -> Vec<&mut [T]> {
        let mut slices = Vec::with_capacity(self.len());
        let mut rest: &mut [T] = &mut self.data;
        for w in self.offsets.windows(2) {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(w[1] - w[0]);
            slices.push(head);
            rest = tail;
        }
        slices
    }
}

impl<T: Clone + Default> VectorOfVectors<T> {
    /// Size phase: allocate storage for vectors with the given sizes.
    /// Elements are default-initialized until the fill phase overwrites them.
    pub fn with_sizes(sizes: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(sizes.len() + 1);
        offsets.push(0);
        let mut total = 0;
        for &size in sizes {
            total += size;
            offsets.push(total);
        }
        VectorOfVectors {
            offsets,
            data: vec![T::default(); total],
        }
    }

    /// Group (key, value) pairs by key into `n` vectors, preserving the order
    /// in which values appear for each key. Counts first, then fills.
    pub fn from_keyed<I>(n: usize, items: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, T)>,
        I::IntoIter: Clone,
    {
        let items = items.into_iter();
        let mut sizes = vec![0usize; n];
        for (key, _) in items.clone() {
            ensure!(key < n, "Key {} out of range for {} vectors", key, n);
            sizes[key] += 1;
        }

        let mut result = Self::with_sizes(&sizes);
        let mut cursor = result.offsets[..n].to_vec();
        for (key, value) in items {
            result.data[cursor[key]] = value;
            cursor[key] += 1;
        }
        Ok(result)
    }
}

impl<T: Clone + Default + Send + Sync> VectorOfVectors<T> {
    /// Two-phase parallel construction.
    ///
    /// `count` runs for every index in parallel and must not write anything.
    /// Storage is allocated only after every count is known. `fill` then runs
    /// for every index in parallel and receives exactly the slice reserved
    /// for that index.
    pub fn build_parallel<C, F>(n: usize, count: C, fill: F) -> Result<Self>
    where
        C: Fn(usize) -> Result<usize> + Sync + Send,
        F: Fn(usize, &mut [T]) -> Result<()> + Sync + Send,
    {
        // Pass 1
        let sizes: Vec<usize> = (0..n)
            .into_par_iter()
            .map(&count)
            .collect::<Result<Vec<_>>>()?;

        // Barrier: storage is finalized here
        let mut result = Self::with_sizes(&sizes);

        // Pass 2
        result
            .slices_mut()
            .into_par_iter()
            .enumerate()
            .try_for_each(|(i, slice)| fill(i, slice))?;

        Ok(result)
    }

    /// Apply `f` to every vector in parallel
    pub fn par_for_each_mut<F>(&mut self, f: F)
    where
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        self.slices_mut()
            .into_par_iter()
            .enumerate()
            .for_each(|(i, slice)| f(i, slice));
    }
}

impl<T> Index<usize> for VectorOfVectors<T> {
    type Output = [T];

    fn index(&self, i: usize) -> &[T] {
        &self.data[self.offsets[i]..self.offsets[i + 1]]
    }
}
