/// Compatibility layer for rayon/sequential execution.
///
/// With the `parallel` feature (the default) this re-exports rayon's
/// parallel iterators, and the pixel loops in this crate run row-parallel.
/// Without it, a sequential stand-in provides the same `into_par_iter`
/// surface so the loops compile unchanged on targets without threads.
#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Sequential stand-in for `rayon::prelude::IntoParallelIterator`.
    ///
    /// `into_par_iter()` resolves to `into_iter()`, so the rest of the
    /// chain (`.flat_map()`, `.collect()`, ...) uses the standard
    /// `Iterator` methods.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
