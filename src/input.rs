//! Constrained reads over a fuzzer-supplied byte buffer.
//!
//! Wraps [`arbitrary::Unstructured`] with the two contracts the interpreter
//! needs: reads that fail once the buffer is empty (rather than zero-filling),
//! and reads that keep drawing until a value satisfies a predicate.

use arbitrary::{Arbitrary, Error, Result, Unstructured};

/// A fuzz input being consumed one operand at a time.
pub struct Input<'a> {
    u: Unstructured<'a>,
}

impl<'a> Input<'a> {
    pub fn new(data: &'a [u8]) -> Input<'a> {
        Input {
            u: Unstructured::new(data),
        }
    }

    /// Returns `true` once every byte has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.u.is_empty()
    }

    /// Reads one value, failing if the buffer is already empty.
    ///
    /// The explicit emptiness check matters: the integer `Arbitrary` impls
    /// zero-fill on a short buffer instead of failing, which would turn
    /// exhaustion into an endless stream of zeroes.
    pub fn read<T>(&mut self) -> Result<T>
    where
        T: Arbitrary<'a>,
    {
        if self.u.is_empty() {
            return Err(Error::NotEnoughData);
        }

        T::arbitrary(&mut self.u)
    }

    /// Reads values until one satisfies `pred`.
    ///
    /// Rejected values are consumed and discarded. Running out of input
    /// before a satisfying value appears fails the read; with an
    /// unsatisfiable predicate that is the only possible outcome.
    pub fn read_where<T, F>(&mut self, pred: F) -> Result<T>
    where
        T: Arbitrary<'a>,
        F: Fn(&T) -> bool,
    {
        loop {
            let value = self.read::<T>()?;

            if pred(&value) {
                return Ok(value);
            }
        }
    }

    /// Invokes `body` repeatedly until the buffer is exhausted.
    ///
    /// A failed read inside `body` ends the run; it is the expected way for
    /// every run to finish, not an error. Returns `true` when the buffer was
    /// fully consumed.
    pub fn run<F>(mut self, mut body: F) -> bool
    where
        F: FnMut(&mut Input<'a>) -> Result<()>,
    {
        while !self.is_exhausted() {
            if body(&mut self).is_err() {
                break;
            }
        }

        self.is_exhausted()
    }
}
