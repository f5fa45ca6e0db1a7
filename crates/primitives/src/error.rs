use std::fmt;

/// A pair of values, one observed and one expected, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GotExpected<T> {
    /// The value that was observed.
    pub got: T,
    /// The value that was expected.
    pub expected: T,
}

impl<T: fmt::Display> fmt::Display for GotExpected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "got {}, expected {}", self.got, self.expected)
    }
}

impl<T> From<(T, T)> for GotExpected<T> {
    fn from((got, expected): (T, T)) -> Self {
        Self { got, expected }
    }
}
