//!
//! # Error-Helper Utilities
//!
//! ```rust
//! use calmautils::ErrorHelper;
//!
//! /// Example implementer of [`ErrorHelper`].
//! /// Typical implementers hold internal state to report upon failure.
//! struct AtLine(usize);
//! impl ErrorHelper for AtLine {
//!     type Error = String;
//!
//!     fn err(&self, msg: impl Into<String>) -> Self::Error {
//!         format!("{} on line {}", msg.into(), self.0)
//!     }
//! }
//!
//! let h = AtLine(42);
//! assert_eq!(h.unwrap(Some(5), "missing value").unwrap(), 5);
//! assert_eq!(h.fail::<()>("bad value").unwrap_err(), "bad value on line 42");
//! ```
//!

///
/// # ErrorHelper
///
/// Helper trait shared among tree-walking parsers and serializers.
/// Each implementer generally carries some internal state - a position,
/// a context stack - which it injects into error values via the
/// implementation-required `err` method. The remaining methods are
/// default-implemented atop `err`.
///
pub trait ErrorHelper {
    type Error;

    /// Create and return a [Self::Error] value.
    fn err(&self, msg: impl Into<String>) -> Self::Error;
    /// Return failure
    fn fail<T>(&self, msg: impl Into<String>) -> Result<T, Self::Error> {
        Err(self.err(msg))
    }
    /// Unwrap the [Option] `opt` if it is [Some], and return our error if not.
    fn unwrap<T>(&self, opt: Option<T>, msg: impl Into<String>) -> Result<T, Self::Error> {
        match opt {
            Some(val) => Ok(val),
            None => self.fail(msg),
        }
    }
    /// Assert boolean condition `b`. Returns through `self.fail` if not satisfied.
    fn assert(&self, b: bool, msg: impl Into<String>) -> Result<(), Self::Error> {
        match b {
            true => Ok(()),
            false => self.fail(msg),
        }
    }
}
