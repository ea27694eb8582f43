//! Synchronous effect building blocks.
//!
//! - [`Error`]: the failure cause shared by every effect in the crate
//! - [`IO`]: a deferred, repeatable side effect
//! - [`Reader`]: a computation over a read-only environment
//!
//! Both `IO` and `Reader` lift into the cancellation-aware
//! [`ReaderIOResult`](crate::readerioresult::ReaderIOResult) when the `async`
//! feature is enabled.
//!
//! # Examples
//!
//! ```rust
//! use ctxio::effect::{Error, IO, Result};
//!
//! let parse = IO::new(|| "42".parse::<i32>().map_err(Error::new));
//! let result: Result<i32> = parse.run_unsafe();
//! assert_eq!(result, Ok(42));
//! ```

mod error;
mod io;
mod reader;

pub use error::{Error, Result};
pub use io::IO;
pub use reader::Reader;
