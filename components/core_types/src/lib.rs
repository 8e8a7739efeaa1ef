//! Core value types and error handling for the deferred computation engine.
//!
//! This crate provides the foundational types shared by the runtime
//! components: the dynamically typed [`Value`] that flows through promise
//! chains, and the [`JsError`] carried by error values and host failures.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of engine values
//! - [`JsError`] - Error objects with a kind and a message
//! - [`ErrorKind`] - Types of built-in errors
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, JsError, Value};
//!
//! let num = Value::Smi(42);
//! assert_eq!(num.to_string(), "42");
//!
//! let error = JsError::new(ErrorKind::TypeError, "undefined is not a function");
//! let thrown = Value::from(error);
//! assert!(thrown.as_error().is_some());
//! assert_eq!(thrown.to_string(), "TypeError: undefined is not a function");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod value;

pub use error::{ErrorKind, JsError};
pub use value::Value;
