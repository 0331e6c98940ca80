//! Dependency injection infrastructure.
//!
//! Components declare what they need by implementing [`FromRef`] for the
//! application [`Context`](crate::context::Context), and command handlers
//! pull them out without knowing how they are wired.
//!
//! # Example
//!
//! ```ignore
//! use strata::di::FromRef;
//!
//! let ctx = Context::from_config(config)?;
//! let runner = AppRunner::from_ref(&ctx);
//! ```

/// Trait for extracting a value from a reference to another type.
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

/// Blanket implementation: any Clone type can be extracted from itself.
impl<T: Clone> FromRef<T> for T {
    fn from_ref(input: &T) -> Self {
        input.clone()
    }
}
