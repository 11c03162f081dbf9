//! # Service status taxonomy
//!
//! Every operation of the services layer reports one of a fixed set of
//! statuses dictated by the interpreter it serves. Success is `Ok(_)`;
//! the failure statuses live in [`Status`].
//!
//! The set is closed: callers on the interpreter side match on exactly
//! these variants, so adapters translate collaborator-specific errors
//! into this taxonomy at the boundary instead of inventing new ones.

#![cfg_attr(not(any(test, doctest)), no_std)]

/// Failure statuses reportable to the interpreter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Status {
    /// Backing allocation failed.
    #[error("out of memory")]
    OutOfMemory,
    /// An argument violated the operation's contract.
    #[error("bad parameter")]
    BadParameter,
    /// The operation has no backing implementation on this host.
    #[error("not implemented")]
    NotImplemented,
    /// A lookup matched nothing (unknown mapping, uninstalled vector).
    #[error("not found")]
    NotFound,
}

/// Result alias used across the services layer.
pub type Result<T> = core::result::Result<T, Status>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_render_stable_messages() {
        assert_eq!(Status::OutOfMemory.to_string(), "out of memory");
        assert_eq!(Status::BadParameter.to_string(), "bad parameter");
        assert_eq!(Status::NotImplemented.to_string(), "not implemented");
        assert_eq!(Status::NotFound.to_string(), "not found");
    }
}
