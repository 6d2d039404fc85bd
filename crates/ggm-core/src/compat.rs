//! Compatibility layer - always no_std + alloc.
//!
//! `std` is only enabled by a consuming binary for logger initialization and
//! for `midi::describe`'s formatted debug strings; the graph kernel itself
//! never needs it.

pub use alloc::{
    boxed::Box,
    rc::{Rc, Weak},
    string::{String, ToString},
    vec,
    vec::Vec,
};

pub use core::cell::RefCell;
