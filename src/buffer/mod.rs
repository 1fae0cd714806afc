//! Rolling Segment Buffer
//!
//! The on-disk store of fixed-duration audio segments. The buffer
//! directory is the only shared state: the encoder appends, the sweeper
//! prunes, and the selector reads a consistent-enough snapshot per
//! request. No in-memory index is kept.
//!
//! # Architecture
//!
//! * `segment`: the `Segment` type plus filename/timestamp mapping and
//!   directory scanning.
//! * `selector`: picks the stable segments covering a requested window,
//!   oldest first.
//! * `sweeper`: background loop deleting segments past the retention
//!   window.

pub mod segment;
pub mod selector;
pub mod sweeper;
