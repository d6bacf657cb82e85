//! Field decoders, grouped by where the boxes live in a file.

pub mod fragment;
pub mod movie;
pub mod protection;
pub mod sample;
