//! Decoder for the box structure of ISO base media files (MP4, fragmented
//! MP4, CMAF segments, PIFF).
//!
//! [`decode`] turns a byte buffer into a [`Tree`] of [`BoxNode`]s with their
//! decoded fields. Damaged input is decoded on a best-effort basis; problems
//! are collected as [`Diagnostic`]s next to the tree.

pub mod api;
pub mod boxes;
pub mod decoders;
pub mod descriptor;
pub mod error;
pub mod known_boxes;
pub mod parser;
pub mod reader;
pub mod registry;
pub mod util;
pub mod uuid_ext;

pub use api::{DecodeOptions, HexDump, Tree, decode, decode_with, hex_range};
pub use boxes::{AttrValue, Attributes, BoxHeader, BoxNode, FourCC};
pub use error::{DecodeError, Diagnostic, ReadError};
pub use known_boxes::{BoxClass, KnownBox};
pub use parser::read_box_header;
