//! Common utilities for bit and byte extraction

pub mod bitstream;
pub mod cursor;

pub use bitstream::BitReader;
pub use cursor::ByteCursor;
