pub mod console;
pub mod file;
pub mod filter;
pub mod multi;
pub mod null;
