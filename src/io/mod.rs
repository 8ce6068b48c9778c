//! On-disk array formats for the precomputed model artifacts.

pub mod npy;

pub use npy::{read_npy, write_npy, NpyArray};
