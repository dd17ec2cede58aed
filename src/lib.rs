#![cfg_attr(not(any(test, doctest, feature = "std")), no_std)]
#![doc = include_str!("../README.md")]

mod lag;
pub use lag::*;
mod lowpass;
pub use lowpass::*;
mod num;
pub use num::*;

#[cfg(test)]
pub mod testing;
