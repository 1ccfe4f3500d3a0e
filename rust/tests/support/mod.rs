#![allow(dead_code)]

mod gated;
mod helpers;

pub use gated::GatedGateway;
pub use helpers::*;
