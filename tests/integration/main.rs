//! Integration tests: full slate → parlay pipeline through the public API.

mod fixtures;
mod pipeline;
