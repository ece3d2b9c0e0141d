// src/files/mod.rs

//! Ordered glob expansion.
//!
//! Stages describe their inputs as ordered lists of glob patterns relative to
//! the project root (or a stage `cwd`). Patterns prefixed with `!` remove
//! matches. Brace alternatives (`{,*/}*.js`, `*.{png,jpg}`) are expanded
//! before compilation, and `*` never crosses a `/`.

pub mod braces;
pub mod expand;

pub use braces::expand_braces;
pub use expand::{compile_globset, PatternSet};
