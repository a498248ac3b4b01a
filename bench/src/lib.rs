/// Sample prelude shared by the benchmarks.
pub static PRELUDE: &str = include_str!("../../demos/core.lisp");
