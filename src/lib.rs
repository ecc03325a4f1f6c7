pub mod cmdline;
pub mod core;
pub mod destructure;
pub mod environment;
pub mod evaluator;
pub mod interpreter;
pub mod lazy;
pub mod math;
pub mod printer;
pub mod reader;
pub mod special_forms;
pub mod types;

#[macro_use]
extern crate lazy_static;

mod chars;

pub use environment::Environment;
pub use types::Value;
