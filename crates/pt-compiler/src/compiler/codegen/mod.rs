//! C++ header generation: the final compiler stage, turning a resolved and
//! analyzed module into a self-contained, templated header.

pub mod expr;
pub mod generator;

pub use expr::{ExprEnvironment, ExprPrinter, GlobalsUsage, ModuleExprEnvironment, VarOrigin};
pub use generator::{generate, CodegenOutput};
