pub mod llvm;

pub use llvm::{emit_function_text, emit_llvm_ir};
