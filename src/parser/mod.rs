mod java;
mod common;
pub mod xml;

pub use java::JavaParser;
pub use common::{descendants, node_text, ParsedUnit, TypeDecl, TypeKind};
