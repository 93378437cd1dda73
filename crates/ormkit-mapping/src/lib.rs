//! Reflection mapping driver for ormkit: scans Rust sources for
//! doc-comment tags and turns them into class metadata.
#![warn(unreachable_pub)]

pub mod declaration;
pub mod descriptor;
pub mod driver;
pub mod inflector;
pub mod source;
pub mod tag;

pub use declaration::{
    DeclaredType, MethodDeclaration, PropertyDeclaration, Representative, TypeDeclaration,
};
pub use driver::ReflectionDriver;
pub use source::{ScanError, SourceIndex};
pub use tag::{DocBlock, TagKind};
