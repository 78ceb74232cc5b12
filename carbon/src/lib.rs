#![doc = include_str!("../README.md")]

#![deny(warnings)]
#![cfg_attr(test, allow(warnings))]

pub mod abstracts;
pub mod dot;
pub mod field;
pub mod find;
pub mod insert;
pub mod iter;
pub mod json;
pub mod memfile;
pub mod record;
pub mod revise;

pub use abstracts::AbstractClass;
pub use dot::{DotAtom, DotPath};
pub use field::{ColumnType, FieldType};
pub use find::Find;
pub use insert::{ArrayInserter, ColumnInserter, FieldSink, Inserter, ObjectInserter};
pub use iter::{ArrayIter, ColValue, ColumnIter, ObjectIter};
pub use memfile::MemFile;
pub use record::{commit_from_str, commit_to_str, Carbon, Key, KeyType};
pub use revise::Revise;

pub use carbon_core as core;
