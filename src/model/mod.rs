// src/model/mod.rs
//! Domain model — farmers, fields, and the processing lifecycle.

mod farmer;
mod field;

pub use farmer::{resolve_display_name, resolve_location, Farmer};
pub use field::{
    is_done_status_literal, is_pending_status_literal, Field, FieldPatch, ProcessingStatus,
};
