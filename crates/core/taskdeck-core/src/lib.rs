//! Core types for the taskdeck client.
//!
//! This crate has no I/O. It provides:
//! - the wire model shared with the REST backend (`Task`, `User`, request payloads)
//! - local input validation (`TaskDraft`, `Credentials::validate`)
//! - the in-memory task list (`TaskBoard`) and the mutations applied to it
//! - status filtering and search over the list (`TaskQuery`)

pub mod board;
pub mod draft;
pub mod model;
pub mod pending;
pub mod query;

pub use board::{LoadState, TaskBoard, TaskMutation};
pub use draft::{TaskDraft, ValidationError};
pub use model::{
    CompletionPatch, Credentials, LoginResponse, NewTask, Task, TaskId, TaskUpdate, User,
};
pub use pending::{Control, PendingControls};
pub use query::{StatusFilter, TaskQuery, TaskStats};
