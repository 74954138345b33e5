//! HTTP client for the taskdeck REST backend.
//!
//! All network traffic goes through one [`ApiClient`]. It attaches the bearer
//! token from the [`SessionContext`](taskdeck_session::SessionContext) to every
//! request outside the credential endpoints, and reacts to every response:
//! a 401 clears the session and broadcasts [`ClientEvent::SessionExpired`],
//! a 403 is logged and broadcast without touching the session.
//!
//! Views talk to the backend through [`TaskService`], which resolves the
//! current user, validates input locally and turns each confirmed response
//! into a [`TaskMutation`](taskdeck_core::TaskMutation).

mod auth;
mod client;
mod error;
mod events;
mod service;
mod tasks;

pub use client::{ApiClient, ApiClientBuilder, DEFAULT_BASE_URL};
pub use error::{ApiError, ApiResult, ClientBuildError, ErrorKind, Operation};
pub use events::ClientEvent;
pub use service::{DetailState, LoadTransition, TASK_NOT_FOUND, TaskService, settle_load};
