//! Client-side state and submission lifecycle for the health risk form.
//!
//! [`FormSessionController`] is the entry point; [`reducer`] holds its pure transitions and
//! [`transport`] the backend seam.

mod controller;
pub mod error;
pub mod reducer;
pub mod transport;
pub mod types;

pub use controller::{execute, FormSessionController};
pub use error::{ApiFailure, ValidationError};
pub use transport::{HttpPatientApi, PatientApi};
pub use types::{ApiStatus, SessionState, StatusKind, StatusMessage};
