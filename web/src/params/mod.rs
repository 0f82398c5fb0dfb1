//! This module holds typed parameters for various endpoint inputs.
//!
//! The purpose of this module is to define and manage the parameters that are used as inputs
//! for different endpoints in the web application. By using typed parameters, we can ensure
//! that the inputs are validated (by type) and correctly formatted before they are processed by the
//! application logic.
//!
//! Structural checks that serde cannot express (non-empty strings and lists) live on each
//! params type as a `validate` method, called by the controller before any event is built.

pub(crate) mod sse;
