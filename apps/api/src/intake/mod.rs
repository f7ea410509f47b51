//! HTTP intake: request validation, job creation and dispatch, status and
//! download endpoints.

pub mod handlers;
pub mod validation;
