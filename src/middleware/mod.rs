//! Middleware module
//!
//! Contains the CORS middleware applied to every route.

pub mod cors;
