//! Template management and document generation endpoints.

pub mod handlers;
pub mod models;
pub mod multipart_parser;
pub mod service;
pub mod validation;
