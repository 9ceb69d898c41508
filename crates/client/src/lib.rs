//! HTTP client for the chunked upload endpoints.
//!
//! One multipart `POST` per chunk to the upload endpoint, then a JSON
//! `POST` to `<upload-endpoint>/finalize` that returns the durable URL.

pub mod client;

pub use client::{Client, ClientOptions, Error};
