#![doc = "bucket-mirror-core: core pipeline library for bucket-mirror."]

//! This crate contains the whole upload pipeline: ignore-pattern filtering,
//! file enumeration, the per-file upload worker with its retry policy, and the
//! orchestrator that drives a fixed pool of workers over the enumerated files.
//!
//! The object store itself is an external collaborator, reached only through the
//! [`contract::ObjectStore`] trait. The CLI crate supplies the S3 implementation;
//! tests use the generated `MockObjectStore`.
//!
//! # Usage
//! Build a [`config::MirrorConfig`], wrap an [`contract::ObjectStore`] in an `Arc`,
//! and call [`synchronise::Mirror::run`].

pub mod config;
pub mod contract;
pub mod enumerate;
pub mod error;
pub mod filter;
pub mod synchronise;
pub mod upload;

pub use error::MirrorError;
