//! # fiscus-core
//!
//! Core types for Fiscus, the CRM invoice retrieval and enrichment core.
//!
//! This crate provides the foundational types shared across all Fiscus crates:
//! - Entity structs for invoices, product lines, and counterparties
//! - Explicit absence-vs-value decimal coercion for raw CRM payloads
//! - Tax-identifier checksum validation (10- and 12-digit formats)
//! - The run-level validation report

pub mod decimal;
pub mod entities;
pub mod enums;
pub mod tax_id;
