//! Common test utilities for endpoint testing.
//!
//! This module provides test infrastructure including:
//!
//! - [`client`] - A recording FHIR client and a counting client factory
//! - [`fixtures`] - Test resources and bundles

#![allow(dead_code)]

pub mod client;
pub mod fixtures;
