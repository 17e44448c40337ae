//! Customer Onboarding API Library
//!
//! This library provides the core functionality for the onboarding backend:
//! KYC document processing (OCR field extraction and two-tier validation),
//! application persistence, credit-card recommendation scoring, and the
//! credit bureau integration.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `application`: Submission workflow orchestration.
//! - `cache_validator`: Cache validation utilities.
//! - `catalog`: In-memory card catalog.
//! - `circuit_breaker`: Circuit breaker for vendor calls.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `extraction`: OCR field extraction.
//! - `features`: Customer and card feature encoding.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `recommendation`: Recommendation composition.
//! - `scoring`: Similarity scoring and ranking.
//! - `services`: External service clients (OCR, LLM, vector store, credit bureau).
//! - `storage`: Postgres persistence.
//! - `validation`: Document validation rules.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod application;
pub mod cache_validator;
pub mod catalog;
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod extraction;
pub mod features;
pub mod handlers;
pub mod models;
pub mod recommendation;
pub mod scoring;
pub mod services;
pub mod storage;
pub mod validation;
