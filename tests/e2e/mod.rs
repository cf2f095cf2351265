//! End-to-end tests against a live OpenAI-compatible upstream
//!
//! These tests make real API calls and are ignored by default.
//! Run with: cargo test -- --ignored
//!
//! Required environment variables:
//! - RELAY_E2E_BASE_URL: Upstream base URL, e.g. https://api.openai.com/v1
//! - RELAY_E2E_MODEL: Model id to request
//! - RELAY_E2E_API_KEY: Credential for the upstream (optional)
