//! # HTTP Gateway
//!
//! A small axum front end for the assistant: a chat endpoint taking the
//! caller-owned history, a health probe, and the static web client.

mod server;

pub use server::{ChatRequest, ChatResponse, ErrorResponse, GatewayState, router, run};
