//! Scam Honeypot - decision-and-extraction engine for conversational honeypots
//!
//! Inbound messages are scored by lexical, semantic and historical layers.
//! Above the scam threshold a persona keeps the sender talking for a bounded
//! number of turns while payment handles, bank accounts, URLs and phone
//! numbers are extracted from the conversation.
//!
//! - `domain` - pure scoring, state machine and extraction logic
//! - `ports` / `adapters` - completion providers and session storage
//! - `application` - the `ProcessMessageHandler` and its services

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
