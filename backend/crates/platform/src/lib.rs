//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, HMAC-SHA256, hex, URL-safe Base64, random bytes)
//! - Cookie building and extraction

pub mod cookie;
pub mod crypto;
