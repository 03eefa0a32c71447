//! Pin Publish library.
//!
//! Backend for a Shopify merchant tool that crops product images,
//! uploads the crops as Shopify-hosted files and publishes them to
//! Pinterest, either through a pre-filled pin-create link or directly
//! via the Pinterest v5 API. Processed products are tagged in Shopify
//! and mirrored into `PostgreSQL` so they drop out of the work queue.
//!
//! # Security
//!
//! This crate holds HIGH PRIVILEGE access:
//! - Shopify Admin API (file uploads, product tag management)
//! - Pinterest API (pin creation on the merchant account)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod compositor;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pin_url;
pub mod pinterest;
pub mod routes;
pub mod session;
pub mod shopify;
pub mod state;
