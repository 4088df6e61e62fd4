//! Logistics Delta Client
//!
//! Client side of the logistics invoice reconciliation service: uploads
//! partner invoice files, submits a delta check job, polls it to completion
//! and presents the resulting delta table. Also mirrors the invoices Slack
//! channel and exposes the analytics and pricing lookups.

pub mod app_state;
pub mod config;
pub mod models;
pub mod services;
