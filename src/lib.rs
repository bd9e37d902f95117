//! Financial Inclusion Predictor Library
//!
//! Serves a single-page form that collects survey respondent attributes,
//! runs them through a previously trained classification pipeline and shows
//! whether the respondent is likely to hold a bank account.
//!
//! # Modules
//!
//! - `artifacts`: Loading and caching of the exported pipeline artifacts.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and router.
//! - `models`: Form fields, respondent records and prediction results.
//! - `pipeline`: Pipeline contract and the exported logistic-regression pipeline.
//! - `services`: Prediction dispatch.
//! - `view`: HTML rendering.

pub mod artifacts;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod view;
