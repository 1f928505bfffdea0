//! # gitledger
//!
//! A git history ETL: extracts commit, tag, and author history from local
//! repositories and loads it into SQLite for analytical querying.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────────┐   ┌──────────┐
//! │ git commands │──▶│ parse → validate →     │──▶│  SQLite   │
//! │ log/tags/ls  │   │ aggregate → upsert    │   │ WAL, ACID │
//! └──────────────┘   └───────────────────────┘   └──────────┘
//! ```
//!
//! Each repository's load runs inside a single transaction: re-running the
//! extraction is idempotent, with commits, tags, daily stats, and repository
//! metadata overwritten under their natural keys and author activity merged.
//!
//! ## Quick Start
//!
//! ```bash
//! gitledger init                 # create database
//! gitledger sync ./my-repo       # ETL one repository
//! gitledger sync                 # ETL everything in the config
//! gitledger stats                # what's loaded
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`gitcmd`] | External `git` command interface |
//! | [`parser`] | Commit log and tag-ref parsing |
//! | [`validate`] | Record constraint checks |
//! | [`aggregate`] | Author, daily-stat, and summary derivation |
//! | [`store`] | Upserts and the transaction boundary |
//! | [`ingest`] | Pipeline orchestration and batch driver |
//! | [`discover`] | Repository discovery under scan dirs |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod aggregate;
pub mod config;
pub mod db;
pub mod discover;
pub mod gitcmd;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod parser;
pub mod progress;
pub mod sources;
pub mod stats;
pub mod store;
pub mod validate;
