//! Library to backup an application's database and managed files.
//!
//! A backup run dumps the active database connection, zips the dump together
//! with the files of the application's storage disk and publishes the archive
//! to a destination disk. The pipeline lives in the [`backup`] module, the
//! dump programs for the individual database engines in [`backends`].

#![forbid(unsafe_code)]

pub mod application;
pub mod archive;
pub mod backends;
pub mod backup;
pub mod cli;
pub mod config;
pub mod database;
pub mod storage;
