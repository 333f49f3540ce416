//! Client for the vendor game-data and profile APIs.
//!
//! [`BlizzardClient`] issues authenticated requests with retries and a shared
//! in-flight cap. [`fetch_all_realms`] fans a leaderboard sweep for one period
//! out over realms × dungeons and hands results back as a [`FetchStream`].

pub mod auth;
pub mod client;
pub mod error;
pub mod fetch;
pub mod types;

pub use auth::{Credentials, TokenSource};
pub use client::{BlizzardClient, ClientConfig, ClientStats, RetryPolicy};
pub use error::{Error, Result};
pub use fetch::{FetchOutcome, FetchResult, FetchStream, fetch_all_realms};
pub use types::{CharacterStatus, SeasonIndex};
