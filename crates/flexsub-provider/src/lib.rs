//! Talking to the subscriptions API and to CloudFormation's callback URL.
//!
//! - [`ProviderClient`]: authenticated REST calls
//! - [`Poller`]: bounded waits on task links
//! - [`ResponseReporter`]: PUT of the final outcome

pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod reporter;

pub use client::{DATABASE_PAGE_LIMIT, ProviderClient};
pub use config::{Credentials, ProviderConfig};
pub use error::{PollError, ProviderError, ReporterError};
pub use poller::{PollPolicy, Poller};
pub use reporter::ResponseReporter;
