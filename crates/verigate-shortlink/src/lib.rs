//! Shortlink creation and resolution for the Verigate gateway.
//!
//! [`ShortlinkResolver`] turns a long URL into a short one through an
//! external shortening API. Results are cached per exact input URL for a
//! short TTL, and failed attempts are retried within a fixed budget.
//! It also follows redirects on an existing short URL to find its final
//! destination, falling back to the input on any error.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use verigate_shortlink::{HttpShortenerClient, HttpShortenerSettings, ResolverSettings, ShortlinkResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpShortenerClient::new(
//!     HttpShortenerSettings::builder()
//!         .api_url(HttpShortenerClient::api_url_for_domain("short.example"))
//!         .api_key("secret".to_string())
//!         .build(),
//! )?;
//! let resolver = ShortlinkResolver::new(Arc::new(client), ResolverSettings::builder().build());
//!
//! let short = resolver.create("https://t.me/bot?start=verify_abc").await?;
//! let landing = resolver.resolve(&short).await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod resolver;

pub use cache::{CachedShortlink, ShortlinkCache};
pub use client::{HttpShortenerClient, HttpShortenerSettings, ShortenerClient};
pub use error::{AttemptError, Result, ShortlinkError};
pub use resolver::{ResolverSettings, ShortlinkResolver};
