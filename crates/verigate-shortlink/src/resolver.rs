use crate::cache::ShortlinkCache;
use crate::client::ShortenerClient;
use crate::error::{AttemptError, Result, ShortlinkError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;
use verigate_core::validate::validate_url;

/// Behaviour knobs for [`ShortlinkResolver`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct ResolverSettings {
    /// Attempts per uncached URL, including the first one.
    #[builder(default = 3)]
    max_attempts: u32,
    /// Authorities accepted for both input and shortener output.
    /// Empty means any http(s) authority.
    #[builder(default)]
    allowed_domains: Vec<String>,
    #[builder(default = crate::cache::DEFAULT_TTL)]
    cache_ttl: Duration,
    #[builder(default = 10_000)]
    cache_capacity: u64,
}

/// Creates shortlinks through a [`ShortenerClient`] with caching and retry,
/// and resolves existing shortlinks to their final destination.
pub struct ShortlinkResolver {
    client: Arc<dyn ShortenerClient>,
    cache: ShortlinkCache,
    allowed_domains: Vec<String>,
    max_attempts: u32,
}

impl ShortlinkResolver {
    pub fn new(client: Arc<dyn ShortenerClient>, settings: ResolverSettings) -> Self {
        Self {
            client,
            cache: ShortlinkCache::with_ttl(settings.cache_capacity, settings.cache_ttl),
            allowed_domains: settings.allowed_domains,
            max_attempts: settings.max_attempts.max(1),
        }
    }

    /// Returns the cache, for inspection and lifecycle control.
    pub fn cache(&self) -> &ShortlinkCache {
        &self.cache
    }

    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    /// Turns `long_url` into a short URL.
    ///
    /// A live cache entry for the exact same input is returned without any
    /// network call. Otherwise the shortener is tried up to the attempt
    /// budget; non-200 responses, malformed bodies, invalid `shortenedUrl`
    /// values and transport errors all count as failed attempts.
    ///
    /// Two requests racing on the same uncached URL may both call the
    /// shortener; the first result stored is the one both get back.
    pub async fn create(&self, long_url: &str) -> Result<String> {
        if !validate_url(long_url, &self.allowed_domains) {
            return Err(ShortlinkError::InvalidUrl);
        }

        if let Some(hit) = self.cache.get(long_url).await {
            debug!("shortlink cache hit");
            return Ok(hit.short_url);
        }

        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            let error = match self.client.shorten(long_url).await {
                Ok(short_url) if validate_url(&short_url, &self.allowed_domains) => {
                    debug!(attempt, "shortener succeeded");
                    let entry = self.cache.insert_if_absent(long_url, short_url).await;
                    return Ok(entry.short_url);
                }
                Ok(short_url) => AttemptError::InvalidShortUrl(short_url),
                Err(error) => error,
            };
            warn!(attempt, max_attempts = self.max_attempts, error = %error, "shortener attempt failed");
            last_error = Some(error);
        }

        Err(ShortlinkError::Exhausted {
            attempts: self.max_attempts,
            last: last_error
                .unwrap_or_else(|| AttemptError::Transport("no attempt was made".to_string())),
        })
    }

    /// Follows redirects on `short_url` and returns where it lands.
    ///
    /// Never fails: any error (timeout, DNS, TLS, redirect loop) returns the
    /// input unchanged.
    pub async fn resolve(&self, short_url: &str) -> String {
        match self.client.follow(short_url).await {
            Ok(final_url) if !final_url.is_empty() => final_url,
            Ok(_) => short_url.to_owned(),
            Err(error) => {
                debug!(error = %error, "shortlink resolve failed, using original url");
                short_url.to_owned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Scripted = std::result::Result<String, AttemptError>;

    /// Replays scripted shortener answers and counts calls.
    #[derive(Default)]
    struct ScriptedClient {
        answers: Mutex<VecDeque<Scripted>>,
        fallback: Option<Scripted>,
        follow: Option<Scripted>,
        shorten_calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn always(answer: Scripted) -> Self {
            Self {
                fallback: Some(answer),
                ..Self::default()
            }
        }

        fn sequence(answers: Vec<Scripted>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.shorten_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ShortenerClient for ScriptedClient {
        async fn shorten(&self, _long_url: &str) -> std::result::Result<String, AttemptError> {
            self.shorten_calls.fetch_add(1, Ordering::SeqCst);
            let next = self.answers.lock().unwrap().pop_front();
            next.or_else(|| self.fallback.clone())
                .unwrap_or(Err(AttemptError::Status(500)))
        }

        async fn follow(&self, url: &str) -> std::result::Result<String, AttemptError> {
            self.follow.clone().unwrap_or_else(|| Ok(url.to_string()))
        }
    }

    const LONG_URL: &str = "https://t.me/VerigateBot?start=verify_tok123";

    fn resolver(client: Arc<ScriptedClient>) -> ShortlinkResolver {
        ShortlinkResolver::new(client, ResolverSettings::builder().build())
    }

    #[tokio::test]
    async fn create_returns_short_url() {
        let client = Arc::new(ScriptedClient::always(Ok("https://short.example/xyz".into())));
        let resolver = resolver(client.clone());

        let short = resolver.create(LONG_URL).await.unwrap();

        assert_eq!(short, "https://short.example/xyz");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn second_create_within_ttl_hits_cache() {
        let client = Arc::new(ScriptedClient::always(Ok("https://short.example/xyz".into())));
        let resolver = resolver(client.clone());

        let first = resolver.create(LONG_URL).await.unwrap();
        let second = resolver.create(LONG_URL).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn different_urls_are_cached_separately() {
        let client = Arc::new(ScriptedClient::sequence(vec![
            Ok("https://short.example/a".into()),
            Ok("https://short.example/b".into()),
        ]));
        let resolver = resolver(client.clone());

        let a = resolver.create("https://t.me/bot?start=verify_a").await.unwrap();
        let b = resolver.create("https://t.me/bot?start=verify_b").await.unwrap();

        assert_eq!(a, "https://short.example/a");
        assert_eq!(b, "https://short.example/b");
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn create_fails_after_three_non_200_attempts() {
        let client = Arc::new(ScriptedClient::always(Err(AttemptError::Status(502))));
        let resolver = resolver(client.clone());

        let err = resolver.create(LONG_URL).await.unwrap_err();

        assert!(matches!(
            err,
            ShortlinkError::Exhausted {
                attempts: 3,
                last: AttemptError::Status(502)
            }
        ));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn create_fails_after_three_malformed_bodies() {
        let client = Arc::new(ScriptedClient::always(Err(AttemptError::MalformedBody(
            "missing shortenedUrl".into(),
        ))));
        let resolver = resolver(client.clone());

        let err = resolver.create(LONG_URL).await.unwrap_err();

        assert!(matches!(err, ShortlinkError::Exhausted { attempts: 3, .. }));
        assert_eq!(client.calls(), 3);
        assert!(resolver.cache().get(LONG_URL).await.is_none());
    }

    #[tokio::test]
    async fn create_surfaces_last_transport_error() {
        let client = Arc::new(ScriptedClient::sequence(vec![
            Err(AttemptError::Transport("timeout 1".into())),
            Err(AttemptError::Status(500)),
            Err(AttemptError::Transport("timeout 3".into())),
        ]));
        let resolver = resolver(client.clone());

        let err = resolver.create(LONG_URL).await.unwrap_err();

        match err {
            ShortlinkError::Exhausted { last, .. } => {
                assert_eq!(last, AttemptError::Transport("timeout 3".into()))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_retries_until_success() {
        let client = Arc::new(ScriptedClient::sequence(vec![
            Err(AttemptError::Status(503)),
            Err(AttemptError::Transport("reset".into())),
            Ok("https://short.example/late".into()),
        ]));
        let resolver = resolver(client.clone());

        assert_eq!(
            resolver.create(LONG_URL).await.unwrap(),
            "https://short.example/late"
        );
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn invalid_short_url_counts_as_failed_attempt() {
        let client = Arc::new(ScriptedClient::sequence(vec![
            Ok("not a url".into()),
            Ok("ftp://short.example/x".into()),
            Ok("https://short.example/good".into()),
        ]));
        let resolver = resolver(client.clone());

        assert_eq!(
            resolver.create(LONG_URL).await.unwrap(),
            "https://short.example/good"
        );
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn invalid_long_url_is_rejected_without_calls() {
        let client = Arc::new(ScriptedClient::always(Ok("https://short.example/x".into())));
        let resolver = resolver(client.clone());

        let err = resolver.create("t.me/bot").await.unwrap_err();

        assert!(matches!(err, ShortlinkError::InvalidUrl));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn allowed_domains_apply_to_both_sides() {
        let client = Arc::new(ScriptedClient::always(Ok("https://elsewhere.example/x".into())));
        let resolver = ShortlinkResolver::new(
            client.clone(),
            ResolverSettings::builder()
                .allowed_domains(vec!["t.me".to_string(), "short.example".to_string()])
                .build(),
        );

        let err = resolver.create("https://evil.example/x").await.unwrap_err();
        assert!(matches!(err, ShortlinkError::InvalidUrl));
        assert_eq!(client.calls(), 0);

        let err = resolver.create(LONG_URL).await.unwrap_err();
        assert!(matches!(
            err,
            ShortlinkError::Exhausted {
                last: AttemptError::InvalidShortUrl(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn resolve_returns_final_url() {
        let client = Arc::new(ScriptedClient {
            follow: Some(Ok("https://landing.example/page".into())),
            ..ScriptedClient::default()
        });
        let resolver = resolver(client);

        assert_eq!(
            resolver.resolve("https://short.example/xyz").await,
            "https://landing.example/page"
        );
    }

    #[tokio::test]
    async fn resolve_falls_back_to_input_on_error() {
        let client = Arc::new(ScriptedClient {
            follow: Some(Err(AttemptError::Transport("dns".into()))),
            ..ScriptedClient::default()
        });
        let resolver = resolver(client);

        assert_eq!(
            resolver.resolve("https://short.example/xyz").await,
            "https://short.example/xyz"
        );
    }
}
