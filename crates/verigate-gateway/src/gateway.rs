use crate::config::{ConfigFault, GatewayConfig};
use crate::diagnostics::Diagnostics;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};
use verigate_core::error::StoreError;
use verigate_core::validate::{mask_token, validate_page_token, validate_url, validate_user_id};
use verigate_core::{Clock, RecordStore, RedirectId, RedirectRecord, SystemClock, UserId};
use verigate_shortlink::{ShortlinkError, ShortlinkResolver};

/// Which of the two independent windows elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryClock {
    /// The verification session, anchored at the verification record.
    Session,
    /// The redirect page, anchored at the redirect record.
    RedirectPage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub url: String,
    /// Set when a redirect record backs this target.
    pub redirect_id: Option<RedirectId>,
    /// `false` when the raw deep link is served as a fallback.
    pub shortened: bool,
}

#[derive(Debug, Error)]
pub enum ServiceFault {
    #[error("gateway is misconfigured: {0}")]
    Misconfigured(ConfigFault),
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Shortener(ShortlinkError),
}

/// Terminal state of one gateway interaction.
#[derive(Debug)]
pub enum Outcome {
    /// Malformed input; no store read happened.
    Invalid,
    /// Token mismatch, malformed token, or a record that cannot build a deep link.
    Rejected,
    NotFound,
    Verified,
    Expired(ExpiryClock),
    Redirecting(RedirectTarget),
    ServiceError(ServiceFault),
}

impl Outcome {
    /// Stable name of the state, used in logs and diagnostics.
    pub fn state(&self) -> &'static str {
        match self {
            Outcome::Invalid => "INVALID",
            Outcome::Rejected => "REJECTED",
            Outcome::NotFound => "NOT_FOUND",
            Outcome::Verified => "VERIFIED",
            Outcome::Expired(_) => "EXPIRED",
            Outcome::Redirecting(_) => "REDIRECTING",
            Outcome::ServiceError(_) => "SERVICE_ERROR",
        }
    }
}

/// An [`Outcome`] together with what was observed on the way to it.
#[derive(Debug)]
pub struct Decision {
    pub outcome: Outcome,
    pub diagnostics: Diagnostics,
}

impl Decision {
    fn new(outcome: Outcome, mut diagnostics: Diagnostics) -> Self {
        diagnostics.state = outcome.state();
        Self {
            outcome,
            diagnostics,
        }
    }
}

/// The verification-gated redirect state machine.
///
/// Every call re-reads the store; nothing about a subject is remembered
/// between requests apart from the shortlink cache inside the resolver.
pub struct RedirectGateway {
    store: Arc<dyn RecordStore>,
    shortlinks: Option<ShortlinkResolver>,
    clock: Arc<dyn Clock>,
    config: GatewayConfig,
    fault: Option<ConfigFault>,
}

impl RedirectGateway {
    /// Creates a gateway on the system clock.
    ///
    /// `shortlinks` is `None` when no shortener credentials are configured,
    /// which is recorded as a configuration fault.
    pub fn new(
        store: Arc<dyn RecordStore>,
        shortlinks: Option<ShortlinkResolver>,
        config: GatewayConfig,
    ) -> Self {
        Self::with_clock(store, shortlinks, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn RecordStore>,
        shortlinks: Option<ShortlinkResolver>,
        config: GatewayConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let fault = if config.bot_username.as_deref().is_none_or(str::is_empty) {
            Some(ConfigFault::MissingBotUsername)
        } else if shortlinks.is_none() {
            Some(ConfigFault::MissingShortener)
        } else {
            None
        };
        Self {
            store,
            shortlinks,
            clock,
            config,
            fault,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The configuration fault detected at construction, if any.
    pub fn config_fault(&self) -> Option<ConfigFault> {
        self.fault
    }

    pub fn shortlinks(&self) -> Option<&ShortlinkResolver> {
        self.shortlinks.as_ref()
    }

    /// Decides the entry request for `(user_id, page_token)`.
    pub async fn verify(&self, raw_user_id: &str, raw_page_token: &str) -> Decision {
        self.decide(raw_user_id, Some(raw_page_token)).await
    }

    /// Query-string form of [`verify`](Self::verify). A missing parameter is
    /// an input fault.
    pub async fn verify_query(
        &self,
        raw_user_id: Option<&str>,
        raw_page_token: Option<&str>,
    ) -> Decision {
        self.decide(raw_user_id.unwrap_or_default(), raw_page_token)
            .await
    }

    async fn decide(&self, raw_user_id: &str, raw_page_token: Option<&str>) -> Decision {
        let mut diagnostics = match raw_page_token {
            Some(raw) => Diagnostics::default().with_page_token(raw),
            None => Diagnostics::default(),
        };

        if let Some(fault) = self.fault {
            warn!(fault = %fault, "verification refused, gateway is misconfigured");
            return Decision::new(
                Outcome::ServiceError(ServiceFault::Misconfigured(fault)),
                diagnostics,
            );
        }

        let Ok(user_id) = validate_user_id(raw_user_id) else {
            debug!("rejecting malformed user id");
            return Decision::new(Outcome::Invalid, diagnostics);
        };
        diagnostics.user_id = Some(user_id.get());

        let Some(raw_page_token) = raw_page_token else {
            debug!(user_id = %user_id, "rejecting request without page token");
            return Decision::new(Outcome::Invalid, diagnostics);
        };

        if !validate_page_token(raw_page_token) {
            debug!(user_id = %user_id, "rejecting malformed page token");
            return Decision::new(Outcome::Rejected, diagnostics);
        }

        let record = match self
            .bounded("get_verification", self.store.get_verification(user_id))
            .await
        {
            Ok(Some(record)) => record,
            Ok(None) => {
                trace!(user_id = %user_id, "no verification record");
                diagnostics.record_found = Some(false);
                return Decision::new(Outcome::NotFound, diagnostics);
            }
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "verification lookup failed");
                return Decision::new(
                    Outcome::ServiceError(ServiceFault::Store(error)),
                    diagnostics,
                );
            }
        };
        diagnostics.record_found = Some(true);

        if !record.matches_page_token(raw_page_token) {
            debug!(
                user_id = %user_id,
                page_token = %mask_token(raw_page_token),
                "page token mismatch"
            );
            return Decision::new(Outcome::Rejected, diagnostics);
        }

        let now = self.clock.now();
        diagnostics.verified = Some(record.is_verified);
        diagnostics.age_secs = Some(record.session_age(now).as_secs());

        if record.is_verified {
            debug!(user_id = %user_id, "subject already verified");
            return Decision::new(Outcome::Verified, diagnostics);
        }

        if record.session_expired(now, self.config.session_ttl) {
            debug!(user_id = %user_id, "verification session expired");
            return Decision::new(Outcome::Expired(ExpiryClock::Session), diagnostics);
        }

        let Some(verify_token) = record.verify_token.as_deref().filter(|t| !t.is_empty()) else {
            debug!(user_id = %user_id, "record has no verify token");
            return Decision::new(Outcome::Rejected, diagnostics);
        };

        trace!(user_id = %user_id, "needs shortlink");
        let outcome = self.shortlink_for(user_id, verify_token).await;
        if let Outcome::Redirecting(target) = &outcome {
            diagnostics.shortened = Some(target.shortened);
            diagnostics.redirect_id = target.redirect_id.as_ref().map(ToString::to_string);
        }
        Decision::new(outcome, diagnostics)
    }

    async fn shortlink_for(&self, user_id: UserId, verify_token: &str) -> Outcome {
        let (Some(deep_link), Some(shortlinks)) =
            (self.config.deep_link(verify_token), self.shortlinks.as_ref())
        else {
            // Guarded by the configuration fault check.
            return Outcome::ServiceError(ServiceFault::Misconfigured(
                ConfigFault::MissingShortener,
            ));
        };

        if !validate_url(&deep_link, &self.config.allowed_domains) {
            warn!(user_id = %user_id, "deep link failed validation");
            return Outcome::Rejected;
        }

        match shortlinks.create(&deep_link).await {
            Ok(short_url) => {
                let record = RedirectRecord::new(user_id, short_url.clone(), self.clock.now());
                let redirect_id = record.redirect_id.clone();
                let redirect_id = match self
                    .bounded("create_redirect", self.store.create_redirect(record))
                    .await
                {
                    Ok(()) => {
                        debug!(user_id = %user_id, redirect_id = %redirect_id, "redirect record created");
                        Some(redirect_id)
                    }
                    Err(error) => {
                        warn!(user_id = %user_id, error = %error, "failed to persist redirect record");
                        None
                    }
                };
                Outcome::Redirecting(RedirectTarget {
                    url: short_url,
                    redirect_id,
                    shortened: true,
                })
            }
            Err(error) if self.config.require_shortlink => {
                warn!(user_id = %user_id, error = %error, "shortening failed and a shortlink is required");
                Outcome::ServiceError(ServiceFault::Shortener(error))
            }
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "shortening failed, serving deep link");
                Outcome::Redirecting(RedirectTarget {
                    url: deep_link,
                    redirect_id: None,
                    shortened: false,
                })
            }
        }
    }

    /// Resumes a previously generated redirect.
    pub async fn resume(&self, raw_redirect_id: Option<&str>) -> Decision {
        let mut diagnostics = Diagnostics::default();

        let Some(redirect_id) = raw_redirect_id.and_then(|raw| RedirectId::parse(raw).ok()) else {
            debug!("rejecting missing or malformed redirect id");
            return Decision::new(Outcome::Invalid, diagnostics);
        };
        diagnostics.redirect_id = Some(redirect_id.to_string());

        let record = match self
            .bounded("get_redirect", self.store.get_redirect(&redirect_id))
            .await
        {
            Ok(Some(record)) if !record.shortlink.is_empty() => record,
            Ok(_) => {
                trace!(redirect_id = %redirect_id, "redirect record not found");
                diagnostics.record_found = Some(false);
                return Decision::new(Outcome::NotFound, diagnostics);
            }
            Err(error) => {
                warn!(redirect_id = %redirect_id, error = %error, "redirect lookup failed");
                return Decision::new(
                    Outcome::ServiceError(ServiceFault::Store(error)),
                    diagnostics,
                );
            }
        };
        diagnostics.record_found = Some(true);
        diagnostics.user_id = Some(record.user_id.get());

        match self
            .bounded("get_verification", self.store.get_verification(record.user_id))
            .await
        {
            Ok(Some(verification)) if verification.is_verified => {
                debug!(redirect_id = %redirect_id, "subject verified since redirect was issued");
                diagnostics.verified = Some(true);
                return Decision::new(Outcome::Verified, diagnostics);
            }
            Ok(_) => diagnostics.verified = Some(false),
            Err(error) => {
                warn!(redirect_id = %redirect_id, error = %error, "verification lookup failed");
                return Decision::new(
                    Outcome::ServiceError(ServiceFault::Store(error)),
                    diagnostics,
                );
            }
        }

        let now = self.clock.now();
        diagnostics.age_secs = Some(now.duration_since(record.created_at).as_secs());
        if record.expired(now, self.config.redirect_ttl) {
            debug!(redirect_id = %redirect_id, "redirect page expired");
            return Decision::new(Outcome::Expired(ExpiryClock::RedirectPage), diagnostics);
        }

        let url = match self.shortlinks.as_ref() {
            Some(shortlinks) => shortlinks.resolve(&record.shortlink).await,
            None => record.shortlink.clone(),
        };
        self.visit(&redirect_id).await;

        diagnostics.shortened = Some(true);
        Decision::new(
            Outcome::Redirecting(RedirectTarget {
                url,
                redirect_id: Some(redirect_id),
                shortened: true,
            }),
            diagnostics,
        )
    }

    /// Flags a redirect record as visited. Never fails the caller.
    pub async fn mark_visited(&self, raw_redirect_id: Option<&str>) {
        match raw_redirect_id.map(RedirectId::parse) {
            Some(Ok(redirect_id)) => self.visit(&redirect_id).await,
            _ => debug!("ignoring mark-visited without a valid id"),
        }
    }

    async fn visit(&self, redirect_id: &RedirectId) {
        if let Err(error) = self
            .bounded("mark_visited", self.store.mark_visited(redirect_id))
            .await
        {
            warn!(redirect_id = %redirect_id, error = %error, "failed to mark redirect visited");
        }
    }

    /// Probes the record store.
    pub async fn health(&self) -> Result<(), StoreError> {
        self.bounded("health_check", self.store.health_check())
            .await
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.config.store_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(operation.to_string()))?
    }
}
