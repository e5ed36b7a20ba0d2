use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::Session;
use super::store::{CredentialStore, StoredCredentials};
use crate::api::{AnalyzeResponse, AuthResponse, CannonApi, CheckoutSession, ScanImages};
use crate::app::{Config, PaymentConfig};
use crate::forms::{LoginForm, OnboardingForm, SignupForm};
use crate::gate::GateRouter;
use crate::runtime::SubmitGuard;
use crate::utils::{CannonError, CannonResult};

/// Owns the session and every operation that changes it
///
/// The session is published on a watch channel; routers and views hold
/// receivers and never write to it. Every logout bumps a generation counter;
/// a request that started before a logout never publishes its result.
pub struct SessionProvider {
    api: Arc<dyn CannonApi>,
    store: CredentialStore,
    session: watch::Sender<Session>,
    logouts: Mutex<u64>,
    restore_attempts: u32,
    restore_backoff: Duration,
    payment: PaymentConfig,
    auth: SubmitGuard,
    onboarding: SubmitGuard,
    scan: SubmitGuard,
    checkout: SubmitGuard,
}

impl SessionProvider {
    /// Start in the restoring state; call [`SessionProvider::restore`] next
    pub fn new(api: Arc<dyn CannonApi>, store: CredentialStore, config: &Config) -> Self {
        let (session, _) = watch::channel(Session::restoring());
        Self {
            api,
            store,
            session,
            logouts: Mutex::new(0),
            restore_attempts: config.session.restore_attempts.max(1),
            restore_backoff: config.session.restore_backoff(),
            payment: config.payment.clone(),
            auth: SubmitGuard::new("Sign in"),
            onboarding: SubmitGuard::new("Saving onboarding"),
            scan: SubmitGuard::new("Face scan"),
            checkout: SubmitGuard::new("Checkout"),
        }
    }

    pub fn current(&self) -> Session {
        *self.session.borrow()
    }

    /// Receiver notified on every session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// A gate router tracking this provider's session
    pub fn router(&self) -> GateRouter {
        GateRouter::new(self.subscribe())
    }

    /// Email of the stored account, if any
    pub fn stored_email(&self) -> Option<String> {
        self.store.load().ok().flatten().and_then(|c| c.email)
    }

    fn publish(&self, session: Session) -> Session {
        self.session.send_replace(session);
        session
    }

    fn generation(&self) -> u64 {
        *self.logouts.lock()
    }

    /// Runs `f` unless a logout happened after `generation` was read
    fn unless_signed_out<R>(&self, generation: u64, f: impl FnOnce() -> R) -> Option<R> {
        let logouts = self.logouts.lock();
        (*logouts == generation).then(f)
    }

    fn signed_out_meanwhile() -> CannonError {
        CannonError::Authorization("Signed out before the request completed".to_string())
    }

    /// Resolve stored credentials into a session
    ///
    /// An expired token signs out. Transport and server failures are retried;
    /// if every attempt fails the session stays loading and
    /// [`CannonError::RestoreFailed`] is returned so the caller can retry.
    pub async fn restore(&self) -> CannonResult<Session> {
        let generation = self.generation();
        self.publish(Session::restoring());

        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!("ignoring unreadable credentials: {}", e);
                self.forget_credentials();
                None
            }
        };

        let Some(stored) = stored else {
            debug!("no stored credentials");
            self.api.set_token(None);
            return Ok(self.publish(Session::signed_out()));
        };

        self.api.set_token(Some(stored.token));

        let mut reason = String::new();
        for attempt in 1..=self.restore_attempts {
            let result = self.api.current_user().await;
            let settled = self.unless_signed_out(generation, || match result {
                Ok(user) => {
                    info!("restored session for {}", user.email);
                    Some(self.publish(Session::from_user(&user)))
                }
                Err(e) if e.is_authorization() => {
                    info!("stored token rejected, signing out: {}", e.detail());
                    self.forget_credentials();
                    Some(self.publish(Session::signed_out()))
                }
                Err(e) => {
                    warn!(
                        "session restore attempt {}/{} failed: {}",
                        attempt, self.restore_attempts, e
                    );
                    reason = e.detail();
                    None
                }
            });

            match settled {
                Some(Some(session)) => return Ok(session),
                Some(None) => {}
                None => {
                    debug!("signed out during restore; dropping the result");
                    return Ok(self.current());
                }
            }
            if attempt < self.restore_attempts {
                tokio::time::sleep(self.restore_backoff).await;
            }
        }

        if self.generation() != generation {
            return Ok(self.current());
        }

        Err(CannonError::RestoreFailed {
            attempts: self.restore_attempts,
            reason,
        })
    }

    pub async fn login(&self, form: &LoginForm) -> CannonResult<Session> {
        form.validate()?;
        let _in_flight = self.auth.try_begin()?;
        let generation = self.generation();

        let auth = self.api.login(form.email(), &form.password).await?;
        self.sign_in(auth, generation)
    }

    pub async fn signup(&self, form: &SignupForm) -> CannonResult<Session> {
        form.validate()?;
        let _in_flight = self.auth.try_begin()?;
        let generation = self.generation();

        let auth = self.api.signup(form.email(), &form.password).await?;
        self.sign_in(auth, generation)
    }

    fn sign_in(&self, auth: AuthResponse, generation: u64) -> CannonResult<Session> {
        self.unless_signed_out(generation, || {
            self.store.save(&StoredCredentials {
                token: auth.access_token.clone(),
                email: Some(auth.user.email.clone()),
            })?;
            self.api.set_token(Some(auth.access_token.clone()));

            info!("signed in as {}", auth.user.email);
            Ok(self.publish(Session::from_user(&auth.user)))
        })
        .unwrap_or_else(|| Err(Self::signed_out_meanwhile()))
    }

    /// Drop credentials and every progress flag; works from any state
    pub fn logout(&self) -> Session {
        let mut logouts = self.logouts.lock();
        *logouts += 1;
        self.forget_credentials();
        info!("signed out");
        self.publish(Session::signed_out())
    }

    fn forget_credentials(&self) {
        if let Err(e) = self.store.clear() {
            warn!("failed to clear stored credentials: {}", e);
        }
        self.api.set_token(None);
    }

    /// Re-fetch the user and re-derive the session
    ///
    /// A rejected token signs out and still returns the error; any other
    /// failure leaves the session untouched.
    pub async fn refresh_user(&self) -> CannonResult<Session> {
        let generation = self.generation();
        let result = self.api.current_user().await;
        let user = match result {
            Ok(user) => user,
            Err(e) if e.is_authorization() => {
                warn!("token rejected during refresh, signing out");
                self.logout();
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        self.unless_signed_out(generation, || self.publish(Session::from_user(&user)))
            .ok_or_else(Self::signed_out_meanwhile)
    }

    pub async fn complete_onboarding(&self, form: &OnboardingForm) -> CannonResult<Session> {
        let request = form.to_request()?;
        let _in_flight = self.onboarding.try_begin()?;

        self.api.save_onboarding(&request).await?;
        self.refresh_user().await
    }

    /// Upload the three photos, run analysis, then pick up the new flags
    ///
    /// The backend records the first scan on upload, so the session is
    /// refreshed even when analysis fails.
    pub async fn complete_scan(&self, images: &ScanImages) -> CannonResult<AnalyzeResponse> {
        let _in_flight = self.scan.try_begin()?;

        let upload = self.api.upload_scan_images(images).await?;
        debug!("uploaded scan {}", upload.scan_id);

        let analysis = self.api.analyze_scan(&upload.scan_id).await;
        let refreshed = self.refresh_user().await;

        let analysis = analysis?;
        refreshed?;
        Ok(analysis)
    }

    /// Open a checkout session using the configured return links
    ///
    /// Payment completes outside the app; call
    /// [`SessionProvider::refresh_user`] afterwards to pick up activation.
    pub async fn start_checkout(&self) -> CannonResult<CheckoutSession> {
        let _in_flight = self.checkout.try_begin()?;
        self.api
            .create_checkout_session(&self.payment.return_url, &self.payment.cancel_url)
            .await
    }

    /// Development-only bypass that marks the account paid
    pub async fn activate_test_subscription(&self) -> CannonResult<Session> {
        if !self.payment.allow_test_activation {
            return Err(CannonError::Validation(
                "Test activation is disabled (set payment.allow_test_activation)".to_string(),
            ));
        }
        let _in_flight = self.checkout.try_begin()?;

        let status = self.api.test_activate_subscription().await?;
        debug!("test subscription status: {:?}", status.status);
        self.refresh_user().await
    }
}
