//! WalletSession: connection state kept in step with the wallet provider.
//!
//! Every update, whether it comes from an `accountsChanged` notification, from
//! `connect`, or from `disconnect`, replaces the account part of [`WalletState`]
//! in one write on a `watch` channel, so readers never observe an account without
//! the connected flag or the reverse.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use nftmarket_types::{AccountsHandler, Address, Subscription, WalletProvider};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::MarketError;

/// Connection state. `connected` holds exactly when an account is present.
/// `connecting` is set while a `connect` prompt is outstanding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalletState {
    connected: bool,
    account: Option<Address>,
    connecting: bool,
}

impl WalletState {
    pub const fn disconnected() -> Self {
        Self {
            connected: false,
            account: None,
            connecting: false,
        }
    }

    pub const fn connected(account: Address) -> Self {
        Self {
            connected: true,
            account: Some(account),
            connecting: false,
        }
    }

    /// State for a provider account list: first entry wins, empty means disconnected.
    pub fn from_accounts(accounts: &[String]) -> Result<Self, MarketError> {
        match accounts.first() {
            Some(raw) => Ok(Self::connected(Address::from_hex(raw)?)),
            None => Ok(Self::disconnected()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting
    }
}

/// Channel plus the write generation. Every account write bumps the generation
/// inside the channel's write lock.
struct StateFeed {
    tx: watch::Sender<WalletState>,
    generation: AtomicU64,
    pending_connects: AtomicUsize,
}

impl StateFeed {
    fn new() -> Self {
        let (tx, _) = watch::channel(WalletState::disconnected());
        Self {
            tx,
            generation: AtomicU64::new(0),
            pending_connects: AtomicUsize::new(0),
        }
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Replaces the account part, keeping the `connecting` flag.
    fn apply(&self, next: WalletState) {
        self.tx.send_modify(|current| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *current = WalletState {
                connecting: current.connecting,
                ..next
            };
        });
    }

    /// Like [`Self::apply`], but only if nothing was written since `seen`.
    fn apply_if_unchanged(&self, seen: u64, next: WalletState) -> bool {
        self.tx.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != seen {
                return false;
            }
            self.generation.fetch_add(1, Ordering::SeqCst);
            *current = WalletState {
                connecting: current.connecting,
                ..next
            };
            true
        })
    }
}

/// Holds `connecting` up for one `connect` call, on every exit path.
struct ConnectingGuard<'a> {
    feed: &'a StateFeed,
}

impl<'a> ConnectingGuard<'a> {
    fn enter(feed: &'a StateFeed) -> Self {
        feed.tx.send_if_modified(|current| {
            feed.pending_connects.fetch_add(1, Ordering::SeqCst);
            let was = current.connecting;
            current.connecting = true;
            !was
        });
        Self { feed }
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        let feed = self.feed;
        feed.tx.send_if_modified(|current| {
            let remaining = feed.pending_connects.fetch_sub(1, Ordering::SeqCst) - 1;
            let was = current.connecting;
            current.connecting = remaining > 0;
            was != current.connecting
        });
    }
}

pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    feed: Arc<StateFeed>,
    subscription: Mutex<Option<Subscription>>,
}

impl WalletSession {
    /// Disconnected session, not yet listening. Call [`Self::activate`] to start.
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider,
            feed: Arc::new(StateFeed::new()),
            subscription: Mutex::new(None),
        }
    }

    /// Shared provider handle, for components that issue calls but never listen.
    pub fn provider(&self) -> Arc<dyn WalletProvider> {
        Arc::clone(&self.provider)
    }

    /// Registers the account listener and silently picks up already-authorized
    /// accounts. With no provider present this is a no-op and never fails.
    ///
    /// The startup answer is dropped if any notification, `connect`, or
    /// `disconnect` was applied while it was outstanding.
    pub async fn activate(&self) {
        if !self.provider.is_available() {
            debug!("no wallet provider present; staying disconnected");
            return;
        }
        self.ensure_subscribed();

        let seen = self.feed.generation();
        let accounts = match self.provider.current_accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                warn!(error = %err, "initial account query failed");
                return;
            }
        };
        let state = match WalletState::from_accounts(&accounts) {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "ignoring malformed authorized account");
                return;
            }
        };
        if self.feed.apply_if_unchanged(seen, state) {
            info!(account = ?state.account(), "initial wallet state");
        } else {
            debug!("wallet state changed during startup query; keeping it");
        }
    }

    fn ensure_subscribed(&self) {
        let mut slot = self
            .subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            return;
        }

        let feed = Arc::clone(&self.feed);
        let handler: AccountsHandler = Arc::new(move |accounts: Vec<String>| {
            let next = WalletState::from_accounts(&accounts).unwrap_or_else(|err| {
                warn!(error = %err, "accountsChanged carried a malformed account; disconnecting");
                WalletState::disconnected()
            });
            info!(account = ?next.account(), "accounts changed");
            feed.apply(next);
        });
        *slot = Some(self.provider.subscribe_accounts(handler));
    }

    /// Latest known state. Never blocks.
    pub fn current_state(&self) -> WalletState {
        *self.feed.tx.borrow()
    }

    /// Change feed for UI bindings; the receiver starts at the current state.
    pub fn subscribe(&self) -> watch::Receiver<WalletState> {
        self.feed.tx.subscribe()
    }

    /// Prompts the wallet for account access. `connecting` is set on the feed
    /// until this call returns or is dropped.
    pub async fn connect(&self) -> Result<WalletState, MarketError> {
        if !self.provider.is_available() {
            return Err(MarketError::ProviderUnavailable);
        }
        self.ensure_subscribed();
        let _connecting = ConnectingGuard::enter(&self.feed);

        let accounts = self
            .provider
            .request_accounts()
            .await
            .map_err(MarketError::from_account_request)?;
        let next = WalletState::from_accounts(&accounts)?;
        if !next.is_connected() {
            return Err(MarketError::UserRejected(
                "wallet authorized no accounts".to_string(),
            ));
        }
        info!(account = ?next.account(), "wallet connected");
        self.feed.apply(next);
        Ok(next)
    }

    /// Clears the session's view of the wallet. Wallet-side authorization is untouched.
    pub fn disconnect(&self) {
        info!("wallet disconnected by user");
        self.feed.apply(WalletState::disconnected());
    }

    /// Releases the account listener. Dropping the session does the same.
    pub fn close(&self) {
        let released = self
            .subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(subscription) = released {
            subscription.unsubscribe();
            debug!("account listener released");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use nftmarket_mock::MockWalletProvider;
    use nftmarket_types::{
        AccountsHandler, Address, ProviderError, Subscription, TxHash, TxReceipt, WalletProvider,
    };
    use tokio::sync::Notify;

    use super::{WalletSession, WalletState};
    use crate::error::{ErrorKind, MarketError};

    /// Wallet that never notifies and parks the chosen calls until released.
    #[derive(Default)]
    struct GatedWallet {
        hold_queries: bool,
        hold_requests: bool,
        queries: Notify,
        requests: Notify,
    }

    #[async_trait]
    impl WalletProvider for GatedWallet {
        fn is_available(&self) -> bool {
            true
        }

        async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
            if self.hold_requests {
                self.requests.notified().await;
            }
            Ok(vec![ALICE.to_string()])
        }

        async fn current_accounts(&self) -> Result<Vec<String>, ProviderError> {
            if self.hold_queries {
                self.queries.notified().await;
            }
            Ok(Vec::new())
        }

        fn subscribe_accounts(&self, _handler: AccountsHandler) -> Subscription {
            Subscription::noop()
        }

        async fn await_finality(&self, _tx_hash: TxHash) -> Result<TxReceipt, ProviderError> {
            Err(ProviderError::Internal("no chain".to_string()))
        }
    }

    const ALICE: &str = "0xA11CE000000000000000000000000000000A11CE";
    const BOB: &str = "0xB0B0000000000000000000000000000000000B0B";

    fn session(provider: &MockWalletProvider) -> WalletSession {
        WalletSession::new(Arc::new(provider.clone()))
    }

    #[tokio::test]
    async fn starts_disconnected_before_activation() {
        let provider = MockWalletProvider::new(vec![ALICE.to_string()]);
        provider.preauthorize(vec![ALICE.to_string()]);
        let session = session(&provider);
        assert_eq!(session.current_state(), WalletState::disconnected());
    }

    #[tokio::test]
    async fn activation_picks_up_authorized_account_in_lower_case() {
        let provider = MockWalletProvider::new(vec![ALICE.to_string()]);
        provider.preauthorize(vec![ALICE.to_string()]);
        let session = session(&provider);
        session.activate().await;

        let state = session.current_state();
        assert!(state.is_connected());
        assert_eq!(
            state.account().unwrap().to_string(),
            "0xa11ce000000000000000000000000000000a11ce"
        );
        assert_eq!(provider.request_count(), 0, "activation must not prompt");
    }

    #[tokio::test]
    async fn activation_without_provider_is_silent() {
        let provider = MockWalletProvider::unavailable();
        let session = session(&provider);
        session.activate().await;
        assert_eq!(session.current_state(), WalletState::disconnected());
        assert_eq!(provider.listener_count(), 0);
    }

    #[tokio::test]
    async fn connect_without_provider_fails() {
        let session = session(&MockWalletProvider::unavailable());
        assert_eq!(
            session.connect().await.unwrap_err(),
            MarketError::ProviderUnavailable
        );
    }

    #[tokio::test]
    async fn rejected_connect_leaves_session_usable() {
        let provider = MockWalletProvider::new(vec![ALICE.to_string()]);
        let session = session(&provider);
        session.activate().await;

        provider.reject_next_request("User rejected the request.");
        let err = session.connect().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserRejected);
        assert!(!session.current_state().is_connected());

        let state = session.connect().await.expect("retry should connect");
        assert_eq!(state.account(), Some(Address::from_hex(ALICE).unwrap()));
        assert_eq!(session.current_state(), state);
    }

    #[tokio::test]
    async fn final_state_tracks_last_notification() {
        let provider = MockWalletProvider::new(vec![ALICE.to_string(), BOB.to_string()]);
        let session = session(&provider);
        session.activate().await;

        let sequences: Vec<Vec<String>> = vec![
            vec![ALICE.to_string()],
            vec![BOB.to_string(), ALICE.to_string()],
            vec![],
            vec![ALICE.to_string(), BOB.to_string()],
            vec![],
            vec![BOB.to_string()],
        ];
        for accounts in sequences {
            provider.emit_accounts_changed(accounts.clone());
            let state = session.current_state();
            assert_eq!(state.is_connected(), !accounts.is_empty());
            assert_eq!(
                state.account(),
                accounts.first().map(|raw| Address::from_hex(raw).unwrap())
            );
        }
    }

    #[tokio::test]
    async fn one_transition_per_notification() {
        let provider = MockWalletProvider::new(vec![ALICE.to_string()]);
        let session = session(&provider);
        session.activate().await;
        let mut rx = session.subscribe();
        rx.borrow_and_update();

        provider.emit_accounts_changed(vec![ALICE.to_string()]);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_connected());
        assert!(!rx.has_changed().unwrap());

        provider.emit_accounts_changed(vec![]);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), WalletState::disconnected());
    }

    #[tokio::test]
    async fn malformed_notification_disconnects() {
        let provider = MockWalletProvider::new(vec![ALICE.to_string()]);
        let session = session(&provider);
        session.activate().await;
        session.connect().await.unwrap();

        provider.emit_accounts_changed(vec!["not-an-address".to_string()]);
        assert_eq!(session.current_state(), WalletState::disconnected());
    }

    #[tokio::test]
    async fn listener_released_on_close_and_drop() {
        let provider = MockWalletProvider::new(vec![ALICE.to_string()]);
        let session = session(&provider);
        session.activate().await;
        session.activate().await;
        assert_eq!(provider.listener_count(), 1, "activation is idempotent");

        session.close();
        assert_eq!(provider.listener_count(), 0);

        let session = self::session(&provider);
        session.activate().await;
        assert_eq!(provider.listener_count(), 1);
        drop(session);
        assert_eq!(provider.listener_count(), 0);
    }

    #[tokio::test]
    async fn disconnect_is_local() {
        let provider = MockWalletProvider::new(vec![ALICE.to_string()]);
        let session = session(&provider);
        session.connect().await.unwrap();
        session.disconnect();
        assert!(!session.current_state().is_connected());

        provider.emit_accounts_changed(vec![ALICE.to_string()]);
        assert!(session.current_state().is_connected());
    }

    #[tokio::test]
    async fn connect_during_startup_query_is_not_overwritten() {
        let wallet = Arc::new(GatedWallet {
            hold_queries: true,
            ..GatedWallet::default()
        });
        let session = WalletSession::new(Arc::clone(&wallet) as Arc<dyn WalletProvider>);

        let ((), connected) = tokio::join!(session.activate(), async {
            let connected = session.connect().await;
            wallet.queries.notify_one();
            connected
        });

        assert!(connected.unwrap().is_connected());
        let state = session.current_state();
        assert!(state.is_connected(), "stale startup answer replaced {state:?}");
        assert_eq!(state.account(), Some(Address::from_hex(ALICE).unwrap()));
    }

    #[tokio::test]
    async fn disconnect_during_startup_query_is_not_overwritten() {
        let wallet = Arc::new(GatedWallet {
            hold_queries: true,
            ..GatedWallet::default()
        });
        let session = WalletSession::new(Arc::clone(&wallet) as Arc<dyn WalletProvider>);
        session.connect().await.unwrap();

        let mut rx = session.subscribe();
        rx.borrow_and_update();
        tokio::join!(session.activate(), async {
            session.disconnect();
            wallet.queries.notify_one();
        });

        assert_eq!(session.current_state(), WalletState::disconnected());
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
        assert!(!rx.has_changed().unwrap(), "startup answer must not publish");
    }

    #[tokio::test]
    async fn connecting_flag_spans_the_prompt() {
        let wallet = Arc::new(GatedWallet {
            hold_requests: true,
            ..GatedWallet::default()
        });
        let session = WalletSession::new(Arc::clone(&wallet) as Arc<dyn WalletProvider>);
        let mut rx = session.subscribe();
        assert!(!rx.borrow().is_connecting());

        let (connected, seen) = tokio::join!(session.connect(), async {
            let seen = *rx.wait_for(|state| state.is_connecting()).await.unwrap();
            wallet.requests.notify_one();
            seen
        });

        assert!(!seen.is_connected());
        let state = connected.unwrap();
        assert!(!state.is_connecting());
        assert_eq!(session.current_state(), state);
    }

    #[tokio::test]
    async fn connecting_flag_cleared_on_rejection_and_abandonment() {
        let provider = MockWalletProvider::new(vec![ALICE.to_string()]);
        let session = session(&provider);
        provider.reject_next_request("User rejected the request.");
        assert!(session.connect().await.is_err());
        assert!(!session.current_state().is_connecting());

        let wallet = Arc::new(GatedWallet {
            hold_requests: true,
            ..GatedWallet::default()
        });
        let session = WalletSession::new(wallet as Arc<dyn WalletProvider>);
        let abandoned = tokio::time::timeout(Duration::from_millis(20), session.connect()).await;
        assert!(abandoned.is_err());
        assert!(!session.current_state().is_connecting());
        assert!(!session.current_state().is_connected());
    }
}
