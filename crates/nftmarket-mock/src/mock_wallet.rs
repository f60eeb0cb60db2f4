//! MockWalletProvider: scripted account authorization, change notifications, and finality.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use nftmarket_types::{
    AccountsHandler, ProviderError, Subscription, TxHash, TxReceipt, WalletProvider,
};
use tokio::sync::watch;
use tracing::debug;

#[derive(Default)]
struct WalletInner {
    available: bool,
    /// Accounts the wallet holds and grants on `request_accounts`.
    wallet_accounts: Vec<String>,
    /// Accounts currently authorized for the dapp.
    authorized: Vec<String>,
    reject_next_request: Option<String>,
    fail_next_finality: Option<ProviderError>,
    revert_next_finality: bool,
    listeners: HashMap<u64, AccountsHandler>,
    next_listener_id: u64,
    block_number: u64,
    request_count: usize,
}

/// Shared-handle mock; clones observe and drive the same wallet.
#[derive(Clone)]
pub struct MockWalletProvider {
    inner: Arc<Mutex<WalletInner>>,
    finality_held: Arc<watch::Sender<bool>>,
}

impl MockWalletProvider {
    /// Available wallet holding `accounts`, none of them authorized yet.
    pub fn new(accounts: Vec<String>) -> Self {
        let (finality_held, _) = watch::channel(false);
        Self {
            inner: Arc::new(Mutex::new(WalletInner {
                available: true,
                wallet_accounts: accounts,
                ..WalletInner::default()
            })),
            finality_held: Arc::new(finality_held),
        }
    }

    /// No wallet agent installed.
    pub fn unavailable() -> Self {
        let provider = Self::new(Vec::new());
        provider.set_available(false);
        provider
    }

    fn lock(&self) -> MutexGuard<'_, WalletInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Marks accounts as already authorized, as if connected in an earlier visit.
    pub fn preauthorize(&self, accounts: Vec<String>) {
        self.lock().authorized = accounts;
    }

    pub fn reject_next_request(&self, message: impl Into<String>) {
        self.lock().reject_next_request = Some(message.into());
    }

    pub fn fail_next_finality(&self, err: ProviderError) {
        self.lock().fail_next_finality = Some(err);
    }

    pub fn revert_next_finality(&self) {
        self.lock().revert_next_finality = true;
    }

    /// Blocks `await_finality` until [`Self::release_finality`] is called.
    pub fn hold_finality(&self) {
        self.finality_held.send_replace(true);
    }

    pub fn release_finality(&self) {
        self.finality_held.send_replace(false);
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn request_count(&self) -> usize {
        self.lock().request_count
    }

    /// Pushes an `accountsChanged` notification to every registered listener.
    pub fn emit_accounts_changed(&self, accounts: Vec<String>) {
        let handlers: Vec<AccountsHandler> = {
            let mut inner = self.lock();
            inner.authorized = accounts.clone();
            inner.listeners.values().cloned().collect()
        };
        debug!(listeners = handlers.len(), accounts = accounts.len(), "emitting accountsChanged");
        for handler in handlers {
            handler(accounts.clone());
        }
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    fn is_available(&self) -> bool {
        self.lock().available
    }

    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        let granted = {
            let mut inner = self.lock();
            inner.request_count += 1;
            if !inner.available {
                return Err(ProviderError::Unavailable);
            }
            if let Some(message) = inner.reject_next_request.take() {
                return Err(ProviderError::from_rpc(
                    ProviderError::USER_REJECTED_CODE,
                    message,
                ));
            }
            if inner.authorized == inner.wallet_accounts {
                return Ok(inner.authorized.clone());
            }
            inner.wallet_accounts.clone()
        };
        // Wallets announce newly authorized accounts to every listener.
        self.emit_accounts_changed(granted.clone());
        Ok(granted)
    }

    async fn current_accounts(&self) -> Result<Vec<String>, ProviderError> {
        let inner = self.lock();
        if !inner.available {
            return Err(ProviderError::Unavailable);
        }
        Ok(inner.authorized.clone())
    }

    fn subscribe_accounts(&self, handler: AccountsHandler) -> Subscription {
        let id = {
            let mut inner = self.lock();
            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            inner.listeners.insert(id, handler);
            id
        };
        let registry = Arc::clone(&self.inner);
        Subscription::new(move || {
            let mut inner = registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            inner.listeners.remove(&id);
        })
    }

    async fn await_finality(&self, tx_hash: TxHash) -> Result<TxReceipt, ProviderError> {
        let mut held = self.finality_held.subscribe();
        if held.wait_for(|held| !*held).await.is_err() {
            return Err(ProviderError::Internal("finality gate closed".to_string()));
        }

        let mut inner = self.lock();
        if let Some(err) = inner.fail_next_finality.take() {
            return Err(err);
        }
        inner.block_number += 1;
        let success = !std::mem::take(&mut inner.revert_next_finality);
        Ok(TxReceipt {
            tx_hash,
            block_number: inner.block_number,
            success,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use nftmarket_types::{ProviderError, TxHash, WalletProvider};

    use super::MockWalletProvider;

    fn account() -> String {
        "0xA11CE000000000000000000000000000000A11CE".to_string()
    }

    #[tokio::test]
    async fn request_accounts_authorizes_and_notifies() {
        let provider = MockWalletProvider::new(vec![account()]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = provider.subscribe_accounts(Arc::new(move |accounts: Vec<String>| {
            sink.lock().unwrap().push(accounts);
        }));

        assert!(provider.current_accounts().await.unwrap().is_empty());
        assert_eq!(provider.request_accounts().await.unwrap(), vec![account()]);
        assert_eq!(provider.current_accounts().await.unwrap(), vec![account()]);
        assert_eq!(seen.lock().unwrap().as_slice(), &[vec![account()]]);
    }

    #[tokio::test]
    async fn scripted_rejection_and_unavailability() {
        let provider = MockWalletProvider::new(vec![account()]);
        provider.reject_next_request("User denied account authorization");
        assert!(provider.request_accounts().await.unwrap_err().is_user_rejection());

        provider.set_available(false);
        assert_eq!(
            provider.request_accounts().await.unwrap_err(),
            ProviderError::Unavailable
        );
    }

    #[tokio::test]
    async fn dropping_subscription_removes_listener() {
        let provider = MockWalletProvider::new(vec![account()]);
        let sub = provider.subscribe_accounts(Arc::new(|_: Vec<String>| {}));
        assert_eq!(provider.listener_count(), 1);
        drop(sub);
        assert_eq!(provider.listener_count(), 0);
    }

    #[tokio::test]
    async fn finality_reports_reverts() {
        let provider = MockWalletProvider::new(vec![account()]);
        let tx = TxHash::new([0x11; 32]);
        assert!(provider.await_finality(tx).await.unwrap().success);
        provider.revert_next_finality();
        let receipt = provider.await_finality(tx).await.unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.block_number, 2);
    }
}
