use crate::celo::{NetworkParams, ALFAJORES_CHAIN_ID};
use crate::model::{WalletState, WalletStatus};
use crate::provider::{ProviderEvent, WalletProvider};
use crate::session::{SessionCache, WALLETCONNECT_DEEPLINK_KEY, WALLETCONNECT_SESSION_KEY};
use crate::utils;
use alloy::primitives::Address;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Disposal handle for a provider event subscription. Dropping or
/// disposing it tears the subscription down.
pub struct EventSubscription {
    handle: JoinHandle<()>,
}

impl EventSubscription {
    pub fn dispose(self) {
        self.handle.abort();
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Connection lifecycle against a wallet provider handle.
///
/// The provider is injected and optional; `None` models the wallet not
/// being installed at all. Session state is shared with the background
/// event handler, which reacts to account, chain and disconnect events
/// pushed by the provider.
pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    cache: Arc<dyn SessionCache>,
    state: Arc<Mutex<WalletState>>,
    reload_requested: Arc<AtomicBool>,
    subscription: Option<EventSubscription>,
}

impl WalletSession {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, cache: Arc<dyn SessionCache>) -> Self {
        Self {
            provider,
            cache,
            state: Arc::new(Mutex::new(WalletState::default())),
            reload_requested: Arc::new(AtomicBool::new(false)),
            subscription: None,
        }
    }

    /// Install the provider event subscription and pick up an already
    /// exposed account, if any, without an explicit user action.
    pub async fn start(&mut self) {
        let Some(provider) = self.provider.clone() else {
            return;
        };

        if self.subscription.is_none() {
            self.subscription = Some(spawn_event_handler(
                provider.clone(),
                self.state.clone(),
                self.cache.clone(),
                self.reload_requested.clone(),
            ));
        }

        if let Ok(accounts) = provider.accounts().await {
            if let Some(account) = accounts.first() {
                debug!("Provider already connected to {account}");
                let mut state = self.state.lock().unwrap();
                *state = WalletState {
                    status: WalletStatus::Connected,
                    account: Some(*account),
                    error: None,
                };
            }
        }
    }

    /// Request account permission and the active account list. Returns
    /// whether the session ended up connected.
    pub async fn connect(&mut self) -> bool {
        let Some(provider) = self.provider.clone() else {
            self.set_error("No wallet detected. Please install MiniPay.");
            return false;
        };

        self.state.lock().unwrap().status = WalletStatus::Connecting;

        // Force the wallet to show its account selector
        if let Err(e) = provider.request_permissions().await {
            error!("Wallet connection error: {e}");
            self.set_error(&e.message);
            return false;
        }

        match provider.accounts().await {
            Ok(accounts) => match accounts.first() {
                Some(account) => {
                    info!(
                        "Wallet connected: {}",
                        utils::truncate_address(&account.to_string())
                    );
                    let mut state = self.state.lock().unwrap();
                    *state = WalletState {
                        status: WalletStatus::Connected,
                        account: Some(*account),
                        error: None,
                    };
                    true
                }
                None => {
                    self.set_error("No accounts found");
                    false
                }
            },
            Err(e) => {
                error!("Wallet connection error: {e}");
                self.set_error(&e.message);
                false
            }
        }
    }

    /// Tear down the event subscription, reset state and purge cached
    /// wallet-connection session data.
    pub fn disconnect(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.dispose();
        }
        reset_state(&self.state);
        purge_session_cache(self.cache.as_ref());
    }

    /// Ask the provider to switch to Alfajores; if the chain is unknown to
    /// it, add the chain definition and retry. Never fails the caller,
    /// only reports success.
    pub async fn switch_to_alfajores(&self) -> bool {
        let Some(provider) = &self.provider else {
            return false;
        };

        match provider.switch_chain(ALFAJORES_CHAIN_ID).await {
            Ok(()) => true,
            Err(e) if e.is_unrecognized_chain() => {
                debug!("Provider does not know Alfajores, adding the chain definition");
                match provider.add_chain(&NetworkParams::alfajores()).await {
                    Ok(()) => provider.switch_chain(ALFAJORES_CHAIN_ID).await.is_ok(),
                    Err(add_err) => {
                        error!("Failed to add Alfajores network: {add_err}");
                        false
                    }
                }
            }
            Err(e) => {
                error!("Failed to switch network: {e}");
                false
            }
        }
    }

    pub fn state(&self) -> WalletState {
        self.state.lock().unwrap().clone()
    }

    pub fn status(&self) -> WalletStatus {
        self.state.lock().unwrap().status
    }

    pub fn account(&self) -> Option<Address> {
        self.state.lock().unwrap().account
    }

    /// Whether a chain change invalidated the session's cached
    /// chain-dependent configuration.
    pub fn reload_requested(&self) -> bool {
        self.reload_requested.load(Ordering::SeqCst)
    }

    fn set_error(&self, message: &str) {
        let mut state = self.state.lock().unwrap();
        *state = WalletState {
            status: WalletStatus::Error,
            account: None,
            error: Some(message.to_string()),
        };
    }
}

fn spawn_event_handler(
    provider: Arc<dyn WalletProvider>,
    state: Arc<Mutex<WalletState>>,
    cache: Arc<dyn SessionCache>,
    reload_requested: Arc<AtomicBool>,
) -> EventSubscription {
    let mut events = provider.subscribe();

    let handle = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ProviderEvent::AccountsChanged(accounts)) => match accounts.first() {
                    None => {
                        debug!("Provider reports no accounts, disconnecting");
                        reset_state(&state);
                        purge_session_cache(cache.as_ref());
                    }
                    Some(account) => {
                        debug!("Active account changed to {account}");
                        let mut state = state.lock().unwrap();
                        state.status = WalletStatus::Connected;
                        state.account = Some(*account);
                    }
                },
                Ok(ProviderEvent::ChainChanged(chain_id)) => {
                    // Chain-dependent config is cached at session setup;
                    // the whole context has to be rebuilt.
                    warn!("Provider chain changed to {chain_id}, session reload required");
                    reload_requested.store(true, Ordering::SeqCst);
                }
                Ok(ProviderEvent::Disconnect) => {
                    debug!("Provider disconnected");
                    reset_state(&state);
                    purge_session_cache(cache.as_ref());
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Dropped {skipped} provider events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    EventSubscription { handle }
}

fn reset_state(state: &Mutex<WalletState>) {
    *state.lock().unwrap() = WalletState::default();
}

fn purge_session_cache(cache: &dyn SessionCache) {
    cache.remove(WALLETCONNECT_SESSION_KEY);
    cache.remove(WALLETCONNECT_DEEPLINK_KEY);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use crate::provider::{ProviderError, UNRECOGNIZED_CHAIN_CODE, USER_REJECTED_CODE};
    use crate::session::MemorySessionCache;
    use std::time::Duration;

    fn account(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn session_with(
        provider: Arc<MockProvider>,
    ) -> (WalletSession, Arc<MemorySessionCache>) {
        let cache = Arc::new(MemorySessionCache::new());
        let session = WalletSession::new(Some(provider), cache.clone());
        (session, cache)
    }

    fn seed_cache(cache: &MemorySessionCache) {
        cache.set(WALLETCONNECT_SESSION_KEY, "session-blob");
        cache.set(WALLETCONNECT_DEEPLINK_KEY, "native");
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn connect_without_provider_reports_missing_wallet() {
        let cache = Arc::new(MemorySessionCache::new());
        let mut session = WalletSession::new(None, cache);

        assert!(!session.connect().await);
        let state = session.state();
        assert_eq!(state.status, WalletStatus::Error);
        assert_eq!(
            state.error.as_deref(),
            Some("No wallet detected. Please install MiniPay.")
        );
    }

    #[tokio::test]
    async fn connect_selects_first_account() {
        let provider = Arc::new(MockProvider::new(vec![account(0x11), account(0x22)]));
        let (mut session, _) = session_with(provider);

        assert!(session.connect().await);
        let state = session.state();
        assert_eq!(state.status, WalletStatus::Connected);
        assert_eq!(state.account, Some(account(0x11)));
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn connect_fails_on_empty_account_list() {
        let provider = Arc::new(MockProvider::new(vec![]));
        let (mut session, _) = session_with(provider);

        assert!(!session.connect().await);
        let state = session.state();
        assert_eq!(state.status, WalletStatus::Error);
        assert_eq!(state.error.as_deref(), Some("No accounts found"));
    }

    #[tokio::test]
    async fn connect_surfaces_user_rejection() {
        let provider = Arc::new(MockProvider::new(vec![account(0x11)]));
        *provider.permission_result.lock().unwrap() = Err(ProviderError::new(
            USER_REJECTED_CODE,
            "User rejected the request",
        ));
        let (mut session, _) = session_with(provider);

        assert!(!session.connect().await);
        let state = session.state();
        assert_eq!(state.status, WalletStatus::Error);
        assert_eq!(state.error.as_deref(), Some("User rejected the request"));
    }

    #[tokio::test]
    async fn start_picks_up_existing_connection() {
        let provider = Arc::new(MockProvider::new(vec![account(0x11)]));
        let (mut session, _) = session_with(provider);

        session.start().await;
        assert_eq!(session.status(), WalletStatus::Connected);
        assert_eq!(session.account(), Some(account(0x11)));
    }

    #[tokio::test]
    async fn disconnect_resets_state_and_purges_cache() {
        let provider = Arc::new(MockProvider::new(vec![account(0x11)]));
        let (mut session, cache) = session_with(provider);
        seed_cache(&cache);

        session.start().await;
        session.connect().await;
        session.disconnect();

        assert_eq!(session.status(), WalletStatus::Disconnected);
        assert_eq!(session.account(), None);
        assert_eq!(cache.get(WALLETCONNECT_SESSION_KEY), None);
        assert_eq!(cache.get(WALLETCONNECT_DEEPLINK_KEY), None);
    }

    #[tokio::test]
    async fn disconnect_purges_cache_even_when_never_connected() {
        let provider = Arc::new(MockProvider::new(vec![]));
        let (mut session, cache) = session_with(provider);
        seed_cache(&cache);

        session.disconnect();

        assert_eq!(session.status(), WalletStatus::Disconnected);
        assert_eq!(cache.get(WALLETCONNECT_SESSION_KEY), None);
        assert_eq!(cache.get(WALLETCONNECT_DEEPLINK_KEY), None);
    }

    #[tokio::test]
    async fn empty_accounts_event_disconnects() {
        let provider = Arc::new(MockProvider::new(vec![account(0x11)]));
        let (mut session, cache) = session_with(provider.clone());
        seed_cache(&cache);

        session.start().await;
        assert_eq!(session.status(), WalletStatus::Connected);

        provider.emit(ProviderEvent::AccountsChanged(vec![]));
        settle().await;

        assert_eq!(session.status(), WalletStatus::Disconnected);
        assert_eq!(cache.get(WALLETCONNECT_SESSION_KEY), None);
        assert_eq!(cache.get(WALLETCONNECT_DEEPLINK_KEY), None);
    }

    #[tokio::test]
    async fn accounts_changed_event_updates_account() {
        let provider = Arc::new(MockProvider::new(vec![account(0x11)]));
        let (mut session, _) = session_with(provider.clone());

        session.start().await;
        provider.emit(ProviderEvent::AccountsChanged(vec![account(0x22)]));
        settle().await;

        assert_eq!(session.status(), WalletStatus::Connected);
        assert_eq!(session.account(), Some(account(0x22)));
    }

    #[tokio::test]
    async fn chain_changed_event_requests_reload() {
        let provider = Arc::new(MockProvider::new(vec![account(0x11)]));
        let (mut session, _) = session_with(provider.clone());

        session.start().await;
        assert!(!session.reload_requested());

        provider.emit(ProviderEvent::ChainChanged(1));
        settle().await;

        assert!(session.reload_requested());
    }

    #[tokio::test]
    async fn disconnect_event_resets_session() {
        let provider = Arc::new(MockProvider::new(vec![account(0x11)]));
        let (mut session, cache) = session_with(provider.clone());
        seed_cache(&cache);

        session.start().await;
        provider.emit(ProviderEvent::Disconnect);
        settle().await;

        assert_eq!(session.status(), WalletStatus::Disconnected);
        assert_eq!(cache.get(WALLETCONNECT_SESSION_KEY), None);
    }

    #[tokio::test]
    async fn switch_succeeds_directly() {
        let provider = Arc::new(MockProvider::new(vec![account(0x11)]));
        let (session, _) = session_with(provider.clone());

        assert!(session.switch_to_alfajores().await);
        assert_eq!(
            provider.add_chain_calls.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[tokio::test]
    async fn switch_falls_back_to_adding_the_chain() {
        let provider = Arc::new(MockProvider::new(vec![account(0x11)]));
        *provider.switch_results.lock().unwrap() = vec![
            Err(ProviderError::new(
                UNRECOGNIZED_CHAIN_CODE,
                "Unrecognized chain ID",
            )),
            Ok(()),
        ];
        let (session, _) = session_with(provider.clone());

        assert!(session.switch_to_alfajores().await);
        assert_eq!(
            provider.add_chain_calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn switch_degrades_to_false_when_chain_cannot_be_added() {
        let provider = Arc::new(MockProvider::new(vec![account(0x11)]));
        *provider.switch_results.lock().unwrap() = vec![Err(ProviderError::new(
            UNRECOGNIZED_CHAIN_CODE,
            "Unrecognized chain ID",
        ))];
        *provider.add_chain_result.lock().unwrap() =
            Err(ProviderError::rpc("user declined to add the chain"));
        let (session, _) = session_with(provider);

        assert!(!session.switch_to_alfajores().await);
    }

    #[tokio::test]
    async fn switch_does_not_add_chain_on_other_errors() {
        let provider = Arc::new(MockProvider::new(vec![account(0x11)]));
        *provider.switch_results.lock().unwrap() = vec![Err(ProviderError::new(
            USER_REJECTED_CODE,
            "User rejected the request",
        ))];
        let (session, _) = session_with(provider.clone());

        assert!(!session.switch_to_alfajores().await);
        assert_eq!(
            provider.add_chain_calls.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }
}
