use tokio::sync::watch;

/// Credentials the host hands over once the viewer is authorized.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub channel_id: String,
    pub client_id: String,
    pub helix_token: String,
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("channel_id", &self.channel_id)
            .field("client_id", &self.client_id)
            .field("helix_token", &"<redacted>")
            .finish()
    }
}

/// Latest-value broadcast of the host's auth context.
///
/// Late subscribers see the most recent value immediately; `None` until the
/// host has authorized at least once.
#[derive(Clone)]
pub struct AuthEvents {
    tx: watch::Sender<Option<AuthContext>>,
}

impl AuthEvents {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn set(&self, auth: AuthContext) {
        tracing::debug!(channel_id = %auth.channel_id, "auth context updated");
        self.tx.send_replace(Some(auth));
    }

    pub fn get(&self) -> Option<AuthContext> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AuthContext>> {
        self.tx.subscribe()
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait until an auth context is present and return it.
///
/// Returns `None` only if the sending side has gone away.
pub async fn authorized(rx: &mut watch::Receiver<Option<AuthContext>>) -> Option<AuthContext> {
    rx.wait_for(Option::is_some).await.ok()?.clone()
}
