//! The proxy software the router drives.

use std::sync::Arc;

use uuid::Uuid;

/// Callback the host invokes to pick a backend for an arriving player.
pub type ReconnectTarget = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Adapter over the proxy's own server registry and player list.
///
/// All methods are synchronous and expected to be cheap: they run on the
/// controller link task between reads.
pub trait ProxyHost: Send + Sync + 'static {
    /// A connected player.
    type Player: Send;
    /// A registered backend server.
    type Backend: Send;

    /// Adds a backend, replacing any existing one with the same name.
    fn register_backend(&self, name: &str, address: &str, port: u16);

    /// Removes a backend. Returns `false` if no backend had that name.
    fn deregister_backend(&self, name: &str) -> bool;

    fn lookup_backend(&self, name: &str) -> Option<Self::Backend>;

    /// The `ip:port` players connect to; sent as `Authentication.ip`.
    fn listener_address(&self) -> String;

    fn find_player(&self, id: Uuid) -> Option<Self::Player>;

    /// Connects `player` to `backend`.
    fn move_player(&self, player: Self::Player, backend: Self::Backend);

    /// Installs the hook consulted whenever a player arrives or must be
    /// rerouted. Called once, when the router is created.
    fn set_reconnect_target(&self, target: ReconnectTarget);
}
