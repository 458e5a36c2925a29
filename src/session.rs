//! Wallet session: who is connected, and remembering it across runs.
//!
//! A [`Session`] is a plain value. Persistence goes through [`SessionStore`],
//! keyed by application name, so several sessions (or tests) can coexist.

use crate::clarity::Principal;
use crate::config::Network;
use crate::error::{Result, TipJarError};
use crate::types::WalletState;
use crate::wallet::{AppDetails, Wallet};

#[cfg(feature = "native")]
use rusqlite::{params, Connection, OptionalExtension};
#[cfg(feature = "native")]
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub app_id: String,
    pub address: String,
    pub network: Network,
    pub connected_at_ms: i64,
}

pub trait SessionStore: Send + Sync {
    fn load(&self, app_id: &str) -> Result<Option<StoredSession>>;
    fn save(&self, session: &StoredSession) -> Result<()>;
    fn clear(&self, app_id: &str) -> Result<()>;
}

/// Store for tests and one-shot runs; forgets everything on drop.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: std::sync::Mutex<std::collections::HashMap<String, StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, std::collections::HashMap<String, StoredSession>> {
        // A poisoned map is still a valid map.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, app_id: &str) -> Result<Option<StoredSession>> {
        Ok(self.map().get(app_id).cloned())
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        self.map().insert(session.app_id.clone(), session.clone());
        Ok(())
    }

    fn clear(&self, app_id: &str) -> Result<()> {
        self.map().remove(app_id);
        Ok(())
    }
}

#[cfg(feature = "native")]
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

#[cfg(feature = "native")]
impl SqliteSessionStore {
    /// Open (or create) the session database. `":memory:"` works for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "busy_timeout", 250)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions(
                app_id          TEXT PRIMARY KEY,
                address         TEXT NOT NULL,
                network         TEXT NOT NULL,
                connected_at_ms INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TipJarError::Session("session database lock poisoned".into()))
    }
}

#[cfg(feature = "native")]
impl SessionStore for SqliteSessionStore {
    fn load(&self, app_id: &str) -> Result<Option<StoredSession>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT address, network, connected_at_ms FROM sessions WHERE app_id = ?1",
                params![app_id],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((address, network, connected_at_ms)) = row else {
            return Ok(None);
        };
        let network = network
            .parse::<Network>()
            .map_err(|e| TipJarError::Session(e.to_string()))?;
        Ok(Some(StoredSession {
            app_id: app_id.to_string(),
            address,
            network,
            connected_at_ms,
        }))
    }

    fn save(&self, s: &StoredSession) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO sessions(app_id, address, network, connected_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![s.app_id, s.address, s.network.to_string(), s.connected_at_ms],
        )?;
        Ok(())
    }

    fn clear(&self, app_id: &str) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM sessions WHERE app_id = ?1", params![app_id])?;
        Ok(())
    }
}

/// A checksum-valid single-sig address for `network`, returned in canonical
/// c32check form (upper case, no Crockford substitutes).
pub fn validate_address(address: &str, network: Network) -> Result<String> {
    match Principal::parse(address.trim()) {
        Ok(p @ Principal::Standard { version, .. }) if network.accepts_version(version) => {
            Ok(p.to_string())
        }
        Ok(Principal::Standard { .. }) => Err(TipJarError::Validation(format!(
            "{address} is not a {network} address"
        ))),
        Ok(Principal::Contract { .. }) => Err(TipJarError::Validation(format!(
            "{address} is a contract, not a wallet address"
        ))),
        Err(e) => Err(TipJarError::Validation(format!("{address}: {e}"))),
    }
}

pub struct Session {
    store: Box<dyn SessionStore>,
    app: AppDetails,
    network: Network,
    address: Option<String>,
}

impl Session {
    /// Starts disconnected; call [`Session::restore`] to pick up a stored session.
    pub fn new(store: Box<dyn SessionStore>, app: AppDetails, network: Network) -> Self {
        Self {
            store,
            app,
            network,
            address: None,
        }
    }

    pub fn app(&self) -> &AppDetails {
        &self.app
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    pub fn current_address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn wallet_state(&self) -> WalletState {
        match &self.address {
            Some(a) => WalletState::connected(a.clone()),
            None => WalletState::default(),
        }
    }

    /// Load a persisted session. A stored session for another network, or
    /// with an address that no longer validates, is ignored.
    pub fn restore(&mut self) -> Result<Option<&str>> {
        let Some(stored) = self.store.load(&self.app.name)? else {
            return Ok(None);
        };
        if stored.network != self.network {
            log::info!(
                "Stored session is for {}, running on {}; ignoring",
                stored.network,
                self.network
            );
            return Ok(None);
        }
        let address = match validate_address(&stored.address, self.network) {
            Ok(address) => address,
            Err(e) => {
                log::warn!("Discarding stored session: {e}");
                self.store.clear(&self.app.name)?;
                return Ok(None);
            }
        };
        log::info!("Restored session for {address}");
        self.address = Some(address);
        Ok(self.current_address())
    }

    /// Interactive connect through the wallet. Picks the address for the
    /// configured network from the wallet's reply.
    pub async fn connect<W: Wallet + ?Sized>(&mut self, wallet: &W) -> Result<String> {
        let user = wallet.connect(&self.app).await?;
        let address = user.address_for(self.network).to_string();
        self.connect_with_address(&address)
    }

    /// Connect without a wallet round-trip, e.g. an address typed on the
    /// command line. The address must be checksum-valid for this network;
    /// the canonical spelling is what gets stored and used as the sender.
    pub fn connect_with_address(&mut self, address: &str) -> Result<String> {
        let address = validate_address(address, self.network)?;
        self.store.save(&StoredSession {
            app_id: self.app.name.clone(),
            address: address.clone(),
            network: self.network,
            connected_at_ms: chrono::Utc::now().timestamp_millis(),
        })?;
        log::info!("Connected as {address}");
        self.address = Some(address.clone());
        Ok(address)
    }

    /// Sign out. The in-memory address is dropped even if the store fails.
    pub fn disconnect(&mut self) -> Result<()> {
        self.address = None;
        self.store.clear(&self.app.name)?;
        log::info!("Disconnected");
        Ok(())
    }
}
