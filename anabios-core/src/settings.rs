//! Typed settings on top of the persistent store
//!
//! Wraps a [`PersistentStore`] with the one-time init (including the
//! erase-and-reinit recovery path) and typed accessors for every stored
//! value. Values are postcard-encoded.

use anabios_hal::radio::{MAX_PASSWORD_LEN, MAX_SSID_LEN};
use anabios_hal::{Namespace, PersistentStore, StoreError, StoreKey};
use heapless::String;

use crate::config::MAX_REVISION_LEN;
use crate::network::Credentials;

/// Largest encoded value (password plus length prefix)
const MAX_VALUE_SIZE: usize = MAX_PASSWORD_LEN + 8;

/// Settings errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Underlying store failed
    Store(StoreError),
    /// No station credentials stored
    NotProvisioned,
    /// Stored value could not be encoded or decoded
    Encoding,
    /// String longer than its slot
    TooLong,
}

impl From<StoreError> for SettingsError {
    fn from(e: StoreError) -> Self {
        SettingsError::Store(e)
    }
}

/// Typed settings manager
///
/// The store is opened per operation; no state is held between calls apart
/// from whether `init` has succeeded.
pub struct Settings<S> {
    store: S,
    initialized: bool,
}

impl<S: PersistentStore> Settings<S> {
    /// Create a settings manager; the store is initialized lazily
    pub fn new(store: S) -> Self {
        Self {
            store,
            initialized: false,
        }
    }

    /// Access the underlying store
    pub fn store(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give the store back
    pub fn into_store(self) -> S {
        self.store
    }

    /// Check if the store has been initialized
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Initialize the store once
    ///
    /// If the partition is full or has an incompatible layout, it is erased
    /// and initialized again. Later calls are no-ops.
    pub async fn ensure_initialized(&mut self) -> Result<(), SettingsError> {
        if self.initialized {
            return Ok(());
        }

        match self.store.init().await {
            Ok(()) => {}
            Err(e) if e.needs_erase() => {
                warn!("[lifecycle] store init issue ({:?}); attempting erase", e);
                if let Err(erase_err) = self.store.erase_partition().await {
                    error!("[lifecycle] failed to erase store while recovering init: {:?}", erase_err);
                    return Err(erase_err.into());
                }
                self.store.init().await.map_err(|e| {
                    error!("[lifecycle] failed to initialise store: {:?}", e);
                    SettingsError::from(e)
                })?;
            }
            Err(e) => {
                error!("[lifecycle] failed to initialise store: {:?}", e);
                return Err(e.into());
            }
        }

        self.initialized = true;
        Ok(())
    }

    /// Load the durable restart counter; absent means zero
    pub async fn load_restart_count(&mut self) -> Result<u32, SettingsError> {
        Ok(self.load_u32(StoreKey::RestartCount).await?.unwrap_or(0))
    }

    /// Persist the restart counter and commit
    pub async fn save_restart_count(&mut self, value: u32) -> Result<(), SettingsError> {
        self.save_u32(StoreKey::RestartCount, value).await
    }

    /// Record the update-requested flag and commit
    pub async fn set_update_requested(&mut self, requested: bool) -> Result<(), SettingsError> {
        self.ensure_initialized().await?;
        self.store
            .write(StoreKey::UpdateRequested, &[u8::from(requested)])
            .await?;
        self.store.commit(Namespace::Lifecycle).await?;
        Ok(())
    }

    /// Read the update-requested flag; absent means false
    pub async fn update_requested(&mut self) -> Result<bool, SettingsError> {
        self.ensure_initialized().await?;
        let mut buffer = [0u8; 1];
        match self.store.read(StoreKey::UpdateRequested, &mut buffer).await {
            Ok(1) => Ok(buffer[0] != 0),
            Ok(_) => Err(SettingsError::Encoding),
            Err(StoreError::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Load station credentials
    ///
    /// A missing SSID is [`SettingsError::NotProvisioned`]; a missing
    /// password means an open network.
    pub async fn load_credentials(&mut self) -> Result<Credentials, SettingsError> {
        let ssid = match self.load_str::<MAX_SSID_LEN>(StoreKey::Ssid).await? {
            Some(ssid) => ssid,
            None => return Err(SettingsError::NotProvisioned),
        };
        let password = self
            .load_str::<MAX_PASSWORD_LEN>(StoreKey::Password)
            .await?
            .unwrap_or_default();
        Ok(Credentials { ssid, password })
    }

    /// Store station credentials and commit
    pub async fn store_credentials(&mut self, ssid: &str, password: &str) -> Result<(), SettingsError> {
        if ssid.len() > MAX_SSID_LEN || password.len() > MAX_PASSWORD_LEN {
            return Err(SettingsError::TooLong);
        }
        self.write_str(StoreKey::Ssid, ssid).await?;
        self.write_str(StoreKey::Password, password).await?;
        self.store.commit(Namespace::Network).await?;
        Ok(())
    }

    /// Remove both credential keys; keys already absent are fine
    pub async fn erase_credentials(&mut self) -> Result<(), SettingsError> {
        self.ensure_initialized().await?;
        let mut result = Ok(());
        for key in [StoreKey::Ssid, StoreKey::Password] {
            match self.store.erase_key(key).await {
                Ok(()) | Err(StoreError::NotFound) => {}
                Err(e) => {
                    warn!("[lifecycle] failed to erase {}: {:?}", key.name(), e);
                    if result.is_ok() {
                        result = Err(e.into());
                    }
                }
            }
        }
        if let Err(e) = self.store.commit(Namespace::Network).await {
            warn!("[lifecycle] failed to commit credential erase: {:?}", e);
            if result.is_ok() {
                result = Err(e.into());
            }
        }
        result
    }

    /// Erase a whole namespace and commit
    pub async fn clear_namespace(&mut self, namespace: Namespace) -> Result<(), SettingsError> {
        self.ensure_initialized().await?;
        self.store.erase_namespace(namespace).await?;
        self.store.commit(namespace).await?;
        Ok(())
    }

    /// Load the recorded firmware version
    pub async fn load_installed_version(&mut self) -> Result<Option<String<MAX_REVISION_LEN>>, SettingsError> {
        self.load_str(StoreKey::InstalledVersion).await
    }

    /// Record the installed firmware version and commit
    pub async fn store_installed_version(&mut self, version: &str) -> Result<(), SettingsError> {
        if version.len() > MAX_REVISION_LEN {
            return Err(SettingsError::TooLong);
        }
        self.write_str(StoreKey::InstalledVersion, version).await?;
        self.store.commit(Namespace::Firmware).await?;
        Ok(())
    }

    /// Deinitialize and erase the whole store
    ///
    /// The next operation initializes it again from scratch.
    pub async fn wipe(&mut self) -> Result<(), SettingsError> {
        let mut result = Ok(());
        match self.store.deinit().await {
            Ok(()) | Err(StoreError::NotInitialized) => {}
            Err(e) => {
                warn!("[lifecycle] store deinit failed: {:?}", e);
                result = Err(e.into());
            }
        }
        self.initialized = false;

        if let Err(e) = self.store.erase_partition().await {
            error!("[lifecycle] store erase failed: {:?}", e);
            if result.is_ok() {
                result = Err(e.into());
            }
        }
        result
    }

    async fn load_u32(&mut self, key: StoreKey) -> Result<Option<u32>, SettingsError> {
        self.ensure_initialized().await?;
        let mut buffer = [0u8; MAX_VALUE_SIZE];
        match self.store.read(key, &mut buffer).await {
            Ok(len) => postcard::from_bytes(&buffer[..len])
                .map(Some)
                .map_err(|_| SettingsError::Encoding),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_u32(&mut self, key: StoreKey, value: u32) -> Result<(), SettingsError> {
        self.ensure_initialized().await?;
        let mut buffer = [0u8; MAX_VALUE_SIZE];
        let encoded = postcard::to_slice(&value, &mut buffer).map_err(|_| SettingsError::Encoding)?;
        self.store.write(key, encoded).await?;
        self.store.commit(key.namespace()).await?;
        Ok(())
    }

    async fn load_str<const N: usize>(&mut self, key: StoreKey) -> Result<Option<String<N>>, SettingsError> {
        self.ensure_initialized().await?;
        let mut buffer = [0u8; MAX_VALUE_SIZE];
        let len = match self.store.read(key, &mut buffer).await {
            Ok(len) => len,
            Err(StoreError::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value: &str = postcard::from_bytes(&buffer[..len]).map_err(|_| SettingsError::Encoding)?;
        String::try_from(value)
            .map(Some)
            .map_err(|_| SettingsError::TooLong)
    }

    async fn write_str(&mut self, key: StoreKey, value: &str) -> Result<(), SettingsError> {
        self.ensure_initialized().await?;
        let mut buffer = [0u8; MAX_VALUE_SIZE];
        let encoded = postcard::to_slice(value, &mut buffer).map_err(|_| SettingsError::Encoding)?;
        self.store.write(key, encoded).await?;
        Ok(())
    }
}
