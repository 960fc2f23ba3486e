//! Station network manager
//!
//! Drives the radio from stored credentials and link events:
//!
//! ```text
//! Stopped --start()--> Starting --Started--> Connecting --AddressAcquired--> Connected
//!                                                ^                              |
//!                                                +--------Disconnected----------+
//! ```
//!
//! Reconnects are unconditional and without backoff. The ready callback
//! runs once per successful connection.

use anabios_hal::radio::{MAX_PASSWORD_LEN, MAX_SSID_LEN};
use anabios_hal::{AuthMode, LinkEvent, PersistentStore, RadioError, StationConfig, StationRadio};
use heapless::String;

use crate::settings::{Settings, SettingsError};

/// Callback run when the station has an address
pub type ReadyCallback = fn();

/// Stored station credentials
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Credentials {
    /// Network name
    pub ssid: String<MAX_SSID_LEN>,
    /// Passphrase, empty for open networks
    pub password: String<MAX_PASSWORD_LEN>,
}

impl Credentials {
    /// Security mode implied by the passphrase
    pub fn auth_mode(&self) -> AuthMode {
        if self.password.is_empty() {
            AuthMode::Open
        } else {
            AuthMode::Wpa2Personal
        }
    }

    /// Radio configuration for these credentials
    pub fn station_config(&self) -> StationConfig {
        StationConfig {
            ssid: self.ssid.clone(),
            password: self.password.clone(),
            auth: self.auth_mode(),
        }
    }
}

/// Network manager state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkState {
    /// Radio down
    Stopped,
    /// Radio started, waiting for the interface
    Starting,
    /// Associating (or reassociating)
    Connecting,
    /// Address acquired
    Connected,
}

/// Network manager errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkError {
    /// No stored credentials; the caller should enter provisioning
    NotProvisioned,
    /// Credentials could not be loaded
    Settings(SettingsError),
    /// Radio operation failed
    Radio(RadioError),
}

impl From<SettingsError> for NetworkError {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::NotProvisioned => NetworkError::NotProvisioned,
            other => NetworkError::Settings(other),
        }
    }
}

impl From<RadioError> for NetworkError {
    fn from(e: RadioError) -> Self {
        NetworkError::Radio(e)
    }
}

/// Station network manager
pub struct NetworkManager<R> {
    radio: R,
    state: NetworkState,
    on_ready: Option<ReadyCallback>,
    handlers_registered: bool,
}

impl<R: StationRadio> NetworkManager<R> {
    /// Create a stopped manager
    pub fn new(radio: R) -> Self {
        Self {
            radio,
            state: NetworkState::Stopped,
            on_ready: None,
            handlers_registered: false,
        }
    }

    /// Current state
    pub fn state(&self) -> NetworkState {
        self.state
    }

    /// Whether the radio has been started
    pub fn is_started(&self) -> bool {
        self.state != NetworkState::Stopped
    }

    /// Access the radio
    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Access the radio mutably
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Give the radio back
    pub fn into_radio(self) -> R {
        self.radio
    }

    /// Start the station from stored credentials
    ///
    /// When already started, only the ready callback is replaced. Missing
    /// credentials return [`NetworkError::NotProvisioned`] before the radio
    /// is touched.
    pub async fn start<S: PersistentStore>(
        &mut self,
        settings: &mut Settings<S>,
        on_ready: ReadyCallback,
    ) -> Result<(), NetworkError> {
        if self.is_started() {
            self.on_ready = Some(on_ready);
            info!("[network] already started");
            return Ok(());
        }

        let credentials = match settings.load_credentials().await {
            Ok(credentials) => credentials,
            Err(SettingsError::NotProvisioned) => {
                warn!("[network] no stored credentials; provisioning required");
                return Err(NetworkError::NotProvisioned);
            }
            Err(e) => {
                error!("[network] failed to load credentials: {:?}", e);
                return Err(e.into());
            }
        };
        let config = credentials.station_config();

        match self.radio.init_stack().await {
            Ok(()) | Err(RadioError::AlreadyInitialized) => {}
            Err(e) => {
                error!("[network] failed to init interface stack: {:?}", e);
                return Err(e.into());
            }
        }

        if let Err(e) = self.bring_up(&config).await {
            error!("[network] start failed: {:?}", e);
            self.drop_handlers();
            return Err(e.into());
        }

        self.on_ready = Some(on_ready);
        self.state = NetworkState::Starting;
        info!("[network] started (station), connecting to '{}'", config.ssid.as_str());
        Ok(())
    }

    async fn bring_up(&mut self, config: &StationConfig) -> Result<(), RadioError> {
        self.radio.register_handlers()?;
        self.handlers_registered = true;
        self.radio.configure(config).await?;
        self.radio.start().await
    }

    /// Feed a link event into the state machine
    ///
    /// Events are ignored while the manager is stopped.
    pub async fn handle_event(&mut self, event: LinkEvent) {
        if !self.handlers_registered {
            trace!("[network] ignoring {:?} while stopped", event);
            return;
        }

        match event {
            LinkEvent::Started => {
                info!("[network] interface started, connecting");
                self.state = NetworkState::Connecting;
                self.connect().await;
            }
            LinkEvent::Disconnected { reason } => {
                warn!("[network] disconnected (reason={}), reconnecting", reason);
                self.state = NetworkState::Connecting;
                self.connect().await;
            }
            LinkEvent::AddressAcquired { address } => {
                info!(
                    "[network] got address {}.{}.{}.{}",
                    address[0],
                    address[1],
                    address[2],
                    address[3]
                );
                if self.state == NetworkState::Connected {
                    return;
                }
                self.state = NetworkState::Connected;
                if let Some(on_ready) = self.on_ready {
                    on_ready();
                }
            }
        }
    }

    async fn connect(&mut self) {
        if let Err(e) = self.radio.connect().await {
            warn!("[network] connect attempt failed: {:?}", e);
        }
    }

    /// Tear the station down
    ///
    /// Every step runs; the first failure is returned but the manager always
    /// ends up [`NetworkState::Stopped`].
    pub async fn stop(&mut self) -> Result<(), NetworkError> {
        if !self.is_started() {
            return Ok(());
        }

        info!("[network] stopping");
        let mut result = Ok(());
        let mut keep_first = |step: &str, outcome: Result<(), RadioError>| match outcome {
            Ok(()) | Err(RadioError::NotStarted) | Err(RadioError::NotInitialized) => {}
            Err(e) => {
                warn!("[network] {} failed: {:?}", step, e);
                if result.is_ok() {
                    result = Err(NetworkError::Radio(e));
                }
            }
        };

        keep_first("disconnect", self.radio.disconnect().await);
        keep_first("stop", self.radio.stop().await);
        let unregister = match self.radio.unregister_handlers() {
            Err(RadioError::InvalidState) => Ok(()),
            other => other,
        };
        keep_first("unregister handlers", unregister);
        keep_first("release", self.radio.release().await);

        self.handlers_registered = false;
        self.state = NetworkState::Stopped;
        self.on_ready = None;
        info!("[network] stopped");
        result
    }

    /// Clear configuration the radio stack persisted internally
    pub async fn restore_defaults(&mut self) -> Result<(), NetworkError> {
        self.radio.restore_defaults().await.map_err(|e| {
            warn!("[network] restore defaults failed: {:?}", e);
            NetworkError::Radio(e)
        })
    }

    fn drop_handlers(&mut self) {
        if self.handlers_registered {
            if let Err(e) = self.radio.unregister_handlers() {
                warn!("[network] failed to unregister handlers: {:?}", e);
            }
            self.handlers_registered = false;
        }
    }
}
