//! Persistent store abstractions
//!
//! Provides a namespaced key/value store that survives power loss.
//! Implementations handle wear leveling and data integrity; callers only
//! see typed keys grouped by namespace.

/// Storage namespaces
///
/// Every key belongs to exactly one namespace so a whole group can be
/// erased at once (e.g. during a factory reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Namespace {
    /// Restart counter mirror and update flag
    Lifecycle = 0,
    /// Station credentials
    Network = 1,
    /// Installed firmware metadata
    Firmware = 2,
}

impl Namespace {
    /// All namespaces, in storage order
    pub const ALL: [Namespace; 3] = [Namespace::Lifecycle, Namespace::Network, Namespace::Firmware];

    /// Namespace name as used in logs
    pub fn name(self) -> &'static str {
        match self {
            Namespace::Lifecycle => "lifecycle",
            Namespace::Network => "network",
            Namespace::Firmware => "firmware",
        }
    }

    /// Keys stored in this namespace
    pub fn keys(self) -> &'static [StoreKey] {
        match self {
            Namespace::Lifecycle => &[StoreKey::RestartCount, StoreKey::UpdateRequested],
            Namespace::Network => &[StoreKey::Ssid, StoreKey::Password],
            Namespace::Firmware => &[StoreKey::InstalledVersion],
        }
    }
}

/// Storage keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StoreKey {
    /// Durable mirror of the restart counter (u32)
    RestartCount = 0,
    /// Update requested flag (u8 bool)
    UpdateRequested = 1,
    /// Station SSID (string)
    Ssid = 2,
    /// Station password (string, absent or empty means open network)
    Password = 3,
    /// Last recorded firmware version (string)
    InstalledVersion = 4,
}

impl StoreKey {
    /// Namespace owning this key
    pub fn namespace(self) -> Namespace {
        match self {
            StoreKey::RestartCount | StoreKey::UpdateRequested => Namespace::Lifecycle,
            StoreKey::Ssid | StoreKey::Password => Namespace::Network,
            StoreKey::InstalledVersion => Namespace::Firmware,
        }
    }

    /// Key name within its namespace
    pub fn name(self) -> &'static str {
        match self {
            StoreKey::RestartCount => "restart_count",
            StoreKey::UpdateRequested => "do_update",
            StoreKey::Ssid => "ssid",
            StoreKey::Password => "password",
            StoreKey::InstalledVersion => "installed_ver",
        }
    }

    /// Get the key as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a key from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StoreKey::RestartCount),
            1 => Some(StoreKey::UpdateRequested),
            2 => Some(StoreKey::Ssid),
            3 => Some(StoreKey::Password),
            4 => Some(StoreKey::InstalledVersion),
            _ => None,
        }
    }
}

/// Errors from persistent store operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Store used before a successful `init`
    NotInitialized,
    /// No free pages left; the partition must be erased
    NoFreePages,
    /// Partition was written by an incompatible layout; must be erased
    NewVersionFound,
    /// Key not found
    NotFound,
    /// Buffer too small for the stored value
    BufferTooSmall,
    /// Data corrupted or not decodable
    Corrupted,
    /// Storage is full
    Full,
    /// Low-level flash operation failed
    Flash,
}

impl StoreError {
    /// Whether `init` failed in a way that erase-and-reinit can repair
    pub fn needs_erase(self) -> bool {
        matches!(self, StoreError::NoFreePages | StoreError::NewVersionFound)
    }
}

/// Persistent store trait
///
/// Writes become durable only once `commit` for the key's namespace has
/// returned `Ok`. Implementations backed by an append-only log may commit
/// eagerly and treat `commit` as a no-op.
pub trait PersistentStore {
    /// Bring the store up
    ///
    /// Returns [`StoreError::NoFreePages`] or [`StoreError::NewVersionFound`]
    /// when the partition must be erased before it can be used.
    fn init(&mut self) -> impl core::future::Future<Output = Result<(), StoreError>>;

    /// Release the store; `init` must be called again before further use
    fn deinit(&mut self) -> impl core::future::Future<Output = Result<(), StoreError>>;

    /// Erase the whole storage partition
    fn erase_partition(&mut self) -> impl core::future::Future<Output = Result<(), StoreError>>;

    /// Read a value by key into the provided buffer
    ///
    /// # Returns
    /// The number of bytes read, or an error.
    fn read(
        &mut self,
        key: StoreKey,
        buffer: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, StoreError>>;

    /// Write a value by key
    fn write(
        &mut self,
        key: StoreKey,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), StoreError>>;

    /// Remove a single key; [`StoreError::NotFound`] if it was absent
    fn erase_key(&mut self, key: StoreKey) -> impl core::future::Future<Output = Result<(), StoreError>>;

    /// Remove every key of a namespace
    fn erase_namespace(
        &mut self,
        namespace: Namespace,
    ) -> impl core::future::Future<Output = Result<(), StoreError>>;

    /// Make pending writes of a namespace durable
    fn commit(&mut self, namespace: Namespace) -> impl core::future::Future<Output = Result<(), StoreError>>;
}

// Implement the sequential-storage Key trait when the feature is enabled
#[cfg(feature = "sequential-storage")]
impl sequential_storage::map::Key for StoreKey {
    fn serialize_into(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, sequential_storage::map::SerializationError> {
        if buffer.len() < 2 {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        buffer[0] = self.namespace() as u8;
        buffer[1] = self.as_u8();
        Ok(2)
    }

    fn deserialize_from(
        buffer: &[u8],
    ) -> Result<(Self, usize), sequential_storage::map::SerializationError> {
        if buffer.len() < 2 {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        match StoreKey::from_u8(buffer[1]) {
            Some(key) if key.namespace() as u8 == buffer[0] => Ok((key, 2)),
            _ => Err(sequential_storage::map::SerializationError::InvalidFormat),
        }
    }
}
