//! Settings store on RP2040 flash
//!
//! Uses sequential-storage for wear-leveled key-value storage in
//! [`STORE_RANGE`](crate::flash::STORE_RANGE). Items are durable once
//! `store_item` returns, so `commit` has nothing left to do. Removing a key
//! writes an empty value; readers treat an empty value as absent.

use anabios_hal::{Namespace, PersistentStore, StoreError, StoreKey};
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

use crate::flash::{SharedFlash, STORE_RANGE, STORE_START};

/// Largest stored value
const MAX_ITEM_SIZE: usize = 128;

/// Probe key used by `init` to validate the partition
const PROBE_KEY: StoreKey = StoreKey::RestartCount;

/// RP2040 persistent store
pub struct Rp2040Store {
    flash: &'static SharedFlash,
    initialized: bool,
}

impl Rp2040Store {
    /// Create a store on the shared flash driver
    pub fn new(flash: &'static SharedFlash) -> Self {
        Self {
            flash,
            initialized: false,
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.initialized {
            Ok(())
        } else {
            Err(StoreError::NotInitialized)
        }
    }

    async fn fetch(&mut self, key: StoreKey, buffer: &mut [u8]) -> Result<usize, StoreError> {
        let mut data_buffer = [0u8; MAX_ITEM_SIZE];
        let mut flash = self.flash.lock().await;

        let result = map::fetch_item::<StoreKey, &[u8], _>(
            &mut *flash,
            STORE_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
        )
        .await;

        match result {
            Ok(Some(data)) if !data.is_empty() => {
                let len = data.len();
                if buffer.len() < len {
                    return Err(StoreError::BufferTooSmall);
                }
                buffer[..len].copy_from_slice(data);
                Ok(len)
            }
            Ok(_) => Err(StoreError::NotFound),
            Err(e) => Err(map_error(e)),
        }
    }

    async fn store(&mut self, key: StoreKey, data: &[u8]) -> Result<(), StoreError> {
        let mut data_buffer = [0u8; MAX_ITEM_SIZE];
        let mut flash = self.flash.lock().await;

        map::store_item(
            &mut *flash,
            STORE_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
            &data,
        )
        .await
        .map_err(map_error)
    }
}

fn map_error<E>(e: sequential_storage::Error<E>) -> StoreError {
    match e {
        sequential_storage::Error::FullStorage { .. } => StoreError::Full,
        sequential_storage::Error::Corrupted { .. } => StoreError::Corrupted,
        sequential_storage::Error::BufferTooSmall { .. } => StoreError::BufferTooSmall,
        sequential_storage::Error::Storage { .. } => StoreError::Flash,
        _ => StoreError::Corrupted,
    }
}

impl PersistentStore for Rp2040Store {
    async fn init(&mut self) -> Result<(), StoreError> {
        if self.initialized {
            return Ok(());
        }

        // A corrupted or foreign layout only shows up when the map is walked
        let mut probe = [0u8; MAX_ITEM_SIZE];
        self.initialized = true;
        match self.fetch(PROBE_KEY, &mut probe).await {
            Ok(_) | Err(StoreError::NotFound) => Ok(()),
            Err(e) => {
                self.initialized = false;
                Err(match e {
                    StoreError::Corrupted => StoreError::NewVersionFound,
                    StoreError::Full => StoreError::NoFreePages,
                    other => other,
                })
            }
        }
    }

    async fn deinit(&mut self) -> Result<(), StoreError> {
        self.check()?;
        self.initialized = false;
        Ok(())
    }

    async fn erase_partition(&mut self) -> Result<(), StoreError> {
        let mut flash = self.flash.lock().await;
        flash
            .erase(STORE_START, STORE_RANGE.end)
            .await
            .map_err(|_| StoreError::Flash)
    }

    async fn read(&mut self, key: StoreKey, buffer: &mut [u8]) -> Result<usize, StoreError> {
        self.check()?;
        self.fetch(key, buffer).await
    }

    async fn write(&mut self, key: StoreKey, data: &[u8]) -> Result<(), StoreError> {
        self.check()?;
        self.store(key, data).await
    }

    async fn erase_key(&mut self, key: StoreKey) -> Result<(), StoreError> {
        self.check()?;
        let mut probe = [0u8; MAX_ITEM_SIZE];
        self.fetch(key, &mut probe).await?;
        self.store(key, &[]).await
    }

    async fn erase_namespace(&mut self, namespace: Namespace) -> Result<(), StoreError> {
        self.check()?;
        for &key in namespace.keys() {
            match self.erase_key(key).await {
                Ok(()) | Err(StoreError::NotFound) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn commit(&mut self, _namespace: Namespace) -> Result<(), StoreError> {
        self.check()
    }
}
