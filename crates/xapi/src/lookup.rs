//! Drive type, media type and scratch pool tables shared by all requests.
//!
//! A [`LookupStore`] holds the current [`LookupTables`] behind an `Arc`.
//! Requests capture that `Arc` when they register and read only from it, so a
//! rebuild never blocks a request mid-flight. Rebuilds are serialised by one
//! async mutex.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::consts::{
    MAX_DRIVE_TYPES, MAX_MEDIA_TYPES, MAX_SCRATCH_POOLS, SCRATCH_MAX_AGE,
};
use crate::config::XapiConfig;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("table load failed: {0}")]
    Load(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveType {
    pub code: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub code: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchPool {
    pub pool_id: u16,
    pub name: String,
    /// Scratch volumes currently in the pool.
    pub volumes: u32,
    pub low_water_mark: u32,
    pub high_water_mark: u32,
}

/// One immutable generation of the lookup tables.
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    drive_types: Vec<DriveType>,
    media_types: Vec<MediaType>,
    scratch_pools: Vec<ScratchPool>,
    scratch_built: Option<Instant>,
}

fn capped<T>(mut items: Vec<T>, max: usize, table: &'static str) -> Vec<T> {
    if items.len() > max {
        warn!(table, count = items.len(), max, "lookup table truncated");
        items.truncate(max);
    }
    items
}

impl LookupTables {
    pub fn new(
        drive_types: Vec<DriveType>,
        media_types: Vec<MediaType>,
        scratch_pools: Vec<ScratchPool>,
    ) -> Self {
        Self {
            drive_types: capped(drive_types, MAX_DRIVE_TYPES, "drive_types"),
            media_types: capped(media_types, MAX_MEDIA_TYPES, "media_types"),
            scratch_pools: capped(scratch_pools, MAX_SCRATCH_POOLS, "scratch_pools"),
            scratch_built: Some(Instant::now()),
        }
    }

    pub fn drive_types(&self) -> &[DriveType] {
        &self.drive_types
    }

    pub fn media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    pub fn scratch_pools(&self) -> &[ScratchPool] {
        &self.scratch_pools
    }

    /// Code of the drive type called `model`, ignoring case and padding.
    pub fn drive_type_code(&self, model: &str) -> Option<u8> {
        let model = model.trim();
        self.drive_types
            .iter()
            .find(|drive| drive.name.eq_ignore_ascii_case(model))
            .map(|drive| drive.code)
    }

    /// Code of the media type called `media`, ignoring case and padding.
    pub fn media_type_code(&self, media: &str) -> Option<u8> {
        let media = media.trim();
        self.media_types
            .iter()
            .find(|kind| kind.name.eq_ignore_ascii_case(media))
            .map(|kind| kind.code)
    }

    pub fn scratch_pool(&self, pool_id: u16) -> Option<&ScratchPool> {
        self.scratch_pools.iter().find(|pool| pool.pool_id == pool_id)
    }

    /// Time since the scratch pool table was built; `None` if it never was.
    pub fn scratch_age(&self) -> Option<Duration> {
        self.scratch_built.map(|built| built.elapsed())
    }
}

/// Source of fresh lookup tables.
#[async_trait]
pub trait TableLoader: Send + Sync {
    async fn load(&self) -> Result<LookupTables, LookupError>;
}

/// Loader serving fixed tables, optionally extended with drive types read
/// from a drive list file (one drive type name per line, `#` comments).
#[derive(Debug, Clone, Default)]
pub struct StaticTables {
    pub drive_types: Vec<DriveType>,
    pub media_types: Vec<MediaType>,
    pub scratch_pools: Vec<ScratchPool>,
    pub drive_list: Option<PathBuf>,
}

impl StaticTables {
    pub fn from_config(config: &XapiConfig) -> Self {
        Self {
            drive_list: config.drive_list.clone(),
            ..Self::default()
        }
    }

    pub fn with_scratch_pools(mut self, pools: Vec<ScratchPool>) -> Self {
        self.scratch_pools = pools;
        self
    }
}

fn parse_drive_list(text: &str, first_code: usize) -> Vec<DriveType> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .enumerate()
        .map(|(index, name)| DriveType {
            code: u8::try_from(first_code + index).unwrap_or(u8::MAX),
            name: name.to_ascii_uppercase(),
        })
        .collect()
}

#[async_trait]
impl TableLoader for StaticTables {
    async fn load(&self) -> Result<LookupTables, LookupError> {
        let mut drive_types = self.drive_types.clone();
        if let Some(path) = &self.drive_list {
            let text = tokio::fs::read_to_string(path).await?;
            let next = drive_types
                .iter()
                .map(|drive| usize::from(drive.code) + 1)
                .max()
                .unwrap_or(0);
            drive_types.extend(parse_drive_list(&text, next));
        }
        Ok(LookupTables::new(
            drive_types,
            self.media_types.clone(),
            self.scratch_pools.clone(),
        ))
    }
}

/// Current lookup tables plus the rebuild policy.
pub struct LookupStore {
    current: RwLock<Arc<LookupTables>>,
    loaded: AtomicBool,
    config_stale: AtomicBool,
    token: Mutex<Option<String>>,
    rebuild: tokio::sync::Mutex<()>,
    loader: Box<dyn TableLoader>,
}

impl std::fmt::Debug for LookupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupStore")
            .field("loaded", &self.loaded.load(Ordering::Acquire))
            .field("config_stale", &self.config_stale.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl LookupStore {
    pub fn new(loader: Box<dyn TableLoader>) -> Self {
        Self {
            current: RwLock::new(Arc::new(LookupTables::default())),
            loaded: AtomicBool::new(false),
            config_stale: AtomicBool::new(false),
            token: Mutex::new(None),
            rebuild: tokio::sync::Mutex::new(()),
            loader,
        }
    }

    /// The current generation.
    pub fn snapshot(&self) -> Arc<LookupTables> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn mark_config_stale(&self) {
        self.config_stale.store(true, Ordering::Release);
    }

    pub fn is_config_stale(&self) -> bool {
        self.config_stale.load(Ordering::Acquire)
    }

    /// Record the configuration token of a reply; a change from the last
    /// token seen marks the tables stale. Returns whether it changed.
    pub fn observe_config_token(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return false;
        }
        let mut last = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = last.as_deref().is_some_and(|previous| previous != token);
        if changed {
            info!(token, "XAPI configuration token changed");
            self.mark_config_stale();
        }
        *last = Some(token.to_string());
        changed
    }

    fn needs_rebuild(&self) -> bool {
        !self.loaded.load(Ordering::Acquire)
            || self.is_config_stale()
            || self
                .snapshot()
                .scratch_age()
                .map_or(true, |age| age > SCRATCH_MAX_AGE)
    }

    /// Rebuild the tables if they were never loaded, the configuration token
    /// changed, or the scratch pool table aged out. A failed load keeps the
    /// previous generation. Returns the generation to capture.
    pub async fn refresh_if_stale(&self) -> Arc<LookupTables> {
        if !self.needs_rebuild() {
            return self.snapshot();
        }
        let _rebuild = self.rebuild.lock().await;
        if !self.needs_rebuild() {
            return self.snapshot();
        }
        match self.loader.load().await {
            Ok(tables) => {
                debug!(
                    drive_types = tables.drive_types().len(),
                    media_types = tables.media_types().len(),
                    scratch_pools = tables.scratch_pools().len(),
                    "lookup tables rebuilt"
                );
                let tables = Arc::new(tables);
                *self.current.write().unwrap_or_else(PoisonError::into_inner) =
                    Arc::clone(&tables);
                self.loaded.store(true, Ordering::Release);
                self.config_stale.store(false, Ordering::Release);
                tables
            }
            Err(err) => {
                warn!(error = %err, "lookup table rebuild failed; keeping previous tables");
                self.snapshot()
            }
        }
    }
}
