pub mod config;
pub mod error;
pub mod form;
pub mod guard;
pub mod records;
pub mod session;
pub mod storage;
pub mod transport;
pub mod validate;

use std::sync::Arc;

/// The wired-up client core shared by every front end.
#[derive(Clone)]
pub struct Jobtrack {
    pub transport: transport::Transport,
    pub session: Arc<session::SessionManager>,
    pub records: records::RecordStore,
}

impl Jobtrack {
    /// Build the core on top of the given storage and bootstrap the session
    /// from whatever it already holds.
    pub fn new(
        cfg: &config::ClientConfig,
        storage: Arc<dyn storage::Storage>,
    ) -> Result<Self, error::TransportError> {
        let transport = transport::Transport::new(cfg, storage.clone())?;
        let session = Arc::new(session::SessionManager::new(transport.clone(), storage));
        session.bootstrap();
        let records = records::RecordStore::new(transport.clone());
        Ok(Self {
            transport,
            session,
            records,
        })
    }
}

pub use config::{resolve_data_dir, ClientConfig};
pub use error::{
    ErrorKind, LoginError, RefreshError, RegisterError, StorageError, TransportError,
};
pub use records::{ApplicationRecord, FilterCriteria, RecordStore, StatisticsSnapshot, Status};
pub use session::{Identity, SessionManager, SessionState};
pub use storage::{FileStorage, MemoryStorage, Storage};
