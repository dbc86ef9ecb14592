use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use http::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::model::{ApplicationPayload, ApplicationRecord, FilterCriteria, StatisticsSnapshot};
use crate::error::TransportError;
use crate::transport::Transport;

const APPLICATIONS: &str = "applications/";
const STATISTICS: &str = "applications/statistics/";

/// The service may return a bare array or a paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody {
    Plain(Vec<ApplicationRecord>),
    Paged { results: Vec<ApplicationRecord> },
}

impl ListBody {
    fn into_records(self) -> Vec<ApplicationRecord> {
        match self {
            ListBody::Plain(records) | ListBody::Paged { results: records } => records,
        }
    }
}

/// Result of [`RecordStore::refresh`]. The halves succeed or fail independently.
#[derive(Debug)]
pub struct Refresh {
    pub records: Result<Vec<ApplicationRecord>, TransportError>,
    pub statistics: Result<StatisticsSnapshot, TransportError>,
}

#[derive(Default)]
struct Snapshot {
    records: Vec<ApplicationRecord>,
    statistics: Option<StatisticsSnapshot>,
    filter: FilterCriteria,
}

#[derive(Default)]
struct Inner {
    list_seq: AtomicU64,
    stats_seq: AtomicU64,
    snapshot: Mutex<Snapshot>,
}

/// Read-through cache of the user's application records.
///
/// Each `list` takes a sequence tag before it suspends; its response replaces
/// the held records only if no newer `list` has been issued since. Statistics
/// follow the same rule with their own counter.
#[derive(Clone)]
pub struct RecordStore {
    transport: Transport,
    inner: Arc<Inner>,
}

impl RecordStore {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            inner: Arc::new(Inner::default()),
        }
    }

    fn snapshot_lock(&self) -> MutexGuard<'_, Snapshot> {
        self.inner
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The records from the most recent applied `list`, in the order received.
    pub fn snapshot(&self) -> Vec<ApplicationRecord> {
        self.snapshot_lock().records.clone()
    }

    pub fn statistics_snapshot(&self) -> Option<StatisticsSnapshot> {
        self.snapshot_lock().statistics.clone()
    }

    /// Criteria of the most recently issued `list`.
    pub fn filter(&self) -> FilterCriteria {
        self.snapshot_lock().filter.clone()
    }

    /// Fetch the records matching `filter`.
    ///
    /// Returns what the service sent even when a newer `list` has superseded
    /// this one; in that case the held snapshot is left alone.
    pub async fn list(
        &self,
        filter: &FilterCriteria,
    ) -> Result<Vec<ApplicationRecord>, TransportError> {
        let seq = self.inner.list_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.snapshot_lock().filter = filter.clone();

        let mut url = self.transport.endpoint(APPLICATIONS)?;
        let pairs = filter.query_pairs();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }

        let records = self
            .transport
            .send(Method::GET, url, None)
            .await?
            .json::<ListBody>()?
            .into_records();

        let latest = self.inner.list_seq.load(Ordering::SeqCst);
        let mut snapshot = self.snapshot_lock();
        if seq == latest {
            snapshot.records = records.clone();
        } else {
            debug!(seq, latest, "discarding stale application list");
        }
        Ok(records)
    }

    /// Re-issue `list` with the criteria last used.
    pub async fn reload(&self) -> Result<Vec<ApplicationRecord>, TransportError> {
        let filter = self.filter();
        self.list(&filter).await
    }

    /// Counts over every record, regardless of the current filter.
    pub async fn statistics(&self) -> Result<StatisticsSnapshot, TransportError> {
        let seq = self.inner.stats_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let stats: StatisticsSnapshot = self.transport.get(STATISTICS).await?;

        let latest = self.inner.stats_seq.load(Ordering::SeqCst);
        let mut snapshot = self.snapshot_lock();
        if seq == latest {
            snapshot.statistics = Some(stats.clone());
        } else {
            debug!(seq, latest, "discarding stale statistics");
        }
        Ok(stats)
    }

    /// Fetch the list and the statistics concurrently.
    pub async fn refresh(&self, filter: &FilterCriteria) -> Refresh {
        let (records, statistics) = tokio::join!(self.list(filter), self.statistics());
        Refresh {
            records,
            statistics,
        }
    }

    pub async fn create(
        &self,
        payload: &ApplicationPayload,
    ) -> Result<ApplicationRecord, TransportError> {
        let body = to_body(payload)?;
        let record: ApplicationRecord = self.transport.post(APPLICATIONS, &body).await?;
        info!(id = %record.id_segment(), "application created");
        Ok(record)
    }

    /// Replace every field of application `id`.
    pub async fn update(
        &self,
        id: &str,
        payload: &ApplicationPayload,
    ) -> Result<ApplicationRecord, TransportError> {
        let body = to_body(payload)?;
        let record: ApplicationRecord = self
            .transport
            .request(Method::PUT, &record_path(id)?, Some(&body))
            .await?
            .json()?;
        info!(id, "application updated");
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.transport
            .request(Method::DELETE, &record_path(id)?, None)
            .await?;
        info!(id, "application deleted");
        Ok(())
    }
}

fn to_body(payload: &ApplicationPayload) -> Result<Value, TransportError> {
    serde_json::to_value(payload).map_err(|e| TransportError::Decode(e.to_string()))
}

fn record_path(id: &str) -> Result<String, TransportError> {
    if matches!(id, "" | "." | "..") || id.contains(['/', '?', '#']) {
        return Err(TransportError::InvalidPath(id.to_owned()));
    }
    Ok(format!("{APPLICATIONS}{id}/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_path_shape() {
        assert_eq!(record_path("42").unwrap(), "applications/42/");
        assert!(record_path("").is_err());
        assert!(record_path("1/../2").is_err());
        assert!(record_path("1?x=2").is_err());
        assert!(record_path(".").is_err());
        assert!(record_path("..").is_err());
        assert_eq!(record_path("..1").unwrap(), "applications/..1/");
    }

    #[test]
    fn list_body_accepts_plain_and_paged() {
        let rec = json!({
            "id": 1,
            "company_name": "Acme",
            "job_title": "Engineer",
            "status": "applied",
            "application_date": "2024-01-15"
        });
        let plain: ListBody = serde_json::from_value(json!([rec.clone()])).unwrap();
        assert_eq!(plain.into_records().len(), 1);
        let paged: ListBody =
            serde_json::from_value(json!({"count": 1, "results": [rec]})).unwrap();
        assert_eq!(paged.into_records().len(), 1);
    }
}
