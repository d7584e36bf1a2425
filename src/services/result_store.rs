use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{MarkRow, StudentRecord, StudentRow};
use crate::services::reconciler::{self, ReconcileError};

/// Query token that returns every record instead of a single student.
///
/// It shares the hall ticket namespace, so a student whose ticket is
/// literally `y` cannot be fetched by point lookup.
pub const BULK_EXPORT_TOKEN: &str = "y";

/// One published reconciliation result.
#[derive(Debug)]
pub struct Dataset {
    id: Uuid,
    published_at: OffsetDateTime,
    source_sha256: Option<String>,
    records: Vec<StudentRecord>,
    // lower-cased hall ticket -> position of the first record carrying it
    index: HashMap<String, usize>,
}

impl Dataset {
    pub fn new(records: Vec<StudentRecord>, source_sha256: Option<String>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            index.entry(fold_ticket(&record.hall_ticket)).or_insert(position);
        }

        Self {
            id: Uuid::new_v4(),
            published_at: OffsetDateTime::now_utc(),
            source_sha256,
            records,
            index,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn published_at(&self) -> OffsetDateTime {
        self.published_at
    }

    pub fn source_sha256(&self) -> Option<&str> {
        self.source_sha256.as_deref()
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum LookupResult {
    /// Nothing has been published yet.
    NotAvailable,
    NotFound,
    Found { dataset: Arc<Dataset>, position: usize },
    All(Arc<Dataset>),
}

impl LookupResult {
    pub fn record(&self) -> Option<&StudentRecord> {
        match self {
            LookupResult::Found { dataset, position } => dataset.records.get(*position),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LookupResult::NotAvailable => "not_available",
            LookupResult::NotFound => "not_found",
            LookupResult::Found { .. } => "found",
            LookupResult::All(_) => "all",
        }
    }
}

/// Holds the most recently published dataset.
///
/// Readers clone the `Arc` out of a short read lock, and publishing holds the
/// write lock only for the swap, so a lookup sees either the old dataset or
/// the new one in full.
#[derive(Clone, Default)]
pub struct ResultStore {
    current: Arc<RwLock<Option<Arc<Dataset>>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps in `dataset`, discarding whatever was published before.
    pub async fn replace(&self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        let mut guard = self.current.write().await;
        *guard = Some(dataset.clone());
        dataset
    }

    /// Reconciles the rows and publishes the result. On error the current
    /// dataset is left as it was.
    ///
    /// The join runs on the calling task. Callers holding a large workbook
    /// should reconcile on a blocking thread and hand the records to
    /// [`ResultStore::replace`].
    pub async fn reconcile_and_publish(
        &self,
        students: &[StudentRow],
        marks: &[MarkRow],
        source_sha256: Option<String>,
    ) -> Result<Arc<Dataset>, ReconcileError> {
        let records = reconciler::reconcile(students, marks)?;
        Ok(self.replace(Dataset::new(records, source_sha256)).await)
    }

    pub async fn snapshot(&self) -> Option<Arc<Dataset>> {
        self.current.read().await.clone()
    }

    pub async fn lookup(&self, hall_ticket: &str) -> LookupResult {
        let Some(dataset) = self.snapshot().await else {
            return LookupResult::NotAvailable;
        };

        let query = fold_ticket(hall_ticket);
        if query == BULK_EXPORT_TOKEN {
            return LookupResult::All(dataset);
        }

        match dataset.index.get(&query).copied() {
            Some(position) => LookupResult::Found { dataset, position },
            None => LookupResult::NotFound,
        }
    }
}

fn fold_ticket(raw: &str) -> String {
    raw.trim().to_lowercase()
}
