//! The evidence store: student → skill → rolling window of evidence.
//!
//! The whole store is one versioned JSON document kept in a [`KvStorage`]
//! backend and rewritten after every successful append.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::model::{EvidenceEvent, EvidenceEventInput};
use crate::storage::{KvStorage, MemoryStorage};

/// Storage key of the persisted document.
pub const STORAGE_KEY: &str = "cs.evidence.v2";

/// Version tag the persisted document must carry to be loaded.
pub const DOCUMENT_VERSION: &str = "cs.evidence.v2";

/// Number of events kept per (student, skill).
pub const WINDOW_SIZE: usize = 5;

/// The most recent evidence for one student and one skill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillWindow {
    /// Up to [`WINDOW_SIZE`] events in insertion order.
    #[serde(default)]
    pub records: Vec<EvidenceEvent>,
    /// Largest timestamp ever appended, including evicted events.
    #[serde(default)]
    pub last_ts: i64,
}

impl SkillWindow {
    /// Append an event, evicting the oldest insertion beyond the window.
    pub fn push(&mut self, event: EvidenceEvent) {
        self.last_ts = self.last_ts.max(event.timestamp);
        self.records.push(event);
        self.trim();
    }

    fn trim(&mut self) {
        if self.records.len() > WINDOW_SIZE {
            let excess = self.records.len() - WINDOW_SIZE;
            self.records.drain(..excess);
        }
    }

    /// Records sorted ascending by timestamp. Equal timestamps keep
    /// insertion order.
    pub fn sorted_rows(&self) -> Vec<EvidenceEvent> {
        let mut rows = self.records.clone();
        rows.sort_by_key(|r| r.timestamp);
        rows
    }

    /// The chronologically latest record.
    pub fn latest(&self) -> Option<&EvidenceEvent> {
        self.records.iter().max_by_key(|r| r.timestamp)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Everything tracked for one student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(default)]
    pub skills: BTreeMap<String, SkillWindow>,
}

/// The persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    pub version: String,
    #[serde(default)]
    pub students: BTreeMap<String, StudentRecord>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            students: BTreeMap::new(),
        }
    }
}

impl StoreDocument {
    /// Parse a persisted document. Anything that is not valid JSON of the
    /// current version is refused; older shapes are never migrated.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let mut doc: StoreDocument = serde_json::from_str(raw).map_err(StoreError::Corrupt)?;
        if doc.version != DOCUMENT_VERSION {
            return Err(StoreError::VersionMismatch {
                found: doc.version,
                expected: DOCUMENT_VERSION,
            });
        }
        for student in doc.students.values_mut() {
            for window in student.skills.values_mut() {
                window.trim();
            }
        }
        Ok(doc)
    }

    pub fn window(&self, student_id: &str, skill_id: &str) -> Option<&SkillWindow> {
        self.students.get(student_id)?.skills.get(skill_id)
    }
}

struct StoreState {
    document: StoreDocument,
    generation: u64,
}

/// Owns the evidence document and its persistence.
///
/// Appends for the same student are serialized; appends for different
/// students only contend on the brief in-memory update. Persisted writes
/// are ordered by generation so a stale snapshot never replaces a newer one.
pub struct EvidenceStore {
    storage: Arc<dyn KvStorage>,
    clock: Arc<dyn Clock>,
    state: RwLock<StoreState>,
    student_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    persisted_generation: Mutex<u64>,
}

impl EvidenceStore {
    /// Load the document from `storage`. A missing, corrupt, or
    /// wrong-version document yields an empty store.
    pub fn open(storage: Arc<dyn KvStorage>, clock: Arc<dyn Clock>) -> Self {
        let document = match storage.get(STORAGE_KEY) {
            Ok(Some(raw)) => StoreDocument::parse(&raw).unwrap_or_else(|e| {
                warn!(key = STORAGE_KEY, error = %e, "discarding persisted evidence document");
                StoreDocument::default()
            }),
            Ok(None) => StoreDocument::default(),
            Err(e) => {
                warn!(key = STORAGE_KEY, error = %e, "evidence storage unreadable, starting empty");
                StoreDocument::default()
            }
        };
        debug!(students = document.students.len(), "evidence store opened");

        Self {
            storage,
            clock,
            state: RwLock::new(StoreState {
                document,
                generation: 0,
            }),
            student_locks: Mutex::new(HashMap::new()),
            persisted_generation: Mutex::new(0),
        }
    }

    /// An empty store in memory on the system clock.
    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryStorage::new()), Arc::new(SystemClock))
    }

    /// An empty store in memory on the given clock.
    pub fn in_memory_with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::open(Arc::new(MemoryStorage::new()), clock)
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Validate, normalize, append, and persist an event.
    ///
    /// Returns `None` for a rejected payload. A persistence failure is
    /// logged; the in-memory append stands and the event is returned.
    pub fn record_evidence(&self, input: EvidenceEventInput) -> Option<EvidenceEvent> {
        let (event, persisted) = self.append(input)?;
        if let Err(e) = persisted {
            warn!(
                student = %event.student_id,
                error = %e,
                "evidence appended but not persisted"
            );
        }
        Some(event)
    }

    /// Like [`record_evidence`](Self::record_evidence) but surfaces
    /// persistence failures.
    pub fn try_record_evidence(
        &self,
        input: EvidenceEventInput,
    ) -> Result<Option<EvidenceEvent>, StoreError> {
        match self.append(input) {
            Some((event, persisted)) => persisted.map(|()| Some(event)),
            None => Ok(None),
        }
    }

    fn append(
        &self,
        input: EvidenceEventInput,
    ) -> Option<(EvidenceEvent, Result<(), StoreError>)> {
        let Some(event) = input.normalize(self.clock.now_ms()) else {
            debug!("rejected evidence without student id or targets");
            return None;
        };

        let student_lock = self.student_lock(&event.student_id);
        let _serialized = student_lock.lock();

        let snapshot = {
            let mut state = self.state.write();
            let student = state
                .document
                .students
                .entry(event.student_id.clone())
                .or_default();
            for target in &event.targets {
                student
                    .skills
                    .entry(target.clone())
                    .or_default()
                    .push(event.clone());
            }
            state.generation += 1;
            let generation = state.generation;
            serde_json::to_string(&state.document)
                .map(|json| (generation, json))
                .map_err(StoreError::from)
        };

        debug!(
            student = %event.student_id,
            targets = event.targets.len(),
            "evidence recorded"
        );

        let persisted = snapshot.and_then(|(generation, json)| self.persist(generation, &json));
        Some((event, persisted))
    }

    fn student_lock(&self, student_id: &str) -> Arc<Mutex<()>> {
        self.student_locks
            .lock()
            .entry(student_id.to_string())
            .or_default()
            .clone()
    }

    fn persist(&self, generation: u64, json: &str) -> Result<(), StoreError> {
        let mut written = self.persisted_generation.lock();
        if generation <= *written {
            // A newer snapshot already reached storage.
            return Ok(());
        }
        self.storage.set(STORAGE_KEY, json)?;
        *written = generation;
        Ok(())
    }

    /// Up to [`WINDOW_SIZE`] rows for the pair, oldest first. Unknown pairs
    /// yield an empty list.
    pub fn skill_rows(&self, student_id: &str, skill_id: &str) -> Vec<EvidenceEvent> {
        self.state
            .read()
            .document
            .window(student_id, skill_id)
            .map(SkillWindow::sorted_rows)
            .unwrap_or_default()
    }

    /// All skill windows tracked for a student, keyed by skill id.
    pub fn student_skills(&self, student_id: &str) -> BTreeMap<String, SkillWindow> {
        self.state
            .read()
            .document
            .students
            .get(student_id)
            .map(|s| s.skills.clone())
            .unwrap_or_default()
    }

    pub fn student_count(&self) -> usize {
        self.state.read().document.students.len()
    }

    /// A copy of the whole document.
    pub fn document(&self) -> StoreDocument {
        self.state.read().document.clone()
    }
}

impl std::fmt::Debug for EvidenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("EvidenceStore")
            .field("students", &state.document.students.len())
            .field("generation", &state.generation)
            .finish()
    }
}
