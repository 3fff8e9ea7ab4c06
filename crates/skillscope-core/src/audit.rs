//! Read-only consistency scan of the evidence store.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::clock::days_between;
use crate::store::EvidenceStore;

/// Rows older than this many days are counted as stale.
pub const STALE_THRESHOLD_DAYS: i64 = 180;

/// The set of skill ids the host considers valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillCatalog {
    ids: BTreeSet<String>,
}

impl SkillCatalog {
    /// Parse a catalog from either a JSON array of strings or plain text
    /// with one id per line. Blank lines and `#` comments are ignored.
    pub fn parse(raw: &str) -> Self {
        if let Ok(ids) = serde_json::from_str::<Vec<String>>(raw) {
            return ids.into_iter().collect();
        }
        raw.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn contains(&self, skill_id: &str) -> bool {
        self.ids.contains(skill_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SkillCatalog {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter
                .into_iter()
                .map(|id| {
                    let id: String = id.into();
                    id.trim().to_string()
                })
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub generated_at: i64,
    pub tracked_students: usize,
    /// Distinct skill ids across all students.
    pub tracked_skills: usize,
    pub total_rows: usize,
    pub stale_rows: usize,
    pub stale_threshold_days: i64,
    /// Skill ids absent from the catalog, sorted. `None` when no catalog
    /// was supplied.
    pub orphan_skill_ids: Option<Vec<String>>,
}

impl AuditReport {
    /// True when the scan found stale rows or orphaned skill ids.
    pub fn has_findings(&self) -> bool {
        self.stale_rows > 0
            || self
                .orphan_skill_ids
                .as_ref()
                .is_some_and(|ids| !ids.is_empty())
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("## Evidence store audit\n\n");
        md.push_str(&format!(
            "**Summary:** {} students, {} skills, {} rows, {} stale (> {} days)\n\n",
            self.tracked_students,
            self.tracked_skills,
            self.total_rows,
            self.stale_rows,
            self.stale_threshold_days
        ));

        match &self.orphan_skill_ids {
            None => md.push_str("Orphan detection skipped: no skill catalog supplied.\n"),
            Some(ids) if ids.is_empty() => md.push_str("No orphaned skill ids.\n"),
            Some(ids) => {
                md.push_str("### Orphaned skill ids\n\n");
                for id in ids {
                    md.push_str(&format!("- `{id}`\n"));
                }
            }
        }

        md
    }
}

/// Scan the whole store. Never mutates it.
pub fn audit_evidence_store(store: &EvidenceStore, catalog: Option<&SkillCatalog>) -> AuditReport {
    let now_ms = store.now_ms();
    let document = store.document();

    let mut skills = BTreeSet::new();
    let mut total_rows = 0;
    let mut stale_rows = 0;
    for student in document.students.values() {
        for (skill_id, window) in &student.skills {
            skills.insert(skill_id.as_str());
            total_rows += window.len();
            stale_rows += window
                .records
                .iter()
                .filter(|r| days_between(r.timestamp, now_ms) > STALE_THRESHOLD_DAYS)
                .count();
        }
    }

    let orphan_skill_ids = catalog.map(|catalog| {
        skills
            .iter()
            .filter(|id| !catalog.contains(id))
            .map(|id| id.to_string())
            .collect()
    });

    AuditReport {
        generated_at: now_ms,
        tracked_students: document.students.len(),
        tracked_skills: skills.len(),
        total_rows,
        stale_rows,
        stale_threshold_days: STALE_THRESHOLD_DAYS,
        orphan_skill_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, DAY_MS};
    use crate::model::EvidenceEventInput;
    use std::sync::Arc;

    const NOW: i64 = 1_760_000_000_000;

    fn store() -> EvidenceStore {
        let store = EvidenceStore::in_memory_with_clock(Arc::new(FixedClock::new(NOW)));
        store.record_evidence(
            EvidenceEventInput::new("stu-a", ["LIT.DEC.SYL", "LIT.FLU.ACC"]).at_ms(NOW - DAY_MS),
        );
        store.record_evidence(
            EvidenceEventInput::new("stu-a", ["LIT.DEC.SYL"]).at_ms(NOW - 200 * DAY_MS),
        );
        store.record_evidence(
            EvidenceEventInput::new("stu-b", ["LIT.LEGACY.X"]).at_ms(NOW - 181 * DAY_MS),
        );
        store.record_evidence(
            EvidenceEventInput::new("stu-b", ["LIT.DEC.SYL"]).at_ms(NOW - 180 * DAY_MS),
        );
        store
    }

    #[test]
    fn counts_students_skills_and_rows() {
        let report = audit_evidence_store(&store(), None);
        assert_eq!(report.tracked_students, 2);
        assert_eq!(report.tracked_skills, 3);
        assert_eq!(report.total_rows, 5);
        assert_eq!(report.stale_rows, 2);
        assert_eq!(report.stale_threshold_days, 180);
        assert_eq!(report.generated_at, NOW);
    }

    #[test]
    fn no_catalog_skips_orphan_detection() {
        let report = audit_evidence_store(&store(), None);
        assert_eq!(report.orphan_skill_ids, None);
        assert!(report.to_markdown().contains("skipped"));
    }

    #[test]
    fn orphans_are_sorted_and_unique() {
        let catalog: SkillCatalog = ["LIT.DEC.SYL"].into_iter().collect();
        let report = audit_evidence_store(&store(), Some(&catalog));
        assert_eq!(
            report.orphan_skill_ids,
            Some(vec!["LIT.FLU.ACC".to_string(), "LIT.LEGACY.X".to_string()])
        );
        assert!(report.has_findings());
        assert!(report.to_markdown().contains("`LIT.LEGACY.X`"));
    }

    #[test]
    fn audit_is_read_only_and_repeatable() {
        let store = store();
        let before = store.document();
        let first = audit_evidence_store(&store, None);
        let second = audit_evidence_store(&store, None);
        assert_eq!(first, second);
        assert_eq!(store.document(), before);
    }

    #[test]
    fn empty_store_has_no_findings() {
        let store = EvidenceStore::in_memory();
        let report = audit_evidence_store(&store, Some(&SkillCatalog::default()));
        assert_eq!(report.tracked_students, 0);
        assert_eq!(report.orphan_skill_ids, Some(vec![]));
        assert!(!report.has_findings());
    }

    #[test]
    fn catalog_parses_json_and_lines() {
        let json = SkillCatalog::parse(r#"["A", " B ", ""]"#);
        assert_eq!(json.len(), 2);
        assert!(json.contains("B"));

        let lines = SkillCatalog::parse("# skills\nA\n\n  C  \n");
        assert_eq!(lines.len(), 2);
        assert!(lines.contains("C"));
        assert!(!lines.contains("# skills"));
    }
}
