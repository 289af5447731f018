//! Sync Engine - reconcile the stored snapshot with an incoming one
//!
//! A run ends in one of two states:
//! - `UpToDate`: the stored file metadata matches, nothing is written
//! - `Reconciled`: the minimal set of inserts, updates and deletes is applied
//!   and committed once
//!
//! Any error before the commit leaves the store as it was; the session's
//! teardown rolls back whatever was staged.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::record::{CodeRecord, FileRecord};
use crate::storage::{PersistentMapping, Session};
use crate::Result;

/// A subtype change for one code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeChange {
    pub old: CodeRecord,
    pub new: CodeRecord,
}

/// What a reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    /// Codes that were not in the store
    pub added: BTreeSet<String>,
    /// Codes whose subtype changed
    pub changed: BTreeMap<String, CodeChange>,
    /// Codes absent from the incoming stream, with their last subtype
    pub removed: BTreeMap<String, CodeRecord>,
}

impl ChangeSummary {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

impl std::fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Codes Added:   {}", self.added.len())?;
        writeln!(f, "Codes Changed: {}", self.changed.len())?;
        for (code, change) in &self.changed {
            writeln!(f, "{}: {} -> {}", code, change.old, change.new)?;
        }
        writeln!(f, "Codes Deleted: {}", self.removed.len())?;
        for (code, old) in &self.removed {
            writeln!(f, "{}: {}", code, old)?;
        }
        Ok(())
    }
}

/// Result of a sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "summary", rename_all = "snake_case")]
pub enum Outcome {
    UpToDate,
    Reconciled(ChangeSummary),
}

impl Outcome {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, Outcome::UpToDate)
    }

    pub fn summary(&self) -> Option<&ChangeSummary> {
        match self {
            Outcome::UpToDate => None,
            Outcome::Reconciled(summary) => Some(summary),
        }
    }
}

/// Applies an incoming snapshot to a session's store.
pub struct SyncEngine<'s> {
    session: &'s mut Session,
}

impl<'s> SyncEngine<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self { session }
    }

    /// Reconcile and commit.
    ///
    /// `member` names the dataset member `file` describes; `records` is the
    /// member's (code, subtype) stream, consumed once front to back. The
    /// commit at the end is the only one of the run.
    pub fn sync<I>(&mut self, member: &str, file: &FileRecord, records: I) -> Result<Outcome>
    where
        I: IntoIterator<Item = Result<(String, CodeRecord)>>,
    {
        let outcome = self.stage(member, file, records)?;
        if let Outcome::Reconciled(summary) = &outcome {
            self.session.commit()?;
            info!(
                "Reconciled {}: {} added, {} changed, {} removed",
                member,
                summary.added.len(),
                summary.changed.len(),
                summary.removed.len()
            );
        }
        Ok(outcome)
    }

    /// Apply the diff to the session without committing.
    pub fn stage<I>(&mut self, member: &str, file: &FileRecord, records: I) -> Result<Outcome>
    where
        I: IntoIterator<Item = Result<(String, CodeRecord)>>,
    {
        let files = self.session.files();
        if files.fetch(member)?.as_ref() == Some(file) {
            info!("{} is current, nothing to do", member);
            return Ok(Outcome::UpToDate);
        }

        info!("{} changed, reconciling", member);
        files.set(member, file)?;

        let codes = self.session.codes();
        let mut pending: HashSet<String> = codes.keys().collect::<Result<_>>()?;
        debug!("{} codes stored before reconciling", pending.len());

        let mut summary = ChangeSummary::default();
        // latest value written for each code seen in this stream
        let mut seen: HashMap<String, CodeRecord> = HashMap::new();

        for entry in records {
            let (code, record) = entry?;

            if let Some(current) = seen.get_mut(&code) {
                // repeated code: last one wins, not reported
                if *current != record {
                    codes.set(&code, &record)?;
                    *current = record;
                }
                continue;
            }

            if pending.remove(&code) {
                let old = codes.get(&code)?;
                if old != record {
                    codes.set(&code, &record)?;
                    summary.changed.insert(
                        code.clone(),
                        CodeChange {
                            old,
                            new: record.clone(),
                        },
                    );
                }
            } else {
                codes.set(&code, &record)?;
                summary.added.insert(code.clone());
            }
            seen.insert(code, record);
        }

        for code in pending {
            let old = codes.get(&code)?;
            codes.delete(&code)?;
            summary.removed.insert(code, old);
        }

        Ok(Outcome::Reconciled(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SchemaManager;
    use crate::Error;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const MEMBER: &str = "alpha.v3.txt";

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(4, 15, 0)
            .unwrap()
    }

    fn file(day: u32) -> FileRecord {
        FileRecord::new(ts(day), format!("# MAC list {}", day))
    }

    fn stream(pairs: &[(&str, &str)]) -> Vec<Result<(String, CodeRecord)>> {
        pairs
            .iter()
            .map(|(code, subtype)| Ok((code.to_string(), CodeRecord::new(*subtype))))
            .collect()
    }

    fn create_store(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("macsync.db");
        SchemaManager::default().create(&path).unwrap();
        path
    }

    fn open(path: &Path) -> Session {
        SchemaManager::default().open_session(path).unwrap()
    }

    fn memory_session() -> Session {
        SchemaManager::default()
            .open_in_memory()
            .unwrap()
            .into_session()
            .unwrap()
    }

    fn contents(session: &Session) -> BTreeMap<String, String> {
        let codes = session.codes();
        codes
            .keys()
            .map(|key| {
                let key = key.unwrap();
                let subtype = codes.get(&key).unwrap().subtype;
                (key, subtype)
            })
            .collect()
    }

    fn seed(session: &mut Session, pairs: &[(&str, &str)]) {
        SyncEngine::new(session)
            .sync(MEMBER, &file(1), stream(pairs))
            .unwrap();
    }

    #[test]
    fn test_first_run_adds_everything() {
        let mut session = memory_session();

        let outcome = SyncEngine::new(&mut session)
            .sync(MEMBER, &file(1), stream(&[("AB", "01:02"), ("CD", "03:04")]))
            .unwrap();

        let summary = outcome.summary().unwrap();
        assert_eq!(summary.added.len(), 2);
        assert!(summary.changed.is_empty());
        assert!(summary.removed.is_empty());
        assert!(session.has_committed());
        assert_eq!(session.files().get(MEMBER).unwrap(), file(1));
    }

    #[test]
    fn test_diff_correctness() {
        let mut session = memory_session();
        seed(&mut session, &[("A", "x"), ("B", "y")]);

        let outcome = SyncEngine::new(&mut session)
            .sync(MEMBER, &file(2), stream(&[("A", "x"), ("C", "z")]))
            .unwrap();

        let summary = outcome.summary().unwrap();
        assert_eq!(summary.added, BTreeSet::from(["C".to_string()]));
        assert!(summary.changed.is_empty());
        assert_eq!(
            summary.removed,
            BTreeMap::from([("B".to_string(), CodeRecord::new("y"))])
        );

        let expected = BTreeMap::from([
            ("A".to_string(), "x".to_string()),
            ("C".to_string(), "z".to_string()),
        ]);
        assert_eq!(contents(&session), expected);
    }

    #[test]
    fn test_change_detection() {
        let mut session = memory_session();
        seed(&mut session, &[("A", "x")]);

        let outcome = SyncEngine::new(&mut session)
            .sync(MEMBER, &file(2), stream(&[("A", "y")]))
            .unwrap();

        let summary = outcome.summary().unwrap();
        assert!(summary.added.is_empty());
        assert!(summary.removed.is_empty());
        assert_eq!(
            summary.changed.get("A"),
            Some(&CodeChange {
                old: CodeRecord::new("x"),
                new: CodeRecord::new("y"),
            })
        );
        assert_eq!(session.codes().get("A").unwrap().subtype, "y");
    }

    #[test]
    fn test_second_identical_run_is_up_to_date() {
        let dir = TempDir::new().unwrap();
        let path = create_store(&dir);
        let pairs = [("AB", "01:02"), ("CD", "03:04")];

        let mut session = open(&path);
        let first = SyncEngine::new(&mut session)
            .sync(MEMBER, &file(1), stream(&pairs))
            .unwrap();
        assert!(!first.is_up_to_date());
        session.close().unwrap();

        let mut session = open(&path);
        let second = SyncEngine::new(&mut session)
            .sync(MEMBER, &file(1), stream(&pairs))
            .unwrap();
        assert_eq!(second, Outcome::UpToDate);
        assert!(!session.has_committed());
    }

    #[test]
    fn test_up_to_date_does_not_read_stream() {
        let mut session = memory_session();
        seed(&mut session, &[("AB", "01")]);

        let poisoned = vec![Err(Error::Parse {
            line: 3,
            message: "should not be read".into(),
        })];
        let outcome = SyncEngine::new(&mut session)
            .sync(MEMBER, &file(1), poisoned)
            .unwrap();
        assert!(outcome.is_up_to_date());
    }

    #[test]
    fn test_comment_change_triggers_reconcile() {
        let mut session = memory_session();
        seed(&mut session, &[("AB", "01")]);

        let mut newer = file(1);
        newer.comment.push_str(" (reissued)");
        let outcome = SyncEngine::new(&mut session)
            .sync(MEMBER, &newer, stream(&[("AB", "01")]))
            .unwrap();

        let summary = outcome.summary().unwrap();
        assert!(summary.is_empty());
        assert_eq!(session.files().get(MEMBER).unwrap().comment, newer.comment);
    }

    #[test]
    fn test_duplicate_key_last_write_wins() {
        let mut session = memory_session();

        let outcome = SyncEngine::new(&mut session)
            .sync(MEMBER, &file(1), stream(&[("A", "x"), ("A", "y")]))
            .unwrap();

        let summary = outcome.summary().unwrap();
        assert_eq!(summary.added, BTreeSet::from(["A".to_string()]));
        assert!(summary.changed.is_empty());
        assert_eq!(session.codes().get("A").unwrap().subtype, "y");
    }

    #[test]
    fn test_duplicate_of_existing_key_is_not_reported_as_added() {
        let mut session = memory_session();
        seed(&mut session, &[("A", "x")]);

        let outcome = SyncEngine::new(&mut session)
            .sync(MEMBER, &file(2), stream(&[("A", "x"), ("A", "z")]))
            .unwrap();

        let summary = outcome.summary().unwrap();
        assert!(summary.is_empty());
        assert_eq!(session.codes().get("A").unwrap().subtype, "z");
    }

    #[test]
    fn test_fault_before_commit_leaves_store_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = create_store(&dir);

        let mut session = open(&path);
        seed(&mut session, &[("A", "x"), ("B", "y")]);
        session.close().unwrap();

        {
            let mut session = open(&path);
            let staged = SyncEngine::new(&mut session)
                .stage(MEMBER, &file(2), stream(&[("A", "changed"), ("C", "z")]))
                .unwrap();
            assert!(!staged.is_up_to_date());
            // the run dies here, before commit
        }

        let session = open(&path);
        let expected = BTreeMap::from([
            ("A".to_string(), "x".to_string()),
            ("B".to_string(), "y".to_string()),
        ]);
        assert_eq!(contents(&session), expected);
        assert_eq!(session.files().get(MEMBER).unwrap(), file(1));
    }

    #[test]
    fn test_stream_error_aborts_run() {
        let dir = TempDir::new().unwrap();
        let path = create_store(&dir);

        let mut session = open(&path);
        seed(&mut session, &[("A", "x")]);
        session.close().unwrap();

        let mut session = open(&path);
        let mut records = stream(&[("A", "y"), ("B", "z")]);
        records.push(Err(Error::Parse {
            line: 5,
            message: "expected 3 fields".into(),
        }));

        let err = SyncEngine::new(&mut session)
            .sync(MEMBER, &file(2), records)
            .unwrap_err();
        assert!(matches!(err, Error::Parse { line: 5, .. }));
        assert!(!session.has_committed());
        session.close().unwrap();

        let session = open(&path);
        assert_eq!(
            contents(&session),
            BTreeMap::from([("A".to_string(), "x".to_string())])
        );
        assert_eq!(session.files().get(MEMBER).unwrap(), file(1));
    }

    #[test]
    fn test_summary_text() {
        let mut summary = ChangeSummary::default();
        summary.added.insert("C".into());
        summary.changed.insert(
            "A".into(),
            CodeChange {
                old: CodeRecord::new("x"),
                new: CodeRecord::new("y"),
            },
        );
        summary.removed.insert("B".into(), CodeRecord::new("y"));

        let text = summary.to_string();
        assert_eq!(
            text,
            "Codes Added:   1\nCodes Changed: 1\nA: x -> y\nCodes Deleted: 1\nB: y\n"
        );
    }

    #[test]
    fn test_outcome_json() {
        let json = serde_json::to_value(Outcome::UpToDate).unwrap();
        assert_eq!(json["status"], "up_to_date");

        let json = serde_json::to_value(Outcome::Reconciled(ChangeSummary::default())).unwrap();
        assert_eq!(json["status"], "reconciled");
        assert_eq!(json["summary"]["added"], serde_json::json!([]));
    }
}
