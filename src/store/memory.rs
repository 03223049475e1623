//! In-process [`ArtifactStore`] with the same merge semantics as SQLite.

use super::{normalize_username, ArtifactStore, CourseKey, CourseRecord};
use crate::error::Doc2StudyError;
use crate::output::Artifacts;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

/// Mutex-guarded map of course records. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<CourseKey, CourseRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<CourseKey, CourseRecord>>, Doc2StudyError> {
        self.records
            .lock()
            .map_err(|_| Doc2StudyError::StorageUnavailable {
                detail: "memory store lock poisoned".into(),
            })
    }
}

/// Append the items of `incoming` not already in `existing`; returns how many.
fn union_into<T: Clone + PartialEq>(existing: &mut Vec<T>, incoming: &[T]) -> usize {
    let before = existing.len();
    for item in incoming {
        if !existing.contains(item) {
            existing.push(item.clone());
        }
    }
    existing.len() - before
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn accumulate(
        &self,
        key: &CourseKey,
        artifacts: &Artifacts,
    ) -> Result<usize, Doc2StudyError> {
        let mut records = self.lock()?;
        let record = records
            .entry(key.clone())
            .or_insert_with(|| CourseRecord::empty(key.clone()));
        Ok(match artifacts {
            Artifacts::Flashcards(cards) => union_into(&mut record.flashcards, cards),
            Artifacts::Quiz(questions) => union_into(&mut record.quizzes, questions),
        })
    }

    async fn fetch(&self, key: &CourseKey) -> Result<CourseRecord, Doc2StudyError> {
        Ok(self
            .lock()?
            .get(key)
            .cloned()
            .unwrap_or_else(|| CourseRecord::empty(key.clone())))
    }

    async fn list_courses(&self, username: &str) -> Result<BTreeSet<String>, Doc2StudyError> {
        let username = normalize_username(username);
        Ok(self
            .lock()?
            .keys()
            .filter(|k| k.username == username)
            .map(|k| k.course.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Flashcard, QuizQuestion};

    #[test]
    fn union_keeps_first_seen_order() {
        let mut existing = vec![1, 2];
        assert_eq!(union_into(&mut existing, &[2, 3, 3, 1, 4]), 2);
        assert_eq!(existing, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn kinds_merge_into_their_own_fields() {
        let store = MemoryStore::new();
        let key = CourseKey::new("ana", "physics");
        store
            .accumulate(&key, &Artifacts::Flashcards(vec![Flashcard::new("F", "ma")]))
            .await
            .unwrap();
        store
            .accumulate(
                &key,
                &Artifacts::Quiz(vec![QuizQuestion::new("g?", ["9.8", "1", "0", "3"], "9.8")]),
            )
            .await
            .unwrap();

        let record = store.fetch(&key).await.unwrap();
        assert_eq!(record.flashcards.len(), 1);
        assert_eq!(record.quizzes.len(), 1);
    }

    #[tokio::test]
    async fn same_batch_twice_adds_nothing_the_second_time() {
        let store = MemoryStore::new();
        let key = CourseKey::new("ana", "physics");
        let batch = Artifacts::Flashcards(vec![Flashcard::new("a", "b")]);
        assert_eq!(store.accumulate(&key, &batch).await.unwrap(), 1);
        assert_eq!(store.accumulate(&key, &batch).await.unwrap(), 0);
        assert_eq!(store.fetch(&key).await.unwrap().flashcards.len(), 1);
    }

    #[tokio::test]
    async fn list_courses_trims_username() {
        let store = MemoryStore::new();
        store
            .accumulate(
                &CourseKey::new(" ana", "physics"),
                &Artifacts::Flashcards(vec![Flashcard::new("a", "b")]),
            )
            .await
            .unwrap();
        let courses = store.list_courses("ana  ").await.unwrap();
        assert_eq!(courses.into_iter().collect::<Vec<_>>(), vec!["Physics"]);
    }
}
