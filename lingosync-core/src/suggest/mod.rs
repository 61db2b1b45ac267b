//! AI translation suggestions.
//!
//! [`SuggestionBatcher`] requests candidates for many rows in sequential
//! chunks and merges them back through a [`SuggestionSink`]. Every row it
//! works on is flagged in a shared [`InFlightSet`] for exactly the duration of
//! its request, so query tags and single-row requests see a consistent view.

mod inflight;
mod prompt;
mod provider;

pub use inflight::{InFlightGuard, InFlightSet};
pub use prompt::{
    build_prompt, parse_suggestions, response_schema, CompletionClient, CompletionRequest,
    LlmSuggestionProvider,
};
pub use provider::{
    SuggestionItem, SuggestionMap, SuggestionProvider, SuggestionRequest, SuggestionSink,
};

use crate::error::{Error, Result};
use crate::rows::TranslationRow;
use crate::state::Settings;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of one bulk run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Rows that were flagged and queued
    pub candidates: usize,
    pub chunks_sent: usize,
    /// Suggestions written to the sink
    pub applied: usize,
    /// Queued rows the provider returned nothing usable for
    pub without_suggestion: usize,
    /// Rows that vanished from the sink before their suggestion arrived
    pub stale: usize,
    pub cancelled: bool,
}

/// Drives a [`SuggestionProvider`] over rows of a table
pub struct SuggestionBatcher<P> {
    provider: P,
    settings: Settings,
    in_flight: InFlightSet,
    cancelled: AtomicBool,
}

impl<P: SuggestionProvider> SuggestionBatcher<P> {
    pub fn new(provider: P, settings: Settings, in_flight: InFlightSet) -> Self {
        Self {
            provider,
            settings,
            in_flight,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn in_flight(&self) -> &InFlightSet {
        &self.in_flight
    }

    /// Stop a running bulk request before its next chunk
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn request(&self, items: Vec<SuggestionItem>) -> SuggestionRequest {
        SuggestionRequest {
            model: self.settings.model,
            api_key: self.settings.api_key.clone(),
            source_lang: self.settings.source_lang.clone(),
            target_lang: self.settings.target_lang.clone(),
            items,
            extra_instructions: self.settings.extra_instructions.clone(),
        }
    }

    /// Request suggestions for every eligible row, one chunk at a time.
    ///
    /// Eligible rows are those not already in flight and, unless
    /// `replace_existing` is set, without a suggestion. All of them are
    /// flagged before the first request. A provider failure stops the run,
    /// keeps what earlier chunks applied and is returned as [`Error::Batch`]
    /// carrying the zero-based chunk index.
    pub async fn suggest_all<S>(
        &self,
        sink: &S,
        rows: &[TranslationRow],
        replace_existing: bool,
    ) -> Result<BatchReport>
    where
        S: SuggestionSink + ?Sized,
    {
        self.cancelled.store(false, Ordering::SeqCst);

        let mut seen = HashSet::new();
        let eligible: Vec<&TranslationRow> = rows
            .iter()
            .filter(|row| replace_existing || !row.has_suggestion())
            .filter(|row| seen.insert(row.key.as_str()))
            .collect();

        // Keys owned by another request are skipped; items keep row order.
        let mut guard = self
            .in_flight
            .acquire(eligible.iter().map(|row| row.key.clone()));
        let items: Vec<SuggestionItem> = eligible
            .into_iter()
            .filter(|row| guard.holds(&row.key))
            .map(SuggestionItem::from)
            .collect();

        let mut report = BatchReport {
            candidates: items.len(),
            ..BatchReport::default()
        };
        if items.is_empty() {
            return Ok(report);
        }

        let chunk_size = self.settings.chunk_size.max(1);
        tracing::info!(
            candidates = items.len(),
            chunk_size,
            model = %self.settings.model,
            "Starting suggestion batch"
        );

        for (index, chunk) in items.chunks(chunk_size).enumerate() {
            if self.cancelled.load(Ordering::SeqCst) {
                tracing::info!(chunk = index, "Suggestion batch cancelled");
                report.cancelled = true;
                break;
            }

            report.chunks_sent += 1;
            let response = match self.provider.suggest(&self.request(chunk.to_vec())).await {
                Ok(response) => response,
                Err(e) => {
                    guard.release_all();
                    tracing::warn!(chunk = index, error = %e, "Suggestion chunk failed");
                    return Err(Error::Batch {
                        chunk: index,
                        source: Box::new(e),
                    });
                }
            };

            for item in chunk {
                match response.get(&item.key).filter(|s| !s.is_empty()) {
                    Some(suggestion) if sink.apply_suggestion(&item.key, suggestion) => {
                        report.applied += 1;
                    }
                    Some(_) => report.stale += 1,
                    None => report.without_suggestion += 1,
                }
                guard.release(&item.key);
            }

            tracing::debug!(
                chunk = index,
                size = chunk.len(),
                returned = response.len(),
                "Suggestion chunk applied"
            );
        }

        // Whatever is still held (cancelled tail) is released here.
        guard.release_all();

        tracing::info!(
            applied = report.applied,
            without_suggestion = report.without_suggestion,
            chunks = report.chunks_sent,
            cancelled = report.cancelled,
            "Suggestion batch finished"
        );
        Ok(report)
    }

    /// Request a suggestion for one row.
    ///
    /// Returns `Ok(None)` without contacting the provider when the row is
    /// already in flight, or when the provider had nothing for it.
    pub async fn suggest_one<S>(&self, sink: &S, row: &TranslationRow) -> Result<Option<String>>
    where
        S: SuggestionSink + ?Sized,
    {
        let Some(_guard) = self.in_flight.try_acquire_one(&row.key) else {
            tracing::debug!(key = %row.key, "Row already in flight");
            return Ok(None);
        };

        let response = self
            .provider
            .suggest(&self.request(vec![SuggestionItem::from(row)]))
            .await?;

        match response.get(&row.key).filter(|s| !s.is_empty()) {
            Some(suggestion) if sink.apply_suggestion(&row.key, suggestion) => {
                Ok(Some(suggestion.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::RowTable;
    use std::sync::Mutex;

    /// Translates by suffixing, optionally failing on one call or skipping keys
    #[derive(Default)]
    struct MockProvider {
        calls: Mutex<Vec<Vec<String>>>,
        fail_on_call: Option<usize>,
        skip: HashSet<String>,
    }

    impl MockProvider {
        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SuggestionProvider for MockProvider {
        async fn suggest(&self, request: &SuggestionRequest) -> Result<SuggestionMap> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(request.items.iter().map(|i| i.key.clone()).collect());
                calls.len()
            };
            tokio::task::yield_now().await;

            if self.fail_on_call == Some(call) {
                return Err(Error::Provider("quota exceeded".to_string()));
            }
            Ok(request
                .items
                .iter()
                .filter(|i| !self.skip.contains(&i.key))
                .map(|i| (i.key.clone(), format!("{}-fr", i.value)))
                .collect())
        }
    }

    fn settings(chunk_size: usize) -> Settings {
        Settings {
            chunk_size,
            api_key: "key".to_string(),
            ..Settings::default()
        }
    }

    fn five_rows() -> Mutex<RowTable> {
        Mutex::new(RowTable::from_rows(
            ["a", "b", "c", "d", "e"]
                .iter()
                .map(|k| TranslationRow::new(*k, k.to_uppercase(), k.to_uppercase())),
        ))
    }

    fn rows_of(table: &Mutex<RowTable>) -> Vec<TranslationRow> {
        table.lock().unwrap().rows().to_vec()
    }

    #[tokio::test]
    async fn test_five_rows_in_chunks_of_two() {
        let table = five_rows();
        let batcher = SuggestionBatcher::new(MockProvider::default(), settings(2), InFlightSet::new());

        let report = batcher
            .suggest_all(&table, &rows_of(&table), false)
            .await
            .unwrap();

        assert_eq!(
            batcher.provider().calls(),
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string(), "d".to_string()],
                vec!["e".to_string()],
            ]
        );
        assert_eq!(report.chunks_sent, 3);
        assert_eq!(report.applied, 5);
        assert!(batcher.in_flight().is_empty());

        let table = table.lock().unwrap();
        assert_eq!(table.get("c").unwrap().ai_suggestion, "C-fr");
        // Targets are never touched by the batcher.
        assert_eq!(table.get("c").unwrap().target_value, "C");
    }

    #[tokio::test]
    async fn test_failure_clears_flags_and_keeps_earlier_chunks() {
        let table = five_rows();
        let provider = MockProvider {
            fail_on_call: Some(2),
            ..MockProvider::default()
        };
        let batcher = SuggestionBatcher::new(provider, settings(2), InFlightSet::new());

        let err = batcher
            .suggest_all(&table, &rows_of(&table), false)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Batch { chunk: 1, .. }));
        assert_eq!(batcher.provider().calls().len(), 2);
        assert!(batcher.in_flight().is_empty());

        let table = table.lock().unwrap();
        assert_eq!(table.get("b").unwrap().ai_suggestion, "B-fr");
        assert!(!table.get("c").unwrap().has_suggestion());
        assert!(!table.get("e").unwrap().has_suggestion());
    }

    #[tokio::test]
    async fn test_missing_keys_are_released_without_suggestion() {
        let table = five_rows();
        let provider = MockProvider {
            skip: HashSet::from(["d".to_string()]),
            ..MockProvider::default()
        };
        let batcher = SuggestionBatcher::new(provider, settings(10), InFlightSet::new());

        let report = batcher
            .suggest_all(&table, &rows_of(&table), false)
            .await
            .unwrap();

        assert_eq!(report.applied, 4);
        assert_eq!(report.without_suggestion, 1);
        assert!(batcher.in_flight().is_empty());
        assert!(!table.lock().unwrap().get("d").unwrap().has_suggestion());
    }

    #[tokio::test]
    async fn test_existing_suggestions_skipped_unless_replacing() {
        let table = five_rows();
        table.lock().unwrap().set_suggestion("a", "old").unwrap();
        let batcher = SuggestionBatcher::new(MockProvider::default(), settings(10), InFlightSet::new());

        let report = batcher
            .suggest_all(&table, &rows_of(&table), false)
            .await
            .unwrap();
        assert_eq!(report.candidates, 4);
        assert_eq!(table.lock().unwrap().get("a").unwrap().ai_suggestion, "old");

        let report = batcher
            .suggest_all(&table, &rows_of(&table), true)
            .await
            .unwrap();
        assert_eq!(report.candidates, 5);
        assert_eq!(table.lock().unwrap().get("a").unwrap().ai_suggestion, "A-fr");
    }

    #[tokio::test]
    async fn test_rows_in_flight_elsewhere_are_skipped() {
        let table = five_rows();
        let in_flight = InFlightSet::new();
        let _held = in_flight.acquire(["b"]);
        let batcher = SuggestionBatcher::new(MockProvider::default(), settings(10), in_flight.clone());

        let report = batcher
            .suggest_all(&table, &rows_of(&table), false)
            .await
            .unwrap();

        assert_eq!(report.candidates, 4);
        assert_eq!(in_flight.keys(), vec!["b".to_string()]);
    }

    /// Records the shared in-flight keys at the start of every call
    struct InFlightRecorder {
        in_flight: InFlightSet,
        seen: Mutex<Vec<Vec<String>>>,
    }

    impl SuggestionProvider for InFlightRecorder {
        async fn suggest(&self, request: &SuggestionRequest) -> Result<SuggestionMap> {
            let mut keys = self.in_flight.keys();
            keys.sort();
            self.seen.lock().unwrap().push(keys);
            Ok(request
                .items
                .iter()
                .map(|i| (i.key.clone(), format!("{}-fr", i.value)))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_all_candidates_flagged_before_first_call() {
        let table = five_rows();
        let in_flight = InFlightSet::new();
        let provider = InFlightRecorder {
            in_flight: in_flight.clone(),
            seen: Mutex::new(Vec::new()),
        };
        let batcher = SuggestionBatcher::new(provider, settings(2), in_flight.clone());

        batcher
            .suggest_all(&table, &rows_of(&table), false)
            .await
            .unwrap();

        let seen = batcher.provider().seen.lock().unwrap().clone();
        let keys = |ks: &[&str]| ks.iter().map(|k| k.to_string()).collect::<Vec<_>>();
        assert_eq!(
            seen,
            vec![
                keys(&["a", "b", "c", "d", "e"]),
                keys(&["c", "d", "e"]),
                keys(&["e"]),
            ]
        );
        assert!(in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_before_run_is_reset() {
        let table = five_rows();
        let batcher = SuggestionBatcher::new(MockProvider::default(), settings(2), InFlightSet::new());
        batcher.cancel();

        let report = batcher
            .suggest_all(&table, &rows_of(&table), false)
            .await
            .unwrap();
        assert!(!report.cancelled);
        assert_eq!(report.chunks_sent, 3);
    }

    #[tokio::test]
    async fn test_suggest_one_alongside_bulk_run() {
        let table = Mutex::new(RowTable::from_rows(vec![
            TranslationRow::new("a", "A", "A"),
            TranslationRow::new("b", "B", "B"),
            TranslationRow::new("x", "X", "X"),
        ]));
        let batcher = SuggestionBatcher::new(MockProvider::default(), settings(1), InFlightSet::new());
        let all = rows_of(&table);
        let bulk_rows = all[..2].to_vec();
        let a = all[0].clone();
        let x = all[2].clone();

        let (bulk, busy, single) = tokio::join!(
            batcher.suggest_all(&table, &bulk_rows, false),
            batcher.suggest_one(&table, &a),
            batcher.suggest_one(&table, &x),
        );

        assert_eq!(bulk.unwrap().applied, 2);
        assert_eq!(busy.unwrap(), None);
        assert_eq!(single.unwrap().as_deref(), Some("X-fr"));
        assert_eq!(batcher.provider().calls().len(), 3);
        assert!(batcher.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_suggest_one_failure_clears_flag() {
        let table = five_rows();
        let provider = MockProvider {
            fail_on_call: Some(1),
            ..MockProvider::default()
        };
        let batcher = SuggestionBatcher::new(provider, settings(1), InFlightSet::new());
        let row = rows_of(&table)[0].clone();

        assert!(matches!(
            batcher.suggest_one(&table, &row).await,
            Err(Error::Provider(_))
        ));
        assert!(batcher.in_flight().is_empty());
    }
}
