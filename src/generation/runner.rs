use super::llm_client::{CompletionBackend, CompletionClient};
use super::postprocess::{PassthroughPostProcessor, PostProcessor};
use super::prompt::PromptStore;
use super::response::ChatCompletionRequest;
use crate::config::JobConfig;
use crate::domain::{Record, Transcript};
use crate::error::{BatchError, Result};
use crate::memory::{JsonResultStore, RecordSet, ResultStore};
use crate::utils::unresolved_markers;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::Value;
use std::error::Error as _;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    SingleTurn,
    Consecutive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub skipped_complete: usize,
    pub skipped_budget: usize,
    pub checkpoints: usize,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunStats),
    /// A request exhausted its retries. Results were saved; run again to resume.
    Suspended {
        index: usize,
        error: BatchError,
        stats: RunStats,
    },
}

impl RunOutcome {
    pub fn stats(&self) -> &RunStats {
        match self {
            RunOutcome::Completed(stats) => stats,
            RunOutcome::Suspended { stats, .. } => stats,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, RunOutcome::Suspended { .. })
    }
}

pub struct BatchRunner<B: CompletionBackend> {
    config: JobConfig,
    prompts: PromptStore,
    client: CompletionClient<B>,
    post_processor: Box<dyn PostProcessor>,
    store: Box<dyn ResultStore>,
}

impl<B: CompletionBackend> BatchRunner<B> {
    pub fn new(config: JobConfig, prompts: PromptStore, backend: Arc<B>) -> Result<Self> {
        config.validate()?;
        info!(
            results = %config.results_json_path.display(),
            model = %config.model_name,
            prompts = prompts.len(),
            budget = ?config.budget,
            debug_sample = ?config.debug_mode,
            "batch runner configured"
        );
        let store = JsonResultStore::new(config.results_json_path.clone());
        Ok(Self {
            config,
            prompts,
            client: CompletionClient::new(backend),
            post_processor: Box::new(PassthroughPostProcessor),
            store: Box::new(store),
        })
    }

    pub fn with_post_processor(mut self, post_processor: impl PostProcessor + 'static) -> Self {
        self.post_processor = Box::new(post_processor);
        self
    }

    pub fn with_store(mut self, store: impl ResultStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn generate(&self, data: Vec<Record>) -> Result<RunOutcome> {
        self.run(data, GenerationMode::SingleTurn)
    }

    pub fn generate_consecutive(&self, data: Vec<Record>) -> Result<RunOutcome> {
        self.run(data, GenerationMode::Consecutive)
    }

    pub fn run(&self, data: Vec<Record>, mode: GenerationMode) -> Result<RunOutcome> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut records = self.load_working_set(data, &mut rng)?;
        self.prepare(&mut records, mode)?;

        if let Some(size) = self.config.debug_mode {
            records = records.sample(&mut rng, size)?;
            info!(sample = size, "debug mode, running on a sample of the records");
        }

        info!(mode = ?mode, records = records.len(), "generation started");
        if let Some(first) = records.get(0) {
            debug!(prepared = ?first.prepared(), "first prepared prompt");
        }

        let mut stats = RunStats {
            total: records.len(),
            ..RunStats::default()
        };

        for idx in 0..records.len() {
            let Some(record) = records.get(idx) else {
                break;
            };
            if record.is_complete() {
                stats.skipped_complete += 1;
                continue;
            }
            if self.config.budget.is_some_and(|budget| idx > budget) {
                stats.skipped_budget += 1;
                continue;
            }

            stats.dispatched += 1;
            let result = match mode {
                GenerationMode::SingleTurn => self.complete_single(idx, record),
                GenerationMode::Consecutive => self.complete_consecutive(idx, record),
            };

            match result {
                Ok((content, prediction)) => {
                    if let Some(record) = records.get_mut(idx) {
                        record.set_result(content, prediction);
                    }
                    stats.completed += 1;
                }
                Err(err @ BatchError::RetryBudgetExhausted { .. }) => {
                    self.checkpoint(&records, &mut stats)?;
                    let cause = err.source().map(ToString::to_string);
                    error!(
                        index = idx,
                        error = %err,
                        cause = ?cause,
                        completed = stats.completed,
                        "run suspended, results saved; run again to resume"
                    );
                    return Ok(RunOutcome::Suspended {
                        index: idx,
                        error: err,
                        stats,
                    });
                }
                Err(err) => return Err(err),
            }

            if idx > 0 && idx % self.config.save_every == 0 {
                self.checkpoint(&records, &mut stats)?;
                info!(index = idx, completed = stats.completed, "checkpoint saved");
            }
        }

        self.checkpoint(&records, &mut stats)?;
        info!(
            total = stats.total,
            dispatched = stats.dispatched,
            completed = stats.completed,
            skipped_complete = stats.skipped_complete,
            skipped_budget = stats.skipped_budget,
            "generation done"
        );
        Ok(RunOutcome::Completed(stats))
    }

    fn load_working_set(&self, data: Vec<Record>, rng: &mut StdRng) -> Result<RecordSet> {
        if self.config.overwrite {
            warn!(results = %self.config.results_json_path.display(), "previous results will be overwritten");
        } else if let Some(saved) = self.store.load()? {
            info!(records = saved.len(), "continuing from saved results");
            return Ok(RecordSet::new(saved));
        }

        let mut records = RecordSet::new(data);
        if self.config.shuffle_data_before_generate {
            records.shuffle(rng);
        }
        Ok(records)
    }

    fn prepare(&self, records: &mut RecordSet, mode: GenerationMode) -> Result<()> {
        let expected_turns = self.prompts.len();
        for (idx, record) in records.iter_mut().enumerate() {
            match mode {
                GenerationMode::SingleTurn => {
                    match record.prepared() {
                        None => {}
                        Some(Value::String(_)) => continue,
                        Some(_) if record.is_complete() => continue,
                        Some(_) => {
                            return Err(BatchError::Configuration(format!(
                                "record {idx} holds multi-turn prompts, it cannot run in single-turn mode"
                            )))
                        }
                    }
                    let prepared = self.prompts.render(record, None)?;
                    log_unresolved(idx, &prepared);
                    record.set_prepared(Value::String(prepared));
                }
                GenerationMode::Consecutive => {
                    let ready = record
                        .prepared_turns()
                        .is_some_and(|turns| turns.len() == expected_turns);
                    if ready {
                        continue;
                    }
                    let turns = self.prompts.render_all(record);
                    for turn in &turns {
                        log_unresolved(idx, turn);
                    }
                    record.set_prepared(Value::Array(turns.into_iter().map(Value::String).collect()));
                }
            }
        }
        Ok(())
    }

    fn complete_single(&self, idx: usize, record: &Record) -> Result<(Value, Value)> {
        let prompt = record.prepared_text().ok_or_else(|| {
            BatchError::Configuration(format!("record {idx} has no prepared prompt"))
        })?;

        let mut transcript = Transcript::new(self.config.system_msg.as_str());
        transcript.push_user(prompt);
        let completion =
            self.client
                .complete(self.config.delay(), self.config.max_trials, &self.request(&transcript))?;

        let (content, prediction) = self.post_processor.process(&completion, None);
        Ok((Value::String(content), prediction))
    }

    fn complete_consecutive(&self, idx: usize, record: &Record) -> Result<(Value, Value)> {
        let turns = record
            .prepared_turns()
            .filter(|turns| turns.len() == self.prompts.len())
            .ok_or_else(|| {
                BatchError::Configuration(format!("record {idx} has no prepared turns"))
            })?;

        let mut transcript = Transcript::new(self.config.system_msg.as_str());
        let mut contents = Vec::with_capacity(turns.len());
        let mut predictions = Vec::with_capacity(turns.len());

        for (turn, template) in turns.into_iter().zip(self.prompts.templates()) {
            transcript.push_user(turn);
            let completion = self.client.complete(
                self.config.delay(),
                self.config.max_trials,
                &self.request(&transcript),
            )?;

            let (content, prediction) = self
                .post_processor
                .process(&completion, Some(template.name.as_str()));
            transcript.push_assistant(completion.first_content().unwrap_or_default());
            contents.push(Value::String(content));
            predictions.push(prediction);
        }

        Ok((Value::Array(contents), Value::Array(predictions)))
    }

    fn request(&self, transcript: &Transcript) -> ChatCompletionRequest {
        ChatCompletionRequest::new(
            self.config.model_name.as_str(),
            transcript,
            self.config.max_token,
            self.config.temperature,
        )
    }

    fn checkpoint(&self, records: &RecordSet, stats: &mut RunStats) -> Result<()> {
        self.store.save(records.records())?;
        stats.checkpoints += 1;
        Ok(())
    }
}

fn log_unresolved(idx: usize, prompt: &str) {
    let markers = unresolved_markers(prompt);
    if !markers.is_empty() {
        debug!(index = idx, markers = ?markers, "prompt keeps unresolved markers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::llm_client::MockCompletionBackend;
    use crate::generation::postprocess::JsonPostProcessor;
    use crate::generation::prompt::PromptTemplate;
    use crate::domain::Role;
    use crate::memory::ResultSetLoader;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::path::Path;

    #[derive(Clone, Default)]
    struct RecordingStore {
        saved: Arc<Mutex<Option<Vec<Record>>>>,
        snapshots: Arc<Mutex<Vec<Vec<Record>>>>,
    }

    impl RecordingStore {
        fn snapshots(&self) -> Vec<Vec<Record>> {
            self.snapshots.lock().clone()
        }
    }

    impl ResultStore for RecordingStore {
        fn load(&self) -> Result<Option<Vec<Record>>> {
            Ok(self.saved.lock().clone())
        }

        fn save(&self, records: &[Record]) -> Result<()> {
            self.snapshots.lock().push(records.to_vec());
            *self.saved.lock() = Some(records.to_vec());
            Ok(())
        }
    }

    fn job(dir: &Path) -> JobConfig {
        let mut config = JobConfig::new(dir.join("results.json"));
        config.delay = 0.0;
        config.max_trials = 1;
        config.system_msg = "You label banking queries.".to_string();
        config
    }

    fn single_prompt() -> PromptStore {
        PromptStore::new(vec![PromptTemplate::new("intent", "Classify: [TEXT]")]).unwrap()
    }

    fn three_prompts() -> PromptStore {
        PromptStore::new(vec![
            PromptTemplate::new("intent", "Classify: [TEXT]"),
            PromptTemplate::new("explain", "Explain your label for [TEXT]"),
            PromptTemplate::new("confidence", "How sure are you?"),
        ])
        .unwrap()
    }

    fn data(n: usize) -> Vec<Record> {
        (0..n).map(|i| Record::from_text(format!("q{i}"))).collect()
    }

    fn runner(
        config: JobConfig,
        prompts: PromptStore,
        backend: &Arc<MockCompletionBackend>,
    ) -> BatchRunner<MockCompletionBackend> {
        BatchRunner::new(config, prompts, backend.clone()).unwrap()
    }

    fn saved(dir: &Path) -> Vec<Record> {
        ResultSetLoader::load_from_path(dir.join("results.json"))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn single_turn_run_fills_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockCompletionBackend::default());
        for reply in ["card_arrival", " top_up \n", "lost_card"] {
            backend.push_reply(reply);
        }

        let outcome = runner(job(dir.path()), single_prompt(), &backend)
            .generate(data(3))
            .unwrap();

        assert!(!outcome.is_suspended());
        assert_eq!(outcome.stats().completed, 3);
        let records = saved(dir.path());
        assert_eq!(records[1].prepared_text(), Some("Classify: q1"));
        assert_eq!(records[1].prediction(), Some(&json!("top_up")));
        assert_eq!(records[1].content(), Some(&json!("top_up")));

        let request = &backend.requests()[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, "You label banking queries.");
        assert_eq!(request.messages[1].content, "Classify: q0");
    }

    #[test]
    fn completed_records_are_skipped_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockCompletionBackend::default());
        backend.push_reply("first");
        backend.push_reply("second");
        runner(job(dir.path()), single_prompt(), &backend)
            .generate(data(2))
            .unwrap();
        let before = saved(dir.path());

        let rerun_backend = Arc::new(MockCompletionBackend::default());
        let outcome = runner(job(dir.path()), single_prompt(), &rerun_backend)
            .generate(data(2))
            .unwrap();

        assert_eq!(rerun_backend.call_count(), 0);
        assert_eq!(outcome.stats().skipped_complete, 2);
        assert_eq!(saved(dir.path()), before);
    }

    #[test]
    fn budget_caps_dispatched_indices() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockCompletionBackend::default());
        for _ in 0..5 {
            backend.push_reply("ok");
        }
        let mut config = job(dir.path());
        config.budget = Some(1);

        let outcome = runner(config, single_prompt(), &backend)
            .generate(data(5))
            .unwrap();

        assert_eq!(backend.call_count(), 2);
        assert_eq!(outcome.stats().skipped_budget, 3);
        let records = saved(dir.path());
        assert!(records[..2].iter().all(Record::is_complete));
        assert!(records[2..].iter().all(|r| r.prediction().is_none()));
    }

    #[test]
    fn checkpoints_follow_the_save_cadence() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockCompletionBackend::default());
        for i in 0..5 {
            backend.push_reply(format!("r{i}"));
        }
        let mut config = job(dir.path());
        config.save_every = 2;
        let store = RecordingStore::default();

        let outcome = runner(config, single_prompt(), &backend)
            .with_store(store.clone())
            .generate(data(5))
            .unwrap();

        // after index 2, after index 4, then the final save
        let snapshots = store.snapshots();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(outcome.stats().checkpoints, 3);
        let complete: Vec<bool> = snapshots[0].iter().map(Record::is_complete).collect();
        assert_eq!(complete, vec![true, true, true, false, false]);
        assert!(snapshots[1].iter().all(Record::is_complete));
    }

    #[test]
    fn exhausted_retries_save_and_suspend() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockCompletionBackend::default());
        let mut config = job(dir.path());
        config.max_trials = 3;

        let outcome = runner(config, single_prompt(), &backend)
            .generate(data(2))
            .unwrap();

        assert_eq!(backend.call_count(), 3);
        match outcome {
            RunOutcome::Suspended { index, error, stats } => {
                assert_eq!(index, 0);
                assert!(matches!(error, BatchError::RetryBudgetExhausted { attempts: 3, .. }));
                assert_eq!(stats.checkpoints, 1);
            }
            other => panic!("expected suspension, got {other:?}"),
        }
        let records = saved(dir.path());
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.prediction().is_none()));
        assert_eq!(records[0].prepared_text(), Some("Classify: q0"));
    }

    #[test]
    fn suspended_run_resumes_where_it_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockCompletionBackend::default());
        backend.push_reply("a");
        backend.push_failure("quota exceeded");
        let outcome = runner(job(dir.path()), single_prompt(), &backend)
            .generate(data(3))
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Suspended { index: 1, .. }));

        let resume_backend = Arc::new(MockCompletionBackend::default());
        resume_backend.push_reply("b");
        resume_backend.push_reply("c");
        let outcome = runner(job(dir.path()), single_prompt(), &resume_backend)
            .generate(Vec::new())
            .unwrap();

        assert!(!outcome.is_suspended());
        assert_eq!(resume_backend.call_count(), 2);
        let predictions: Vec<_> = saved(dir.path())
            .iter()
            .map(|r| r.prediction().cloned())
            .collect();
        assert_eq!(
            predictions,
            vec![Some(json!("a")), Some(json!("b")), Some(json!("c"))]
        );
    }

    #[test]
    fn prepared_prompts_are_not_recomputed_on_resume() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::default();
        store
            .save(&[Record::from_text("q0").with_field("prepared", "hand-written prompt")])
            .unwrap();
        let backend = Arc::new(MockCompletionBackend::default());
        backend.push_reply("ok");

        runner(job(dir.path()), single_prompt(), &backend)
            .with_store(store)
            .generate(data(1))
            .unwrap();

        assert_eq!(backend.requests()[0].messages[1].content, "hand-written prompt");
    }

    #[test]
    fn overwrite_ignores_saved_results() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::default();
        store
            .save(&[Record::from_text("old").with_field("prediction", "old")])
            .unwrap();
        let backend = Arc::new(MockCompletionBackend::default());
        backend.push_reply("new");
        let mut config = job(dir.path());
        config.overwrite = true;

        runner(config, single_prompt(), &backend)
            .with_store(store.clone())
            .generate(vec![Record::from_text("fresh")])
            .unwrap();

        let last = store.snapshots().pop().unwrap();
        assert_eq!(last, vec![Record::from_text("fresh")
            .with_field("prepared", "Classify: fresh")
            .with_field("content", "new")
            .with_field("prediction", "new")]);
    }

    #[test]
    fn shuffle_uses_the_configured_seed() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockCompletionBackend::default());
        let mut config = job(dir.path());
        config.shuffle_data_before_generate = true;
        config.seed = 3;
        config.budget = Some(0);
        backend.push_reply("only");

        runner(config, single_prompt(), &backend)
            .generate(data(6))
            .unwrap();

        let mut expected = RecordSet::new(data(6));
        expected.shuffle(&mut StdRng::seed_from_u64(3));
        let order: Vec<_> = saved(dir.path())
            .iter()
            .map(|r| r.get("text").cloned())
            .collect();
        let expected: Vec<_> = expected
            .records()
            .iter()
            .map(|r| r.get("text").cloned())
            .collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn debug_mode_narrows_the_run_to_a_sample() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockCompletionBackend::default());
        backend.push_reply("x");
        backend.push_reply("y");
        let mut config = job(dir.path());
        config.debug_mode = Some(2);

        let outcome = runner(config, single_prompt(), &backend)
            .generate(data(5))
            .unwrap();

        assert_eq!(outcome.stats().total, 2);
        assert_eq!(backend.call_count(), 2);
        assert_eq!(saved(dir.path()).len(), 2);
    }

    #[test]
    fn consecutive_mode_threads_the_conversation() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockCompletionBackend::default());
        backend.push_reply("```json\n{\"intent\": \"card_arrival\"}\n```");
        backend.push_reply("Because it mentions delivery.");
        backend.push_reply("0.9");

        runner(job(dir.path()), three_prompts(), &backend)
            .with_post_processor(JsonPostProcessor)
            .generate_consecutive(vec![Record::from_text("where is my card")])
            .unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 3);
        let roles: Vec<Role> = requests[2].messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User
            ]
        );
        assert_eq!(requests[2].messages[3].content, "Explain your label for where is my card");
        assert_eq!(
            requests[1].messages[2].content,
            "```json\n{\"intent\": \"card_arrival\"}\n```"
        );

        let record = &saved(dir.path())[0];
        assert_eq!(
            record.prepared(),
            Some(&json!([
                "Classify: where is my card",
                "Explain your label for where is my card",
                "How sure are you?"
            ]))
        );
        assert_eq!(
            record.prediction(),
            Some(&json!([{"intent": "card_arrival"}, "Because it mentions delivery.", 0.9]))
        );
    }

    #[test]
    fn consecutive_failure_keeps_no_partial_turns() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockCompletionBackend::default());
        backend.push_reply("turn one");
        backend.push_failure("server overloaded");

        let outcome = runner(job(dir.path()), three_prompts(), &backend)
            .generate_consecutive(data(1))
            .unwrap();
        assert!(outcome.is_suspended());
        let record = &saved(dir.path())[0];
        assert!(record.prediction().is_none());
        assert!(record.content().is_none());

        let resume_backend = Arc::new(MockCompletionBackend::default());
        for reply in ["one", "two", "three"] {
            resume_backend.push_reply(reply);
        }
        runner(job(dir.path()), three_prompts(), &resume_backend)
            .generate_consecutive(data(1))
            .unwrap();
        assert_eq!(resume_backend.call_count(), 3);
        assert_eq!(
            saved(dir.path())[0].prediction(),
            Some(&json!(["one", "two", "three"]))
        );
    }

    #[test]
    fn consecutive_reprepares_on_turn_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::default();
        store
            .save(&[Record::from_text("q0").with_field("prepared", json!(["stale"]))])
            .unwrap();
        let backend = Arc::new(MockCompletionBackend::default());
        for reply in ["1", "2", "3"] {
            backend.push_reply(reply);
        }

        runner(job(dir.path()), three_prompts(), &backend)
            .with_store(store.clone())
            .generate_consecutive(Vec::new())
            .unwrap();

        let last = store.snapshots().pop().unwrap();
        assert_eq!(last[0].prepared_turns().map(|t| t.len()), Some(3));
        assert_eq!(backend.requests()[0].messages[1].content, "Classify: q0");
    }

    #[test]
    fn single_turn_refuses_multi_turn_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::default();
        store
            .save(&[Record::from_text("q0").with_field("prepared", json!(["a", "b"]))])
            .unwrap();
        let backend = Arc::new(MockCompletionBackend::default());

        let err = runner(job(dir.path()), single_prompt(), &backend)
            .with_store(store)
            .generate(Vec::new())
            .unwrap_err();
        assert!(matches!(err, BatchError::Configuration(_)));
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn single_turn_skips_completed_multi_turn_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::default();
        store
            .save(&[Record::from_text("q0")
                .with_field("prepared", json!(["a", "b"]))
                .with_field("content", json!(["x", "y"]))
                .with_field("prediction", json!(["x", "y"]))])
            .unwrap();
        let backend = Arc::new(MockCompletionBackend::default());

        let outcome = runner(job(dir.path()), single_prompt(), &backend)
            .with_store(store.clone())
            .generate(Vec::new())
            .unwrap();

        assert!(!outcome.is_suspended());
        assert_eq!(outcome.stats().skipped_complete, 1);
        assert_eq!(backend.call_count(), 0);
        let last = store.snapshots().pop().unwrap();
        assert_eq!(last[0].prepared(), Some(&json!(["a", "b"])));
    }

    #[test]
    fn debug_sample_is_stable_for_a_seed() {
        let sampled_texts = |dir: &Path| {
            let backend = Arc::new(MockCompletionBackend::default());
            for _ in 0..3 {
                backend.push_reply("ok");
            }
            let mut config = job(dir);
            config.seed = 11;
            config.shuffle_data_before_generate = true;
            config.debug_mode = Some(3);
            runner(config, single_prompt(), &backend)
                .generate(data(8))
                .unwrap();
            saved(dir)
                .iter()
                .map(|r| r.get("text").cloned())
                .collect::<Vec<_>>()
        };

        let first_dir = tempfile::tempdir().unwrap();
        let second_dir = tempfile::tempdir().unwrap();
        let first = sampled_texts(first_dir.path());
        let second = sampled_texts(second_dir.path());
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);

        // shuffle draws from the generator before the sample does
        let mut rng = StdRng::seed_from_u64(11);
        let mut expected = RecordSet::new(data(8));
        expected.shuffle(&mut rng);
        let expected: Vec<_> = expected
            .sample(&mut rng, 3)
            .unwrap()
            .records()
            .iter()
            .map(|r| r.get("text").cloned())
            .collect();
        assert_eq!(first, expected);
    }

    #[test]
    fn invalid_results_path_fails_before_running() {
        let backend = Arc::new(MockCompletionBackend::default());
        let config = JobConfig::new("results.csv");
        assert!(matches!(
            BatchRunner::new(config, single_prompt(), backend),
            Err(BatchError::Configuration(_))
        ));
    }
}
