//! Transcript Sink (C9): turns a dispatched utterance into durable
//! artifacts — a WAV/txt pair per conversation, a rolling `spoken.txt`
//! log, a noun-frequency map, an activity log line, and (optionally) a
//! fire-and-forget call out to an agent.

use crate::audio::wav::write_wav_f32;
use crate::error::Result;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Characters (besides alphanumerics) that count towards the "valid
/// character" ratio in the noise filter's first check.
const ALLOWED_PUNCTUATION: &str = " ,.!?-'\"():";

/// Strips everything but letters and digits, lowercased, so a tagger only
/// ever sees the bare word.
fn clean_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn is_numeric_token(token: &str) -> bool {
    let cleaned = clean_token(token);
    !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit())
}

/// The six checks that keep hallucinated or low-value text out of the
/// rolling `spoken.txt` log, in the order they're applied. Any one
/// failing excludes the line; none of them gate the WAV/txt conversation
/// artifacts, which are written unconditionally.
fn is_noise(text: &str, tagger: &dyn PosTagger) -> bool {
    let trimmed = text.trim();

    // 1. Non-empty after trimming.
    if trimmed.is_empty() {
        return true;
    }

    // 2. At least 60% of characters are alphanumeric or ordinary punctuation.
    let total_chars = trimmed.chars().count();
    let valid_chars = trimmed
        .chars()
        .filter(|c| c.is_alphanumeric() || ALLOWED_PUNCTUATION.contains(*c))
        .count();
    if total_chars > 0 && (valid_chars as f32 / total_chars as f32) < 0.6 {
        return true;
    }

    // 3. At least 2 whitespace-separated tokens.
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() < 2 {
        return true;
    }

    // 4. At least 30% of tokens are a recognised open-class part of speech.
    let open_class_count = tokens
        .iter()
        .filter(|t| tagger.is_open_class(&clean_token(t)))
        .count();
    if (open_class_count as f32 / tokens.len() as f32) < 0.3 {
        return true;
    }

    // 5. At least one noun or verb present.
    let has_noun_or_verb = tokens.iter().any(|t| tagger.is_noun_or_verb(&clean_token(t)));
    if !has_noun_or_verb {
        return true;
    }

    // 6. Among tokens at 4-or-more count, purely numeric tokens don't exceed 50%.
    if tokens.len() >= 4 {
        let numeric_count = tokens.iter().filter(|t| is_numeric_token(t)).count();
        if (numeric_count as f32 / tokens.len() as f32) > 0.5 {
            return true;
        }
    }

    false
}

const SPOKEN_LOG_CAP_BYTES: u64 = 5 * 1024;

/// Current wall-clock time formatted as the `YYYYMMDD_HHMMSS` slug used
/// for every artifact filename and log entry. Distinct from the
/// injectable monotonic `Clock` used for deadline arithmetic — this is
/// purely for naming, never compared against.
pub fn timestamp_slug() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Capability trait for tagging words with parts of speech, so the noise
/// filter and `words.json`'s noun-frequency map can be built without the
/// sink itself knowing anything about language.
pub trait PosTagger: Send + Sync {
    /// Returns true if `word` should count towards the noun-frequency map.
    fn is_noun(&self, word: &str) -> bool;
    /// Returns true if `word` is a recognised noun, verb, adjective,
    /// adverb, pronoun, or determiner — the open-class set the noise
    /// filter's token-ratio check (§4.8 check 4) consults.
    fn is_open_class(&self, word: &str) -> bool;
    /// Returns true if `word` is specifically a noun or a verb — the
    /// narrower set the noise filter's "meaningful content" check
    /// (§4.8 check 5) consults.
    fn is_noun_or_verb(&self, word: &str) -> bool;
}

/// Best-effort tagger requiring no model: classifies by small closed-class
/// word lists (determiners, pronouns, auxiliary verbs, conjunctions and
/// prepositions) and treats any other alphabetic word as noun-like. Good
/// enough to get a rough topic signal and a workable noise filter without
/// pulling in an NLP dependency.
pub struct HeuristicPosTagger;

const DETERMINERS: &[&str] = &["the", "a", "an", "this", "that", "these", "those"];

const PRONOUNS: &[&str] = &[
    "i", "you", "he", "she", "it", "we", "they", "my", "your", "his", "her", "its", "our", "their",
];

/// Conjunctions and prepositions: closed-class words that don't count as
/// any of noun/verb/adjective/adverb/pronoun/determiner.
const EXCLUDED_FROM_OPEN_CLASS: &[&str] = &["and", "or", "but", "in", "on", "at", "for", "with", "of", "to"];

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "to", "of", "and", "or",
    "but", "in", "on", "at", "for", "with", "i", "you", "he", "she", "it", "we", "they", "my",
    "your", "his", "her", "its", "our", "their", "this", "that", "these", "those", "do", "does",
    "did", "can", "could", "would", "will", "should", "please", "goose", "gus",
];

impl PosTagger for HeuristicPosTagger {
    fn is_noun(&self, word: &str) -> bool {
        let lowered = word.to_lowercase();
        lowered.chars().all(|c| c.is_alphabetic()) && !STOPWORDS.contains(&lowered.as_str())
    }

    fn is_open_class(&self, word: &str) -> bool {
        let lowered = word.to_lowercase();
        !lowered.is_empty()
            && lowered.chars().all(|c| c.is_alphabetic())
            && !EXCLUDED_FROM_OPEN_CLASS.contains(&lowered.as_str())
    }

    fn is_noun_or_verb(&self, word: &str) -> bool {
        let lowered = word.to_lowercase();
        self.is_open_class(&lowered)
            && !DETERMINERS.contains(&lowered.as_str())
            && !PRONOUNS.contains(&lowered.as_str())
    }
}

/// Capability trait for fire-and-forget handoff to an external agent once
/// an utterance is dispatched. Failures are logged, never propagated —
/// the sink's own artifacts are already durable by the time this runs.
pub trait AgentInvoker: Send + Sync {
    fn invoke(&self, transcript: &str, wav_path: &Path);
}

/// No-op invoker used when no agent integration is configured.
pub struct NoopAgentInvoker;

impl AgentInvoker for NoopAgentInvoker {
    fn invoke(&self, _transcript: &str, _wav_path: &Path) {}
}

pub struct TranscriptSinkConfig {
    pub recordings_dir: PathBuf,
    pub data_dir: PathBuf,
    pub sample_rate: u32,
}

/// Writes every dispatched utterance to disk and maintains the ambient
/// data-dir artifacts (`spoken.txt`, `words.json`, `ACTIVITY-LOG.md`).
pub struct TranscriptSink<A: AgentInvoker, P: PosTagger> {
    config: TranscriptSinkConfig,
    agent: A,
    tagger: P,
}

impl<A: AgentInvoker, P: PosTagger> TranscriptSink<A, P> {
    pub fn new(config: TranscriptSinkConfig, agent: A, tagger: P) -> Self {
        Self {
            config,
            agent,
            tagger,
        }
    }

    fn spoken_log_path(&self) -> PathBuf {
        self.config.data_dir.join("spoken.txt")
    }

    fn words_json_path(&self) -> PathBuf {
        self.config.data_dir.join("words.json")
    }

    fn activity_log_path(&self) -> PathBuf {
        self.config.data_dir.join("ACTIVITY-LOG.md")
    }

    /// Handles one finished utterance: writes the WAV+txt conversation
    /// artifact, appends to the rolling log (unless filtered as noise),
    /// updates the noun-frequency map, appends to the activity log, and
    /// fires the agent invoker.
    pub fn handle(&self, timestamp_slug: &str, transcript: &str, audio: &[f32]) -> Result<()> {
        fs::create_dir_all(&self.config.recordings_dir)?;
        fs::create_dir_all(&self.config.data_dir)?;

        let wav_path = self
            .config
            .recordings_dir
            .join(format!("conversation_{timestamp_slug}.wav"));
        let txt_path = self
            .config
            .recordings_dir
            .join(format!("conversation_{timestamp_slug}.txt"));

        write_wav_f32(&wav_path, audio, self.config.sample_rate)?;
        fs::write(&txt_path, transcript)?;

        if !is_noise(transcript, &self.tagger) {
            self.append_spoken_log(transcript)?;
            self.update_word_frequencies(transcript)?;
        }

        self.append_activity_log(timestamp_slug, transcript)?;
        self.agent.invoke(transcript, &wav_path);

        Ok(())
    }

    /// Handles an utterance that originated from the hotkey/screen path
    /// (C10) rather than the voice pipeline: there's no audio, so no WAV
    /// is written; the conversation `.txt` records the screenshot path
    /// alongside the typed-or-spoken instruction.
    pub fn handle_screen(
        &self,
        timestamp_slug: &str,
        screenshot_path: &Path,
        instruction: &str,
    ) -> Result<()> {
        fs::create_dir_all(&self.config.recordings_dir)?;
        fs::create_dir_all(&self.config.data_dir)?;

        let txt_path = self
            .config
            .recordings_dir
            .join(format!("conversation_{timestamp_slug}.txt"));
        let body = format!("screenshot: {}\ninstruction: {instruction}", screenshot_path.display());
        fs::write(&txt_path, &body)?;

        if !is_noise(instruction, &self.tagger) {
            self.append_spoken_log(instruction)?;
            self.update_word_frequencies(instruction)?;
        }

        self.append_activity_log(timestamp_slug, instruction)?;
        self.agent.invoke(instruction, screenshot_path);

        Ok(())
    }

    /// Appends a line to `spoken.txt`, then trims from the front (oldest
    /// first) until the file is back under the size cap. Rewritten
    /// atomically via a temp file + rename so a crash mid-write never
    /// leaves a half-written log.
    fn append_spoken_log(&self, transcript: &str) -> Result<()> {
        let path = self.spoken_log_path();
        let mut existing = fs::read_to_string(&path).unwrap_or_default();
        existing.push_str(transcript.trim());
        existing.push('\n');

        while existing.len() as u64 > SPOKEN_LOG_CAP_BYTES {
            match existing.find('\n') {
                Some(idx) => existing.drain(0..=idx),
                None => break,
            };
        }

        let tmp_path = path.with_extension("txt.tmp");
        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(existing.as_bytes())?;
        }
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn update_word_frequencies(&self, transcript: &str) -> Result<()> {
        let path = self.words_json_path();
        let existing = fs::read_to_string(&path).unwrap_or_default();
        let mut counts: HashMap<String, u64> =
            serde_json::from_str(&existing).unwrap_or_default();

        for word in transcript.split_whitespace() {
            let cleaned: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if cleaned.is_empty() || !self.tagger.is_noun(&cleaned) {
                continue;
            }
            *counts.entry(cleaned).or_insert(0) += 1;
        }

        let serialized = serde_json::to_string_pretty(&counts).map_err(|e| {
            crate::error::ListenError::ArtifactWrite {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;
        fs::write(&path, serialized)?;
        Ok(())
    }

    fn append_activity_log(&self, timestamp_slug: &str, transcript: &str) -> Result<()> {
        let path = self.activity_log_path();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "- {timestamp_slug}: {transcript}")?;
        Ok(())
    }

    /// Writes a wake-word audit record under `recordings_dir`: one of
    /// `activation_triggered_*.txt` or `activation_bypassed_*.txt`
    /// depending on whether the classifier accepted the activation.
    pub fn record_activation(
        &self,
        timestamp_slug: &str,
        transcript: &str,
        confidence: f32,
        triggered: bool,
    ) -> Result<()> {
        fs::create_dir_all(&self.config.recordings_dir)?;

        let kind = if triggered { "triggered" } else { "bypassed" };
        let path = self
            .config
            .recordings_dir
            .join(format!("activation_{kind}_{timestamp_slug}.txt"));

        let body = format!(
            "TIMESTAMP: {timestamp_slug}\nCONFIDENCE: {confidence:.2}\nTRIGGERED: {triggered}\nTRANSCRIPT: {transcript}\n"
        );
        fs::write(&path, body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn config(dir: &Path) -> TranscriptSinkConfig {
        TranscriptSinkConfig {
            recordings_dir: dir.join("recordings"),
            data_dir: dir.join("data"),
            sample_rate: 16000,
        }
    }

    #[test]
    fn noise_filter_rejects_empty_text() {
        assert!(is_noise("", &HeuristicPosTagger));
        assert!(is_noise("   ", &HeuristicPosTagger));
    }

    #[test]
    fn noise_filter_rejects_fewer_than_two_tokens() {
        assert!(is_noise("ok", &HeuristicPosTagger));
        assert!(is_noise("[music]", &HeuristicPosTagger));
    }

    #[test]
    fn noise_filter_rejects_low_valid_character_ratio() {
        assert!(is_noise("@@@ ###", &HeuristicPosTagger));
    }

    #[test]
    fn noise_filter_rejects_low_open_class_ratio() {
        assert!(is_noise("and of", &HeuristicPosTagger));
    }

    #[test]
    fn noise_filter_rejects_no_noun_or_verb() {
        assert!(is_noise("this that", &HeuristicPosTagger));
        assert!(is_noise("the the the the", &HeuristicPosTagger));
    }

    #[test]
    fn noise_filter_rejects_high_numeric_ratio() {
        assert!(is_noise("3 4 5 cat dog", &HeuristicPosTagger));
    }

    #[test]
    fn noise_filter_accepts_real_content() {
        assert!(!is_noise("remind me to water the plants tomorrow", &HeuristicPosTagger));
    }

    #[test]
    fn heuristic_tagger_excludes_stopwords() {
        let tagger = HeuristicPosTagger;
        assert!(!tagger.is_noun("the"));
        assert!(!tagger.is_noun("goose"));
        assert!(tagger.is_noun("calendar"));
    }

    #[test]
    fn heuristic_tagger_open_class_includes_determiners_and_pronouns() {
        let tagger = HeuristicPosTagger;
        assert!(tagger.is_open_class("the"));
        assert!(tagger.is_open_class("they"));
        assert!(!tagger.is_open_class("and"));
        assert!(!tagger.is_open_class("of"));
    }

    #[test]
    fn heuristic_tagger_noun_or_verb_excludes_determiners_and_pronouns() {
        let tagger = HeuristicPosTagger;
        assert!(!tagger.is_noun_or_verb("the"));
        assert!(!tagger.is_noun_or_verb("they"));
        assert!(tagger.is_noun_or_verb("calendar"));
        assert!(tagger.is_noun_or_verb("was"));
    }

    #[test]
    fn handle_writes_wav_and_txt_artifacts() {
        let dir = tempdir().unwrap();
        let sink = TranscriptSink::new(config(dir.path()), NoopAgentInvoker, HeuristicPosTagger);

        sink.handle("20260101-120000", "remind me to check the mailbox", &[0.0; 1600])
            .unwrap();

        assert!(
            dir.path()
                .join("recordings/conversation_20260101-120000.wav")
                .exists()
        );
        let txt = fs::read_to_string(
            dir.path()
                .join("recordings/conversation_20260101-120000.txt"),
        )
        .unwrap();
        assert_eq!(txt, "remind me to check the mailbox");
    }

    #[test]
    fn handle_skips_spoken_log_for_noise() {
        let dir = tempdir().unwrap();
        let sink = TranscriptSink::new(config(dir.path()), NoopAgentInvoker, HeuristicPosTagger);

        sink.handle("a", "this that", &[0.0; 100]).unwrap();

        let spoken_path = dir.path().join("data/spoken.txt");
        assert!(!spoken_path.exists() || fs::read_to_string(&spoken_path).unwrap().is_empty());
    }

    #[test]
    fn handle_appends_real_content_to_spoken_log() {
        let dir = tempdir().unwrap();
        let sink = TranscriptSink::new(config(dir.path()), NoopAgentInvoker, HeuristicPosTagger);

        sink.handle("a", "please water the garden tonight", &[0.0; 100])
            .unwrap();

        let spoken = fs::read_to_string(dir.path().join("data/spoken.txt")).unwrap();
        assert!(spoken.contains("please water the garden tonight"));
    }

    #[test]
    fn handle_updates_word_frequency_map() {
        let dir = tempdir().unwrap();
        let sink = TranscriptSink::new(config(dir.path()), NoopAgentInvoker, HeuristicPosTagger);

        sink.handle("a", "check the calendar for the meeting", &[0.0; 100])
            .unwrap();
        sink.handle("b", "check the calendar again please", &[0.0; 100])
            .unwrap();

        let words_json = fs::read_to_string(dir.path().join("data/words.json")).unwrap();
        let counts: HashMap<String, u64> = serde_json::from_str(&words_json).unwrap();
        assert_eq!(counts.get("calendar"), Some(&2));
    }

    #[test]
    fn handle_appends_activity_log_regardless_of_noise() {
        let dir = tempdir().unwrap();
        let sink = TranscriptSink::new(config(dir.path()), NoopAgentInvoker, HeuristicPosTagger);

        sink.handle("a", "thank you", &[0.0; 100]).unwrap();

        let activity = fs::read_to_string(dir.path().join("data/ACTIVITY-LOG.md")).unwrap();
        assert!(activity.contains("thank you"));
    }

    #[test]
    fn spoken_log_is_capped_and_trims_oldest_first() {
        let dir = tempdir().unwrap();
        let sink = TranscriptSink::new(config(dir.path()), NoopAgentInvoker, HeuristicPosTagger);

        let long_line = "a".repeat(200) + " words here for content padding purposes today";
        for i in 0..40 {
            sink.handle(&i.to_string(), &long_line, &[0.0; 10]).unwrap();
        }

        let spoken = fs::read_to_string(dir.path().join("data/spoken.txt")).unwrap();
        assert!(spoken.len() as u64 <= SPOKEN_LOG_CAP_BYTES + 256);
    }

    #[test]
    fn record_activation_writes_triggered_file() {
        let dir = tempdir().unwrap();
        let sink = TranscriptSink::new(config(dir.path()), NoopAgentInvoker, HeuristicPosTagger);

        sink.record_activation("a", "hey goose what time is it", 0.82, true)
            .unwrap();

        let contents =
            fs::read_to_string(dir.path().join("recordings/activation_triggered_a.txt")).unwrap();
        assert!(contents.contains("TIMESTAMP: a"));
        assert!(contents.contains("CONFIDENCE: 0.82"));
        assert!(contents.contains("TRIGGERED: true"));
        assert!(contents.contains("TRANSCRIPT: hey goose what time is it"));
    }

    #[test]
    fn record_activation_writes_bypassed_file_when_not_triggered() {
        let dir = tempdir().unwrap();
        let sink = TranscriptSink::new(config(dir.path()), NoopAgentInvoker, HeuristicPosTagger);

        sink.record_activation("b", "the goose flew south yesterday", 0.2, false)
            .unwrap();

        assert!(
            dir.path()
                .join("recordings/activation_bypassed_b.txt")
                .exists()
        );
        assert!(
            !dir.path()
                .join("recordings/activation_triggered_b.txt")
                .exists()
        );
    }

    #[test]
    fn agent_invoker_is_called_on_every_dispatch() {
        struct CountingInvoker(Arc<AtomicUsize>);
        impl AgentInvoker for CountingInvoker {
            fn invoke(&self, _transcript: &str, _wav_path: &Path) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let sink = TranscriptSink::new(
            config(dir.path()),
            CountingInvoker(count.clone()),
            HeuristicPosTagger,
        );

        sink.handle("a", "whatever was said", &[0.0; 10]).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
