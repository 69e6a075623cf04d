//! Middleware de filtrage réseau.
//!
//! Encapsule la [`BlocklistSet`] derrière un drapeau d'activation et rend
//! un [`Verdict`] pour chaque requête sortante. Le moteur de rendu appelle
//! [`FilteringEngine::decide`] depuis son hook d'interception, puis substitue
//! [`PLACEHOLDER_URL`] à la destination d'origine quand la requête est bloquée.
//!
//! ## Audit
//!
//! Chaque blocage produit un [`AuditRecord`] (verdict, URL, horodatage),
//! toujours émis sur la cible `tracing` `navalii::audit`, et éventuellement
//! recopié dans un fichier journal via [`WriterAuditSink`].
//!
//! ## Concurrence
//!
//! `decide()` est une lecture pure d'un état immuable : pas de verrou, appel
//! possible depuis plusieurs threads d'interception. Seuls les puits d'audit
//! qui écrivent dans une ressource partagée sérialisent leurs écritures.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;

use tracing::{info, warn};

use crate::blocklist::BlocklistSet;

/// Destination neutre substituée à une requête bloquée.
pub const PLACEHOLDER_URL: &str = "about:blank";

/// Issue de l'évaluation d'une URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block,
}

impl Verdict {
    /// Destination que le moteur de rendu doit charger pour `original`.
    pub fn destination<'a>(&self, original: &'a str) -> &'a str {
        match self {
            Verdict::Allow => original,
            Verdict::Block => PLACEHOLDER_URL,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allow => f.write_str("allow"),
            Verdict::Block => f.write_str("block"),
        }
    }
}

/// Trace d'un blocage, utilisée par les opérateurs pour ajuster la liste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub verdict: Verdict,
    pub url: String,
    /// Motif ayant provoqué le blocage.
    pub pattern: String,
    pub at: SystemTime,
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} (pattern: {})",
            humantime::format_rfc3339_millis(self.at),
            self.verdict,
            self.url,
            self.pattern
        )
    }
}

/// Destination des enregistrements d'audit.
///
/// Les implémentations doivent tolérer des appels concurrents.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord);
}

/// Puits par défaut : événement `tracing` sur la cible `navalii::audit`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) {
        info!(
            target: "navalii::audit",
            verdict = %record.verdict,
            url = %record.url,
            pattern = %record.pattern,
            at = %humantime::format_rfc3339_millis(record.at),
            "Requête bloquée (URL sur liste noire)"
        );
    }
}

/// Puits qui écrit une ligne par enregistrement dans un `Write` partagé.
///
/// Les écritures passent par un `Mutex` : deux blocages simultanés ne
/// produisent jamais de lignes entrelacées.
pub struct WriterAuditSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterAuditSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Récupère le writer sous-jacent.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WriterAuditSink<File> {
    /// Ouvre (ou crée) un journal d'audit en mode ajout.
    pub fn append_to(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!(path = %path.display(), "Journal d'audit ouvert");
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> AuditSink for WriterAuditSink<W> {
    fn record(&self, record: &AuditRecord) {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = writeln!(writer, "{record}").and_then(|()| writer.flush()) {
            warn!(error = %e, url = %record.url, "Écriture du journal d'audit impossible");
        }
    }
}

/// Moteur de décision : liste de motifs + politique d'activation.
pub struct FilteringEngine {
    blocklist: BlocklistSet,
    enabled: bool,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl FilteringEngine {
    /// Construit le moteur avec le puits `tracing` par défaut.
    pub fn new(blocklist: BlocklistSet, enabled: bool) -> Self {
        info!(
            patterns = blocklist.len(),
            enabled, "Moteur de filtrage initialisé"
        );
        Self {
            blocklist,
            enabled,
            sinks: vec![Box::new(TracingAuditSink)],
        }
    }

    /// Ajoute un puits d'audit supplémentaire.
    pub fn with_sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Évalue une requête sortante.
    ///
    /// Fonction totale : jamais d'erreur. Un blocage émet exactement un
    /// enregistrement d'audit par puits.
    pub fn decide(&self, url: &str) -> Verdict {
        if !self.enabled {
            return Verdict::Allow;
        }
        let Some(pattern) = self.blocklist.first_match(url) else {
            return Verdict::Allow;
        };

        let record = AuditRecord {
            verdict: Verdict::Block,
            url: url.to_owned(),
            pattern: pattern.to_owned(),
            at: SystemTime::now(),
        };
        for sink in &self.sinks {
            sink.record(&record);
        }
        Verdict::Block
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn blocklist(&self) -> &BlocklistSet {
        &self.blocklist
    }
}

impl fmt::Debug for FilteringEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteringEngine")
            .field("patterns", &self.blocklist.len())
            .field("enabled", &self.enabled)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Puits de test qui conserve les enregistrements en mémoire.
    #[derive(Default, Clone)]
    struct Recorder(Arc<Mutex<Vec<AuditRecord>>>);

    impl Recorder {
        fn records(&self) -> Vec<AuditRecord> {
            self.0.lock().unwrap().clone()
        }
    }

    impl AuditSink for Recorder {
        fn record(&self, record: &AuditRecord) {
            self.0.lock().unwrap().push(record.clone());
        }
    }

    fn engine(patterns: &[&str], enabled: bool) -> (FilteringEngine, Recorder) {
        let recorder = Recorder::default();
        let list = BlocklistSet::build(patterns.iter().copied(), None::<Vec<String>>).unwrap();
        let engine = FilteringEngine::new(list, enabled).with_sink(recorder.clone());
        (engine, recorder)
    }

    #[test]
    fn test_block_iff_substring_present() {
        let (engine, _) = engine(&["doubleclick.net"], true);
        assert_eq!(engine.decide("https://adclick.g.doubleclick.net/x"), Verdict::Block);
        assert_eq!(engine.decide("https://example.com/doubleclick.net"), Verdict::Block);
        assert_eq!(engine.decide("https://example.com"), Verdict::Allow);
    }

    #[test]
    fn test_disabled_always_allows() {
        let (engine, recorder) = engine(&["example", "https"], false);
        assert_eq!(engine.decide("https://example.com"), Verdict::Allow);
        assert_eq!(engine.decide("https://googleads.g.doubleclick.net/"), Verdict::Allow);
        assert!(recorder.records().is_empty());
    }

    #[test]
    fn test_empty_url_allowed() {
        let (engine, recorder) = engine(&["ezoic"], true);
        assert_eq!(engine.decide(""), Verdict::Allow);
        assert!(recorder.records().is_empty());
    }

    #[test]
    fn test_builtin_block_emits_exactly_one_record() {
        let recorder = Recorder::default();
        let engine =
            FilteringEngine::new(BlocklistSet::builtin(), true).with_sink(recorder.clone());
        let url = "https://googleads.g.doubleclick.net/pagead/ads";

        assert_eq!(engine.decide(url), Verdict::Block);

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, url);
        assert_eq!(records[0].verdict, Verdict::Block);
    }

    #[test]
    fn test_allow_emits_nothing() {
        let (engine, recorder) = engine(&["ezoic"], true);
        engine.decide("https://www.rust-lang.org/");
        assert!(recorder.records().is_empty());
    }

    #[test]
    fn test_destination_substitutes_placeholder() {
        assert_eq!(Verdict::Block.destination("https://ads.test/"), PLACEHOLDER_URL);
        assert_eq!(Verdict::Allow.destination("https://ok.test/"), "https://ok.test/");
    }

    #[test]
    fn test_writer_sink_one_line_per_record() {
        let list = BlocklistSet::build(["ad_unit"], None::<Vec<String>>).unwrap();
        let sink = Arc::new(WriterAuditSink::new(Vec::new()));
        let engine = FilteringEngine::new(list, true).with_sink(SharedSink(Arc::clone(&sink)));

        engine.decide("https://a.test/ad_unit/1");
        engine.decide("https://b.test/ok");
        engine.decide("https://c.test/ad_unit/2");
        drop(engine);

        let sink = Arc::try_unwrap(sink).ok().unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("block https://a.test/ad_unit/1"));
        assert!(lines[1].contains("(pattern: ad_unit)"));
    }

    struct SharedSink(Arc<WriterAuditSink<Vec<u8>>>);

    impl AuditSink for SharedSink {
        fn record(&self, record: &AuditRecord) {
            self.0.record(record);
        }
    }

    #[test]
    fn test_concurrent_decide_records_every_block() {
        let (engine, recorder) = engine(&["gnpbad_"], true);
        let engine = Arc::new(engine);

        std::thread::scope(|s| {
            for t in 0..8 {
                let engine = Arc::clone(&engine);
                s.spawn(move || {
                    for i in 0..50 {
                        let blocked = format!("https://t{t}.test/gnpbad_{i}");
                        let allowed = format!("https://t{t}.test/page{i}");
                        assert_eq!(engine.decide(&blocked), Verdict::Block);
                        assert_eq!(engine.decide(&allowed), Verdict::Allow);
                    }
                });
            }
        });

        assert_eq!(recorder.records().len(), 8 * 50);
    }

    #[test]
    fn test_concurrent_decide_serializes_writer_lines() {
        const THREADS: usize = 16;
        const PER_THREAD: usize = 100;

        let list = BlocklistSet::build(["gnpbad_"], None::<Vec<String>>).unwrap();
        let sink = Arc::new(WriterAuditSink::new(Vec::new()));
        let engine = FilteringEngine::new(list, true).with_sink(SharedSink(Arc::clone(&sink)));

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let engine = &engine;
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        // URLs longues : une écriture non sérialisée se verrait.
                        let blocked = format!("https://t{t}.test/{}/gnpbad_{i}", "x".repeat(200));
                        engine.decide(&blocked);
                        engine.decide(&format!("https://t{t}.test/page{i}"));
                    }
                });
            }
        });
        drop(engine);

        let sink = Arc::try_unwrap(sink).ok().unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.ends_with('\n'));

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), THREADS * PER_THREAD);

        let padding = "x".repeat(200);
        let mut seen = std::collections::HashSet::new();
        for line in &lines {
            let (stamp, rest) = line.split_once("] ").unwrap();
            assert!(stamp.starts_with('[') && stamp.ends_with('Z'), "{line}");
            let url = rest
                .strip_prefix("block ")
                .and_then(|r| r.strip_suffix(" (pattern: gnpbad_)"))
                .unwrap_or_else(|| panic!("malformed audit line: {line}"));
            let (host, tail) = url
                .strip_prefix("https://")
                .and_then(|u| u.split_once('/'))
                .unwrap();
            assert_eq!(tail.split_once('/').unwrap().0, padding, "{line}");
            assert!(host.starts_with('t') && host.ends_with(".test"), "{line}");
            assert!(seen.insert(url.to_owned()), "duplicate record: {line}");
        }
    }

    #[test]
    fn test_audit_record_display() {
        let record = AuditRecord {
            verdict: Verdict::Block,
            url: "https://x.test/ezoic".into(),
            pattern: "ezoic".into(),
            at: SystemTime::UNIX_EPOCH,
        };
        assert_eq!(
            record.to_string(),
            "[1970-01-01T00:00:00.000Z] block https://x.test/ezoic (pattern: ezoic)"
        );
    }
}
