use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::debug::{JsonValue, json_record};

/// Stage timings as JSON lines. When the last clone drops, a `_hot` sibling
/// file is written with spans ranked by total time.
#[derive(Clone)]
pub(crate) struct PerfLogger {
    inner: Arc<Mutex<PerfState>>,
}

struct PerfState {
    writer: BufWriter<File>,
    path: PathBuf,
    span_totals: HashMap<String, f64>,
    span_counts: HashMap<String, u64>,
    count_totals: HashMap<String, u64>,
}

impl PerfLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(PerfState {
                writer: BufWriter::new(file),
                path,
                span_totals: HashMap::new(),
                span_counts: HashMap::new(),
                count_totals: HashMap::new(),
            })),
        })
    }

    pub fn log_span_ms(&self, name: &str, page: Option<usize>, ms: f64) {
        let page = page.map_or(JsonValue::Null, |p| JsonValue::Int(p as u64));
        let line = json_record(
            "perf.span",
            &[
                ("name", JsonValue::Str(name)),
                ("page", page),
                ("unit", JsonValue::Str("ms")),
                ("ms", JsonValue::Num(ms)),
            ],
        );
        if let Ok(mut state) = self.inner.lock() {
            *state.span_totals.entry(name.to_string()).or_insert(0.0) += ms;
            let entry = state.span_counts.entry(name.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn log_counts(&self, name: &str, counts: &[(&str, u64)]) {
        let fields: Vec<(&str, JsonValue<'_>)> = std::iter::once(("name", JsonValue::Str(name)))
            .chain(counts.iter().map(|(key, value)| (*key, JsonValue::Int(*value))))
            .collect();
        let line = json_record("perf.counts", &fields);
        if let Ok(mut state) = self.inner.lock() {
            for (key, value) in counts {
                let entry = state.count_totals.entry(format!("{name}.{key}")).or_insert(0);
                *entry = entry.saturating_add(*value);
            }
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

impl Drop for PerfState {
    fn drop(&mut self) {
        let _ = self.writer.flush();
        let Ok(file) = File::create(hot_path_for(&self.path)) else {
            return;
        };
        let mut writer = BufWriter::new(file);

        let mut spans: Vec<(&String, &f64)> = self.span_totals.iter().collect();
        spans.sort_by(|a, b| {
            b.1.partial_cmp(a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        for (rank, (name, ms)) in spans.into_iter().enumerate() {
            let count = self.span_counts.get(name).copied().unwrap_or(1).max(1);
            let line = json_record(
                "perf.hot.span",
                &[
                    ("rank", JsonValue::Int(rank as u64 + 1)),
                    ("name", JsonValue::Str(name)),
                    ("ms", JsonValue::Num(*ms)),
                    ("count", JsonValue::Int(count)),
                    ("avg_ms", JsonValue::Num(ms / count as f64)),
                ],
            );
            let _ = writeln!(writer, "{line}");
        }

        let mut counts: Vec<(&String, &u64)> = self.count_totals.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (rank, (name, value)) in counts.into_iter().enumerate() {
            let line = json_record(
                "perf.hot.count",
                &[
                    ("rank", JsonValue::Int(rank as u64 + 1)),
                    ("name", JsonValue::Str(name)),
                    ("value", JsonValue::Int(*value)),
                ],
            );
            let _ = writeln!(writer, "{line}");
        }
        let _ = writer.flush();
    }
}

fn hot_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|name| name.to_str())
        .unwrap_or("pagestack_perf");
    path.with_file_name(format!("{stem}_hot.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hot_path_replaces_extension() {
        assert_eq!(
            hot_path_for(Path::new("/tmp/run.perf.jsonl")),
            PathBuf::from("/tmp/run.perf_hot.log")
        );
        assert_eq!(hot_path_for(Path::new("/tmp/perf")), PathBuf::from("/tmp/perf_hot.log"));
    }

    #[test]
    fn drop_writes_ranked_hot_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perf.log");
        {
            let logger = PerfLogger::new(&path).unwrap();
            logger.log_span_ms("pack.encode", None, 3.0);
            logger.log_span_ms("pack.compose", Some(1), 10.0);
            logger.log_span_ms("pack.compose", Some(2), 10.0);
            logger.log_span_ms("pack.probe", None, 0.5);
            logger.log_counts("pack", &[("pages", 2), ("images", 5)]);
        }

        let spans = std::fs::read_to_string(&path).unwrap();
        assert_eq!(spans.lines().count(), 5);
        assert!(spans.lines().last().unwrap().contains("\"pages\":2"));

        let hot = std::fs::read_to_string(dir.path().join("perf_hot.log")).unwrap();
        let lines: Vec<&str> = hot.lines().collect();
        assert!(lines[0].contains("\"name\":\"pack.compose\""));
        assert!(lines[0].contains("\"count\":2"));
        assert!(lines[0].contains("\"avg_ms\":10.000"));
        let first_count = lines
            .iter()
            .find(|line| line.contains("perf.hot.count"))
            .unwrap();
        assert!(first_count.contains("\"name\":\"pack.images\""));
    }
}
