use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A scalar field value in a JSON-lines record.
#[derive(Debug, Clone, Copy)]
pub(crate) enum JsonValue<'a> {
    Str(&'a str),
    Int(u64),
    Num(f64),
    Bool(bool),
    Null,
}

impl JsonValue<'_> {
    fn write_into(&self, out: &mut String) {
        match self {
            JsonValue::Str(s) => {
                out.push('"');
                out.push_str(&json_escape(s));
                out.push('"');
            }
            JsonValue::Int(v) => out.push_str(&v.to_string()),
            // JSON has no NaN or infinity.
            JsonValue::Num(v) if v.is_finite() => out.push_str(&format!("{:.3}", v)),
            JsonValue::Num(_) | JsonValue::Null => out.push_str("null"),
            JsonValue::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
        }
    }
}

/// Formats `{"type":kind, k1:v1, ...}` on one line.
pub(crate) fn json_record(kind: &str, fields: &[(&str, JsonValue<'_>)]) -> String {
    let mut out = format!("{{\"type\":\"{}\"", json_escape(kind));
    for (key, value) in fields {
        out.push_str(",\"");
        out.push_str(&json_escape(key));
        out.push_str("\":");
        value.write_into(&mut out);
    }
    out.push('}');
    out
}

/// JSON-lines event sink for packing decisions. Cloning shares the file.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: BufWriter<File>,
    counters: BTreeMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: BufWriter::new(file),
                counters: BTreeMap::new(),
            })),
        })
    }

    /// Writes one event and bumps the counter named after its kind.
    pub fn event(&self, kind: &str, fields: &[(&str, JsonValue<'_>)]) {
        let line = json_record(kind, fields);
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{line}");
            let entry = state.counters.entry(kind.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
        }
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    /// Emits the accumulated counters and resets them.
    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let counters = std::mem::take(&mut state.counters);
            let mut counts_json = String::from("{");
            for (idx, (key, value)) in counters.iter().enumerate() {
                if idx > 0 {
                    counts_json.push(',');
                }
                counts_json.push_str(&format!("\"{}\":{}", json_escape(key), value));
            }
            counts_json.push('}');
            let _ = writeln!(
                state.writer,
                "{{\"type\":\"debug.summary\",\"context\":\"{}\",\"counts\":{}}}",
                json_escape(context),
                counts_json
            );
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(ch),
        }
    }
    out
}
