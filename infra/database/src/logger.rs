use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use surrealdb::types::{ToSql, Value};

/// Rendering stops recursing below this depth; deeper values collapse to a
/// placeholder so pathological driver metadata cannot blow up a log line.
const MAX_RENDER_DEPTH: usize = 2;

/// Sink for driver-call logging, dispatched explicitly.
///
/// `Console` writes one line per driver call through `tracing` at debug
/// level; `Custom` hands the same line to a user callback; `Off` skips the
/// formatting work entirely.
#[derive(Clone, Default)]
pub enum LoggerConfig {
    #[default]
    Off,
    Console,
    Custom(Arc<dyn Fn(&str) + Send + Sync>),
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("LoggerConfig::Off"),
            Self::Console => f.write_str("LoggerConfig::Console"),
            Self::Custom(_) => f.write_str("LoggerConfig::Custom(..)"),
        }
    }
}

impl LoggerConfig {
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Emits one formatted line for a driver call.
    pub fn log(&self, table: &str, method: &str, args: &[&Value], duration: Duration) {
        match self {
            Self::Off => {}
            Self::Console => {
                let line = format_call(table, method, args, duration);
                tracing::debug!(target: "corral::query", "{line}");
            }
            Self::Custom(sink) => {
                let line = format_call(table, method, args, duration);
                sink(&line);
            }
        }
    }
}

/// Renders a driver call as a single human-readable line of the form
/// `table.method(args) duration`.
#[must_use]
pub fn format_call(table: &str, method: &str, args: &[&Value], duration: Duration) -> String {
    let mut rendered = String::new();
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            rendered.push_str(", ");
        }
        rendered.push_str(&render(arg, 0));
    }
    format!("{table}.{method}({rendered}) {duration:?}")
}

/// Renders one value. Binary data collapses to an opaque placeholder,
/// strings are quoted, containers recurse up to [`MAX_RENDER_DEPTH`];
/// everything else uses the driver's own literal notation (datetimes as
/// `d'..'`, record ids as `table:id`).
fn render(value: &Value, depth: usize) -> String {
    match value {
        Value::Bytes(_) => "<bytes>".to_owned(),
        Value::String(text) => format!("'{text}'"),
        Value::Object(object) => {
            if depth >= MAX_RENDER_DEPTH {
                return "{..}".to_owned();
            }
            let fields = object
                .iter()
                .map(|(key, field)| format!("{key}: {}", render(field, depth + 1)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{ {fields} }}")
        }
        Value::Array(items) => {
            if depth >= MAX_RENDER_DEPTH {
                return "[..]".to_owned();
            }
            let items = items
                .iter()
                .map(|item| render(item, depth + 1))
                .collect::<Vec<_>>()
                .join(", ");
            format!("[{items}]")
        }
        other => other.to_sql(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surrealdb::types::{Bytes, Object};

    fn object(fields: &[(&str, Value)]) -> Value {
        let mut object = Object::default();
        for (key, value) in fields {
            object.insert((*key).to_owned(), value.clone());
        }
        Value::Object(object)
    }

    #[test]
    fn formats_table_method_args_and_duration() {
        let doc = object(&[("name", Value::String("Flappy".to_owned()))]);
        let line = format_call("bird", "create", &[&doc], Duration::from_millis(12));
        assert!(line.starts_with("bird.create({ name: 'Flappy' })"), "line: {line}");
        assert!(line.ends_with("12ms"), "line: {line}");
    }

    #[test]
    fn binary_values_render_as_placeholder() {
        let doc = object(&[("blob", Value::Bytes(Bytes::from(vec![1u8, 2, 3])))]);
        let line = format_call("bird", "create", &[&doc], Duration::ZERO);
        assert!(line.contains("blob: <bytes>"), "line: {line}");
    }

    #[test]
    fn nested_containers_collapse_beyond_one_extra_level() {
        let inner = object(&[("deep", object(&[("deeper", Value::Bool(true))]))]);
        let doc = object(&[("nested", inner)]);
        let line = format_call("bird", "create", &[&doc], Duration::ZERO);
        assert!(line.contains("nested: { deep: {..} }"), "line: {line}");
    }

    #[test]
    fn off_sink_is_disabled() {
        assert!(!LoggerConfig::Off.is_enabled());
        assert!(LoggerConfig::Console.is_enabled());
    }

    #[test]
    fn custom_sink_receives_the_line() {
        let captured = std::sync::Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
        let sink_lines = captured.clone();
        let logger = LoggerConfig::Custom(Arc::new(move |line| {
            sink_lines.lock().expect("lock").push(line.to_owned());
        }));

        logger.log("bird", "find", &[], Duration::from_millis(3));

        let lines = captured.lock().expect("lock");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("bird.find()"), "line: {}", lines[0]);
    }
}
