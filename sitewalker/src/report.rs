//! Terminal rendering of crawl notifications and the final frontier map.

use colored::{ColoredString, Colorize};
use serde_json::Value;
use sitewalker_core::{CrawlEvent, PathMap};

/// One human-readable line per notification; `Complete` renders nothing.
pub fn notification_line(event: &CrawlEvent) -> Option<String> {
    let line = match event {
        CrawlEvent::Redirect { url, target, status } => {
            format!("{} {} {} {} ({})", "↪".cyan(), url, "→".dimmed(), target, status)
        }
        CrawlEvent::NotFound { url } => format!("{} 404 {}", "✗".yellow(), url),
        CrawlEvent::HttpError { url, status, message } => {
            format!("{} {} {} {}", "✗".red(), status, url, message.dimmed())
        }
        CrawlEvent::DataError { url, status, .. } => {
            format!("{} undecodable response ({}) {}", "✗".red(), status, url)
        }
        CrawlEvent::GzipError { url, error } => {
            format!("{} gzip decode failed {} {}", "✗".red(), url, error.dimmed())
        }
        CrawlEvent::ClientError { url, error } => {
            format!("{} request failed {} {}", "✗".red(), url, error.dimmed())
        }
        CrawlEvent::QueueError { url, error } => {
            format!("{} could not queue {} {}", "✗".yellow(), url, error.dimmed())
        }
        CrawlEvent::FragmentNotFound { url } => {
            format!("{} fragment target missing {}", "✗".yellow(), url)
        }
        CrawlEvent::BadFragment { referrer, url } => {
            let source = referrer.as_deref().unwrap_or("(unknown referrer)");
            format!("{} unparseable fragment {} on {}", "✗".yellow(), url, source)
        }
        CrawlEvent::Complete { .. } => return None,
    };
    Some(line)
}

/// Renders the frontier as an indented tree, one line per known URL.
pub fn render(frontier: &PathMap) -> serde_json::Result<String> {
    let value = serde_json::to_value(frontier)?;
    let mut counts = Counts::default();
    tally(&value, &mut counts);

    let mut out = String::new();
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    out.push_str("# Summary:\n");
    out.push_str(&format!("  URLs known: {}\n", counts.known));
    out.push_str(&format!("  Resolved: {}\n", counts.resolved));
    out.push_str(&format!("  Failures: {}\n", counts.failed));
    out.push_str(&format!("  Unvisited: {}\n", counts.unvisited));
    out.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    walk(&value, 0, &mut out);
    out.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    Ok(out)
}

#[derive(Default)]
struct Counts {
    known: usize,
    resolved: usize,
    failed: usize,
    unvisited: usize,
}

fn is_record_field(key: &str) -> bool {
    key == "redirect" || key == "statusCode"
}

fn tally(value: &Value, counts: &mut Counts) {
    let Value::Object(entries) = value else {
        return;
    };
    for (key, entry) in entries {
        if is_record_field(key) {
            continue;
        }
        counts.known += 1;
        match entry {
            Value::Bool(true) => counts.resolved += 1,
            Value::Bool(false) => counts.unvisited += 1,
            Value::String(tag) if tag.is_empty() => counts.unvisited += 1,
            Value::String(_) => counts.failed += 1,
            Value::Number(n) => {
                if n.as_u64().is_some_and(|status| status >= 400) {
                    counts.failed += 1;
                } else {
                    counts.resolved += 1;
                }
            }
            Value::Object(_) => {
                // a page that was itself fetched and yielded links
                counts.resolved += 1;
                tally(entry, counts);
            }
            _ => {}
        }
    }
}

fn walk(value: &Value, depth: usize, out: &mut String) {
    let Value::Object(entries) = value else {
        return;
    };
    let indent = "  ".repeat(depth + 1);
    for (key, entry) in entries {
        if is_record_field(key) {
            continue;
        }
        match entry {
            Value::Object(record) if record.get("redirect") == Some(&Value::Bool(true)) => {
                let status = record
                    .get("statusCode")
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as u16;
                out.push_str(&format!("{indent}{} {}\n", status_label(status), key));
                walk(entry, depth + 1, out);
            }
            Value::Object(_) => {
                out.push_str(&format!("{indent}{} {}\n", "▸".normal(), key));
                walk(entry, depth + 1, out);
            }
            scalar => {
                out.push_str(&format!("{indent}{} {}\n", scalar_label(scalar), key));
            }
        }
    }
}

fn scalar_label(value: &Value) -> ColoredString {
    match value {
        Value::Bool(true) => "✓".green(),
        Value::Bool(false) => "·".dimmed(),
        Value::String(tag) if tag.is_empty() => "·".dimmed(),
        Value::String(tag) => tag.as_str().red(),
        Value::Number(n) => status_label(n.as_u64().unwrap_or(0) as u16),
        other => other.to_string().normal(),
    }
}

fn status_label(status: u16) -> ColoredString {
    let text = status.to_string();
    match status {
        100..=199 => text.white(),
        200..=299 => text.green(),
        300..=399 => text.cyan(),
        400..=499 => text.yellow(),
        500..=599 => text.red(),
        _ => text.normal(),
    }
}
