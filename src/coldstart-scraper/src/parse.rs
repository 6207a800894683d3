//! Line-oriented parsing of the per-replica Prometheus text exposition.

use std::collections::HashMap;

/// Accumulated `request_total`/`response_total` counters for one pod,
/// split by direction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PodCounters {
    inbound_request: u64,
    inbound_response: u64,
    outbound_request: u64,
    outbound_response: u64,
}

impl PodCounters {
    /// In-flight estimate: `(request - response)` per direction, summed,
    /// each clamped at zero so a response-before-request race never goes
    /// negative.
    pub fn active(&self) -> u32 {
        let inbound = self
            .inbound_request
            .saturating_sub(self.inbound_response);
        let outbound = self
            .outbound_request
            .saturating_sub(self.outbound_response);
        (inbound + outbound) as u32
    }
}

/// Parses the text body of a `/metrics` response, keeping only the
/// `request_total`/`response_total` series whose `authority` label starts
/// with `authority_prefix`.
pub fn parse_counters(body: &str, authority_prefix: &str) -> PodCounters {
    let mut counters = PodCounters::default();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, rest)) = line.split_once('{') else {
            continue;
        };
        let Some((labels_str, value_str)) = rest.rsplit_once('}') else {
            continue;
        };
        let Ok(value) = value_str.trim().parse::<u64>() else {
            continue;
        };
        let labels = parse_labels(labels_str);
        let Some(authority) = labels.get("authority") else {
            continue;
        };
        if !authority.starts_with(authority_prefix) {
            continue;
        }
        let Some(direction) = labels.get("direction").map(String::as_str) else {
            continue;
        };

        match (name, direction) {
            ("request_total", "inbound") => counters.inbound_request += value,
            ("response_total", "inbound") => counters.inbound_response += value,
            ("request_total", "outbound") => counters.outbound_request += value,
            ("response_total", "outbound") => counters.outbound_response += value,
            _ => {}
        }
    }

    counters
}

/// Splits a `key="value", key2="value2"` label body, respecting quoted
/// values (which never contain a comma in this exposition format).
fn parse_labels(s: &str) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    let mut current = String::new();
    let mut in_quotes = false;

    let mut parts = Vec::new();
    for c in s.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }

    for part in parts {
        if let Some((key, value)) = part.split_once('=') {
            labels.insert(
                key.trim().to_string(),
                value.trim().trim_matches('"').to_string(),
            );
        }
    }

    labels
}
