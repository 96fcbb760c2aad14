//! Observability-only client record (spec.md §3 "Client record").
//!
//! Registered the first time a context's SSE stream connects, never on the
//! initial page GET (spec.md §4.6).

use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub connection_id: String,
    pub identicon: String,
    pub connected_at: Instant,
    pub remote_addr: Option<String>,
}

impl ClientRecord {
    pub fn new(connection_id: impl Into<String>, remote_addr: Option<String>) -> Self {
        let connection_id = connection_id.into();
        let identicon = identicon_data_uri(&connection_id);
        Self {
            connection_id,
            identicon,
            connected_at: Instant::now(),
            remote_addr,
        }
    }
}

/// A tiny deterministic identicon: hash the id, use the low bits as an RGB
/// fill for an inline SVG square, base64-free so it stays a plain data URI.
fn identicon_data_uri(id: &str) -> String {
    let hash = fnv1a(id.as_bytes());
    let r = (hash & 0xFF) as u8;
    let g = ((hash >> 8) & 0xFF) as u8;
    let b = ((hash >> 16) & 0xFF) as u8;
    let svg = format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='32' height='32'>\
         <rect width='32' height='32' fill='#{r:02x}{g:02x}{b:02x}'/></svg>"
    );
    format!("data:image/svg+xml,{}", urlencoding_minimal(&svg))
}

/// Minimal percent-encoding sufficient for the fixed SVG template above
/// (only `<`, `>`, `'`, `#`, space and `/` appear).
fn urlencoding_minimal(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            '#' => out.push_str("%23"),
            ' ' => out.push_str("%20"),
            '\'' => out.push_str("%27"),
            other => out.push(other),
        }
    }
    out
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
