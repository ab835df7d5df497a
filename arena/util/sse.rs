use std::io::Write;

/// Status line and headers of an SSE stream, written ahead of the frames
/// because the handler streams on the raw connection.
pub const SSE_HEADER: &str = "HTTP/1.1 200 OK\r\n\
                              Content-Type: text/event-stream\r\n\
                              Cache-Control: no-cache\r\n\
                              Connection: keep-alive\r\n\
                              X-Accel-Buffering: no\r\n\
                              \r\n";

/// Formats a named SSE event with a JSON data payload:
/// `event: <name>\ndata: <json>\n\n`.
pub fn format_sse_event(event_name: &str, json_data: &str) -> String {
    format!("event: {}\ndata: {}\n\n", event_name, json_data)
}

/// SSE comment ignored by `EventSource` clients; keeps idle streams open.
pub fn format_sse_keepalive() -> &'static str {
    ": ping\n\n"
}

/// Writes one SSE message and flushes. Returns `false` once the client is gone.
pub fn write_sse<W: Write>(writer: &mut W, msg: &str) -> bool {
    writer.write_all(msg.as_bytes()).is_ok() && writer.flush().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_framing() {
        assert_eq!(format_sse_event("epoch", "{\"epoch\":1}"), "event: epoch\ndata: {\"epoch\":1}\n\n");
        let mut sink = Vec::new();
        assert!(write_sse(&mut sink, format_sse_keepalive()));
        assert_eq!(sink, b": ping\n\n");
    }
}
