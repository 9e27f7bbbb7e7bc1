// File: src/core/streamer.rs
use std::time::Duration;

/// Replays a finished reply word by word so canned answers reach the caller
/// through the same streaming callback as generated ones. Each emission is
/// the cumulative prefix, followed by a fixed pause. Words are split on
/// single spaces only, so the last emission is the reply verbatim.
pub async fn stream_reply<F>(reply: &str, delay: Duration, on_chunk: &mut F) -> String
where
    F: FnMut(&str) + ?Sized,
{
    if reply.is_empty() {
        return String::new();
    }
    let mut end = 0;
    for word in reply.split(' ') {
        end += word.len();
        on_chunk(&reply[..end]);
        tokio::time::sleep(delay).await;
        // Step over the separator.
        end += 1;
    }
    reply.to_string()
}
