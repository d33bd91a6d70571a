use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, instrument};
use tts_accelerator_cache::Cache;
use tts_accelerator_splitter::{Splitter, SplitterConfig};

use crate::sse::{extract_delta, LineReassembler};

/// Wires the streaming splitter and the cache into a chat-completion
/// forwarding pipe: every chunk is forwarded to the client unchanged and
/// immediately, while its plain-text delta is fed into a splitter bound to
/// this stream and every emitted segment is submitted for prefetch.
///
/// Submission is fire-and-forget (see [`Cache::submit`]): the cache is
/// never awaited here, so prefetch can never backpressure the forwarded
/// stream.
pub struct Orchestrator {
    cache: Arc<Cache>,
    splitter_config: SplitterConfig,
}

impl Orchestrator {
    pub fn new(cache: Arc<Cache>, splitter_config: SplitterConfig) -> Self {
        Self {
            cache,
            splitter_config,
        }
    }

    /// Wraps `upstream`, a stream of raw SSE byte chunks from the
    /// chat-completion provider, in a pass-through stream that prefetches
    /// TTS audio for `tts_model` as text arrives. The returned stream
    /// yields the same chunks, in the same order, as `upstream`.
    #[instrument(skip(self, upstream), fields(request_id, tts_model))]
    pub fn prefetch_stream<S, E>(
        &self,
        request_id: String,
        tts_model: String,
        upstream: S,
    ) -> impl Stream<Item = Result<Bytes, E>>
    where
        S: Stream<Item = Result<Bytes, E>>,
    {
        let cache = Arc::clone(&self.cache);
        let splitter_config = self.splitter_config;

        async_stream::stream! {
            let mut splitter = Splitter::new(splitter_config);
            let mut reassembler = LineReassembler::new();
            let mut submitted = 0usize;

            futures::pin_mut!(upstream);
            while let Some(item) = upstream.next().await {
                let chunk = match item {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(e);
                        continue;
                    }
                };

                // (a) forward unchanged and immediately
                let forwarded = chunk.clone();

                // (b)+(c)+(d) extract deltas, feed the splitter, submit segments
                for payload in reassembler.feed(&chunk) {
                    if let Some(delta) = extract_delta(&payload) {
                        for segment in splitter.feed(&delta) {
                            cache.submit(&segment, &tts_model);
                            submitted += 1;
                        }
                    }
                }

                yield Ok(forwarded);
            }

            for segment in splitter.flush() {
                cache.submit(&segment, &tts_model);
                submitted += 1;
            }
            debug!(request_id = %request_id, submitted, "prefetch stream ended");
        }
    }
}
