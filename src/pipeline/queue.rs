//! Two-stage execution: frame acquisition on a blocking task, metrics on the caller.
//!
//! The stages are joined by a bounded, ordered flume queue, so decoding of frame N+1
//! overlaps the metric computation of frame N while records keep source order.

use std::future::Future;

use color_eyre::{eyre::eyre, Result};
use flume::bounded;
use tracing::{debug, info, warn};

use crate::capture::{Frame, FrameSource};

use super::{MetricPipeline, MetricRecord};

/// Run `pipeline` over `source` until end of stream or until `shutdown` resolves.
///
/// On shutdown the consumer stops pulling; the reader notices the closed queue,
/// releases the source and exits. Records computed so far are returned.
pub async fn run_pipelined<S, F>(
    pipeline: &mut MetricPipeline,
    mut source: S,
    queue_depth: usize,
    shutdown: F,
) -> Result<Vec<MetricRecord>>
where
    S: FrameSource + Send + 'static,
    F: Future<Output = ()>,
{
    let (tx, rx) = bounded::<Frame>(queue_depth.max(1));
    info!("Processing {} (queue depth {})", source.properties().identifier, queue_depth);

    let reader = tokio::task::spawn_blocking(move || {
        let mut sent = 0u64;
        while let Some(frame) = source.next_frame() {
            if tx.send(frame).is_err() {
                debug!("Metric stage stopped pulling");
                break;
            }
            sent += 1;
        }
        source.release();
        sent
    });

    tokio::pin!(shutdown);
    let mut records = Vec::new();
    loop {
        tokio::select! {
            frame = rx.recv_async() => match frame {
                Ok(frame) => records.push(pipeline.step(frame)),
                // Reader finished and dropped its sender
                Err(_) => break,
            },
            _ = &mut shutdown => {
                warn!("Shutdown requested, stopping after {} frames", records.len());
                break;
            }
        }
    }
    drop(rx);

    let sent = reader
        .await
        .map_err(|e| eyre!("Frame reader task failed: {}", e))?;
    debug!("Reader delivered {} frames", sent);

    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::capture::{MemorySource, SourceProperties};
    use crate::AnalysisConfig;

    /// Counts every `release` call, so double releases show up.
    struct CountingSource {
        inner: MemorySource,
        releases: Arc<AtomicUsize>,
    }

    impl CountingSource {
        fn new(count: usize) -> (Self, Arc<AtomicUsize>) {
            let releases = Arc::new(AtomicUsize::new(0));
            let source = Self {
                inner: MemorySource::new(frames(count), 30.0),
                releases: releases.clone(),
            };
            (source, releases)
        }
    }

    impl FrameSource for CountingSource {
        fn properties(&self) -> &SourceProperties {
            self.inner.properties()
        }

        fn next_frame(&mut self) -> Option<Frame> {
            self.inner.next_frame()
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
            self.inner.release();
        }
    }

    fn frames(count: usize) -> Vec<Frame> {
        (0..count)
            .map(|i| Frame::solid(3, 3, [(i * 20) as u8; 3], i as f64 * 33.0))
            .collect()
    }

    #[tokio::test]
    async fn matches_sequential_run() {
        let config = AnalysisConfig {
            add_mse: true,
            mse_delta: 500.0,
        };

        let sequential = MetricPipeline::new(&config).run(&mut MemorySource::new(frames(12), 30.0));

        let mut pipeline = MetricPipeline::new(&config);
        let pipelined = run_pipelined(
            &mut pipeline,
            MemorySource::new(frames(12), 30.0),
            2,
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(pipelined, sequential);
        assert_eq!(pipeline.summary().frames, 12);
    }

    #[tokio::test]
    async fn shutdown_stops_early() {
        let mut pipeline = MetricPipeline::new(&AnalysisConfig::default());
        let records = run_pipelined(
            &mut pipeline,
            MemorySource::new(frames(100), 30.0),
            1,
            std::future::ready(()),
        )
        .await
        .unwrap();

        assert!(records.len() < 100);
        let numbers: Vec<u64> = records.iter().map(|r| r.frame_num).collect();
        assert_eq!(numbers, (0..records.len() as u64).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn end_of_stream_releases_once() {
        let (source, releases) = CountingSource::new(8);
        let mut pipeline = MetricPipeline::new(&AnalysisConfig::default());
        let records = run_pipelined(&mut pipeline, source, 2, std::future::pending())
            .await
            .unwrap();

        assert_eq!(records.len(), 8);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_releases_once() {
        let (source, releases) = CountingSource::new(100);
        let mut pipeline = MetricPipeline::new(&AnalysisConfig::default());
        let records = run_pipelined(&mut pipeline, source, 1, std::future::ready(()))
            .await
            .unwrap();

        assert!(records.len() < 100);
        // The reader has been joined, so the source is released by now
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
