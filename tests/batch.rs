//! Batch orchestration through the public API.

use std::sync::Arc;

use rasterpress::error::EncodeFailure;
use rasterpress::orchestrator::submit_batch_blocking;
use rasterpress::{
    BatchJob, CodecError, CodecFamily, EncodePlan, JobError, Orchestrator, OrchestratorConfig,
    PixelBuffer,
};

fn gradient(width: u32, height: u32, seed: u8) -> Arc<PixelBuffer> {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[
                (x * 4) as u8 ^ seed,
                (y * 4) as u8,
                seed.wrapping_add((x + y) as u8),
                255,
            ]);
        }
    }
    Arc::new(PixelBuffer::new(width, height, data).unwrap())
}

fn config(workers: usize) -> OrchestratorConfig {
    OrchestratorConfig::default().with_worker_count(workers)
}

#[tokio::test]
async fn test_second_batch_is_served_from_cache() {
    let orchestrator = Orchestrator::new(config(3)).unwrap();
    let jobs: Vec<BatchJob> = (0..6u8)
        .map(|i| BatchJob::new(gradient(24, 24, i * 11), EncodePlan::transform_quantize(0.7)))
        .collect();

    let first = orchestrator.submit_batch(jobs.clone()).await.unwrap();
    let after_first = orchestrator.stats();
    assert_eq!(after_first.codec_invocations, 6);
    assert_eq!(after_first.cache_hits, 0);

    let second = orchestrator.submit_batch(jobs).await.unwrap();
    let after_second = orchestrator.stats();
    assert_eq!(after_second.codec_invocations, 6);
    assert_eq!(after_second.cache_hits, 6);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_fifty_identical_jobs_encode_once() {
    let orchestrator = Orchestrator::new(config(4)).unwrap();
    let buffer = gradient(40, 30, 3);
    let jobs = vec![BatchJob::new(buffer, EncodePlan::filter_entropy(1.0)); 50];

    let outcomes = orchestrator.submit_batch(jobs).await.unwrap();
    assert_eq!(outcomes.len(), 50);
    let first = outcomes[0].as_ref().unwrap();
    assert!(outcomes.iter().all(|o| o.as_ref() == Ok(first)));

    let stats = orchestrator.stats();
    assert_eq!(stats.codec_invocations, 1);
    assert_eq!(stats.cache_hits, 49);
}

#[tokio::test]
async fn test_results_keep_submission_order() {
    let orchestrator = Orchestrator::new(config(4)).unwrap();
    // Mixed sizes so completion order differs from submission order.
    let jobs: Vec<BatchJob> = (0..10u32)
        .map(|i| {
            let side = if i % 2 == 0 { 96 } else { 8 };
            BatchJob::new(gradient(side, side + i, i as u8), EncodePlan::filter_entropy(1.0))
        })
        .collect();
    let outcomes = orchestrator.submit_batch(jobs.clone()).await.unwrap();
    for (job, outcome) in jobs.iter().zip(outcomes) {
        let result = outcome.unwrap();
        assert_eq!((result.width, result.height), (job.buffer.width(), job.buffer.height()));
        assert_eq!(rasterpress::decode(&result.data).unwrap(), *job.buffer);
    }
}

#[tokio::test]
async fn test_out_of_range_quality_fails_after_one_fallback() {
    let orchestrator = Orchestrator::new(config(2)).unwrap();
    let jobs = vec![
        BatchJob::new(gradient(8, 8, 1), EncodePlan::transform_quantize(2.0)),
        BatchJob::new(gradient(8, 8, 2), EncodePlan::transform_quantize(0.5)),
    ];
    let outcomes = orchestrator.submit_batch(jobs).await.unwrap();

    let expected = CodecError::EncodeFailure(EncodeFailure::QualityOutOfRange(2.0));
    match &outcomes[0] {
        Err(JobError::Failed {
            job_id,
            source,
            fallback,
            ..
        }) => {
            assert_eq!(*job_id, 0);
            assert_eq!(source, &expected);
            assert_eq!(fallback.as_ref(), Some(&expected));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(outcomes[1].as_ref().unwrap().family, CodecFamily::TransformQuantize);
    assert_eq!(orchestrator.stats().fallbacks, 1);
}

#[test]
fn test_blocking_entry_point() {
    let jobs = vec![
        BatchJob::new(gradient(16, 16, 9), EncodePlan::filter_entropy(1.0)),
        BatchJob::new(gradient(16, 16, 9), EncodePlan::filter_entropy(1.0)),
    ];
    let (outcomes, stats) = submit_batch_blocking(jobs, config(2)).unwrap();
    assert!(outcomes.iter().all(|o| o.is_ok()));
    assert_eq!(stats.codec_invocations, 1);
    assert_eq!(stats.cache_hits, 1);
}
