//! End-to-end pipeline scenarios with in-process collaborators

mod helpers;

use helpers::*;
use lyra_annotate::pipeline::PipelineSettings;
use lyra_common::api::{AnnotateOptions, AnnotateRequest};
use lyra_common::chunking::chunk_range;
use lyra_common::events::NO_LYRICS_MESSAGE;
use lyra_common::model::is_fallback_tagged;
use lyra_common::{Provenance, StreamEvent};
use std::sync::Arc;

fn lines_request(lines: Vec<String>) -> AnnotateRequest {
    AnnotateRequest {
        hanzi_lines: Some(lines),
        ..Default::default()
    }
}

fn chunk_events(events: &[StreamEvent]) -> Vec<(&'static str, usize, usize)> {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::PinyinChunk { chunk_index, data, .. } => Some(("pinyinChunk", *chunk_index, data.len())),
            StreamEvent::English { chunk_index, data, .. } => Some(("english", *chunk_index, data.len())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_failing_engine_twenty_five_lines() {
    let engine = Arc::new(FailingEngine::default());
    let pipeline = pipeline(
        Arc::new(FakeCatalog::default()),
        engine.clone(),
        Arc::new(EchoTranslator::default()),
        PipelineSettings::default(),
    );

    let events = collect_events(pipeline, lines_request(chinese_lines(25))).await;

    assert_eq!(
        chunk_events(&events),
        vec![
            ("pinyinChunk", 0, 10),
            ("english", 0, 10),
            ("pinyinChunk", 1, 10),
            ("english", 1, 10),
            ("pinyinChunk", 2, 5),
            ("english", 2, 5),
        ]
    );
    assert_eq!(events.len(), 6, "no lyrics or lrc events for caller-supplied lines");
    assert_eq!(engine.calls(), 9);

    for event in &events {
        match event {
            StreamEvent::PinyinChunk { data, provenance, .. } | StreamEvent::English { data, provenance, .. } => {
                assert_eq!(*provenance, Some(Provenance::Fallback));
                assert!(data.iter().all(|s| is_fallback_tagged(s)));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_discovered_lyrics_precede_chunks() {
    let catalog = Arc::new(FakeCatalog::with(vec![
        candidate("1", "月亮代表我的心 (Live)", Some("live version"), None),
        candidate(
            "2",
            "月亮代表我的心",
            Some("你问我爱你有多深\n我爱你有几分"),
            Some("[00:10.00]你问我爱你有多深\n[00:15.00]我爱你有几分"),
        ),
    ]));
    let pipeline = pipeline(
        catalog.clone(),
        Arc::new(EchoEngine::default()),
        Arc::new(EchoTranslator::default()),
        PipelineSettings::default(),
    );

    let request = AnnotateRequest {
        title: Some("月亮代表我的心".to_string()),
        artist: Some("邓丽君".to_string()),
        ..Default::default()
    };
    let events = collect_events(pipeline, request).await;

    let types: Vec<&str> = events.iter().map(StreamEvent::event_type).collect();
    assert_eq!(types, vec!["lyricsUpdate", "lrcUpdate", "pinyinChunk", "english"]);

    match &events[0] {
        StreamEvent::LyricsUpdate { lines } => {
            assert_eq!(lines, &vec!["你问我爱你有多深".to_string(), "我爱你有几分".to_string()]);
        }
        other => panic!("expected lyricsUpdate, got {other:?}"),
    }
    match &events[1] {
        StreamEvent::LrcUpdate { lrc } => assert!(lrc.starts_with("[00:10.00]")),
        other => panic!("expected lrcUpdate, got {other:?}"),
    }
    match &events[2] {
        StreamEvent::PinyinChunk { chunk_index, data, provenance } => {
            assert_eq!(*chunk_index, 0);
            assert_eq!(data[0], "py:你问我爱你有多深");
            assert_eq!(*provenance, Some(Provenance::Primary));
        }
        other => panic!("expected pinyinChunk, got {other:?}"),
    }

    assert_eq!(catalog.queries(), vec!["月亮代表我的心 邓丽君".to_string()]);
}

#[tokio::test]
async fn test_whitespace_only_lines_yield_single_info() {
    let engine = Arc::new(FailingEngine::default());
    let pipeline = pipeline(
        Arc::new(FakeCatalog::default()),
        engine.clone(),
        Arc::new(EchoTranslator::default()),
        PipelineSettings::default(),
    );

    let request = lines_request(vec!["  ".to_string(), "".to_string(), "\t".to_string()]);
    let events = collect_events(pipeline, request).await;

    assert_eq!(events, vec![StreamEvent::info(NO_LYRICS_MESSAGE)]);
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn test_unreachable_catalog_yields_info() {
    let catalog = Arc::new(FakeCatalog::failing());
    let pipeline = pipeline(
        catalog.clone(),
        Arc::new(EchoEngine::default()),
        Arc::new(EchoTranslator::default()),
        PipelineSettings::default(),
    );

    let request = AnnotateRequest {
        title: Some("月亮代表我的心".to_string()),
        artist: Some("邓丽君".to_string()),
        ..Default::default()
    };
    let events = collect_events(pipeline, request).await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type(), "info");
    assert_eq!(catalog.queries().len(), 2, "retries with the title alone");
}

#[tokio::test]
async fn test_caller_lines_still_receive_synced_lyrics() {
    let catalog = Arc::new(FakeCatalog::with(vec![candidate(
        "9",
        "月亮代表我的心",
        Some("catalog text that must not replace the caller's"),
        Some("[00:01.00]你问我爱你有多深"),
    )]));
    let pipeline = pipeline(
        catalog,
        Arc::new(EchoEngine::default()),
        Arc::new(EchoTranslator::default()),
        PipelineSettings::default(),
    );

    let request = AnnotateRequest {
        hanzi_lines: Some(vec!["你问我爱你有多深".to_string()]),
        title: Some("月亮代表我的心".to_string()),
        ..Default::default()
    };
    let events = collect_events(pipeline, request).await;

    let types: Vec<&str> = events.iter().map(StreamEvent::event_type).collect();
    assert_eq!(types, vec!["lrcUpdate", "pinyinChunk", "english"]);
}

#[tokio::test]
async fn test_chunks_reconstruct_full_arrays() {
    let total = 23;
    let pipeline = pipeline(
        Arc::new(FakeCatalog::default()),
        Arc::new(EchoEngine::default()),
        Arc::new(EchoTranslator::default()),
        PipelineSettings {
            chunk_size: 4,
            concurrency: 1,
        },
    );

    let lines = chinese_lines(total);
    let events = collect_events(pipeline, lines_request(lines.clone())).await;

    let mut pinyin = vec![None; total];
    for event in &events {
        if let StreamEvent::PinyinChunk { chunk_index, data, .. } = event {
            let range = chunk_range(*chunk_index, 4, data.len(), total);
            assert_eq!(range.len(), data.len());
            for (slot, value) in pinyin[range].iter_mut().zip(data) {
                assert!(slot.is_none(), "slot written twice");
                *slot = Some(value.clone());
            }
        }
    }

    let expected: Vec<Option<String>> = lines.iter().map(|l| Some(format!("py:{l}"))).collect();
    assert_eq!(pinyin, expected);
}

#[tokio::test]
async fn test_concurrency_preserves_event_order() {
    let request = lines_request(chinese_lines(37));

    let sequential = collect_events(
        pipeline(
            Arc::new(FakeCatalog::default()),
            Arc::new(EchoEngine::default()),
            Arc::new(EchoTranslator::default()),
            PipelineSettings {
                chunk_size: 5,
                concurrency: 1,
            },
        ),
        request.clone(),
    )
    .await;

    let concurrent = collect_events(
        pipeline(
            Arc::new(FakeCatalog::default()),
            Arc::new(EchoEngine::default()),
            Arc::new(EchoTranslator::default()),
            PipelineSettings {
                chunk_size: 5,
                concurrency: 4,
            },
        ),
        request,
    )
    .await;

    assert_eq!(sequential, concurrent);
    assert_eq!(sequential.len(), 16);
}

#[tokio::test]
async fn test_tone_numbers_option_reaches_fallback() {
    let pipeline = pipeline(
        Arc::new(FakeCatalog::default()),
        Arc::new(UnavailableEngine),
        Arc::new(EchoTranslator::default()),
        PipelineSettings::default(),
    );

    let request = AnnotateRequest {
        hanzi_lines: Some(vec!["中国".to_string()]),
        options: Some(AnnotateOptions { tone_numbers: true }),
        ..Default::default()
    };
    let events = collect_events(pipeline, request).await;

    match &events[0] {
        StreamEvent::PinyinChunk { data, .. } => assert!(data[0].starts_with("zhong1 guo2")),
        other => panic!("expected pinyinChunk, got {other:?}"),
    }
}
