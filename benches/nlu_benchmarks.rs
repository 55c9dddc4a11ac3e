use admissions_nlu::nlu::normalizer::normalize;
use admissions_nlu::{AdmissionsAssistant, NluConfig, NluPipeline, SessionId};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// NLU パイプラインベンチマーク
///
/// 同梱データでの正規化・意図分類・エンティティ抽出・会話ターン処理を測定する。

const UTTERANCES: &[&str] = &[
    "Điểm chuẩn ngành CNTT 2024 là bao nhiêu",
    "học phí một năm là bao nhiêu",
    "trường có những học bổng nào",
    "khối a00 gồm những môn nào",
    "thời tiết hôm nay đẹp quá",
];

fn config() -> NluConfig {
    NluConfig::default().with_data_dir(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))
}

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize", |b| {
        b.iter(|| {
            for text in UTTERANCES {
                black_box(normalize(black_box(text)));
            }
        })
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let pipeline = NluPipeline::load(&config()).unwrap();

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(UTTERANCES.len() as u64));

    group.bench_function("detect_intent", |b| {
        b.iter(|| {
            for text in UTTERANCES {
                black_box(pipeline.detect_intent(text));
            }
        })
    });
    group.bench_function("extract_entities", |b| {
        b.iter(|| {
            for text in UTTERANCES {
                black_box(pipeline.extract_entities(text));
            }
        })
    });
    group.bench_function("analyze", |b| {
        b.iter(|| {
            for text in UTTERANCES {
                black_box(pipeline.analyze(text));
            }
        })
    });

    group.finish();
}

fn bench_turns(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let assistant = Arc::new(AdmissionsAssistant::load(&config()).unwrap());

    let mut group = c.benchmark_group("turns");

    // セッション数を変えて同時実行時のスループットを測定
    for sessions in [1usize, 8, 32].iter() {
        group.throughput(Throughput::Elements(*sessions as u64));
        group.bench_with_input(
            BenchmarkId::new("concurrent_sessions", sessions),
            sessions,
            |b, &sessions| {
                b.to_async(&rt).iter(|| {
                    let assistant = assistant.clone();
                    async move {
                        let mut handles = Vec::with_capacity(sessions);
                        for i in 0..sessions {
                            let assistant = assistant.clone();
                            handles.push(tokio::spawn(async move {
                                let session = SessionId::from(format!("bench_{}", i));
                                assistant
                                    .handle_message(&session, UTTERANCES[i % UTTERANCES.len()], true)
                                    .await
                                    .unwrap()
                            }));
                        }
                        for handle in handles {
                            black_box(handle.await.unwrap());
                        }
                    }
                })
            },
        );
    }

    group.finish();
}

criterion_group!(nlu_benches, bench_normalize, bench_pipeline, bench_turns);

criterion_main!(nlu_benches);
