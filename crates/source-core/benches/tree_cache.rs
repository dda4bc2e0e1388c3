use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use source_core::{
    LanguageConfig, LanguageId, LanguageRegistry, MemoryStorage, ProviderRegistry, SyntaxNode,
    Workspace,
};
use std::sync::Arc;

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 48);
    for i in 0..line_count {
        out.push_str(&format!("{i:06} the quick brown fox jumps over the lazy dog\n"));
    }
    out
}

fn lines(source: &str) -> SyntaxNode {
    let mut root = SyntaxNode::new("file", 0..source.len());
    let mut offset = 0;
    for line in source.split_inclusive('\n') {
        root.push_child(SyntaxNode::new("line", offset..offset + line.len()));
        offset += line.len();
    }
    root
}

fn workspace(text: &str) -> Workspace {
    let languages = LanguageRegistry::new()
        .with_language(LanguageConfig::new("plain").with_extension("txt"), lines);
    Workspace::new(
        Arc::new(MemoryStorage::new().with_file("/bench/a.txt", text)),
        Arc::new(languages),
        Arc::new(ProviderRegistry::new()),
    )
}

fn bench_cache_hit(c: &mut Criterion) {
    let ws = workspace(&large_text(10_000));
    let handle = ws.resolve("/bench/a.txt").unwrap();
    let plain = LanguageId::new("plain");
    ws.tree(&handle, &plain).unwrap();

    c.bench_function("tree_cache/hit", |b| {
        b.iter(|| black_box(ws.tree(&handle, &plain).unwrap()))
    });
}

fn bench_edit_then_reparse(c: &mut Criterion) {
    let text = large_text(10_000);
    let plain = LanguageId::new("plain");
    c.bench_function("tree_cache/edit_then_reparse", |b| {
        b.iter_batched(
            || {
                let ws = workspace(&text);
                let handle = ws.resolve("/bench/a.txt").unwrap();
                (ws, handle)
            },
            |(ws, handle)| {
                ws.document(&handle).unwrap().insert(0, "x").unwrap();
                black_box(ws.tree(&handle, &plain).unwrap());
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_cache_hit, bench_edit_then_reparse);
criterion_main!(benches);
