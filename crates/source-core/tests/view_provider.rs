use pretty_assertions::assert_eq;
use source_core::{
    CoreError, LanguageConfig, LanguageId, LanguageRegistry, MemoryStorage, ProviderKind,
    ProviderRegistry, SyntaxNode, ViewProvider, Workspace,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One `word` node per whitespace separated token.
fn words(source: &str) -> SyntaxNode {
    let mut root = SyntaxNode::new("file", 0..source.len());
    let mut start = None;
    for (i, ch) in source.char_indices().chain([(source.len(), ' ')]) {
        match (ch.is_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                root.push_child(SyntaxNode::new("word", s..i));
                start = None;
            }
            _ => {}
        }
    }
    root
}

/// One `expr` node per `{{ ... }}` block.
fn exprs(source: &str) -> SyntaxNode {
    let mut root = SyntaxNode::new("file", 0..source.len());
    let mut offset = 0;
    while let Some(open) = source[offset..].find("{{") {
        let start = offset + open;
        match source[start..].find("}}") {
            Some(close) => {
                root.push_child(SyntaxNode::new("expr", start..start + close + 2));
                offset = start + close + 2;
            }
            None => {
                root.push_child(SyntaxNode::error("unclosed `{{`", start..source.len()));
                break;
            }
        }
    }
    root
}

fn languages() -> LanguageRegistry {
    LanguageRegistry::new()
        .with_language(LanguageConfig::new("words").with_extension("txt"), words)
        .with_language(LanguageConfig::new("expr"), exprs)
        .with_language(
            LanguageConfig::new("template")
                .with_extension("tmpl")
                .with_embedded("expr"),
            words,
        )
}

fn workspace(files: &[(&str, &str)]) -> Workspace {
    let storage = files
        .iter()
        .fold(MemoryStorage::new(), |s, (path, text)| s.with_file(*path, *text));
    Workspace::new(
        Arc::new(storage),
        Arc::new(languages()),
        Arc::new(ProviderRegistry::new()),
    )
}

#[test]
fn test_cached_tree_is_returned_until_content_changes() {
    let ws = workspace(&[("/src/a.txt", "alpha beta")]);
    let handle = ws.resolve("/src/a.txt").unwrap();
    let lang = LanguageId::new("words");

    let first = ws.tree(&handle, &lang).unwrap().unwrap();
    let second = ws.tree(&handle, &lang).unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.root().children().len(), 2);
    assert!(first.is_physical());

    ws.document(&handle).unwrap().insert(10, " gamma").unwrap();
    assert!(first.is_stale());
    let third = ws.tree(&handle, &lang).unwrap().unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.source(), "alpha beta gamma");
    assert_eq!(third.root().children().len(), 3);
    assert_eq!(third.built_at(), handle.stamp());
    assert!(!third.is_stale());
}

#[test]
fn test_unsupported_language_yields_none() {
    let ws = workspace(&[("/src/a.txt", "x")]);
    let handle = ws.resolve("/src/a.txt").unwrap();
    assert!(ws.tree(&handle, &LanguageId::new("expr")).unwrap().is_none());
    assert!(ws.tree(&handle, &LanguageId::new("nope")).unwrap().is_none());
}

#[test]
fn test_composite_file_has_tree_per_language() {
    let ws = workspace(&[("/src/page.tmpl", "hi {{ name }} bye {{ x")]);
    let handle = ws.resolve("/src/page.tmpl").unwrap();
    let provider = ws.provider(&handle).unwrap();
    assert_eq!(
        provider.languages(),
        &[LanguageId::new("template"), LanguageId::new("expr")]
    );
    assert_eq!(provider.base_language(), Some(&LanguageId::new("template")));

    let trees = provider.all_trees().unwrap();
    assert_eq!(trees.len(), 2);
    assert_eq!(trees[0].language(), &LanguageId::new("template"));
    let expr = &trees[1];
    assert_eq!(expr.root().children().len(), 2);
    assert_eq!(expr.root().errors().len(), 1);
    assert_eq!(expr.root().children()[0].text(expr.source()), "{{ name }}");
}

#[test]
fn test_root_changed_marks_sibling_languages_stale() {
    let ws = workspace(&[("/src/page.tmpl", "a {{ b }}")]);
    let handle = ws.resolve("/src/page.tmpl").unwrap();
    let provider = ws.provider(&handle).unwrap();
    let template = LanguageId::new("template");
    let expr = LanguageId::new("expr");

    let expr_tree = provider.get_tree(&expr).unwrap().unwrap();
    let replaced = provider
        .root_changed(SyntaxNode::new("file", 0..9), &template)
        .unwrap();

    assert!(expr_tree.is_stale());
    assert!(!replaced.is_stale());
    assert!(Arc::ptr_eq(
        &provider.get_tree(&template).unwrap().unwrap(),
        &replaced
    ));
    let rebuilt = provider.get_tree(&expr).unwrap().unwrap();
    assert_eq!(rebuilt.built_at(), replaced.built_at());

    assert!(matches!(
        provider.root_changed(SyntaxNode::new("file", 0..0), &LanguageId::new("words")),
        Err(CoreError::UnknownLanguage(_))
    ));
}

#[test]
fn test_concurrent_first_requests_converge() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let languages = LanguageRegistry::new().with_language(
        LanguageConfig::new("words").with_extension("txt"),
        move |source: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            words(source)
        },
    );
    let ws = Arc::new(Workspace::new(
        Arc::new(MemoryStorage::new().with_file("/src/a.txt", "one two three")),
        Arc::new(languages),
        Arc::new(ProviderRegistry::new()),
    ));
    let handle = ws.resolve("/src/a.txt").unwrap();
    let lang = LanguageId::new("words");

    let barrier = Arc::new(std::sync::Barrier::new(8));
    let threads: Vec<_> = (0..8)
        .map(|_| {
            let ws = ws.clone();
            let handle = handle.clone();
            let lang = lang.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                ws.tree(&handle, &lang).unwrap().unwrap()
            })
        })
        .collect();
    let trees: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();

    assert!(trees.iter().all(|t| Arc::ptr_eq(t, &trees[0])));
    assert_eq!(trees[0].built_at(), handle.stamp());
    assert!(calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(ws.registry().len(), 1);
}

#[test]
fn test_concurrent_edits_and_reads_never_cache_stale_trees() {
    let ws = Arc::new(workspace(&[("/src/a.txt", "")]));
    let handle = ws.resolve("/src/a.txt").unwrap();
    let lang = LanguageId::new("words");
    let doc = ws.document(&handle).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ws = ws.clone();
            let handle = handle.clone();
            let lang = lang.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let tree = ws.tree(&handle, &lang).unwrap().unwrap();
                    let expected = tree.source().split_whitespace().count();
                    assert_eq!(tree.root().children().len(), expected);
                }
            })
        })
        .collect();
    for i in 0..200 {
        doc.insert(doc.len_chars().unwrap(), if i % 2 == 0 { "w " } else { "x " })
            .unwrap();
    }
    for reader in readers {
        reader.join().unwrap();
    }

    let tree = ws.tree(&handle, &lang).unwrap().unwrap();
    assert_eq!(tree.built_at(), handle.stamp());
    assert_eq!(tree.root().children().len(), 200);
}

#[test]
fn test_physical_provider_cannot_be_cloned() {
    let ws = workspace(&[("/src/a.txt", "x")]);
    let handle = ws.resolve("/src/a.txt").unwrap();
    let provider = ws.provider(&handle).unwrap();
    assert_eq!(provider.kind(), ProviderKind::Physical);
    assert!(provider.is_event_system_enabled());
    assert!(matches!(
        provider.clone_provider(),
        Err(CoreError::Unsupported(_))
    ));
}

#[test]
fn test_transient_provider_parses_scratch_text() {
    let languages = Arc::new(languages());
    let ws = Workspace::new(
        Arc::new(MemoryStorage::new()),
        languages.clone(),
        Arc::new(ProviderRegistry::new()),
    );
    let lang = LanguageId::new("words");
    let provider = ViewProvider::transient(languages, lang.clone(), "just some text").unwrap();

    assert!(!provider.is_physical());
    assert!(!provider.is_event_system_enabled());
    assert!(!provider.handle().is_physical());
    assert_eq!(provider.contents().unwrap(), "just some text");

    let tree = provider.get_tree(&lang).unwrap().unwrap();
    assert_eq!(tree.root().children().len(), 3);
    assert!(!tree.is_physical());
    assert!(Arc::ptr_eq(&tree.provider().unwrap(), &provider));

    // Never reachable by path.
    assert!(ws.find(&provider.handle().path()).is_none());
    assert!(ws.resolve(provider.handle().path()).is_err());
    assert!(matches!(
        ws.provider(provider.handle()),
        Err(CoreError::Unsupported(_))
    ));
}

#[test]
fn test_transient_replace_and_clone() {
    let lang = LanguageId::new("words");
    let provider = ViewProvider::transient(Arc::new(languages()), lang.clone(), "a b").unwrap();
    let old = provider.get_tree(&lang).unwrap().unwrap();

    let new = provider.replace_contents("a b c d").unwrap();
    assert!(old.is_stale());
    assert_eq!(new.root().children().len(), 4);
    assert_eq!(provider.contents().unwrap(), "a b c d");
    assert_eq!(provider.handle().text().unwrap(), "a b c d");

    let copy = provider.clone_provider().unwrap();
    assert_ne!(copy.handle().id(), provider.handle().id());
    assert_eq!(copy.contents().unwrap(), "a b c d");
    copy.replace_contents("z").unwrap();
    assert_eq!(provider.contents().unwrap(), "a b c d");
}

#[test]
fn test_transient_reverse_lookup_is_weak() {
    let registry = ProviderRegistry::new();
    let lang = LanguageId::new("words");
    let provider = ViewProvider::transient(Arc::new(languages()), lang.clone(), "a").unwrap();
    let tree = provider.get_tree(&lang).unwrap().unwrap();
    let id = provider.handle().id();

    registry.register_transient(&provider).unwrap();
    assert!(Arc::ptr_eq(&registry.get(id).unwrap(), &provider));

    drop(provider);
    assert!(registry.get(id).is_none());
    // The tree outlives its provider but no longer resolves back to it.
    assert!(tree.is_stale());
    assert!(matches!(tree.provider(), Err(CoreError::Invalidated(h)) if h == id));
    assert_eq!(tree.source(), "a");
}

#[test]
fn test_transient_requires_known_language() {
    assert!(matches!(
        ViewProvider::transient(Arc::new(languages()), LanguageId::new("nope"), ""),
        Err(CoreError::UnknownLanguage(_))
    ));
}
