use source_core::{
    LanguageConfig, LanguageId, LanguageRegistry, MemoryStorage, ProviderRegistry, Workspace,
};
use source_core_simple::{GROUP_KIND, RegexParser};
use std::sync::Arc;

#[test]
fn test_regex_parser_drives_workspace_trees() {
    let languages = LanguageRegistry::new().with_language(
        LanguageConfig::new("json").with_extension(".JSON"),
        RegexParser::json_default().unwrap(),
    );
    let ws = Workspace::new(
        Arc::new(MemoryStorage::new().with_file("/cfg/app.json", r#"{"a": [1, 2]}"#)),
        Arc::new(languages),
        Arc::new(ProviderRegistry::new()),
    );
    let json = LanguageId::new("json");
    let handle = ws.resolve("/cfg/app.json").unwrap();

    let tree = ws.tree(&handle, &json).unwrap().unwrap();
    assert!(!tree.root().has_errors());
    assert_eq!(tree.root().children()[0].kind(), GROUP_KIND);

    // Break the document: the next tree carries an error node, the old one is stale.
    let doc = ws.document(&handle).unwrap();
    doc.delete(12..13).unwrap();
    assert!(tree.is_stale());
    let broken = ws.tree(&handle, &json).unwrap().unwrap();
    assert_eq!(broken.source(), r#"{"a": [1, 2]"#);
    assert!(broken.root().has_errors());
}
