//! Python parser, adapted from the teacher's tree-sitter walk pattern
//! (`parsing/rust.rs`) onto the `tree-sitter-python` grammar.

use crate::indexing::file_info::{AwaitSite, CallSite, Import, Language, LoopSite, PerfData};
use crate::parsing::parser::{LanguageParser, ParserFactory};
use crate::symbol::EnhancedSymbol;
use crate::types::{FileId, FunctionFlags, Range, SymbolCounter, SymbolKind};
use tree_sitter::{Node, Parser};

pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| format!("failed to set Python language: {e}"))?;
        Ok(Self { parser })
    }

    fn to_range(node: Node) -> Range {
        Range::new(
            node.start_position().row as u32,
            node.start_position().column as u16,
            node.end_position().row as u32,
            node.end_position().column as u16,
        )
    }

    /// Python doc comments are the first string literal in a block, not a
    /// preceding comment run, so extraction differs from the Rust parser.
    fn extract_docstring(node: Node, code: &str) -> Option<String> {
        let body = node.child_by_field_name("body")?;
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string_node = first.named_child(0)?;
        if string_node.kind() != "string" {
            return None;
        }
        let text = code[string_node.byte_range()].to_string();
        Some(
            text.trim_matches(|c| c == '"' || c == '\'')
                .trim()
                .to_string(),
        )
    }

    fn extract_symbols(
        &self,
        node: Node,
        code: &str,
        file_id: FileId,
        counter: &SymbolCounter,
        symbols: &mut Vec<EnhancedSymbol>,
        in_class: bool,
        receiver: Option<&str>,
        scope: &[String],
    ) {
        let mut next_scope = scope.to_vec();
        match node.kind() {
            "function_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = &code[name_node.byte_range()];
                    let kind = if in_class {
                        SymbolKind::Method
                    } else {
                        SymbolKind::Function
                    };
                    let is_async = code[node.byte_range()].trim_start().starts_with("async def");

                    let mut symbol = EnhancedSymbol::new(
                        counter.next(),
                        name,
                        kind,
                        file_id,
                        Self::to_range(node),
                    );
                    if is_async {
                        symbol.function_flags |= FunctionFlags::ASYNC;
                    }
                    if in_class {
                        symbol.function_flags |= FunctionFlags::METHOD;
                        symbol.receiver_type = receiver.map(Into::into);
                    }
                    symbol.exported = !name.starts_with('_');
                    if let Some(params) = node.child_by_field_name("parameters") {
                        symbol.parameter_count = params
                            .named_children(&mut params.walk())
                            .filter(|c| c.kind() != "comment")
                            .count() as u16;
                    }
                    if let Some(doc) = Self::extract_docstring(node, code) {
                        symbol = symbol.with_doc_comment(doc);
                    }
                    symbol.scope_chain = scope.iter().map(|s| s.as_str().into()).collect();
                    symbols.push(symbol);
                    next_scope.push(name.to_string());
                }
            }
            "class_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = &code[name_node.byte_range()];
                    let mut symbol = EnhancedSymbol::new(
                        counter.next(),
                        name,
                        SymbolKind::Class,
                        file_id,
                        Self::to_range(node),
                    );
                    symbol.exported = !name.starts_with('_');
                    if let Some(doc) = Self::extract_docstring(node, code) {
                        symbol = symbol.with_doc_comment(doc);
                    }
                    symbol.scope_chain = scope.iter().map(|s| s.as_str().into()).collect();
                    symbols.push(symbol);
                    next_scope.push(name.to_string());
                    if let Some(body) = node.child_by_field_name("body") {
                        let mut cursor = body.walk();
                        for child in body.children(&mut cursor) {
                            self.extract_symbols(
                                child, code, file_id, counter, symbols, true, Some(name), &next_scope,
                            );
                        }
                    }
                    return;
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.extract_symbols(child, code, file_id, counter, symbols, in_class, receiver, &next_scope);
        }
    }

    fn collect_loops(node: Node, depth: u16, out: &mut Vec<LoopSite>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let child_depth = if matches!(child.kind(), "for_statement" | "while_statement") {
                out.push(LoopSite {
                    range: Self::to_range(child),
                    depth,
                });
                depth + 1
            } else {
                depth
            };
            Self::collect_loops(child, child_depth, out);
        }
    }

    fn collect_awaits(node: Node, group: &mut u32, out: &mut Vec<AwaitSite>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "await" {
                out.push(AwaitSite {
                    range: Self::to_range(child),
                    sequential_group: *group,
                });
            } else {
                *group += 1;
            }
            Self::collect_awaits(child, group, out);
        }
    }

    fn collect_calls(node: Node, code: &str, depth: u16, out: &mut Vec<CallSite>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let child_depth = if matches!(child.kind(), "for_statement" | "while_statement") {
                depth + 1
            } else {
                depth
            };
            if child.kind() == "call" {
                if let Some(func) = child.child_by_field_name("function") {
                    let name = code[func.byte_range()].to_string();
                    let allocates = name.ends_with(".copy")
                        || name == "list"
                        || name == "dict"
                        || name.ends_with(".append");
                    out.push(CallSite {
                        callee_name: name.into(),
                        range: Self::to_range(child),
                        loop_depth: depth,
                        allocates,
                    });
                }
            }
            Self::collect_calls(child, code, child_depth, out);
        }
    }
}

impl LanguageParser for PythonParser {
    fn parse(&mut self, code: &str, file_id: FileId, counter: &SymbolCounter) -> Vec<EnhancedSymbol> {
        let Some(tree) = self.parser.parse(code, None) else {
            return Vec::new();
        };
        let mut symbols = Vec::new();
        self.extract_symbols(
            tree.root_node(),
            code,
            file_id,
            counter,
            &mut symbols,
            false,
            None,
            &[],
        );
        symbols
    }

    fn find_calls(&mut self, code: &str) -> Vec<(String, String, Range)> {
        let Some(tree) = self.parser.parse(code, None) else {
            return Vec::new();
        };
        let mut calls = Vec::new();
        Self::collect_calls(tree.root_node(), code, 0, &mut calls);
        calls
            .into_iter()
            .map(|c| ("<unresolved>".to_string(), c.callee_name.to_string(), c.range))
            .collect()
    }

    fn find_extends(&mut self, code: &str) -> Vec<(String, String, Range)> {
        let Some(tree) = self.parser.parse(code, None) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.kind() == "class_definition" {
                if let (Some(name_node), Some(superclasses)) = (
                    node.child_by_field_name("name"),
                    node.child_by_field_name("superclasses"),
                ) {
                    let name = code[name_node.byte_range()].to_string();
                    let mut cursor = superclasses.walk();
                    for base in superclasses.named_children(&mut cursor) {
                        out.push((name.clone(), code[base.byte_range()].to_string(), Self::to_range(node)));
                    }
                }
            }
            let mut cursor = node.walk();
            stack.extend(node.children(&mut cursor));
        }
        out
    }

    fn find_imports(&mut self, code: &str) -> Vec<Import> {
        let Some(tree) = self.parser.parse(code, None) else {
            return Vec::new();
        };
        let mut imports = Vec::new();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" | "import_from_statement" => {
                    let text = code[node.byte_range()].to_string();
                    imports.push(Import {
                        is_glob: text.trim_end().ends_with('*'),
                        alias: None,
                        path: text.trim().to_string().into(),
                    });
                }
                _ => {}
            }
            let mut cursor = node.walk();
            stack.extend(node.children(&mut cursor));
        }
        imports
    }

    fn extract_perf_data(&mut self, code: &str) -> PerfData {
        let Some(tree) = self.parser.parse(code, None) else {
            return PerfData::default();
        };
        let root = tree.root_node();
        let mut perf = PerfData::default();
        Self::collect_loops(root, 0, &mut perf.loops);
        let mut group = 0;
        Self::collect_awaits(root, &mut group, &mut perf.awaits);
        Self::collect_calls(root, code, 0, &mut perf.calls);
        perf
    }

    fn language(&self) -> Language {
        Language::Python
    }
}

pub struct PythonParserFactory;

impl ParserFactory for PythonParserFactory {
    fn create(&self) -> Result<Box<dyn LanguageParser>, String> {
        Ok(Box::new(PythonParser::new()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_class_methods_and_module_functions() {
        let mut parser = PythonParser::new().unwrap();
        let counter = SymbolCounter::new();
        let file_id = FileId::new(1).unwrap();
        let code = "class Service:\n    def process(self):\n        pass\n\ndef helper():\n    pass\n";
        let symbols = parser.parse(code, file_id, &counter);

        assert!(symbols.iter().any(|s| s.name.as_ref() == "Service" && s.kind == SymbolKind::Class));
        let method = symbols.iter().find(|s| s.name.as_ref() == "process").unwrap();
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.receiver_type.as_deref(), Some("Service"));
        assert!(symbols.iter().any(|s| s.name.as_ref() == "helper" && s.kind == SymbolKind::Function));
    }

    #[test]
    fn underscore_prefixed_names_are_not_exported() {
        let mut parser = PythonParser::new().unwrap();
        let counter = SymbolCounter::new();
        let file_id = FileId::new(1).unwrap();
        let code = "def _internal():\n    pass\n";
        let symbols = parser.parse(code, file_id, &counter);
        assert!(!symbols[0].exported);
    }

    #[test]
    fn perf_data_counts_for_loops() {
        let mut parser = PythonParser::new().unwrap();
        let code = "def run(items):\n    for item in items:\n        process(item)\n";
        let perf = parser.extract_perf_data(code);
        assert_eq!(perf.loops.len(), 1);
        assert!(perf.calls.iter().any(|c| c.callee_name.as_ref() == "process"));
    }
}
