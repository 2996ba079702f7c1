//! JavaScript parser, adapted from the teacher's tree-sitter walk pattern
//! onto the `tree-sitter-javascript` grammar. Covers function declarations,
//! arrow functions assigned to a binding, classes and their methods.

use crate::indexing::file_info::{AwaitSite, CallSite, Import, Language, LoopSite, PerfData};
use crate::parsing::parser::{LanguageParser, ParserFactory};
use crate::symbol::EnhancedSymbol;
use crate::types::{FileId, FunctionFlags, Range, SymbolCounter, SymbolKind};
use tree_sitter::{Node, Parser};

pub struct JavaScriptParser {
    parser: Parser,
}

impl JavaScriptParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_javascript::LANGUAGE.into())
            .map_err(|e| format!("failed to set JavaScript language: {e}"))?;
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

    fn extract_jsdoc(node: Node, code: &str) -> Option<String> {
        let mut current = node.prev_sibling();
        while let Some(sibling) = current {
            if sibling.kind() == "comment" {
                let text = sibling.utf8_text(code.as_bytes()).ok()?;
                if text.starts_with("/**") {
                    return Some(
                        text.trim_start_matches("/**")
                            .trim_end_matches("*/")
                            .lines()
                            .map(|l| l.trim().trim_start_matches('*').trim())
                            .filter(|l| !l.is_empty())
                            .collect::<Vec<_>>()
                            .join("\n"),
                    );
                }
                return None;
            }
            current = sibling.prev_sibling();
        }
        None
    }

    fn param_count(node: Node) -> u16 {
        node.child_by_field_name("parameters")
            .map(|p| p.named_children(&mut p.walk()).count() as u16)
            .unwrap_or(0)
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
            "function_declaration" | "method_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = &code[name_node.byte_range()];
                    let kind = if in_class {
                        SymbolKind::Method
                    } else {
                        SymbolKind::Function
                    };
                    let mut symbol = EnhancedSymbol::new(
                        counter.next(),
                        name,
                        kind,
                        file_id,
                        Self::to_range(node),
                    );
                    if code[node.byte_range()].trim_start().starts_with("async") {
                        symbol.function_flags |= FunctionFlags::ASYNC;
                    }
                    if code[node.byte_range()].contains('*') && node.kind() == "function_declaration" {
                        symbol.function_flags |= FunctionFlags::GENERATOR;
                    }
                    if in_class {
                        symbol.function_flags |= FunctionFlags::METHOD;
                        symbol.receiver_type = receiver.map(Into::into);
                    }
                    symbol.parameter_count = Self::param_count(node);
                    if let Some(doc) = Self::extract_jsdoc(node, code) {
                        symbol = symbol.with_doc_comment(doc);
                    }
                    symbol.exported = true;
                    symbol.scope_chain = scope.iter().map(|s| s.as_str().into()).collect();
                    symbols.push(symbol);
                    next_scope.push(name.to_string());
                }
            }
            "class_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = &code[name_node.byte_range()];
                    let mut symbol = EnhancedSymbol::new(
                        counter.next(),
                        name,
                        SymbolKind::Class,
                        file_id,
                        Self::to_range(node),
                    );
                    if let Some(doc) = Self::extract_jsdoc(node, code) {
                        symbol = symbol.with_doc_comment(doc);
                    }
                    symbol.exported = true;
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
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = node.walk();
                for declarator in node.named_children(&mut cursor) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let Some(name_node) = declarator.child_by_field_name("name") else {
                        continue;
                    };
                    let Some(value) = declarator.child_by_field_name("value") else {
                        continue;
                    };
                    if !matches!(value.kind(), "arrow_function" | "function_expression") {
                        continue;
                    }
                    let name = &code[name_node.byte_range()];
                    let mut symbol = EnhancedSymbol::new(
                        counter.next(),
                        name,
                        SymbolKind::Function,
                        file_id,
                        Self::to_range(declarator),
                    );
                    if code[value.byte_range()].trim_start().starts_with("async") {
                        symbol.function_flags |= FunctionFlags::ASYNC;
                    }
                    symbol.parameter_count = Self::param_count(value);
                    if let Some(doc) = Self::extract_jsdoc(node, code) {
                        symbol = symbol.with_doc_comment(doc);
                    }
                    symbol.exported = true;
                    symbol.scope_chain = scope.iter().map(|s| s.as_str().into()).collect();
                    symbols.push(symbol);
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
            let child_depth = if matches!(
                child.kind(),
                "for_statement" | "for_in_statement" | "while_statement" | "do_statement"
            ) {
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
            if child.kind() == "await_expression" {
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
            let child_depth = if matches!(
                child.kind(),
                "for_statement" | "for_in_statement" | "while_statement" | "do_statement"
            ) {
                depth + 1
            } else {
                depth
            };
            if child.kind() == "call_expression" {
                if let Some(func) = child.child_by_field_name("function") {
                    let name = code[func.byte_range()].to_string();
                    let allocates = name.ends_with(".push")
                        || name.ends_with(".concat")
                        || name.starts_with("new ")
                        || name == "Array"
                        || name == "Object";
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

impl LanguageParser for JavaScriptParser {
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
            if node.kind() == "class_declaration" {
                if let (Some(name_node), Some(heritage)) =
                    (node.child_by_field_name("name"), node.child_by_field_name("superclass"))
                {
                    out.push((
                        code[name_node.byte_range()].to_string(),
                        code[heritage.byte_range()].to_string(),
                        Self::to_range(node),
                    ));
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
            if node.kind() == "import_statement" {
                let text = code[node.byte_range()].to_string();
                imports.push(Import {
                    is_glob: text.contains("* as"),
                    alias: None,
                    path: text.trim().to_string().into(),
                });
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
        Language::JavaScript
    }
}

pub struct JavaScriptParserFactory;

impl ParserFactory for JavaScriptParserFactory {
    fn create(&self) -> Result<Box<dyn LanguageParser>, String> {
        Ok(Box::new(JavaScriptParser::new()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_functions_classes_and_arrow_bindings() {
        let mut parser = JavaScriptParser::new().unwrap();
        let counter = SymbolCounter::new();
        let file_id = FileId::new(1).unwrap();
        let code = "class Service {\n  process() {}\n}\n\nfunction helper() {}\n\nconst add = (a, b) => a + b;\n";
        let symbols = parser.parse(code, file_id, &counter);

        assert!(symbols.iter().any(|s| s.name.as_ref() == "Service" && s.kind == SymbolKind::Class));
        let method = symbols.iter().find(|s| s.name.as_ref() == "process").unwrap();
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.receiver_type.as_deref(), Some("Service"));
        assert!(symbols.iter().any(|s| s.name.as_ref() == "helper"));
        assert!(symbols.iter().any(|s| s.name.as_ref() == "add"));
    }

    #[test]
    fn async_function_sets_flag() {
        let mut parser = JavaScriptParser::new().unwrap();
        let counter = SymbolCounter::new();
        let file_id = FileId::new(1).unwrap();
        let code = "async function fetchData() { return 1; }\n";
        let symbols = parser.parse(code, file_id, &counter);
        assert!(symbols[0].function_flags.contains(FunctionFlags::ASYNC));
    }

    #[test]
    fn perf_data_finds_await_sites() {
        let mut parser = JavaScriptParser::new().unwrap();
        let code = "async function run() {\n  await fetchA();\n  await fetchB();\n}\n";
        let perf = parser.extract_perf_data(code);
        assert_eq!(perf.awaits.len(), 2);
    }
}
