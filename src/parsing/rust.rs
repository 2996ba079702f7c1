//! Rust parser — grounded on the teacher's `parsing/rust.rs` (manual
//! tree-sitter AST walk keyed on `node.kind()`, `child_by_field_name`,
//! `prev_sibling`-walking doc comment extraction).

use crate::indexing::file_info::{AwaitSite, CallSite, Import, Language, LoopSite, PerfData};
use crate::parsing::parser::{LanguageParser, ParserFactory};
use crate::symbol::EnhancedSymbol;
use crate::types::{FileId, FunctionFlags, Range, SymbolCounter, SymbolKind};
use tree_sitter::{Node, Parser};

pub struct RustParser {
    parser: Parser,
}

impl RustParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .map_err(|e| format!("failed to set Rust language: {e}"))?;
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

    fn extract_doc_comment(node: Node, code: &str) -> Option<String> {
        let mut lines = Vec::new();
        let mut current = node.prev_sibling();
        while let Some(sibling) = current {
            match sibling.kind() {
                "line_comment" => {
                    let text = sibling.utf8_text(code.as_bytes()).ok()?;
                    if text.starts_with("///") && !text.starts_with("////") {
                        lines.push(text.trim_start_matches("///").trim().to_string());
                    } else {
                        break;
                    }
                }
                _ => break,
            }
            current = sibling.prev_sibling();
        }
        if lines.is_empty() {
            None
        } else {
            lines.reverse();
            Some(lines.join("\n"))
        }
    }

    fn cyclomatic_complexity(node: Node) -> u32 {
        let mut count = 1;
        let mut cursor = node.walk();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            if matches!(
                n.kind(),
                "if_expression"
                    | "match_arm"
                    | "while_expression"
                    | "for_expression"
                    | "loop_expression"
                    | "binary_expression"
            ) {
                count += 1;
            }
            for child in n.children(&mut cursor) {
                stack.push(child);
            }
        }
        count
    }

    fn extract_symbols(
        &self,
        node: Node,
        code: &str,
        file_id: FileId,
        counter: &SymbolCounter,
        symbols: &mut Vec<EnhancedSymbol>,
        in_impl: bool,
        receiver: Option<&str>,
        scope: &[String],
    ) {
        let mut next_scope = scope.to_vec();
        match node.kind() {
            "function_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = &code[name_node.byte_range()];
                    let kind = if in_impl {
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
                    )
                    .with_complexity(Self::cyclomatic_complexity(node));

                    symbol.exported = code[node.byte_range()].trim_start().starts_with("pub");
                    if code[node.byte_range()].contains("async fn") {
                        symbol.function_flags |= FunctionFlags::ASYNC;
                    }
                    if in_impl {
                        symbol.function_flags |= FunctionFlags::METHOD;
                        symbol.receiver_type = receiver.map(Into::into);
                    }
                    if let Some(params) = node.child_by_field_name("parameters") {
                        symbol.parameter_count = params
                            .children(&mut params.walk())
                            .filter(|c| c.kind() == "parameter" || c.kind() == "self_parameter")
                            .count() as u16;
                    }
                    if let Some(doc) = Self::extract_doc_comment(node, code) {
                        symbol = symbol.with_doc_comment(doc);
                    }
                    symbol.scope_chain = scope.iter().map(|s| s.as_str().into()).collect();
                    symbols.push(symbol);
                    next_scope.push(name.to_string());
                }
            }
            "struct_item" | "enum_item" | "trait_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = &code[name_node.byte_range()];
                    let kind = match node.kind() {
                        "struct_item" => SymbolKind::Struct,
                        "enum_item" => SymbolKind::Enum,
                        _ => SymbolKind::Trait,
                    };
                    let mut symbol =
                        EnhancedSymbol::new(counter.next(), name, kind, file_id, Self::to_range(node));
                    symbol.exported = code[node.byte_range()].trim_start().starts_with("pub");
                    if let Some(doc) = Self::extract_doc_comment(node, code) {
                        symbol = symbol.with_doc_comment(doc);
                    }
                    symbol.scope_chain = scope.iter().map(|s| s.as_str().into()).collect();
                    symbols.push(symbol);
                    next_scope.push(name.to_string());
                }
            }
            "impl_item" => {
                let impl_type = node.child_by_field_name("type").map(|t| code[t.byte_range()].trim());
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.extract_symbols(child, code, file_id, counter, symbols, true, impl_type, &next_scope);
                }
                return;
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.extract_symbols(child, code, file_id, counter, symbols, in_impl, receiver, &next_scope);
        }
    }

    fn collect_loops(node: Node, depth: u16, out: &mut Vec<LoopSite>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let child_depth = if matches!(
                child.kind(),
                "for_expression" | "while_expression" | "loop_expression"
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
                "for_expression" | "while_expression" | "loop_expression"
            ) {
                depth + 1
            } else {
                depth
            };
            if child.kind() == "call_expression" {
                if let Some(func) = child.child_by_field_name("function") {
                    let name = code[func.byte_range()].to_string();
                    let allocates = name.ends_with("::new")
                        || name.contains("clone")
                        || name.contains("to_vec")
                        || name.contains("to_string");
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

impl LanguageParser for RustParser {
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

    fn find_implementations(&mut self, code: &str) -> Vec<(String, String, Range)> {
        let Some(tree) = self.parser.parse(code, None) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.kind() == "impl_item" {
                if let (Some(trait_node), Some(type_node)) =
                    (node.child_by_field_name("trait"), node.child_by_field_name("type"))
                {
                    out.push((
                        code[type_node.byte_range()].to_string(),
                        code[trait_node.byte_range()].to_string(),
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
            if node.kind() == "use_declaration" {
                let text = code[node.byte_range()].to_string();
                let path = text
                    .trim_start_matches("use")
                    .trim_end_matches(';')
                    .trim()
                    .to_string();
                imports.push(Import {
                    is_glob: path.ends_with("::*"),
                    alias: None,
                    path: path.into(),
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
        Language::Rust
    }
}

pub struct RustParserFactory;

impl ParserFactory for RustParserFactory {
    fn create(&self) -> Result<Box<dyn LanguageParser>, String> {
        Ok(Box::new(RustParser::new()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_function_and_struct() {
        let mut parser = RustParser::new().unwrap();
        let counter = SymbolCounter::new();
        let file_id = FileId::new(1).unwrap();
        let code = "pub struct Service;\n\nimpl Service {\n    pub fn process(&self) {}\n}\n\nfn main() {}\n";
        let symbols = parser.parse(code, file_id, &counter);

        assert!(symbols.iter().any(|s| s.name.as_ref() == "Service" && s.kind == SymbolKind::Struct));
        let method = symbols
            .iter()
            .find(|s| s.name.as_ref() == "process")
            .expect("method found");
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.receiver_type.as_deref(), Some("Service"));
        assert!(symbols.iter().any(|s| s.name.as_ref() == "main" && s.kind == SymbolKind::Function));
    }

    #[test]
    fn doc_comments_attach_to_following_item() {
        let mut parser = RustParser::new().unwrap();
        let counter = SymbolCounter::new();
        let file_id = FileId::new(1).unwrap();
        let code = "/// Adds two numbers.\nfn add(a: i32, b: i32) -> i32 { a + b }";
        let symbols = parser.parse(code, file_id, &counter);
        assert_eq!(symbols[0].doc_comment.as_deref(), Some("Adds two numbers."));
    }

    #[test]
    fn perf_data_finds_loops_and_calls() {
        let mut parser = RustParser::new().unwrap();
        let code = "fn run() {\n    for i in 0..10 {\n        do_work(i);\n    }\n}\n";
        let perf = parser.extract_perf_data(code);
        assert_eq!(perf.loops.len(), 1);
        assert!(perf.calls.iter().any(|c| c.callee_name.as_ref() == "do_work"));
        assert_eq!(perf.calls[0].loop_depth, 1);
    }
}
