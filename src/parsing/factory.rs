//! Dispatches a `Language` to its `ParserFactory`, grounded on the teacher's
//! `parsing/factory.rs` registry pattern trimmed to the three supported
//! grammars.

use crate::indexing::file_info::Language;
use crate::parsing::javascript::JavaScriptParserFactory;
use crate::parsing::parser::{LanguageParser, ParserFactory};
use crate::parsing::python::PythonParserFactory;
use crate::parsing::rust::RustParserFactory;

pub fn factory_for(language: Language) -> Box<dyn ParserFactory> {
    match language {
        Language::Rust => Box::new(RustParserFactory),
        Language::Python => Box::new(PythonParserFactory),
        Language::JavaScript => Box::new(JavaScriptParserFactory),
    }
}

pub fn parser_for(language: Language) -> Result<Box<dyn LanguageParser>, String> {
    factory_for(language).create()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_language_has_a_working_factory() {
        for lang in [Language::Rust, Language::Python, Language::JavaScript] {
            let parser = parser_for(lang).expect("factory creates a parser");
            assert_eq!(parser.language(), lang);
        }
    }
}
