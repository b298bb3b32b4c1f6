use super::Language;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyntaxError {
    #[error("failed to set {language} grammar for parser")]
    LanguageSet { language: Language },

    #[error("failed to parse {language} source")]
    ParseFailed { language: Language },
}
