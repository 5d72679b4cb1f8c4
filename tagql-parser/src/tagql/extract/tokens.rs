//! Token definitions for the host-language scan
//!
//! This is not a JavaScript lexer. It recognizes just enough structure (identifiers, member
//! access, braces, backticks, strings and comments) to find tagged templates without being
//! fooled by the keyword showing up inside a string or a comment. Template contents are not
//! tokens: the extractor scans them itself and re-enters this lexer for every `${` hole.
//! Everything else is left to the lexer's error path and simply breaks a pending tag chain.
use logos::Logos;

#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum JsToken {
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,

    #[token(".")]
    Dot,

    #[token("`")]
    Backtick,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[regex(r#""(?:[^"\\\n]|\\[\s\S])*""#)]
    #[regex(r"'(?:[^'\\\n]|\\[\s\S])*'")]
    Str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Result<JsToken, ()>> {
        JsToken::lexer(source).collect()
    }

    #[test]
    fn test_member_chain() {
        assert_eq!(
            kinds("graphql.experimental"),
            vec![Ok(JsToken::Ident), Ok(JsToken::Dot), Ok(JsToken::Ident)]
        );
    }

    #[test]
    fn test_tag_and_backtick() {
        assert_eq!(
            kinds("graphql `"),
            vec![Ok(JsToken::Ident), Ok(JsToken::Backtick)]
        );
    }

    #[test]
    fn test_braces() {
        assert_eq!(
            kinds("{ a }"),
            vec![Ok(JsToken::LBrace), Ok(JsToken::Ident), Ok(JsToken::RBrace)]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(kinds("// graphql`x`\n/* graphql`y` */"), vec![]);
    }

    #[test]
    fn test_strings_swallow_backticks() {
        assert_eq!(kinds("'graphql`x`' \"`\""), vec![Ok(JsToken::Str), Ok(JsToken::Str)]);
    }
}
