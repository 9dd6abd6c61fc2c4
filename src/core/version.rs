use crate::core::strings::Token;
use crate::parse::ParseState;

pub(crate) fn decode(state: &mut ParseState, tokens: &[Token]) -> Result<(), String> {
    // Example: VERSION "1.0"
    state.model.version = match tokens.get(1) {
        Some(Token::Quoted(v)) | Some(Token::Word(v)) => v.clone(),
        None => String::new(),
    };
    Ok(())
}
