use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid format for '{0}'. Expected 'KEY=VALUE'.")]
    MissingSeparator(String),

    #[error("Component '{component}' cannot be empty in '{input}'.")]
    EmptyComponent {
        component: &'static str,
        input: String,
    },

    #[error("Invalid state '{state}' for variable '{name}'. Expected a non-negative integer.")]
    InvalidState { name: String, state: String },
}

/// Splits `KEY=VALUE` at the first `=`, trimming both sides.
pub fn parse_key_value(input: &str) -> Result<(&str, &str), ParseError> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| ParseError::MissingSeparator(input.to_string()))?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() {
        return Err(ParseError::EmptyComponent {
            component: "key",
            input: input.to_string(),
        });
    }
    if value.is_empty() {
        return Err(ParseError::EmptyComponent {
            component: "value",
            input: input.to_string(),
        });
    }
    Ok((key, value))
}

/// Parses a `NAME=STATE` fixed-variable argument.
pub fn parse_fixed_state(input: &str) -> Result<(&str, usize), ParseError> {
    let (name, state) = parse_key_value(input)?;
    let state = state.parse().map_err(|_| ParseError::InvalidState {
        name: name.to_string(),
        state: state.to_string(),
    })?;
    Ok((name, state))
}
