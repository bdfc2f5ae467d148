use std::io::{self, Read};
use std::str::FromStr;

/// Text to encode, given on the command line. "-" reads it from stdin and
/// "\-" stands for a literal dash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInput(pub String);

impl TextInput {
    // Piped input almost always ends with a newline the user did not mean
    // to encode.
    fn from_reader(mut reader: impl Read) -> io::Result<Self> {
        let mut buffer = String::new();
        reader.read_to_string(&mut buffer)?;

        let trimmed = buffer
            .strip_suffix("\r\n")
            .or_else(|| buffer.strip_suffix('\n'))
            .unwrap_or(&buffer);

        Ok(TextInput(trimmed.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for TextInput {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-" => TextInput::from_reader(io::stdin()),
            r"\-" => Ok(TextInput("-".to_string())),
            _ => Ok(TextInput(s.to_string())),
        }
    }
}

impl AsRef<str> for TextInput {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
