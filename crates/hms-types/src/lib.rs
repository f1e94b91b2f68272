//! Validated text types shared across HMS crates.

/// Maximum length of a room number after normalisation.
pub const MAX_ROOM_NUMBER_LEN: usize = 16;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input was longer than the type allows
    #[error("Text exceeds {max} characters")]
    TooLong { max: usize },
    /// The input contained a character outside the permitted set
    #[error("Invalid character '{0}'")]
    InvalidCharacter(char),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, returning [`TextError::Empty`] if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A hospital room number such as `101`, `ICU-2` or `B12`.
///
/// Room numbers are trimmed and upper-cased so that `icu-2` and `ICU-2` name the same room.
/// Only ASCII letters, digits and `-` are accepted, up to [`MAX_ROOM_NUMBER_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomNumber(String);

impl RoomNumber {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed.chars().count() > MAX_ROOM_NUMBER_LEN {
            return Err(TextError::TooLong {
                max: MAX_ROOM_NUMBER_LEN,
            });
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
        {
            return Err(TextError::InvalidCharacter(bad));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RoomNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for RoomNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for RoomNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RoomNumber::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims() {
        let text = NonEmptyText::new("  Jane Doe ").unwrap();
        assert_eq!(text.as_str(), "Jane Doe");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
    }

    #[test]
    fn test_room_number_is_normalised() {
        let number = RoomNumber::new(" icu-2 ").unwrap();
        assert_eq!(number.as_str(), "ICU-2");
    }

    #[test]
    fn test_room_number_rejects_invalid_input() {
        assert_eq!(RoomNumber::new(""), Err(TextError::Empty));
        assert_eq!(RoomNumber::new("12 B"), Err(TextError::InvalidCharacter(' ')));
        assert_eq!(
            RoomNumber::new("A".repeat(MAX_ROOM_NUMBER_LEN + 1)),
            Err(TextError::TooLong {
                max: MAX_ROOM_NUMBER_LEN
            })
        );
    }

    #[test]
    fn test_room_number_deserialize_validates() {
        let number: RoomNumber = serde_json::from_str("\"b12\"").unwrap();
        assert_eq!(number.as_str(), "B12");

        let rejected: Result<RoomNumber, _> = serde_json::from_str("\"b/12\"");
        assert!(rejected.is_err());
    }
}
