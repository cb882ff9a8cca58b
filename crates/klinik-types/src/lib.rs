/// Errors that can occur when creating validated text types.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// A named form field was empty or contained only whitespace
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Creates a `NonEmptyText` for a required form field.
    ///
    /// Identical to [`NonEmptyText::new`] except that an empty value is reported as
    /// [`TextError::MissingField`] carrying `field`, so the message can be shown to the user
    /// as-is (for example `"full_name is required"`).
    pub fn required(field: &'static str, input: impl AsRef<str>) -> Result<Self, TextError> {
        Self::new(input).map_err(|_| TextError::MissingField(field))
    }

    /// Trims `input` and returns `None` when nothing is left.
    ///
    /// Used for optional free-text fields such as doctor notes.
    pub fn optional(input: Option<impl AsRef<str>>) -> Option<Self> {
        input.and_then(|s| Self::new(s).ok())
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_input() {
        let text = NonEmptyText::new("  Alice Tan \n").unwrap();
        assert_eq!(text.as_str(), "Alice Tan");
    }

    #[test]
    fn test_new_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
    }

    #[test]
    fn test_required_names_the_field() {
        let err = NonEmptyText::required("contact_number", "").unwrap_err();
        assert_eq!(err, TextError::MissingField("contact_number"));
        assert_eq!(err.to_string(), "contact_number is required");
    }

    #[test]
    fn test_optional_drops_blank_values() {
        assert_eq!(NonEmptyText::optional(Some("  ")), None);
        assert_eq!(NonEmptyText::optional(None::<&str>), None);
        assert_eq!(
            NonEmptyText::optional(Some(" rest ")).map(NonEmptyText::into_inner),
            Some("rest".to_string())
        );
    }

    #[test]
    fn test_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<NonEmptyText>("\"\"").is_err());
        let ok: NonEmptyText = serde_json::from_str("\"fever\"").unwrap();
        assert_eq!(ok.as_str(), "fever");
    }
}
