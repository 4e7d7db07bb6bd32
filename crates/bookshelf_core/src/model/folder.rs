//! Book folder content type.
//!
//! # Invariants
//! - `name` is the storage key under the site root; it changes only through
//!   an explicit rename.
//! - Names never contain `/` and never start with `@@`.

use crate::model::form::{FormInput, ValidationError, ValidationErrors};
use serde::{Deserialize, Serialize};

pub const FIELD_NAME: &str = "name";
pub const FIELD_TITLE: &str = "title";

/// Prefix reserved for view names in listing paths (`@@contents`).
const RESERVED_NAME_PREFIX: &str = "@@";

/// A folder holding books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFolder {
    pub name: String,
    pub title: String,
}

/// Validated non-identity attributes of a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEdit {
    pub title: String,
}

impl BookFolder {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
        }
    }
}

/// Validates an add-folder form submission.
///
/// Sibling uniqueness is checked at insertion time, where the store can
/// answer it atomically.
pub fn validate_book_folder(input: &FormInput) -> Result<BookFolder, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = match validate_name(input.get(FIELD_NAME).unwrap_or_default()) {
        Ok(name) => name,
        Err(error) => {
            errors.add(error);
            String::new()
        }
    };
    let title = validate_title(input, &mut errors);

    errors.into_result(BookFolder { name, title })
}

/// Validates an edit-folder form for the folder currently named `current`.
pub fn validate_book_folder_edit(
    input: &FormInput,
    current: &str,
) -> Result<FolderEdit, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if let Some(raw) = input.get(FIELD_NAME) {
        if raw.trim() != current {
            errors.add(ValidationError::new(
                FIELD_NAME,
                "cannot be changed by editing; rename the folder instead",
            ));
        }
    }
    let title = validate_title(input, &mut errors);

    errors.into_result(FolderEdit { title })
}

/// Checks a storage key for a folder.
pub fn validate_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::required(FIELD_NAME));
    }
    if name.contains('/') {
        return Err(ValidationError::new(FIELD_NAME, "must not contain '/'"));
    }
    if name.starts_with(RESERVED_NAME_PREFIX) {
        return Err(ValidationError::new(
            FIELD_NAME,
            format!("must not start with '{RESERVED_NAME_PREFIX}'"),
        ));
    }
    Ok(name.to_string())
}

fn validate_title(input: &FormInput, errors: &mut ValidationErrors) -> String {
    let title = input.get(FIELD_TITLE).map(str::trim).unwrap_or_default();
    if title.is_empty() {
        errors.add(ValidationError::required(FIELD_TITLE));
    }
    title.to_string()
}

#[cfg(test)]
mod tests {
    use super::{validate_book_folder, validate_book_folder_edit, validate_name};
    use crate::model::form::FormInput;

    #[test]
    fn valid_folder_form() {
        let input = FormInput::new()
            .with("name", " fiction ")
            .with("title", "Fiction");
        let folder = validate_book_folder(&input).unwrap();
        assert_eq!(folder.name, "fiction");
        assert_eq!(folder.title, "Fiction");
    }

    #[test]
    fn blank_fields_are_required() {
        let errors = validate_book_folder(&FormInput::new()).unwrap_err();
        let messages = errors.field_messages();
        assert_eq!(messages["name"], "Required");
        assert_eq!(messages["title"], "Required");
    }

    #[test]
    fn reserved_and_path_like_names_are_rejected() {
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("@@contents").is_err());
        assert!(validate_name("shelf-1").is_ok());
    }

    #[test]
    fn edit_keeps_name_locked() {
        let same = FormInput::new().with("name", "fiction").with("title", "F");
        assert_eq!(
            validate_book_folder_edit(&same, "fiction").unwrap().title,
            "F"
        );

        let renamed = FormInput::new().with("name", "novels").with("title", "F");
        let errors = validate_book_folder_edit(&renamed, "fiction").unwrap_err();
        assert!(errors.has_field("name"));
    }
}
