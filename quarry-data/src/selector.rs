use std::marker::PhantomData;

use crate::entity::{type_name_of, Entity};
use crate::error::DataError;
use crate::navigation::Navigation;
use crate::query::is_valid_identifier;

/// A compile-time checked reference to a field of `T`.
///
/// Build one with the [`property!`](crate::property) macro.
pub struct Property<T> {
    name: &'static str,
    _entity: PhantomData<fn(&T)>,
}

impl<T> Property<T> {
    #[doc(hidden)]
    pub const fn new_unchecked(name: &'static str) -> Self {
        Self {
            name,
            _entity: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Property<T> {}

impl<T> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Property").field(&self.name).finish()
    }
}

/// Select a field of an entity type, rejected at compile time when the
/// field does not exist.
///
/// ```ignore
/// config.order_by(property!(Book, title))?;
/// ```
#[macro_export]
macro_rules! property {
    ($ty:ty, $field:ident) => {{
        let _ = |entity: &$ty| {
            let _ = &entity.$field;
        };
        $crate::Property::<$ty>::new_unchecked(stringify!($field))
    }};
}

/// Anything a property can be selected with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Property(&'static str),
    Expression(String),
}

pub trait IntoSelector<T> {
    fn into_selector(self) -> Selector;
}

impl<T> IntoSelector<T> for Property<T> {
    fn into_selector(self) -> Selector {
        Selector::Property(self.name)
    }
}

impl<T> IntoSelector<T> for &str {
    fn into_selector(self) -> Selector {
        Selector::Expression(self.to_string())
    }
}

impl<T> IntoSelector<T> for String {
    fn into_selector(self) -> Selector {
        Selector::Expression(self)
    }
}

/// Turns property selectors into declared property names.
///
/// Accepted expression shapes: `field`, `|e| e.field`, `|e: Book| e.field`
/// and `e => e.field`. Resolution is structural; nothing is evaluated.
pub struct PropertyPathResolver;

impl PropertyPathResolver {
    /// Name of the member the expression selects.
    pub fn resolve(expression: &str) -> Result<String, DataError> {
        let (binder, body) = split_binder(expression.trim())?;
        let body = strip_parens(body.trim());
        if body.contains(OPERATORS) {
            return Err(invalid(expression, "computed expressions are not property selectors"));
        }

        let member = match binder {
            None => body,
            Some(binder) => {
                let Some((head, member)) = body.split_once('.') else {
                    return Err(invalid(expression, "body is not a member access"));
                };
                if head.trim() != binder {
                    return Err(invalid(
                        expression,
                        &format!("member is not accessed on the parameter '{binder}'"),
                    ));
                }
                member.trim()
            }
        };

        if member.contains('(') {
            return Err(invalid(expression, "method calls are not property selectors"));
        }
        if member.contains('.') {
            return Err(invalid(expression, "nested property paths are not supported"));
        }
        if !is_valid_identifier(member) {
            return Err(invalid(expression, "computed expressions are not property selectors"));
        }
        Ok(member.to_string())
    }

    pub fn resolve_selector(selector: Selector) -> Result<String, DataError> {
        match selector {
            Selector::Property(name) => Ok(name.to_string()),
            Selector::Expression(expression) => Self::resolve(&expression),
        }
    }

    /// Resolve to a persisted column of `T`.
    pub fn resolve_column<T: Entity>(selector: impl IntoSelector<T>) -> Result<&'static str, DataError> {
        let name = Self::resolve_selector(selector.into_selector())?;
        T::columns()
            .iter()
            .copied()
            .find(|column| *column == name)
            .ok_or_else(|| {
                DataError::InvalidSelector(format!(
                    "'{name}' is not a persisted property of {}",
                    type_name_of::<T>()
                ))
            })
    }

    /// Resolve to a declared navigation of `T`.
    pub fn resolve_navigation<T: Entity>(selector: impl IntoSelector<T>) -> Result<Navigation, DataError> {
        let name = Self::resolve_selector(selector.into_selector())?;
        T::navigations()
            .into_iter()
            .find(|navigation| navigation.name() == name)
            .ok_or_else(|| {
                DataError::InvalidSelector(format!(
                    "'{name}' is not a navigation of {}",
                    type_name_of::<T>()
                ))
            })
    }
}

fn invalid(expression: &str, reason: &str) -> DataError {
    DataError::InvalidSelector(format!("`{expression}`: {reason}"))
}

fn split_binder(expression: &str) -> Result<(Option<&str>, &str), DataError> {
    if let Some(rest) = expression.strip_prefix('|') {
        let Some((params, body)) = rest.split_once('|') else {
            return Err(invalid(expression, "unterminated closure parameter list"));
        };
        return Ok((Some(binder_name(expression, params)?), body));
    }
    if let Some((params, body)) = expression.split_once("=>") {
        let params = strip_parens(params.trim());
        return Ok((Some(binder_name(expression, params)?), body));
    }
    Ok((None, expression))
}

fn binder_name<'a>(expression: &str, params: &'a str) -> Result<&'a str, DataError> {
    let name = match params.split_once(':') {
        Some((name, ty)) if !ty.trim().is_empty() => name.trim(),
        Some(_) => return Err(invalid(expression, "missing parameter type")),
        None => params.trim(),
    };
    if !is_valid_identifier(name) {
        return Err(invalid(expression, "selector must take exactly one parameter"));
    }
    Ok(name)
}

/// Remove parentheses that wrap the whole of `s`, keeping `(a) + (b)` intact.
fn strip_parens(s: &str) -> &str {
    let mut s = s;
    while encloses(s) {
        s = s[1..s.len() - 1].trim();
    }
    s
}

fn encloses(s: &str) -> bool {
    if !(s.starts_with('(') && s.ends_with(')')) {
        return false;
    }
    let mut depth = 0usize;
    for (idx, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return idx == s.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

const OPERATORS: &[char] = &['+', '-', '*', '/', '%', '&', '|', '^', '<', '>', '=', '!', '?', ','];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_direct_member_access() {
        assert_eq!(PropertyPathResolver::resolve("title").unwrap(), "title");
        assert_eq!(PropertyPathResolver::resolve("|b| b.title").unwrap(), "title");
        assert_eq!(PropertyPathResolver::resolve("|b: Book| b.title").unwrap(), "title");
        assert_eq!(PropertyPathResolver::resolve("|b: &Book| (b.title)").unwrap(), "title");
        assert_eq!(PropertyPathResolver::resolve("b => b.title").unwrap(), "title");
        assert_eq!(PropertyPathResolver::resolve("(b) => b.title").unwrap(), "title");
    }

    #[test]
    fn rejects_method_calls() {
        let err = PropertyPathResolver::resolve("|b| b.title.len()").unwrap_err();
        assert!(matches!(err, DataError::InvalidSelector(_)));
        let err = PropertyPathResolver::resolve("b => b.total()").unwrap_err();
        assert!(matches!(err, DataError::InvalidSelector(_)));
    }

    #[test]
    fn rejects_computed_and_nested() {
        assert!(PropertyPathResolver::resolve("|b| b.pages + 1").is_err());
        assert!(PropertyPathResolver::resolve("|b| b.author.name").is_err());
        assert!(PropertyPathResolver::resolve("author.name").is_err());
        assert!(PropertyPathResolver::resolve("").is_err());
    }

    #[test]
    fn parenthesised_operands_are_computed_not_nested() {
        let err = PropertyPathResolver::resolve("|b| (b.pages) + (b.title)").unwrap_err();
        let DataError::InvalidSelector(message) = err else {
            panic!("expected an invalid selector, got {err:?}");
        };
        assert!(message.contains("computed expression"), "{message}");
        assert_eq!(PropertyPathResolver::resolve("|b| ((b.pages))").unwrap(), "pages");
        assert!(strip_parens("(a) (b)") == "(a) (b)");
    }

    #[test]
    fn rejects_binder_mismatch() {
        assert!(PropertyPathResolver::resolve("|b| other.title").is_err());
        assert!(PropertyPathResolver::resolve("|a, b| b.title").is_err());
        assert!(PropertyPathResolver::resolve("|b| 42").is_err());
    }

    struct Shelf {
        label: String,
    }

    #[test]
    fn property_macro_names_the_field() {
        let label = crate::property!(Shelf, label);
        assert_eq!(label.name(), "label");
        assert_eq!(
            PropertyPathResolver::resolve_selector(IntoSelector::<Shelf>::into_selector(label)).unwrap(),
            "label"
        );
        let _ = Shelf { label: String::new() }.label;
    }
}
