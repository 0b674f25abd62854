//! Simple selector matching for subtree queries
//!
//! Supports selector lists made of compound selectors:
//!
//! | form            | matches                                |
//! |-----------------|----------------------------------------|
//! | `button`        | tag name                               |
//! | `*`             | any element                            |
//! | `#main`         | `id` attribute                         |
//! | `.active`       | class list entry                       |
//! | `[data-toggle]` | attribute presence                     |
//! | `[role=tab]`    | attribute value (optionally quoted)    |
//!
//! Compounds combine (`button.primary[data-controls]`) and alternatives are
//! separated by commas. Combinators (descendant, `>`, `+`, `~`) are rejected.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, cut, map, opt, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{many0, many1, separated_list1},
    sequence::{delimited, preceded},
    Finish, IResult,
};

use crate::document::{Document, ElementId};
use crate::error::{DomError, DomResult};

type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

#[derive(Clone, Debug, PartialEq, Eq)]
enum SimpleSelector {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    Attribute { name: String, value: Option<String> },
}

impl SimpleSelector {
    fn matches(&self, doc: &Document, element: ElementId) -> bool {
        match self {
            SimpleSelector::Universal => true,
            SimpleSelector::Type(tag) => doc.tag(element) == Some(tag.as_str()),
            SimpleSelector::Id(id) => doc.attribute(element, "id") == Some(id.as_str()),
            SimpleSelector::Class(class) => doc.has_class(element, class),
            SimpleSelector::Attribute { name, value } => match value {
                None => doc.has_attribute(element, name),
                Some(value) => doc.attribute(element, name) == Some(value.as_str()),
            },
        }
    }
}

/// A parsed selector list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Vec<SimpleSelector>>,
}

impl Selector {
    pub fn parse(source: &str) -> DomResult<Self> {
        let (_, alternatives) = all_consuming(selector_list)(source)
            .finish()
            .map_err(|err| DomError::InvalidSelector {
                selector: source.to_string(),
                reason: format_verbose_error(source, &err),
            })?;
        Ok(Self { alternatives })
    }

    /// Check whether an element matches any alternative
    pub fn matches(&self, doc: &Document, element: ElementId) -> bool {
        doc.contains(element)
            && self
                .alternatives
                .iter()
                .any(|compound| compound.iter().all(|s| s.matches(doc, element)))
    }
}

impl std::str::FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

/// Name characters: alphanumerics, `-`, `_` and any non-ASCII code point
fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn identifier(input: &str) -> ParseResult<&str> {
    take_while1(is_ident_char)(input)
}

fn universal(input: &str) -> ParseResult<SimpleSelector> {
    value(SimpleSelector::Universal, char('*'))(input)
}

fn type_selector(input: &str) -> ParseResult<SimpleSelector> {
    map(identifier, |tag| SimpleSelector::Type(tag.to_ascii_lowercase()))(input)
}

/// `#identifier`
fn id_selector(input: &str) -> ParseResult<SimpleSelector> {
    context(
        "id selector",
        preceded(
            char('#'),
            cut(map(identifier, |id| SimpleSelector::Id(id.to_string()))),
        ),
    )(input)
}

/// `.identifier`
fn class_selector(input: &str) -> ParseResult<SimpleSelector> {
    context(
        "class selector",
        preceded(
            char('.'),
            cut(map(identifier, |class| SimpleSelector::Class(class.to_string()))),
        ),
    )(input)
}

/// Bare name or a single/double quoted string
fn attribute_value(input: &str) -> ParseResult<&str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
        identifier,
    ))(input)
}

/// Inside of `[...]`: `name` or `name=value`, closing bracket included
fn attribute_body(input: &str) -> ParseResult<SimpleSelector> {
    let (input, name) = identifier(input)?;
    let (input, value) = opt(preceded(char('='), cut(attribute_value)))(input)?;
    let (input, _) = char(']')(input)?;

    Ok((
        input,
        SimpleSelector::Attribute {
            name: name.to_ascii_lowercase(),
            value: value.map(str::to_string),
        },
    ))
}

/// `[name]` or `[name=value]`
fn attribute_selector(input: &str) -> ParseResult<SimpleSelector> {
    context(
        "attribute selector",
        preceded(char('['), cut(attribute_body)),
    )(input)
}

fn subclass_selector(input: &str) -> ParseResult<SimpleSelector> {
    alt((id_selector, class_selector, attribute_selector))(input)
}

/// Optional type or `*`, then any number of id, class and attribute parts
///
/// At least one part is required.
fn compound_selector(input: &str) -> ParseResult<Vec<SimpleSelector>> {
    let (input, head) = opt(alt((universal, type_selector)))(input)?;
    let (input, mut parts) = if head.is_some() {
        many0(subclass_selector)(input)?
    } else {
        many1(subclass_selector)(input)?
    };

    if let Some(head) = head {
        parts.insert(0, head);
    }
    Ok((input, parts))
}

/// Comma separated compounds; anything else left over (such as a
/// combinator) makes the enclosing `all_consuming` fail
fn selector_list(input: &str) -> ParseResult<Vec<Vec<SimpleSelector>>> {
    delimited(
        multispace0,
        separated_list1(
            delimited(multispace0, char(','), multispace0),
            context("compound selector", compound_selector),
        ),
        multispace0,
    )(input)
}

/// Render a VerboseError with byte offsets into `source`
fn format_verbose_error(source: &str, err: &VerboseError<&str>) -> String {
    let mut parts = Vec::new();

    for (rest, kind) in &err.errors {
        let offset = source.len() - rest.len();
        match kind {
            VerboseErrorKind::Context(ctx) => parts.push(format!("in {}", ctx)),
            VerboseErrorKind::Char(c) => {
                parts.push(format!("expected '{}' at offset {}", c, offset))
            }
            VerboseErrorKind::Nom(ek) if rest.is_empty() => {
                parts.push(format!("{:?} at end of input", ek))
            }
            VerboseErrorKind::Nom(ek) => parts.push(format!("{:?} at offset {}", ek, offset)),
        }
    }

    if parts.is_empty() {
        "unknown parse error".to_string()
    } else {
        parts.join(", ")
    }
}

impl Document {
    /// All descendants of `root` matching `selector`, in document order
    ///
    /// `root` itself is never part of the result.
    pub fn query_selector_all(
        &self,
        root: ElementId,
        selector: &str,
    ) -> DomResult<Vec<ElementId>> {
        if !self.contains(root) {
            return Err(DomError::ElementNotFound(root));
        }
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants(root)
            .into_iter()
            .filter(|&e| selector.matches(self, e))
            .collect())
    }

    /// First descendant of `root` matching `selector`
    pub fn query_selector(
        &self,
        root: ElementId,
        selector: &str,
    ) -> DomResult<Option<ElementId>> {
        Ok(self.query_selector_all(root, selector)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, Vec<ElementId>) {
        let mut doc = Document::new();
        let root = doc.root();

        let panel = doc.append_element(root, "div").unwrap();
        doc.set_attribute(panel, "id", "panel").unwrap();
        doc.set_attribute(panel, "class", "card open").unwrap();

        let toggle = doc.append_element(panel, "button").unwrap();
        doc.set_attribute(toggle, "data-controls", "panel").unwrap();
        doc.set_attribute(toggle, "class", "primary").unwrap();

        let plain = doc.append_element(root, "button").unwrap();
        doc.set_attribute(plain, "role", "tab").unwrap();

        (doc, vec![panel, toggle, plain])
    }

    #[test]
    fn test_type_selector() {
        let (doc, els) = sample();
        let found = doc.query_selector_all(doc.root(), "BUTTON").unwrap();
        assert_eq!(found, vec![els[1], els[2]]);
    }

    #[test]
    fn test_id_and_class() {
        let (doc, els) = sample();
        assert_eq!(doc.query_selector_all(doc.root(), "#panel").unwrap(), vec![els[0]]);
        assert_eq!(doc.query_selector_all(doc.root(), ".open").unwrap(), vec![els[0]]);
        assert_eq!(
            doc.query_selector_all(doc.root(), "div.card.open").unwrap(),
            vec![els[0]]
        );
        assert!(doc.query_selector_all(doc.root(), "div.missing").unwrap().is_empty());
    }

    #[test]
    fn test_attribute_selectors() {
        let (doc, els) = sample();
        assert_eq!(
            doc.query_selector_all(doc.root(), "[data-controls]").unwrap(),
            vec![els[1]]
        );
        assert_eq!(
            doc.query_selector_all(doc.root(), "button[role=tab]").unwrap(),
            vec![els[2]]
        );
        assert_eq!(
            doc.query_selector_all(doc.root(), "[data-controls=\"panel\"]").unwrap(),
            vec![els[1]]
        );
    }

    #[test]
    fn test_selector_list_keeps_document_order() {
        let (doc, els) = sample();
        let found = doc.query_selector_all(doc.root(), "[role], #panel").unwrap();
        assert_eq!(found, vec![els[0], els[2]]);
    }

    #[test]
    fn test_root_excluded() {
        let (doc, els) = sample();
        assert_eq!(doc.query_selector_all(els[0], "*").unwrap(), vec![els[1]]);
        assert_eq!(doc.query_selector(els[0], "div").unwrap(), None);
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in [
            "", "div > p", "div p", "[x", "[x=\"y]", "a,", ".", "div#", "%", ".a*", "[=x]",
        ] {
            assert!(
                matches!(Selector::parse(bad), Err(DomError::InvalidSelector { .. })),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_non_ascii_names() {
        let mut doc = Document::new();
        let root = doc.root();
        let item = doc.append_element(root, "li").unwrap();
        doc.set_attribute(item, "class", "пункт активно").unwrap();
        doc.set_attribute(item, "id", "заголовок").unwrap();
        doc.set_attribute(item, "data-роль", "кнопка").unwrap();
        doc.append_element(root, "li").unwrap();

        assert_eq!(doc.query_selector_all(root, ".активно").unwrap(), vec![item]);
        assert_eq!(doc.query_selector_all(root, "#заголовок").unwrap(), vec![item]);
        assert_eq!(
            doc.query_selector_all(root, "li[data-роль=кнопка]").unwrap(),
            vec![item]
        );
        assert!(doc.query_selector_all(root, ".неактивно").unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_around_commas() {
        let (doc, els) = sample();
        let found = doc
            .query_selector_all(doc.root(), "  #panel ,[role]  ")
            .unwrap();
        assert_eq!(found, vec![els[0], els[2]]);
    }

    #[test]
    fn test_error_reports_offset() {
        let (selector, reason) = match Selector::parse("div.") {
            Err(DomError::InvalidSelector { selector, reason }) => (selector, reason),
            other => panic!("unexpected result: {:?}", other),
        };
        assert_eq!(selector, "div.");
        assert!(reason.contains("at end of input"), "{}", reason);
        assert!(reason.contains("class selector"), "{}", reason);
    }

    #[test]
    fn test_from_str() {
        let (doc, els) = sample();
        let selector: Selector = "button.primary".parse().unwrap();
        assert!(selector.matches(&doc, els[1]));
        assert!(!selector.matches(&doc, els[2]));
    }
}
