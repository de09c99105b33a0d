//! CSS subset used by the in-memory page model.
//!
//! Supported: selector lists, descendant and child combinators, type and universal
//! selectors, `#id`, `.class`, attribute selectors (`[a]`, `=`, `*=`, `~=`, `^=`, `$=`,
//! quoted or bare values, optional `i` flag) and `:not(<compound>)`.

use super::MemoryElement;
use crate::error::{AdapterError, AdapterErrorKind};

#[derive(Debug, Clone)]
pub(crate) struct SelectorList(Vec<Complex>);

#[derive(Debug, Clone)]
struct Complex {
    /// Compounds left to right; each carries the combinator joining it to the previous one.
    parts: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
    negations: Vec<Compound>,
}

#[derive(Debug, Clone)]
struct AttrSelector {
    name: String,
    op: AttrOp,
    value: String,
    case_insensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Word,
    Prefix,
    Suffix,
}

impl SelectorList {
    pub(crate) fn parse(input: &str) -> Result<Self, AdapterError> {
        let mut parser = Parser::new(input);
        let list = parser.list()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(list)
    }

    pub(crate) fn matches(&self, elements: &[MemoryElement], idx: usize) -> bool {
        self.0.iter().any(|complex| complex.matches(elements, idx))
    }
}

impl Complex {
    fn matches(&self, elements: &[MemoryElement], idx: usize) -> bool {
        match self.parts.len() {
            0 => false,
            n => self.matches_at(elements, idx, n - 1),
        }
    }

    fn matches_at(&self, elements: &[MemoryElement], idx: usize, part: usize) -> bool {
        let (combinator, compound) = &self.parts[part];
        if !compound.matches(&elements[idx]) {
            return false;
        }
        if part == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => elements[idx]
                .parent
                .is_some_and(|parent| self.matches_at(elements, parent, part - 1)),
            Combinator::Descendant => {
                let mut cursor = elements[idx].parent;
                while let Some(ancestor) = cursor {
                    if self.matches_at(elements, ancestor, part - 1) {
                        return true;
                    }
                    cursor = elements[ancestor].parent;
                }
                false
            }
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.negations.is_empty()
    }

    fn matches(&self, element: &MemoryElement) -> bool {
        if let Some(tag) = &self.tag {
            if tag != "*" && !element.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.attribute("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let classes: Vec<&str> = element
                .attribute("class")
                .map(|value| value.split_whitespace().collect())
                .unwrap_or_default();
            if !self.classes.iter().all(|c| classes.contains(&c.as_str())) {
                return false;
            }
        }
        if !self.attrs.iter().all(|attr| attr.matches(element)) {
            return false;
        }
        !self.negations.iter().any(|negated| negated.matches(element))
    }
}

impl AttrSelector {
    fn matches(&self, element: &MemoryElement) -> bool {
        let Some(actual) = element.attribute(&self.name) else {
            return false;
        };
        if self.op == AttrOp::Exists {
            return true;
        }
        let (actual, expected) = if self.case_insensitive {
            (actual.to_lowercase(), self.value.to_lowercase())
        } else {
            (actual.to_string(), self.value.clone())
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Contains => !expected.is_empty() && actual.contains(&expected),
            AttrOp::Word => actual.split_whitespace().any(|word| word == expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: &str) -> AdapterError {
        AdapterError::new(AdapterErrorKind::InvalidSelector)
            .with_hint(format!("{} at {} in `{}`", reason, self.pos, self.source))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn expect(&mut self, expected: char) -> Result<(), AdapterError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            _ => Err(self.error(&format!("expected `{}`", expected))),
        }
    }

    /// Returns true when any whitespace was consumed.
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn list(&mut self) -> Result<SelectorList, AdapterError> {
        let mut complexes = vec![self.complex()?];
        loop {
            self.skip_ws();
            if self.peek() != Some(',') {
                break;
            }
            self.bump();
            complexes.push(self.complex()?);
        }
        Ok(SelectorList(complexes))
    }

    fn complex(&mut self) -> Result<Complex, AdapterError> {
        self.skip_ws();
        let mut parts = vec![(Combinator::Descendant, self.compound()?)];
        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') | Some(')') => break,
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    Combinator::Child
                }
                Some(_) if had_ws => Combinator::Descendant,
                Some(_) => return Err(self.error("unexpected character")),
            };
            parts.push((combinator, self.compound()?));
        }
        Ok(Complex { parts })
    }

    fn compound(&mut self) -> Result<Compound, AdapterError> {
        let mut compound = Compound::default();
        if self.peek() == Some('*') {
            self.bump();
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.ident()?.to_lowercase());
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.attribute()?);
                }
                Some(':') => {
                    self.bump();
                    let pseudo = self.ident()?.to_lowercase();
                    if pseudo != "not" {
                        return Err(self.error("unsupported pseudo-class"));
                    }
                    self.expect('(')?;
                    self.skip_ws();
                    compound.negations.push(self.compound()?);
                    self.skip_ws();
                    self.expect(')')?;
                }
                _ => break,
            }
        }
        if compound.is_empty() {
            return Err(self.error("empty selector"));
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> Result<AttrSelector, AdapterError> {
        self.skip_ws();
        let name = self.ident()?.to_lowercase();
        self.skip_ws();
        let op = match self.bump() {
            Some(']') => {
                return Ok(AttrSelector {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                    case_insensitive: false,
                })
            }
            Some('=') => AttrOp::Equals,
            Some(c @ ('*' | '~' | '^' | '$')) => {
                self.expect('=')?;
                match c {
                    '*' => AttrOp::Contains,
                    '~' => AttrOp::Word,
                    '^' => AttrOp::Prefix,
                    _ => AttrOp::Suffix,
                }
            }
            _ => return Err(self.error("expected attribute operator")),
        };
        self.skip_ws();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => break,
                        Some('\\') => {
                            if let Some(escaped) = self.bump() {
                                value.push(escaped);
                            }
                        }
                        Some(c) => value.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
                value
            }
            _ => self.ident()?,
        };
        self.skip_ws();
        let mut case_insensitive = false;
        if matches!(self.peek(), Some('i' | 'I')) {
            self.bump();
            case_insensitive = true;
            self.skip_ws();
        }
        self.expect(']')?;
        Ok(AttrSelector {
            name,
            op,
            value,
            case_insensitive,
        })
    }

    fn ident(&mut self) -> Result<String, AdapterError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Vec<MemoryElement> {
        vec![
            MemoryElement::new("nav"),
            MemoryElement::new("a").attr("href", "/shop").within(0),
            MemoryElement::new("div").attr("class", "product-item card"),
            MemoryElement::new("button")
                .attr("class", "btn-mobile primary")
                .within(2),
            MemoryElement::new("input")
                .attr("type", "text")
                .attr("placeholder", "Country Code")
                .attr("id", "phone"),
            MemoryElement::new("link").attr("rel", "shortcut icon"),
        ]
    }

    fn matching(selector: &str) -> Vec<usize> {
        let elements = page();
        let list = SelectorList::parse(selector).unwrap();
        (0..elements.len())
            .filter(|idx| list.matches(&elements, *idx))
            .collect()
    }

    #[test]
    fn selector_list_and_descendants() {
        assert_eq!(matching("nav a, header a, .menu a"), vec![1]);
        assert_eq!(matching("div button"), vec![3]);
        assert_eq!(matching("div > button"), vec![3]);
        assert_eq!(matching("nav > button"), Vec::<usize>::new());
    }

    #[test]
    fn attribute_operators() {
        assert_eq!(matching("[class*=\"item\"]"), vec![2]);
        assert_eq!(matching("link[rel~=\"icon\"]"), vec![5]);
        assert_eq!(matching("input[placeholder*=\"country\" i]"), vec![4]);
        assert_eq!(matching("input[placeholder*=\"country\"]"), Vec::<usize>::new());
        assert_eq!(matching("a[href^='/sh']"), vec![1]);
        assert_eq!(matching("a[href$=op]"), vec![1]);
        assert_eq!(matching("input[type=\"text\"]#phone"), vec![4]);
        assert_eq!(matching("a[href]"), vec![1]);
    }

    #[test]
    fn classes_ids_and_negation() {
        assert_eq!(matching(".card.product-item"), vec![2]);
        assert_eq!(matching("button:not([class*=\"mobile\"])"), Vec::<usize>::new());
        assert_eq!(matching("*:not(div):not(nav):not(a):not(link):not(input)"), vec![3]);
    }

    #[test]
    fn rejects_unsupported_syntax() {
        for bad in ["", "button:has-text(\"x\")", "[class*]", "div >", "a[href"] {
            let err = SelectorList::parse(bad).unwrap_err();
            assert_eq!(err.kind, AdapterErrorKind::InvalidSelector, "{bad}");
        }
    }
}
