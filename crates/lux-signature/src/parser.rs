//! Signature parser.
//!
//! A hand-written single-pass parser over the bytes of the format string.
//! Syntax is checked while scanning; references are resolved in a second
//! pass once the parameter count and the return parameter are known.

use lux_types::ElementType;
use tracing::trace;

use crate::spec::{DimSpec, ParamSpec, ParamSpecList, Role, Trailing, TypeSpec};
use crate::{GrammarError, GrammarErrorKind};

/// Parses a signature such as `"i>D*;i>D1;rD1"`.
///
/// # Errors
///
/// Returns a [`GrammarError`] with the byte position of the first
/// offending character.
pub fn parse(format: &str) -> Result<ParamSpecList, GrammarError> {
    let mut parser = Parser {
        src: format.as_bytes(),
        pos: 0,
    };
    let mut raw = Vec::new();
    loop {
        raw.push(parser.param()?);
        match parser.peek() {
            Some(b';') => parser.pos += 1,
            None => break,
            Some(c) => {
                return Err(parser.error(GrammarErrorKind::UnexpectedChar {
                    found: char::from(c),
                    expected: "';' or end of signature",
                }))
            }
        }
    }
    let list = resolve_references(raw)?;
    trace!(format, params = list.params.len(), "parsed signature");
    Ok(list)
}

/// A parameter or axis index as written.
#[derive(Clone, Copy, Debug)]
enum Index {
    Previous,
    At(usize),
}

struct RawParam {
    spec: ParamSpec,
    pos: usize,
    reference: Option<(Index, usize)>,
    axis: Option<(Index, usize)>,
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, kind: GrammarErrorKind) -> GrammarError {
        GrammarError {
            pos: self.pos,
            kind,
        }
    }

    fn unexpected(&self, expected: &'static str) -> GrammarError {
        match self.peek() {
            Some(c) => self.error(GrammarErrorKind::UnexpectedChar {
                found: char::from(c),
                expected,
            }),
            None => self.error(GrammarErrorKind::UnexpectedEnd { expected }),
        }
    }

    fn param(&mut self) -> Result<RawParam, GrammarError> {
        let pos = self.pos;
        let role = match self.peek() {
            Some(b'i') => Role::Input,
            Some(b'o') => Role::Output,
            Some(b'r') => Role::Return,
            Some(c) => return Err(self.error(GrammarErrorKind::UnknownRole(char::from(c)))),
            None => {
                return Err(self.error(GrammarErrorKind::UnexpectedEnd {
                    expected: "parameter role",
                }))
            }
        };
        self.pos += 1;

        let optional = self.peek() == Some(b'?');
        if optional {
            if role == Role::Return {
                return Err(self.error(GrammarErrorKind::OptionalReturn));
            }
            self.pos += 1;
        }

        let type_spec = self.type_spec()?;

        let reference = if self.peek() == Some(b'[') {
            let at = self.pos;
            self.pos += 1;
            Some((self.index(b']')?, at))
        } else {
            None
        };

        let axis = if self.peek() == Some(b'{') {
            let at = self.pos;
            if role == Role::Input {
                return Err(self.error(GrammarErrorKind::AxisOnInput));
            }
            self.pos += 1;
            Some((self.index(b'}')?, at))
        } else {
            None
        };

        let mut dims = Vec::new();
        if self.at_dim() {
            dims.push(self.dim(role)?);
            while self.eat(b',') {
                if !self.at_dim() {
                    return Err(self.unexpected("dimension"));
                }
                dims.push(self.dim(role)?);
            }
        }

        let trailing = match self.peek() {
            Some(b'*') => {
                if role.is_produced() {
                    return Err(self.error(GrammarErrorKind::ArbitraryOnOutput));
                }
                self.pos += 1;
                Trailing::Arbitrary
            }
            Some(b'&') => {
                self.pos += 1;
                Trailing::EqualToReference
            }
            _ => Trailing::Absent,
        };

        Ok(RawParam {
            spec: ParamSpec {
                role,
                optional,
                type_spec,
                reference: None,
                axis_param: None,
                dims,
                trailing,
            },
            pos,
            reference,
            axis,
        })
    }

    fn type_spec(&mut self) -> Result<Option<TypeSpec>, GrammarError> {
        let lower_bound = self.eat(b'>');
        let Some(c) = self.peek().filter(u8::is_ascii_uppercase) else {
            return if lower_bound {
                Err(self.unexpected("element type"))
            } else {
                Ok(None)
            };
        };
        let element_type = match c {
            b'B' | b'W' | b'L' | b'Q' | b'F' | b'D' | b'S' => {
                ElementType::from_letter(char::from(c))
            }
            _ => None,
        }
        .ok_or_else(|| self.error(GrammarErrorKind::UnknownType(char::from(c))))?;
        if lower_bound && element_type.is_string() {
            return Err(self.error(GrammarErrorKind::LowerBoundString));
        }
        self.pos += 1;
        Ok(Some(TypeSpec {
            element_type,
            lower_bound,
        }))
    }

    fn index(&mut self, close: u8) -> Result<Index, GrammarError> {
        let index = if self.eat(b'-') {
            Index::Previous
        } else {
            match self.count()? {
                Some(n) => Index::At(n),
                None => return Err(self.error(GrammarErrorKind::MalformedIndex)),
            }
        };
        if !self.eat(close) {
            return Err(self.error(GrammarErrorKind::MalformedIndex));
        }
        Ok(index)
    }

    fn count(&mut self) -> Result<Option<usize>, GrammarError> {
        let start = self.pos;
        let mut value: usize = 0;
        while let Some(c) = self.peek().filter(u8::is_ascii_digit) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(usize::from(c - b'0')))
                .ok_or_else(|| GrammarError {
                    pos: start,
                    kind: GrammarErrorKind::InvalidCount,
                })?;
            self.pos += 1;
        }
        Ok((self.pos > start).then_some(value))
    }

    fn nonzero_count(&mut self) -> Result<Option<usize>, GrammarError> {
        let start = self.pos;
        match self.count()? {
            Some(0) => Err(GrammarError {
                pos: start,
                kind: GrammarErrorKind::InvalidCount,
            }),
            other => Ok(other),
        }
    }

    fn at_dim(&self) -> bool {
        matches!(self.peek(), Some(b'+' | b'-' | b'=' | b':' | b'0'..=b'9'))
    }

    fn dim(&mut self, role: Role) -> Result<DimSpec, GrammarError> {
        let marker_pos = self.pos;
        let Some(marker) = self.peek() else {
            return Err(self.unexpected("dimension"));
        };
        if marker.is_ascii_digit() {
            let n = self.nonzero_count()?.unwrap_or_default();
            return Ok(DimSpec::Exact(n));
        }
        self.pos += 1;
        if matches!(self.peek(), Some(b'+' | b'-' | b'=' | b':')) {
            return Err(self.error(GrammarErrorKind::ConflictingMarkers));
        }
        let at_marker = |kind| GrammarError {
            pos: marker_pos,
            kind,
        };
        match marker {
            b'+' => {
                if role == Role::Input {
                    return Err(at_marker(GrammarErrorKind::AddOnInput));
                }
                match self.nonzero_count()? {
                    Some(n) => Ok(DimSpec::Add(n)),
                    None => Err(self.error(GrammarErrorKind::MissingAddCount)),
                }
            }
            b'-' => Ok(DimSpec::Drop(self.nonzero_count()?)),
            b'=' => Ok(DimSpec::Copy(self.nonzero_count()?)),
            _ => {
                if role.is_produced() {
                    return Err(at_marker(GrammarErrorKind::AnyOnOutput));
                }
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.error(GrammarErrorKind::CountAfterAny));
                }
                Ok(DimSpec::Any)
            }
        }
    }
}

fn resolve_references(raw: Vec<RawParam>) -> Result<ParamSpecList, GrammarError> {
    let mut return_index = None;
    for (i, p) in raw.iter().enumerate() {
        if p.spec.role == Role::Return {
            if return_index.is_some() {
                return Err(GrammarError {
                    pos: p.pos,
                    kind: GrammarErrorKind::MultipleReturns,
                });
            }
            return_index = Some(i);
        }
    }

    let mut list = ParamSpecList {
        params: raw.iter().map(|p| p.spec.clone()).collect(),
        return_index,
    };
    let count = raw.len();
    for (i, p) in raw.iter().enumerate() {
        let check = |index: Index, pos: usize| -> Result<Option<usize>, GrammarError> {
            let err = |kind| GrammarError { pos, kind };
            match index {
                Index::Previous => Ok(list.previous(i)),
                Index::At(n) if n >= count => {
                    Err(err(GrammarErrorKind::IndexOutOfRange { index: n, count }))
                }
                Index::At(n) if n == i => Err(err(GrammarErrorKind::SelfReference { index: n })),
                Index::At(n) if Some(n) == return_index => {
                    Err(err(GrammarErrorKind::ReferencesReturn { index: n }))
                }
                Index::At(n) => Ok(Some(n)),
            }
        };

        let reference = match p.reference {
            Some((index, pos)) => check(index, pos)?,
            None => list.previous(i),
        };
        let axis_param = match p.axis {
            Some((index, pos)) => Some(check(index, pos)?.ok_or(GrammarError {
                pos,
                kind: GrammarErrorKind::NoReference,
            })?),
            None => None,
        };
        if reference.is_none() && p.spec.needs_reference() {
            return Err(GrammarError {
                pos: p.pos,
                kind: GrammarErrorKind::NoReference,
            });
        }
        list.params[i].reference = reference;
        list.params[i].axis_param = axis_param;
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(format: &str) -> GrammarErrorKind {
        parse(format).unwrap_err().kind
    }

    #[test]
    fn test_parse_documented_example() {
        let list = parse("i>D*;i>D1;rD1").unwrap();
        assert_eq!(list.params.len(), 3);
        assert_eq!(list.return_index, Some(2));
        let first = &list.params[0];
        assert_eq!(first.role, Role::Input);
        assert_eq!(
            first.type_spec,
            Some(TypeSpec {
                element_type: ElementType::Double,
                lower_bound: true
            })
        );
        assert!(first.dims.is_empty());
        assert_eq!(first.trailing, Trailing::Arbitrary);
        assert_eq!(first.reference, None);
        assert_eq!(list.params[1].dims, vec![DimSpec::Exact(1)]);
        assert_eq!(list.params[1].reference, Some(0));
        let ret = &list.params[2];
        assert_eq!(ret.role, Role::Return);
        assert!(!ret.type_spec.unwrap().lower_bound);
        assert_eq!(ret.reference, Some(1));
    }

    #[test]
    fn test_parse_markers() {
        let list = parse("iL2,:,3*;o?[0]=,-,+4,=5,-6&").unwrap();
        assert_eq!(
            list.params[0].dims,
            vec![DimSpec::Exact(2), DimSpec::Any, DimSpec::Exact(3)]
        );
        let out = &list.params[1];
        assert!(out.optional);
        assert_eq!(out.reference, Some(0));
        assert_eq!(
            out.dims,
            vec![
                DimSpec::Copy(None),
                DimSpec::Drop(None),
                DimSpec::Add(4),
                DimSpec::Copy(Some(5)),
                DimSpec::Drop(Some(6)),
            ]
        );
        assert_eq!(out.trailing, Trailing::EqualToReference);
        assert!(!list.is_function());
    }

    #[test]
    fn test_return_declared_first() {
        let list = parse("r&;i*;iL*").unwrap();
        assert_eq!(list.return_index, Some(0));
        assert_eq!(list.logical_order().collect::<Vec<_>>(), vec![1, 2, 0]);
        assert_eq!(list.params[0].reference, Some(2));
        assert_eq!(list.params[1].reference, None);
        assert_eq!(list.params[2].reference, Some(1));
        assert_eq!(list.min_arguments(), 2);
        assert_eq!(list.max_arguments(), 2);
    }

    #[test]
    fn test_axis_param() {
        let list = parse("i*;iL*;r[0]{1}&").unwrap();
        assert_eq!(list.params[2].reference, Some(0));
        assert_eq!(list.params[2].axis_param, Some(1));
        let list = parse("i*;iL*;r[0]{-}&").unwrap();
        assert_eq!(list.params[2].axis_param, Some(1));
    }

    #[test]
    fn test_role_and_type_errors() {
        assert_eq!(kind("x"), GrammarErrorKind::UnknownRole('x'));
        assert_eq!(kind("iX"), GrammarErrorKind::UnknownType('X'));
        assert_eq!(kind("iC"), GrammarErrorKind::UnknownType('C'));
        assert_eq!(kind("i>S"), GrammarErrorKind::LowerBoundString);
        assert_eq!(kind("r?D"), GrammarErrorKind::OptionalReturn);
        assert_eq!(kind("iD;rD;rD"), GrammarErrorKind::MultipleReturns);
        assert_eq!(
            kind(""),
            GrammarErrorKind::UnexpectedEnd {
                expected: "parameter role"
            }
        );
    }

    #[test]
    fn test_dimension_errors() {
        assert_eq!(kind("i+3"), GrammarErrorKind::AddOnInput);
        assert_eq!(kind("iD;r+"), GrammarErrorKind::MissingAddCount);
        assert_eq!(kind("iD;r+0"), GrammarErrorKind::InvalidCount);
        assert_eq!(kind("iD;r:"), GrammarErrorKind::AnyOnOutput);
        assert_eq!(kind("i:4"), GrammarErrorKind::CountAfterAny);
        assert_eq!(kind("iD;o+=3"), GrammarErrorKind::ConflictingMarkers);
        assert_eq!(kind("iD;o3*"), GrammarErrorKind::ArbitraryOnOutput);
        assert_eq!(kind("i{0}"), GrammarErrorKind::AxisOnInput);
        assert!(matches!(kind("i3,"), GrammarErrorKind::UnexpectedEnd { .. }));
        assert!(matches!(kind("i3x"), GrammarErrorKind::UnexpectedChar { .. }));
        assert_eq!(kind("i3;;"), GrammarErrorKind::UnknownRole(';'));
    }

    #[test]
    fn test_reference_errors() {
        assert_eq!(kind("i=3"), GrammarErrorKind::NoReference);
        assert_eq!(kind("i&"), GrammarErrorKind::NoReference);
        assert_eq!(kind("i3;o[1]="), GrammarErrorKind::SelfReference { index: 1 });
        assert_eq!(
            kind("i3;o[4]="),
            GrammarErrorKind::IndexOutOfRange { index: 4, count: 2 }
        );
        assert_eq!(kind("rD;i[0]3"), GrammarErrorKind::ReferencesReturn { index: 0 });
        assert_eq!(kind("i3;o[x]"), GrammarErrorKind::MalformedIndex);
        assert_eq!(kind("i3;o[0"), GrammarErrorKind::MalformedIndex);
    }

    #[test]
    fn test_error_positions() {
        let err = parse("i>D*;iQ2,x").unwrap_err();
        assert_eq!(err.pos, 9);
        let err = parse("iD;o[7]=").unwrap_err();
        assert_eq!(err.pos, 4);
        assert_eq!(err.to_string(), "parameter index 7 is out of range for 2 parameters at position 4");
    }
}
