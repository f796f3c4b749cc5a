//! Parsed argument signatures.

use std::fmt;

use lux_types::ElementType;
use serde::{Deserialize, Serialize};

/// What a parameter is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Read by the operation (`i`).
    Input,
    /// Written by the operation into a caller argument (`o`).
    Output,
    /// The operation's return value (`r`).
    Return,
}

impl Role {
    /// The signature letter.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Input => 'i',
            Self::Output => 'o',
            Self::Return => 'r',
        }
    }

    /// Whether the parameter produces a new value.
    #[must_use]
    pub const fn is_produced(self) -> bool {
        !matches!(self, Self::Input)
    }
}

/// A required element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeSpec {
    /// The type.
    pub element_type: ElementType,
    /// Whether `element_type` is only a lower bound (`>`).
    pub lower_bound: bool,
}

/// One dimension rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimSpec {
    /// `n`: the dimension has exactly this size.
    Exact(usize),
    /// `=` or `=n`: the size of the matching reference dimension,
    /// optionally verified.
    Copy(Option<usize>),
    /// `+n`: a new dimension of this size (produced parameters only).
    Add(usize),
    /// `-` or `-n`: skip the matching reference dimension, optionally
    /// verifying its size.
    Drop(Option<usize>),
    /// `:`: any size (inputs only).
    Any,
}

impl DimSpec {
    /// Whether the rule consumes a reference dimension.
    #[must_use]
    pub const fn consumes_reference(self) -> bool {
        !matches!(self, Self::Add(_))
    }

    /// Whether the rule needs a reference parameter.
    #[must_use]
    pub const fn needs_reference(self) -> bool {
        matches!(self, Self::Copy(_) | Self::Drop(_))
    }
}

impl fmt::Display for DimSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "{n}"),
            Self::Copy(None) => f.write_str("="),
            Self::Copy(Some(n)) => write!(f, "={n}"),
            Self::Add(n) => write!(f, "+{n}"),
            Self::Drop(None) => f.write_str("-"),
            Self::Drop(Some(n)) => write!(f, "-{n}"),
            Self::Any => f.write_str(":"),
        }
    }
}

/// What happens to dimensions beyond the listed rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trailing {
    /// No further dimensions (other than size 1).
    #[default]
    Absent,
    /// `*`: any further dimensions (inputs only).
    Arbitrary,
    /// `&`: further dimensions equal the reference's remaining ones.
    EqualToReference,
}

/// One parameter of a signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Role.
    pub role: Role,
    /// Whether the argument may be omitted (`?`).
    pub optional: bool,
    /// Required element type, if any.
    pub type_spec: Option<TypeSpec>,
    /// Reference parameter (declaration index), explicit or defaulted.
    pub reference: Option<usize>,
    /// Parameter whose values name axes to delete from this parameter's
    /// shape (produced parameters only).
    pub axis_param: Option<usize>,
    /// Dimension rules, in order.
    pub dims: Vec<DimSpec>,
    /// Policy for dimensions beyond `dims`.
    pub trailing: Trailing,
}

impl ParamSpec {
    /// Whether any rule or the trailing policy needs a reference.
    #[must_use]
    pub fn needs_reference(&self) -> bool {
        self.dims.iter().any(|d| d.needs_reference())
            || self.trailing == Trailing::EqualToReference
    }
}

/// A parsed signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpecList {
    /// Parameters in declaration order.
    pub params: Vec<ParamSpec>,
    /// Declaration index of the return parameter, if any.
    pub return_index: Option<usize>,
}

impl ParamSpecList {
    /// Declaration indices in the order parameters are bound: inputs and
    /// outputs as declared, then the return parameter.
    pub fn logical_order(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.params.len())
            .filter(move |&i| Some(i) != self.return_index)
            .chain(self.return_index)
    }

    /// The parameter bound just before `index`, which serves as its
    /// default reference.
    #[must_use]
    pub fn previous(&self, index: usize) -> Option<usize> {
        let mut prev = None;
        for i in self.logical_order() {
            if i == index {
                return prev;
            }
            prev = Some(i);
        }
        None
    }

    /// Declaration indices of the parameters that take argument slots,
    /// in slot order.
    pub fn argument_params(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.params.len()).filter(move |&i| Some(i) != self.return_index)
    }

    /// Number of argument slots.
    #[must_use]
    pub fn max_arguments(&self) -> usize {
        self.params.len() - usize::from(self.return_index.is_some())
    }

    /// Number of arguments that must be supplied: up to and including the
    /// last non-optional one.
    #[must_use]
    pub fn min_arguments(&self) -> usize {
        self.argument_params()
            .enumerate()
            .filter(|&(_, i)| !self.params[i].optional)
            .map(|(slot, _)| slot + 1)
            .last()
            .unwrap_or(0)
    }

    /// Whether the signature is for a function (has a return parameter).
    #[must_use]
    pub fn is_function(&self) -> bool {
        self.return_index.is_some()
    }
}

impl fmt::Display for ParamSpecList {
    /// Renders the canonical signature text, which parses back to an
    /// equal list. Defaulted references are left implicit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, p) in self.params.iter().enumerate() {
            if index > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}", p.role.letter())?;
            if p.optional {
                f.write_str("?")?;
            }
            if let Some(t) = p.type_spec {
                if t.lower_bound {
                    f.write_str(">")?;
                }
                write!(f, "{}", t.element_type.letter())?;
            }
            if p.reference.is_some() && p.reference != self.previous(index) {
                if let Some(r) = p.reference {
                    write!(f, "[{r}]")?;
                }
            }
            if let Some(a) = p.axis_param {
                write!(f, "{{{a}}}")?;
            }
            for (k, d) in p.dims.iter().enumerate() {
                if k > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{d}")?;
            }
            match p.trailing {
                Trailing::Absent => {}
                Trailing::Arbitrary => f.write_str("*")?,
                Trailing::EqualToReference => f.write_str("&")?,
            }
        }
        Ok(())
    }
}
