//! Binding call arguments to a parsed signature.
//!
//! Binding runs in two phases. The plan phase walks the parameters in
//! logical order, checks every dimension and type rule, converts inputs
//! and allocates outputs into a pending list. Only when every parameter
//! has been planned are the pending values written into the argument
//! slots, so a failed bind leaves the caller's arguments untouched.

use lux_loop::{LoopFlags, LoopInfo, LoopMode};
use lux_types::{
    checked_element_count, combined_type, strip_trailing_ones, Dims, ElementType, MAX_DIMS,
};
use lux_value::{numerical_info, Value, ValueAllocator};
use serde::{Deserialize, Serialize};
use smallvec::smallvec;
use tracing::{debug, instrument};

use crate::spec::{DimSpec, ParamSpec, ParamSpecList, Role, Trailing, TypeSpec};
use crate::ArgumentError;

/// Binder settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindConfig {
    /// Type of a produced parameter that declares no type and has no
    /// reference parameter.
    pub default_output_type: ElementType,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            default_output_type: ElementType::Double,
        }
    }
}

/// The outcome of a successful [`bind`].
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    /// One loop per parameter, in declaration order; `None` for omitted
    /// optional parameters.
    pub loops: Vec<Option<LoopInfo>>,
    /// The return value, for function signatures.
    pub ret: Option<Value>,
}

impl Binding {
    /// The loop of parameter `index`, if it was bound.
    #[must_use]
    pub fn loop_info(&self, index: usize) -> Option<&LoopInfo> {
        self.loops.get(index).and_then(Option::as_ref)
    }
}

/// Shape and type of a parameter as seen by the parameters referencing it.
#[derive(Clone, Debug)]
struct Resolved {
    dims: Dims,
    element_type: ElementType,
}

/// Binds `args` to `specs`.
///
/// Argument slots correspond to the input and output parameters in
/// declaration order; the return parameter has no slot. On success the
/// slots of converted inputs and of outputs hold their new values and
/// the return value (if any) is in [`Binding::ret`]. On failure `args`
/// is unchanged.
///
/// # Errors
///
/// Returns an [`ArgumentError`] naming the offending parameter.
#[instrument(level = "debug", skip_all, fields(params = specs.params.len(), args = args.len()))]
pub fn bind<A>(
    args: &mut [Value],
    specs: &ParamSpecList,
    config: &BindConfig,
    allocator: &A,
) -> Result<Binding, ArgumentError>
where
    A: ValueAllocator + ?Sized,
{
    let min = specs.min_arguments();
    let max = specs.max_arguments();
    if args.len() < min || args.len() > max {
        return Err(ArgumentError::Arity {
            given: args.len(),
            min,
            max,
        });
    }

    let mut slots = vec![None; specs.params.len()];
    for (slot, param) in specs.argument_params().enumerate() {
        slots[param] = Some(slot);
    }

    let mut binder = Binder {
        args,
        specs,
        config,
        slots,
        resolved: vec![None; specs.params.len()],
        processed: vec![false; specs.params.len()],
        pending: Vec::new(),
    };
    let mut loops = vec![None; specs.params.len()];
    let mut ret = None;

    for index in specs.logical_order() {
        let spec = &specs.params[index];
        let planned = if spec.role == Role::Input {
            binder.plan_input(index, spec, allocator)?
        } else {
            binder.plan_produced(index, spec, allocator)?
        };
        binder.processed[index] = true;
        let Some((resolved, info, value)) = planned else {
            debug!(param = index, "optional parameter omitted");
            continue;
        };
        debug!(param = index, dims = ?resolved.dims, element_type = %resolved.element_type, "bound parameter");
        match (spec.role, value) {
            (Role::Return, Some(v)) => ret = Some(v),
            (_, Some(v)) => {
                if let Some(slot) = binder.slots[index] {
                    binder.pending.push((slot, v));
                }
            }
            (_, None) => {}
        }
        binder.resolved[index] = Some(resolved);
        loops[index] = Some(info);
    }

    let Binder { args, pending, .. } = binder;
    for (slot, value) in pending {
        args[slot] = value;
    }
    Ok(Binding { loops, ret })
}

type Planned = Option<(Resolved, LoopInfo, Option<Value>)>;

struct Binder<'a> {
    args: &'a mut [Value],
    specs: &'a ParamSpecList,
    config: &'a BindConfig,
    slots: Vec<Option<usize>>,
    resolved: Vec<Option<Resolved>>,
    processed: Vec<bool>,
    pending: Vec<(usize, Value)>,
}

impl Binder<'_> {
    /// The caller's argument for parameter `index`, if supplied.
    fn argument(&self, index: usize) -> Option<&Value> {
        self.slots[index]
            .and_then(|slot| self.args.get(slot))
            .filter(|v| !matches!(v, Value::Undefined))
    }

    /// Shape and type of `param`'s reference, or `None` if the reference
    /// is an omitted optional parameter.
    fn reference(&self, param: usize, spec: &ParamSpec) -> Result<Option<Resolved>, ArgumentError> {
        let Some(reference) = spec.reference else {
            return Ok(None);
        };
        if let Some(resolved) = &self.resolved[reference] {
            return Ok(Some(resolved.clone()));
        }
        if self.processed[reference] {
            return Ok(None);
        }
        if self.specs.params[reference].role.is_produced() {
            return Err(ArgumentError::ForwardReference { param, reference });
        }
        Ok(self.argument(reference).and_then(|v| {
            Some(Resolved {
                dims: v.dims(),
                element_type: v.element_type()?,
            })
        }))
    }

    fn plan_input<A: ValueAllocator + ?Sized>(
        &self,
        param: usize,
        spec: &ParamSpec,
        allocator: &A,
    ) -> Result<Planned, ArgumentError> {
        let Some(value) = self.argument(param) else {
            return if spec.optional {
                Ok(None)
            } else {
                Err(ArgumentError::Missing { param })
            };
        };
        let info = numerical_info(value).map_err(|source| ArgumentError::Value { param, source })?;
        let reference = self.reference(param, spec)?;
        let ref_dims = required_reference(param, spec, reference.as_ref())?;
        check_input_dims(param, spec, &info.dims, ref_dims)?;

        let element_type = input_type(param, spec.type_spec, info.element_type)?;
        let converted = if element_type == info.element_type {
            None
        } else {
            debug!(param, from = %info.element_type, to = %element_type, "converting input");
            Some(
                allocator
                    .convert(value, element_type)
                    .map_err(|source| ArgumentError::Value { param, source })?,
            )
        };
        let loop_info = full_loop(param, element_type, &info.dims)?;
        Ok(Some((
            Resolved {
                dims: info.dims,
                element_type,
            },
            loop_info,
            converted,
        )))
    }

    fn plan_produced<A: ValueAllocator + ?Sized>(
        &self,
        param: usize,
        spec: &ParamSpec,
        allocator: &A,
    ) -> Result<Planned, ArgumentError> {
        if spec.role == Role::Output {
            let supplied = self.slots[param].is_some_and(|slot| slot < self.args.len());
            if !supplied {
                return Ok(None);
            }
        }
        let reference = self.reference(param, spec)?;
        let ref_dims = required_reference(param, spec, reference.as_ref())?;
        let mut dims = produced_dims(param, spec, ref_dims)?;
        if let Some(axis_param) = spec.axis_param {
            self.delete_axes(param, axis_param, &mut dims)?;
        }
        strip_trailing_ones(&mut dims);
        if checked_element_count(&dims).is_none() {
            return Err(ArgumentError::TooManyElements {
                param,
                dims: dims.to_vec(),
            });
        }

        let element_type = output_type(spec.type_spec, reference.as_ref(), self.config);
        let value = if dims.is_empty() {
            allocator.allocate_scalar(element_type)
        } else {
            allocator.allocate_array(element_type, &dims)
        }
        .map_err(|source| ArgumentError::Value { param, source })?;
        if dims.is_empty() {
            dims.push(1);
        }
        let loop_info = full_loop(param, element_type, &dims)?;
        Ok(Some((
            Resolved { dims, element_type },
            loop_info,
            Some(value),
        )))
    }

    fn delete_axes(&self, param: usize, axis_param: usize, dims: &mut Dims) -> Result<(), ArgumentError> {
        let Some(value) = self.argument(axis_param) else {
            return Ok(());
        };
        let axes = value
            .axis_list()
            .map_err(|source| ArgumentError::Value { param, source })?;
        let ndim = dims.len();
        let mut delete = [false; MAX_DIMS];
        for axis in axes {
            match usize::try_from(axis) {
                Ok(a) if a < ndim => delete[a] = true,
                _ => return Err(ArgumentError::AxisOutOfRange { param, axis, ndim }),
            }
        }
        let mut k = 0;
        dims.retain(|_| {
            k += 1;
            !delete[k - 1]
        });
        Ok(())
    }
}

fn required_reference<'r>(
    param: usize,
    spec: &ParamSpec,
    reference: Option<&'r Resolved>,
) -> Result<&'r [usize], ArgumentError> {
    match reference {
        Some(r) => Ok(&r.dims),
        None if spec.needs_reference() => Err(ArgumentError::MissingReference {
            param,
            reference: spec.reference,
        }),
        None => Ok(&[]),
    }
}

fn dim_at(dims: &[usize], k: usize) -> usize {
    dims.get(k).copied().unwrap_or(1)
}

fn verify_reference(param: usize, dim: usize, expected: Option<usize>, found: usize) -> Result<(), ArgumentError> {
    match expected {
        Some(expected) if expected != found => Err(ArgumentError::ReferenceMismatch {
            param,
            dim,
            expected,
            found,
        }),
        _ => Ok(()),
    }
}

fn check_input_dims(
    param: usize,
    spec: &ParamSpec,
    have: &[usize],
    ref_dims: &[usize],
) -> Result<(), ArgumentError> {
    let expect = |dim: usize, expected: usize| {
        let found = dim_at(have, dim);
        if found == expected {
            Ok(())
        } else {
            Err(ArgumentError::DimensionMismatch {
                param,
                dim,
                expected,
                found,
            })
        }
    };

    let (mut h, mut r) = (0, 0);
    for rule in &spec.dims {
        match *rule {
            DimSpec::Exact(n) => {
                expect(h, n)?;
                h += 1;
                r += 1;
            }
            DimSpec::Add(n) => {
                expect(h, n)?;
                h += 1;
            }
            DimSpec::Copy(verify) => {
                let size = dim_at(ref_dims, r);
                verify_reference(param, r, verify, size)?;
                expect(h, size)?;
                h += 1;
                r += 1;
            }
            DimSpec::Drop(verify) => {
                verify_reference(param, r, verify, dim_at(ref_dims, r))?;
                r += 1;
            }
            DimSpec::Any => {
                h += 1;
                r += 1;
            }
        }
    }

    let rest = have.get(h..).unwrap_or_default();
    match spec.trailing {
        Trailing::Arbitrary => Ok(()),
        Trailing::Absent if rest.iter().all(|&d| d == 1) => Ok(()),
        Trailing::Absent => Err(ArgumentError::ExtraDimensions {
            param,
            allowed: h,
            found: have.to_vec(),
        }),
        Trailing::EqualToReference => {
            let mut found = Dims::from_slice(rest);
            let mut expected = Dims::from_slice(ref_dims.get(r..).unwrap_or_default());
            strip_trailing_ones(&mut found);
            strip_trailing_ones(&mut expected);
            if found == expected {
                Ok(())
            } else {
                Err(ArgumentError::TrailingMismatch {
                    param,
                    expected: expected.to_vec(),
                    found: found.to_vec(),
                })
            }
        }
    }
}

fn produced_dims(param: usize, spec: &ParamSpec, ref_dims: &[usize]) -> Result<Dims, ArgumentError> {
    let mut dims = Dims::new();
    let mut r = 0;
    for rule in &spec.dims {
        match *rule {
            DimSpec::Exact(n) => {
                dims.push(n);
                r += 1;
            }
            DimSpec::Add(n) => dims.push(n),
            DimSpec::Copy(verify) => {
                let size = dim_at(ref_dims, r);
                verify_reference(param, r, verify, size)?;
                dims.push(size);
                r += 1;
            }
            DimSpec::Drop(verify) => {
                verify_reference(param, r, verify, dim_at(ref_dims, r))?;
                r += 1;
            }
            DimSpec::Any => {
                dims.push(dim_at(ref_dims, r));
                r += 1;
            }
        }
    }
    if spec.trailing == Trailing::EqualToReference {
        dims.extend_from_slice(ref_dims.get(r..).unwrap_or_default());
    }
    if dims.len() > MAX_DIMS {
        return Err(ArgumentError::TooManyDims {
            param,
            rank: dims.len(),
        });
    }
    Ok(dims)
}

fn input_type(
    param: usize,
    type_spec: Option<TypeSpec>,
    found: ElementType,
) -> Result<ElementType, ArgumentError> {
    match type_spec {
        None => Ok(found),
        Some(t) if t.element_type.is_string() != found.is_string() => {
            Err(ArgumentError::TypeMismatch {
                param,
                expected: t.element_type,
                found,
            })
        }
        Some(t) if t.lower_bound => Ok(combined_type(found, t.element_type)),
        Some(t) => Ok(t.element_type),
    }
}

fn output_type(
    type_spec: Option<TypeSpec>,
    reference: Option<&Resolved>,
    config: &BindConfig,
) -> ElementType {
    match (type_spec, reference) {
        (Some(t), Some(r)) if t.lower_bound => combined_type(r.element_type, t.element_type),
        (Some(t), _) => t.element_type,
        (None, Some(r)) => r.element_type,
        (None, None) => config.default_output_type,
    }
}

fn full_loop(param: usize, element_type: ElementType, dims: &[usize]) -> Result<LoopInfo, ArgumentError> {
    let dims: Dims = if dims.is_empty() {
        smallvec![1]
    } else {
        Dims::from_slice(dims)
    };
    LoopInfo::new(element_type, &dims, &[], LoopFlags::ALL_AXES, LoopMode::default())
        .map_err(|source| ArgumentError::Loop { param, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use lux_value::HeapAllocator;

    fn bind_str(format: &str, args: &mut [Value]) -> Result<Binding, ArgumentError> {
        let specs = parse(format).unwrap();
        bind(args, &specs, &BindConfig::default(), &HeapAllocator::new())
    }

    #[test]
    fn test_scalar_through_size_one_dimension() {
        let mut args = [Value::scalar(2.5f64)];
        let binding = bind_str("i>D1;rD1", &mut args).unwrap();
        assert!(matches!(binding.ret, Some(Value::Scalar(_))));
        assert_eq!(binding.loop_info(1).unwrap().dims(), &[1]);
    }

    #[test]
    fn test_copy_dimension() {
        let mut args = [Value::array(&[5], vec![0.0f64; 5]).unwrap()];
        let binding = bind_str("i>D:;rD=", &mut args).unwrap();
        assert_eq!(binding.ret.unwrap().dims().as_slice(), &[5]);
    }

    #[test]
    fn test_input_upgrade_is_committed() {
        let mut args = [Value::array(&[3], vec![1i32, 2, 3]).unwrap()];
        let binding = bind_str("i>F*", &mut args).unwrap();
        assert_eq!(args[0].element_type(), Some(ElementType::Float));
        assert_eq!(binding.loop_info(0).unwrap().element_type(), ElementType::Float);
        assert!(binding.ret.is_none());
    }

    #[test]
    fn test_lower_bound_keeps_wider_input() {
        let mut args = [Value::array(&[2], vec![1.0f64, 2.0]).unwrap()];
        bind_str("i>L*", &mut args).unwrap();
        assert_eq!(args[0].element_type(), Some(ElementType::Double));
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let mut args = [Value::array(&[4, 7], vec![0u8; 28]).unwrap()];
        let err = bind_str("i4,5", &mut args).unwrap_err();
        assert_eq!(
            err,
            ArgumentError::DimensionMismatch {
                param: 0,
                dim: 1,
                expected: 5,
                found: 7
            }
        );
        assert_eq!(
            err.to_string(),
            "parameter 0: expected size 5 for dimension 1, found 7"
        );
    }

    #[test]
    fn test_string_type_rules() {
        let mut args = [Value::scalar(String::from("abc"))];
        assert!(bind_str("iS*", &mut args).is_ok());
        assert!(matches!(
            bind_str("iD*", &mut args),
            Err(ArgumentError::TypeMismatch { .. })
        ));
        let mut numbers = [Value::scalar(1i16)];
        assert!(matches!(
            bind_str("iS*", &mut numbers),
            Err(ArgumentError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_default_output_type() {
        let mut args = [Value::Undefined];
        let binding = bind_str("o3", &mut args).unwrap();
        assert_eq!(args[0].element_type(), Some(ElementType::Double));
        assert_eq!(args[0].dims().as_slice(), &[3]);
        assert!(binding.loop_info(0).is_some());
    }

    #[test]
    fn test_forward_reference() {
        let mut args = [Value::Undefined, Value::Undefined];
        assert_eq!(
            bind_str("o[1]=;oL4", &mut args),
            Err(ArgumentError::ForwardReference {
                param: 0,
                reference: 1
            })
        );
    }
}
