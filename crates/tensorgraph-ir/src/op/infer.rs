//! Shape inference rules for the built-in operators.

use crate::error::IrError;
use crate::op::Operator;
use crate::shape::{ElementType, Shape, TensorShape};

fn op_err(op: &Operator, reason: impl Into<String>) -> IrError {
    IrError::OperatorShape {
        op: op.name().to_string(),
        reason: reason.into(),
    }
}

fn expect_arity(op: &Operator, inputs: &[Shape], arity: usize) -> Result<(), IrError> {
    if inputs.len() != arity {
        return Err(op_err(
            op,
            format!("expects {} input(s), got {}", arity, inputs.len()),
        ));
    }
    Ok(())
}

fn tensor_input<'a>(op: &Operator, inputs: &'a [Shape], index: usize) -> Result<&'a TensorShape, IrError> {
    inputs[index]
        .as_tensor()
        .ok_or_else(|| op_err(op, format!("input #{} must not be a tuple", index)))
}

fn no_modules(op: &Operator, branches: &[Vec<Shape>]) -> Result<(), IrError> {
    if !branches.is_empty() {
        return Err(op_err(op, "takes no branch modules"));
    }
    Ok(())
}

/// Compute the output shape of a built-in operator application.
///
/// `branches` holds the return shape sequence of each referenced branch
/// module, in reference order.
pub(crate) fn infer_builtin(
    op: &Operator,
    inputs: &[Shape],
    branches: &[Vec<Shape>],
) -> Result<Shape, IrError> {
    match op {
        Operator::Add
        | Operator::Sub
        | Operator::Mul
        | Operator::Div
        | Operator::Min
        | Operator::Max => {
            no_modules(op, branches)?;
            expect_arity(op, inputs, 2)?;
            let a = tensor_input(op, inputs, 0)?;
            let b = tensor_input(op, inputs, 1)?;
            if a.element_type() != b.element_type() {
                return Err(op_err(
                    op,
                    format!("element types differ: {} vs {}", a.element_type(), b.element_type()),
                ));
            }
            if a.lens() != b.lens() {
                return Err(op_err(
                    op,
                    format!(
                        "dimensions differ: {:?} vs {:?} (broadcast must be explicit)",
                        a.lens(),
                        b.lens()
                    ),
                ));
            }
            Ok(Shape::Tensor(TensorShape::new(
                a.element_type(),
                a.lens().to_vec(),
            )?))
        }
        Operator::Identity => {
            no_modules(op, branches)?;
            expect_arity(op, inputs, 1)?;
            Ok(inputs[0].clone())
        }
        Operator::Neg | Operator::Abs | Operator::Relu => {
            no_modules(op, branches)?;
            expect_arity(op, inputs, 1)?;
            let t = tensor_input(op, inputs, 0)?;
            Ok(Shape::Tensor(TensorShape::new(
                t.element_type(),
                t.lens().to_vec(),
            )?))
        }
        Operator::Contiguous => {
            no_modules(op, branches)?;
            expect_arity(op, inputs, 1)?;
            let t = tensor_input(op, inputs, 0)?;
            Ok(Shape::Tensor(t.as_standard()))
        }
        Operator::Broadcast { axis, out_lens } => {
            no_modules(op, branches)?;
            expect_arity(op, inputs, 1)?;
            let t = tensor_input(op, inputs, 0)?;
            if axis + t.rank() > out_lens.len() {
                return Err(op_err(
                    op,
                    format!(
                        "rank {} input does not fit at axis {} of output dims {:?}",
                        t.rank(),
                        axis,
                        out_lens
                    ),
                ));
            }
            for (i, &len) in t.lens().iter().enumerate() {
                if out_lens[axis + i] != len {
                    return Err(op_err(
                        op,
                        format!(
                            "input dim {} has length {}, output dim {} has length {}",
                            i,
                            len,
                            axis + i,
                            out_lens[axis + i]
                        ),
                    ));
                }
            }
            let mut strides = vec![0usize; out_lens.len()];
            for (i, &s) in t.strides().iter().enumerate() {
                strides[axis + i] = s;
            }
            Ok(Shape::with_strides(
                t.element_type(),
                out_lens.clone(),
                strides,
            )?)
        }
        Operator::Transpose { permutation } => {
            no_modules(op, branches)?;
            expect_arity(op, inputs, 1)?;
            let t = tensor_input(op, inputs, 0)?;
            let mut sorted = permutation.clone();
            sorted.sort_unstable();
            if sorted != (0..t.rank()).collect::<Vec<_>>() {
                return Err(op_err(
                    op,
                    format!(
                        "{:?} is not a permutation of 0..{}",
                        permutation,
                        t.rank()
                    ),
                ));
            }
            let lens = permutation.iter().map(|&d| t.lens()[d]).collect();
            let strides = permutation.iter().map(|&d| t.strides()[d]).collect();
            Ok(Shape::with_strides(t.element_type(), lens, strides)?)
        }
        Operator::Literal { value } => {
            no_modules(op, branches)?;
            expect_arity(op, inputs, 0)?;
            Ok(value.shape().clone())
        }
        Operator::If => {
            expect_arity(op, inputs, 1)?;
            let cond = tensor_input(op, inputs, 0)?;
            if cond.element_type() != ElementType::Bool {
                return Err(op_err(
                    op,
                    format!("condition must be bool, got {}", cond.element_type()),
                ));
            }
            if cond.elements() != 1 {
                return Err(op_err(
                    op,
                    format!("condition must hold a single element, got {:?}", cond.lens()),
                ));
            }
            if branches.len() != 2 {
                return Err(op_err(
                    op,
                    format!("expects exactly 2 branch modules, got {}", branches.len()),
                ));
            }
            if branches[0] != branches[1] {
                return Err(op_err(
                    op,
                    format!(
                        "branch output shapes disagree: ({}) vs ({})",
                        shape_list(&branches[0]),
                        shape_list(&branches[1])
                    ),
                ));
            }
            Ok(Shape::tuple(branches[0].clone()))
        }
        Operator::GetTupleElem { index } => {
            no_modules(op, branches)?;
            expect_arity(op, inputs, 1)?;
            let components = inputs[0]
                .components()
                .ok_or_else(|| op_err(op, "input must have a tuple shape"))?;
            if *index >= components.len() {
                return Err(IrError::IndexOutOfRange {
                    op: op.name().to_string(),
                    index: *index,
                    arity: components.len(),
                });
            }
            Ok(components[*index].clone())
        }
        Operator::Extension { name, .. } => Err(IrError::UnknownOperator { name: name.clone() }),
    }
}

fn shape_list(shapes: &[Shape]) -> String {
    shapes
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
