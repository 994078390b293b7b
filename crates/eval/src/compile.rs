//! Formula compilation and execution.
//!
//! Compilation resolves every instruction's operator against the criteria
//! schema exactly once; the compiled form holds function pointers and is
//! immutable, so a formula compiled for one book of criteria can be
//! evaluated repeatedly. All structural errors (unknown fields, forward
//! references, unresolvable operators) surface at compile time, before any
//! arithmetic runs.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use premia_core::{
    CalculationCriteria, CriteriaSchema, Formula, OperandRef, Quantity, RatingError, Shape,
};

use crate::resolve::{resolve, OpFn};

#[derive(Debug)]
struct CompiledStep {
    operation: String,
    operands: Vec<OperandRef>,
    op: OpFn,
    output_shape: Shape,
}

/// A formula bound to a criteria schema. Evaluation needs criteria with the
/// same field shapes the formula was compiled against.
#[derive(Debug)]
pub struct CompiledFormula {
    steps: Vec<CompiledStep>,
}

/// At most this many operands are named in an unknown-operator message.
const OPERANDS_SHOWN: usize = 5;

fn describe_operands(operands: &[OperandRef], shapes: &[Shape]) -> String {
    let mut parts: Vec<String> = operands
        .iter()
        .zip(shapes)
        .take(OPERANDS_SHOWN)
        .map(|(operand, shape)| match operand {
            OperandRef::Field(name) => format!("{name}: {shape}"),
            OperandRef::Result { index } => format!("#{index}: {shape}"),
        })
        .collect();
    if operands.len() > OPERANDS_SHOWN {
        parts.push(format!("+ {} more", operands.len() - OPERANDS_SHOWN));
    }
    parts.join(", ")
}

/// Resolves every instruction against the schema. Result references must
/// point strictly backwards; the output shape of each step feeds shape
/// resolution of the ones after it.
pub fn compile(
    formula: &Formula,
    schema: &CriteriaSchema,
) -> Result<CompiledFormula, RatingError> {
    if formula.instructions.is_empty() {
        return Err(RatingError::EmptyFormula);
    }
    let mut steps: Vec<CompiledStep> = Vec::with_capacity(formula.instructions.len());
    for (position, instruction) in formula.instructions.iter().enumerate() {
        let mut shapes = Vec::with_capacity(instruction.operands.len());
        for operand in &instruction.operands {
            let shape = match operand {
                OperandRef::Field(name) => {
                    *schema
                        .get(name)
                        .ok_or_else(|| RatingError::UnknownField { field: name.clone() })?
                }
                OperandRef::Result { index } => {
                    if *index >= position {
                        return Err(RatingError::BadReference {
                            index: *index,
                            len: position,
                        });
                    }
                    steps[*index].output_shape
                }
            };
            shapes.push(shape);
        }
        let (op, output_shape) = resolve(&instruction.operation, &shapes).ok_or_else(|| {
            RatingError::UnknownOperator {
                operation: instruction.operation.clone(),
                operands: describe_operands(&instruction.operands, &shapes),
            }
        })?;
        steps.push(CompiledStep {
            operation: instruction.operation.clone(),
            operands: instruction.operands.clone(),
            op,
            output_shape,
        });
    }
    Ok(CompiledFormula { steps })
}

impl CompiledFormula {
    /// Runs every step in order against the criteria, recording one phase
    /// per instruction.
    pub fn evaluate(&self, criteria: &CalculationCriteria) -> Result<RatingResult, RatingError> {
        let mut outputs: Vec<Quantity> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let mut values = Vec::with_capacity(step.operands.len());
            for operand in &step.operands {
                let value = match operand {
                    OperandRef::Field(name) => criteria
                        .get(name)
                        .cloned()
                        .ok_or_else(|| RatingError::UnknownField { field: name.clone() })?,
                    OperandRef::Result { index } => outputs[*index].clone(),
                };
                values.push(value);
            }
            outputs.push((step.op)(&values)?);
        }
        let phases = self
            .steps
            .iter()
            .zip(outputs)
            .map(|(step, output)| RatingPhase {
                operation: step.operation.clone(),
                output,
            })
            .collect();
        Ok(RatingResult { phases })
    }
}

/// One instruction's recorded outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingPhase {
    pub operation: String,
    pub output: Quantity,
}

/// The full trace of a rating: one phase per instruction, in formula order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResult {
    pub phases: Vec<RatingPhase>,
}

impl RatingResult {
    /// The last phase's output, the formula's result proper.
    pub fn final_output(&self) -> Option<&Quantity> {
        self.phases.last().map(|p| &p.output)
    }

    /// The most recent technical premium, searched from the last phase
    /// backwards. Formulas usually end on a Tally, so the bottom-line
    /// premium sits a phase or two earlier.
    pub fn premium(&self) -> Option<Decimal> {
        self.phases.iter().rev().find_map(|phase| match &phase.output {
            Quantity::Premium(p) => Some(p.value),
            _ => None,
        })
    }

    /// Worksheet rendering: every phase, with line items expanded to their
    /// computed amount and validity.
    pub fn to_json(&self) -> serde_json::Value {
        let phases: Vec<serde_json::Value> = self
            .phases
            .iter()
            .enumerate()
            .map(|(index, phase)| {
                json!({
                    "instruction": index,
                    "operation": phase.operation,
                    "output": render_output(&phase.output),
                })
            })
            .collect();
        json!({
            "premium": self.premium(),
            "phases": phases,
        })
    }
}

fn render_output(output: &Quantity) -> serde_json::Value {
    match output {
        Quantity::LineItems(items) => {
            let rendered: Vec<serde_json::Value> = items
                .items
                .iter()
                .map(|item| {
                    json!({
                        "name": item.name,
                        "premiumTypeId": item.premium_type_id,
                        "premium": item.premium,
                        "earned": item.earned,
                        "waived": item.waived,
                        "amount": item.amount(),
                        "isValid": item.is_valid(),
                    })
                })
                .collect();
            match items.regulatory {
                Some(regulatory) => json!({
                    "kind": "lineItems",
                    "regulatory": regulatory,
                    "items": rendered,
                }),
                None => json!({ "kind": "lineItems", "items": rendered }),
            }
        }
        other => serde_json::to_value(other).unwrap_or(serde_json::Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use premia_core::{ClassFactor, FactorPart, Instruction, RateTier};
    use rust_decimal_macros::dec;

    fn criteria() -> CalculationCriteria {
        let mut c = CalculationCriteria::new();
        c.set_class_factor(ClassFactor::new(
            "Payrolls",
            vec![FactorPart::new("5403", vec![RateTier::flat(dec!(100000))])],
        ))
        .set_class_factor(ClassFactor::new(
            "BaseRates",
            vec![FactorPart::new("5403", vec![RateTier::flat(dec!(0.02))])],
        ))
        .set_factor("Xmod", dec!(1.1));
        c
    }

    fn formula() -> Formula {
        Formula::new(vec![
            Instruction::new(
                "Multiply",
                vec![OperandRef::field("Payrolls"), OperandRef::field("BaseRates")],
            ),
            Instruction::new("Tally", vec![OperandRef::result(0)]),
            Instruction::new("Accumulate", vec![OperandRef::result(1)]),
            Instruction::new(
                "Multiply",
                vec![OperandRef::field("Xmod"), OperandRef::result(2)],
            ),
        ])
    }

    #[test]
    fn compile_and_evaluate_chain() {
        let c = criteria();
        let compiled = compile(&formula(), &c.schema()).unwrap();
        let result = compiled.evaluate(&c).unwrap();
        assert_eq!(result.phases.len(), 4);
        // 100000 * 0.02 = 2000, then * 1.1.
        assert_eq!(result.premium(), Some(dec!(2200.000)));
        assert_eq!(
            result.final_output(),
            Some(&Quantity::premium(dec!(2200.000)))
        );
    }

    #[test]
    fn empty_formula_rejected() {
        let c = criteria();
        let err = compile(&Formula::new(vec![]), &c.schema()).unwrap_err();
        assert_eq!(err, RatingError::EmptyFormula);
    }

    #[test]
    fn unknown_field_rejected_at_compile() {
        let c = criteria();
        let f = Formula::new(vec![Instruction::new(
            "Tally",
            vec![OperandRef::field("NoSuchField")],
        )]);
        let err = compile(&f, &c.schema()).unwrap_err();
        assert_eq!(
            err,
            RatingError::UnknownField {
                field: "NoSuchField".into()
            }
        );
    }

    #[test]
    fn forward_reference_rejected() {
        let c = criteria();
        let f = Formula::new(vec![Instruction::new(
            "Tally",
            vec![OperandRef::result(0)],
        )]);
        let err = compile(&f, &c.schema()).unwrap_err();
        assert_eq!(err, RatingError::BadReference { index: 0, len: 0 });
    }

    #[test]
    fn unresolvable_operator_names_operand_shapes() {
        let c = criteria();
        let f = Formula::new(vec![Instruction::new(
            "Divide",
            vec![OperandRef::field("Payrolls"), OperandRef::field("BaseRates")],
        )]);
        let err = compile(&f, &c.schema()).unwrap_err();
        match err {
            RatingError::UnknownOperator { operation, operands } => {
                assert_eq!(operation, "Divide");
                assert_eq!(operands, "Payrolls: PerClass, BaseRates: PerClass");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn worksheet_json_expands_line_items() {
        let c = criteria();
        let compiled = compile(&formula(), &c.schema()).unwrap();
        let json = compiled.evaluate(&c).unwrap().to_json();
        assert_eq!(json["phases"][1]["operation"], "Tally");
        let item = &json["phases"][1]["output"]["items"][0];
        assert_eq!(item["name"], "5403");
        assert_eq!(item["isValid"], true);
    }
}
