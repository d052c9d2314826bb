/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

// src/rule/evaluator.rs
// Tree-walking evaluator for parsed expressions. Failures carry the
// span of the node that failed so the caller can report the exact
// sub-expression.

use crate::rule::context::Context;
use crate::rule::error::EvaluationFailure;
use crate::rule::lexer::Span;
use crate::rule::parser::{BinaryOp, Expr, Expression, Function, Literal, Node, UnaryOp};
use crate::rule::registration::check_registration_code;
use crate::rule::value::Value;

pub type EvalResult<T> = Result<T, (Span, EvaluationFailure)>;

// evaluate evaluates an expression against a context.
pub fn evaluate(expression: &Expression, context: &mut Context<'_>) -> EvalResult<Value> {
    Evaluator {
        expression,
        context,
    }
    .eval(expression.root())
}

struct Evaluator<'a, 'db> {
    expression: &'a Expression,
    context: &'a mut Context<'db>,
}

fn fail<T>(span: Span, failure: EvaluationFailure) -> EvalResult<T> {
    Err((span, failure))
}

fn type_error<T>(span: Span, message: String) -> EvalResult<T> {
    fail(span, EvaluationFailure::type_error(message))
}

fn expect_str(node: &Node, value: Value, function: Function) -> EvalResult<String> {
    match value {
        Value::Str(value) => Ok(value),
        other => type_error(
            node.span,
            format!("{function}() expects a string, got {}", other.type_name()),
        ),
    }
}

// expect_names turns a component argument into a list of names:
// a single name, a list of names, or None for no component.
fn expect_names(node: &Node, value: Value, function: Function) -> EvalResult<Vec<String>> {
    match value {
        Value::None => Ok(Vec::new()),
        Value::Str(name) => Ok(vec![name]),
        Value::List(items) => items
            .into_iter()
            .map(|item| expect_str(node, item, function))
            .collect(),
        other => type_error(
            node.span,
            format!(
                "{function}() expects a component name or a list, got {}",
                other.type_name()
            ),
        ),
    }
}

impl Evaluator<'_, '_> {
    fn eval(&mut self, node: &Node) -> EvalResult<Value> {
        match &node.expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::None => Value::None,
                Literal::Bool(value) => Value::Bool(*value),
                Literal::Integer(value) => Value::Int(*value),
                Literal::String(value) => Value::Str(value.clone()),
            }),
            Expr::Regex(literal) => Ok(Value::Regex(literal.regex.clone())),
            Expr::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<EvalResult<_>>()?,
            )),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match (op, value) {
                    (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
                    (UnaryOp::Negate, Value::Int(value)) => value
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| overflow(node.span)),
                    (UnaryOp::Negate, value) => {
                        type_error(node.span, format!("can't negate {}", value.type_name()))
                    }
                }
            }
            Expr::Binary { op, lhs, rhs } => self.eval_binary(node, *op, lhs, rhs),
            Expr::Call { function, args } => self.eval_call(node, *function, args),
        }
    }

    fn eval_binary(&mut self, node: &Node, op: BinaryOp, lhs: &Node, rhs: &Node) -> EvalResult<Value> {
        // and/or short-circuit and yield one of their operands.
        match op {
            BinaryOp::And => {
                let lhs = self.eval(lhs)?;
                return if lhs.is_truthy() { self.eval(rhs) } else { Ok(lhs) };
            }
            BinaryOp::Or => {
                let lhs = self.eval(lhs)?;
                return if lhs.is_truthy() { Ok(lhs) } else { self.eval(rhs) };
            }
            _ => {}
        }

        let lhs = self.eval(lhs)?;
        let rhs = self.eval(rhs)?;
        let span = node.span;
        let mismatch = |lhs: &Value, rhs: &Value| {
            EvaluationFailure::type_error(format!(
                "unsupported operand types {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ))
        };

        match op {
            BinaryOp::Equal => Ok(Value::Bool(lhs.loose_eq(&rhs))),
            BinaryOp::NotEqual => Ok(Value::Bool(!lhs.loose_eq(&rhs))),
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                let ordering = match (&lhs, &rhs) {
                    (Value::Int(a), Value::Int(b)) => a.cmp(b),
                    (Value::Str(a), Value::Str(b)) => a.cmp(b),
                    _ => return fail(span, mismatch(&lhs, &rhs)),
                };
                Ok(Value::Bool(match op {
                    BinaryOp::Less => ordering.is_lt(),
                    BinaryOp::LessEqual => ordering.is_le(),
                    BinaryOp::Greater => ordering.is_gt(),
                    _ => ordering.is_ge(),
                }))
            }
            BinaryOp::In => match (&lhs, &rhs) {
                (_, Value::List(items)) => Ok(Value::Bool(items.iter().any(|item| lhs.loose_eq(item)))),
                (Value::Str(needle), Value::Str(haystack)) => {
                    Ok(Value::Bool(haystack.contains(needle.as_str())))
                }
                _ => fail(span, mismatch(&lhs, &rhs)),
            },
            BinaryOp::Add => match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => {
                    a.checked_add(b).map(Value::Int).ok_or_else(|| overflow(span))
                }
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
                (Value::List(mut a), Value::List(b)) => {
                    a.extend(b);
                    Ok(Value::List(a))
                }
                (lhs, rhs) => fail(span, mismatch(&lhs, &rhs)),
            },
            BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => {
                let (Value::Int(a), Value::Int(b)) = (&lhs, &rhs) else {
                    return fail(span, mismatch(&lhs, &rhs));
                };
                let (a, b) = (*a, *b);
                if matches!(op, BinaryOp::Divide | BinaryOp::Modulo) && b == 0 {
                    return fail(span, EvaluationFailure::DivisionByZero);
                }
                let result = match op {
                    BinaryOp::Subtract => a.checked_sub(b),
                    BinaryOp::Multiply => a.checked_mul(b),
                    BinaryOp::Divide => a.checked_div_euclid(b),
                    _ => a.checked_rem_euclid(b),
                };
                result.map(Value::Int).ok_or_else(|| overflow(span))
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn eval_call(&mut self, node: &Node, function: Function, args: &[Node]) -> EvalResult<Value> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }
        let mut values = values.into_iter();
        // The parser checked the arity, so every required argument is
        // present.
        let mut next = || values.next().unwrap_or(Value::None);
        let span = node.span;

        match function {
            Function::ComponentEq => {
                let class = expect_str(&args[0], next(), function)?;
                let mut expected = expect_names(&args[1], next(), function)?;
                expected.sort();
                Ok(Value::Bool(self.context.bom().names(&class) == expected.as_slice()))
            }
            Function::ComponentIn => {
                let class = expect_str(&args[0], next(), function)?;
                let choices = match next() {
                    Value::List(items) => items,
                    other => {
                        return type_error(
                            args[1].span,
                            format!("{function}() expects a list, got {}", other.type_name()),
                        );
                    }
                };
                let names = self.context.bom().names(&class);
                let result = if names.is_empty() {
                    choices.contains(&Value::None)
                } else {
                    names
                        .iter()
                        .all(|name| choices.iter().any(|c| c.loose_eq(&Value::Str(name.clone()))))
                };
                Ok(Value::Bool(result))
            }
            Function::SetComponent => {
                let class = expect_str(&args[0], next(), function)?;
                let names = expect_names(&args[1], next(), function)?;
                self.context
                    .set_component(&class, names)
                    .map_err(|e| (span, EvaluationFailure::from(e)))?;
                Ok(Value::None)
            }
            Function::SetImageId => {
                let image_id = match next() {
                    Value::Int(image_id) => image_id,
                    Value::Str(name) => {
                        match self
                            .context
                            .database()
                            .image_ids()
                            .iter()
                            .find(|(_, image_name)| **image_name == name)
                        {
                            Some((image_id, _)) => i64::from(*image_id),
                            None => {
                                return type_error(
                                    args[0].span,
                                    format!("image name '{name}' is not defined"),
                                );
                            }
                        }
                    }
                    other => {
                        return type_error(
                            args[0].span,
                            format!("{function}() expects an int, got {}", other.type_name()),
                        );
                    }
                };
                let checked = u8::try_from(image_id)
                    .ok()
                    .filter(|id| self.context.database().get_pattern(*id).is_some())
                    .ok_or((span, EvaluationFailure::UnknownImageId(image_id)))?;
                self.context
                    .set_image_id(checked)
                    .map_err(|e| (span, EvaluationFailure::from(e)))?;
                Ok(Value::None)
            }
            Function::GetDeviceInfo => {
                let key = expect_str(&args[0], next(), function)?;
                match self.context.get_device_info(&key) {
                    Some(value) => Ok(Value::from(value)),
                    None if args.len() == 2 => Ok(next()),
                    None => fail(span, EvaluationFailure::MissingDeviceInfo(key)),
                }
            }
            Function::GetVpdValue | Function::ValidVpdValue => {
                let section = expect_str(&args[0], next(), function)?;
                let key = expect_str(&args[1], next(), function)?;
                let Some(values) = self.context.vpd().section(&section) else {
                    return fail(args[0].span, EvaluationFailure::UnknownVpdSection(section));
                };
                let value = values.get(&key);
                if function == Function::GetVpdValue {
                    return Ok(value.map_or(Value::None, |value| Value::Str(value.clone())));
                }
                Ok(Value::Bool(value.is_some_and(|value| valid_vpd_value(&key, value))))
            }
            Function::CheckRegistrationCode => {
                let code = expect_str(&args[0], next(), function)?;
                check_registration_code(&code).map_err(|e| (span, e))?;
                Ok(Value::Bool(true))
            }
            Function::GetPhase => Ok(Value::Str(self.context.phase().as_str().to_string())),
            Function::Assert => {
                let condition = next();
                if condition.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                let message = match next() {
                    Value::Str(message) => message,
                    Value::None => format!(
                        "assertion failed: {}",
                        self.expression.text_of(args[0].span)
                    ),
                    other => other.to_string(),
                };
                fail(args[0].span, EvaluationFailure::AssertionFailed { message })
            }
            // Re() calls are turned into regex literals by the parser.
            Function::Re => type_error(span, "Re() must be called with a string literal".into()),
        }
    }
}

fn overflow(span: Span) -> (Span, EvaluationFailure) {
    (span, EvaluationFailure::type_error("integer overflow"))
}

// valid_vpd_value checks that a VPD value is set. Serial numbers must
// also be printable ASCII without whitespace.
fn valid_vpd_value(key: &str, value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    if key == "serial_number" || key == "mlb_serial_number" {
        return value.bytes().all(|b| b.is_ascii_graphic());
    }
    true
}
